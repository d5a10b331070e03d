//! HTTP routes.
//!
//! Bearer-protected routes sit behind [`require_caller`], which runs the
//! access guard before any store or gateway work and hands the resulting
//! `CallerIdentity` to handlers through request extensions.

use axum::extract::{Path, Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{delete, get, post};
use axum::{Extension, Json, Router};
use serde_json::{Value, json};
use surrealdb::Connection;
use tracing::debug;
use uuid::Uuid;
use webtop_auth::{AuthError, LoginInput};
use webtop_core::gateway::ContainerGateway;
use webtop_core::identity::CallerIdentity;
use webtop_core::repository::ApplicationRepository;

use crate::dto::{
    AccessResponse, ApplicationResponse, ChangePasswordRequest, LaunchRequest, LoginRequest,
    LoginResponse, SessionResponse,
};
use crate::error::ApiError;
use crate::state::AppState;

pub fn router<C, G>(state: AppState<C, G>) -> Router
where
    C: Connection,
    G: ContainerGateway + 'static,
{
    Router::new()
        .route("/api/auth/change-password", post(change_password::<C, G>))
        .route("/api/sessions", post(launch::<C, G>).get(list_own::<C, G>))
        .route("/api/sessions/{id}", delete(stop::<C, G>))
        .route("/api/sessions/{id}/stop", post(stop::<C, G>))
        .route("/api/admin/sessions", get(list_all::<C, G>))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_caller::<C, G>,
        ))
        // Unauthenticated routes (added after the layer).
        .route("/api/health", get(health))
        .route("/api/auth/login", post(login::<C, G>))
        .route("/api/applications", get(list_applications::<C, G>))
        .with_state(state)
}

async fn require_caller<C, G>(
    State(state): State<AppState<C, G>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError>
where
    C: Connection,
    G: ContainerGateway + 'static,
{
    let authorization = match request.headers().get(header::AUTHORIZATION) {
        Some(value) => Some(value.to_str().map_err(|_| {
            AuthError::InvalidToken("authorization header is not valid UTF-8".into())
        })?),
        None => None,
    };
    let caller = state.guard.authorize(authorization).inspect_err(|e| {
        debug!(path = %request.uri().path(), error = %e, "Rejected unauthenticated request");
    })?;

    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn login<C, G>(
    State(state): State<AppState<C, G>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError>
where
    C: Connection,
    G: ContainerGateway + 'static,
{
    let out = state
        .credentials
        .login(LoginInput {
            username: body.username,
            password: body.password,
        })
        .await?;

    Ok(Json(LoginResponse {
        token: out.access_token,
        expires_in: out.expires_in,
        user_id: out.identity.user_id,
        is_admin: out.identity.is_admin(),
    }))
}

async fn change_password<C, G>(
    State(state): State<AppState<C, G>>,
    Extension(caller): Extension<CallerIdentity>,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<StatusCode, ApiError>
where
    C: Connection,
    G: ContainerGateway + 'static,
{
    state
        .credentials
        .change_password(&caller, &body.current_password, &body.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_applications<C, G>(
    State(state): State<AppState<C, G>>,
) -> Result<Json<Vec<ApplicationResponse>>, ApiError>
where
    C: Connection,
    G: ContainerGateway + 'static,
{
    let apps = state.applications.list().await?;
    Ok(Json(apps.into_iter().map(ApplicationResponse::from).collect()))
}

async fn launch<C, G>(
    State(state): State<AppState<C, G>>,
    Extension(caller): Extension<CallerIdentity>,
    Json(body): Json<LaunchRequest>,
) -> Result<(StatusCode, Json<AccessResponse>), ApiError>
where
    C: Connection,
    G: ContainerGateway + 'static,
{
    let access = state
        .orchestrator
        .launch(caller, body.application_id, body.persistent)
        .await?;
    Ok((StatusCode::CREATED, Json(access.into())))
}

async fn list_own<C, G>(
    State(state): State<AppState<C, G>>,
    Extension(caller): Extension<CallerIdentity>,
) -> Result<Json<Vec<SessionResponse>>, ApiError>
where
    C: Connection,
    G: ContainerGateway + 'static,
{
    let sessions = state.orchestrator.list_own(caller).await?;
    Ok(Json(sessions.into_iter().map(SessionResponse::from).collect()))
}

async fn stop<C, G>(
    State(state): State<AppState<C, G>>,
    Extension(caller): Extension<CallerIdentity>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionResponse>, ApiError>
where
    C: Connection,
    G: ContainerGateway + 'static,
{
    let session = state.orchestrator.stop(caller, session_id).await?;
    Ok(Json(session.into()))
}

async fn list_all<C, G>(
    State(state): State<AppState<C, G>>,
    Extension(caller): Extension<CallerIdentity>,
) -> Result<Json<Vec<SessionResponse>>, ApiError>
where
    C: Connection,
    G: ContainerGateway + 'static,
{
    let sessions = state.orchestrator.list_all(caller).await?;
    Ok(Json(sessions.into_iter().map(SessionResponse::from).collect()))
}

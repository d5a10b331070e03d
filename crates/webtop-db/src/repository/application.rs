//! SurrealDB implementation of [`ApplicationRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;
use webtop_core::error::WebtopResult;
use webtop_core::models::application::{Application, CreateApplication};
use webtop_core::repository::ApplicationRepository;

use crate::error::{DbError, parse_uuid};

#[derive(Debug, SurrealValue)]
struct ApplicationRow {
    name: String,
    logo_url: Option<String>,
    repository_url: Option<String>,
    image: String,
    docker_compose: Option<String>,
    enabled: bool,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct ApplicationRowWithId {
    record_id: String,
    name: String,
    logo_url: Option<String>,
    repository_url: Option<String>,
    image: String,
    docker_compose: Option<String>,
    enabled: bool,
    created_at: DateTime<Utc>,
}

impl ApplicationRow {
    fn into_application(self, id: Uuid) -> Application {
        Application {
            id,
            name: self.name,
            logo_url: self.logo_url,
            repository_url: self.repository_url,
            image: self.image,
            docker_compose: self.docker_compose,
            enabled: self.enabled,
            created_at: self.created_at,
        }
    }
}

impl ApplicationRowWithId {
    fn try_into_application(self) -> Result<Application, DbError> {
        Ok(Application {
            id: parse_uuid(&self.record_id, "application")?,
            name: self.name,
            logo_url: self.logo_url,
            repository_url: self.repository_url,
            image: self.image,
            docker_compose: self.docker_compose,
            enabled: self.enabled,
            created_at: self.created_at,
        })
    }
}

fn first_row(rows: Vec<ApplicationRow>, id: Uuid) -> Result<Application, DbError> {
    rows.into_iter()
        .next()
        .map(|row| row.into_application(id))
        .ok_or_else(|| DbError::NotFound {
            entity: "application".into(),
            id: id.to_string(),
        })
}

/// SurrealDB implementation of the Application repository.
#[derive(Clone)]
pub struct SurrealApplicationRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealApplicationRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ApplicationRepository for SurrealApplicationRepository<C> {
    async fn create(&self, input: CreateApplication) -> WebtopResult<Application> {
        let id = Uuid::new_v4();

        let result = self
            .db
            .query(
                "CREATE type::record('applications', $id) SET \
                 name = $name, \
                 logo_url = $logo_url, \
                 repository_url = $repository_url, \
                 image = $image, \
                 docker_compose = $docker_compose, \
                 enabled = $enabled",
            )
            .bind(("id", id.to_string()))
            .bind(("name", input.name))
            .bind(("logo_url", input.logo_url))
            .bind(("repository_url", input.repository_url))
            .bind(("image", input.image))
            .bind(("docker_compose", input.docker_compose))
            .bind(("enabled", input.enabled))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_write("application", e))?;

        let rows: Vec<ApplicationRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_row(rows, id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> WebtopResult<Application> {
        let mut result = self
            .db
            .query("SELECT * FROM type::record('applications', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ApplicationRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_row(rows, id)?)
    }

    async fn list(&self) -> WebtopResult<Vec<Application>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM applications \
                 ORDER BY name ASC",
            )
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ApplicationRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(ApplicationRowWithId::try_into_application)
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(items)
    }

    async fn set_enabled(&self, id: Uuid, enabled: bool) -> WebtopResult<Application> {
        let mut result = self
            .db
            .query(
                "UPDATE type::record('applications', $id) \
                 SET enabled = $enabled",
            )
            .bind(("id", id.to_string()))
            .bind(("enabled", enabled))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ApplicationRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_row(rows, id)?)
    }

    async fn delete(&self, id: Uuid) -> WebtopResult<()> {
        self.db
            .query("DELETE type::record('applications', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }
}

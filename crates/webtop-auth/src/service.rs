//! Credential verification: login and password change.

use tracing::{debug, info};
use webtop_core::error::{WebtopError, WebtopResult};
use webtop_core::identity::CallerIdentity;
use webtop_core::repository::UserRepository;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::password;
use crate::token;

/// Input for the login flow.
#[derive(Debug)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

/// Successful login result.
#[derive(Debug)]
pub struct LoginOutput {
    /// Signed JWT access token.
    pub access_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
    pub identity: CallerIdentity,
}

/// Verifies username/password pairs and issues access tokens.
///
/// Generic over the user repository so the auth layer has no
/// dependency on the database crate.
pub struct CredentialVerifier<U: UserRepository> {
    user_repo: U,
    config: AuthConfig,
}

impl<U: UserRepository> CredentialVerifier<U> {
    pub fn new(user_repo: U, config: AuthConfig) -> Self {
        Self { user_repo, config }
    }

    /// Check a username/password pair.
    ///
    /// Unknown usernames and wrong passwords both yield
    /// `InvalidCredentials`.
    pub async fn verify(&self, username: &str, presented: &str) -> WebtopResult<CallerIdentity> {
        let user = match self.user_repo.get_by_username(username).await {
            Ok(u) => u,
            Err(WebtopError::NotFound { .. }) => {
                password::burn_verification(presented);
                debug!("login rejected");
                return Err(AuthError::InvalidCredentials.into());
            }
            Err(e) => return Err(e),
        };

        let valid =
            password::verify_password(presented, &user.password_hash, self.config.pepper.as_deref())?;
        if !valid {
            debug!(user_id = %user.id, "login rejected");
            return Err(AuthError::InvalidCredentials.into());
        }

        Ok(CallerIdentity::new(user.id, user.role()))
    }

    /// Sign a token for `identity` valid for `ttl_secs`.
    pub fn issue_token(&self, identity: &CallerIdentity, ttl_secs: u64) -> WebtopResult<String> {
        let ttl = i64::try_from(ttl_secs).map_err(|_| WebtopError::Validation {
            message: "token lifetime out of range".into(),
        })?;
        Ok(token::issue_access_token(identity, ttl, &self.config)?)
    }

    /// Verify credentials and issue a token with the configured lifetime.
    pub async fn login(&self, input: LoginInput) -> WebtopResult<LoginOutput> {
        let identity = self.verify(&input.username, &input.password).await?;
        let access_token = self.issue_token(&identity, self.config.access_token_lifetime_secs)?;

        info!(user_id = %identity.user_id, role = %identity.role, "User logged in");

        Ok(LoginOutput {
            access_token,
            expires_in: self.config.access_token_lifetime_secs,
            identity,
        })
    }

    /// Replace the caller's password after re-checking the current one.
    pub async fn change_password(
        &self,
        caller: &CallerIdentity,
        current: &str,
        new_password: &str,
    ) -> WebtopResult<()> {
        if new_password.chars().count() < self.config.min_password_length {
            return Err(WebtopError::Validation {
                message: format!(
                    "password must be at least {} characters",
                    self.config.min_password_length
                ),
            });
        }

        let user = self.user_repo.get_by_id(caller.user_id).await?;
        let valid =
            password::verify_password(current, &user.password_hash, self.config.pepper.as_deref())?;
        if !valid {
            return Err(AuthError::InvalidCredentials.into());
        }

        self.user_repo.set_password(user.id, new_password).await?;
        info!(user_id = %user.id, "Password changed");
        Ok(())
    }
}

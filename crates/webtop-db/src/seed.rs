//! Idempotent seed data for fresh deployments.

use surrealdb::{Connection, Surreal};
use tracing::info;
use webtop_core::error::{WebtopError, WebtopResult};
use webtop_core::models::application::CreateApplication;
use webtop_core::models::setting::{PORTAINER_API_KEY_KEY, PORTAINER_URL_KEY};
use webtop_core::models::user::CreateUser;
use webtop_core::repository::{ApplicationRepository, SettingsRepository, UserRepository};

use crate::repository::{
    SurrealApplicationRepository, SurrealSettingsRepository, SurrealUserRepository,
};

/// Initial passwords for the seeded accounts.
#[derive(Debug, Clone)]
pub struct SeedOptions {
    pub admin_password: String,
    pub user_password: String,
    pub pepper: Option<String>,
}

struct SeedApp {
    name: &'static str,
    logo_url: &'static str,
    repository_url: &'static str,
    image: &'static str,
}

const SEED_APPS: &[SeedApp] = &[
    SeedApp {
        name: "VS Code",
        logo_url: "https://cdn.icon-icons.com/icons2/2107/PNG/512/file_type_vscode_icon_130084.png",
        repository_url: "https://github.com/linuxserver/docker-code-server",
        image: "lscr.io/linuxserver/code-server:latest",
    },
    SeedApp {
        name: "Ubuntu Desktop",
        logo_url: "https://cdn.icon-icons.com/icons2/1508/PNG/512/ubuntu_104494.png",
        repository_url: "https://github.com/linuxserver/docker-webtop",
        image: "lscr.io/linuxserver/webtop:latest",
    },
];

/// Insert the default accounts, catalog entries and settings keys that
/// are not present yet. Existing rows are left untouched.
pub async fn seed_initial_data<C: Connection>(
    db: &Surreal<C>,
    options: &SeedOptions,
) -> WebtopResult<()> {
    let users = match &options.pepper {
        Some(p) => SurrealUserRepository::with_pepper(db.clone(), p.clone()),
        None => SurrealUserRepository::new(db.clone()),
    };
    for (username, password, is_admin) in [
        ("admin", &options.admin_password, true),
        ("user", &options.user_password, false),
    ] {
        match users.get_by_username(username).await {
            Ok(_) => {}
            Err(WebtopError::NotFound { .. }) => {
                users
                    .create(CreateUser {
                        username: username.into(),
                        password: password.clone(),
                        is_admin,
                    })
                    .await?;
                info!(username, is_admin, "Seeded user");
            }
            Err(e) => return Err(e),
        }
    }

    let apps = SurrealApplicationRepository::new(db.clone());
    let existing = apps.list().await?;
    for seed in SEED_APPS {
        if existing.iter().any(|a| a.name == seed.name) {
            continue;
        }
        apps.create(CreateApplication {
            name: seed.name.into(),
            logo_url: Some(seed.logo_url.into()),
            repository_url: Some(seed.repository_url.into()),
            image: seed.image.into(),
            docker_compose: None,
            enabled: true,
        })
        .await?;
        info!(name = seed.name, "Seeded application");
    }

    let settings = SurrealSettingsRepository::new(db.clone());
    for key in [PORTAINER_URL_KEY, PORTAINER_API_KEY_KEY] {
        if settings.get(key).await?.is_none() {
            settings.set(key, "").await?;
        }
    }

    Ok(())
}

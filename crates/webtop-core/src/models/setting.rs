//! Key/value deployment setting.

use serde::{Deserialize, Serialize};

pub const PORTAINER_URL_KEY: &str = "portainer_url";
pub const PORTAINER_API_KEY_KEY: &str = "portainer_api_key";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Setting {
    pub key: String,
    pub value: String,
}

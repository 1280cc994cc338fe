use std::{path::Path, time::Duration};

use grouplay_shared::config::{ConfigError, Store, load_config, save_config};
use serde::{Deserialize, Serialize};

use crate::{Role, gs};

#[derive(Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub general: General,
    #[serde(default)]
    pub store: Store,
}
impl Config {
    pub const FILENAME: &str = "config.toml";

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        load_config(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        save_config(path, self)
    }

    /// A REST store client for the configured session. An empty session ID
    /// leaves the client unbound, and an empty token sends no `auth` parameter.
    pub fn store_client(&self) -> gs::Client {
        let poll_interval = Duration::from_millis(self.store.poll_interval_ms.max(1));
        gs::Client::new(
            self.store.base_url.clone(),
            Some(self.store.auth_token.clone()),
        )
        .with_poll_interval(poll_interval)
        .bind(self.store.session_id.clone())
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct General {
    pub role: Role,
    pub catalog_uri_prefix: String,
}
impl Default for General {
    fn default() -> Self {
        Self {
            role: Role::Guest,
            catalog_uri_prefix: "spotify:track:".to_string(),
        }
    }
}

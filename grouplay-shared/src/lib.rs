pub mod config {
    use std::path::Path;

    use serde::{Deserialize, Serialize, de::DeserializeOwned};

    /// Connection settings for the session store.
    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    #[serde(default)]
    pub struct Store {
        pub base_url: String,
        pub session_id: String,
        pub auth_token: String,
        pub poll_interval_ms: u64,
    }
    impl Default for Store {
        fn default() -> Self {
            Self {
                base_url: "https://YOUR_PROJECT.firebaseio.com".to_string(),
                session_id: String::new(),
                auth_token: String::new(),
                poll_interval_ms: 1000,
            }
        }
    }

    #[derive(Debug)]
    pub enum ConfigError {
        Read(std::io::Error),
        Parse(toml::de::Error),
        Serialize(toml::ser::Error),
        Write(std::io::Error),
    }
    impl std::fmt::Display for ConfigError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                ConfigError::Read(e) => write!(f, "Failed to read config: {e}"),
                ConfigError::Parse(e) => write!(f, "Failed to parse config: {e}"),
                ConfigError::Serialize(e) => write!(f, "Failed to serialize config: {e}"),
                ConfigError::Write(e) => write!(f, "Failed to write config: {e}"),
            }
        }
    }
    impl std::error::Error for ConfigError {}

    /// Load a TOML config file, returning `T::default()` if the file doesn't exist.
    pub fn load_config<T: Default + DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).map_err(ConfigError::Parse),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("no config file found at {}, using defaults", path.display());
                Ok(T::default())
            }
            Err(e) => Err(ConfigError::Read(e)),
        }
    }

    /// Write a config to a TOML file.
    pub fn save_config<T: Serialize>(path: &Path, config: &T) -> Result<(), ConfigError> {
        let contents = toml::to_string(config).map_err(ConfigError::Serialize)?;
        std::fs::write(path, contents).map_err(ConfigError::Write)?;
        tracing::info!("saved config to {}", path.display());
        Ok(())
    }
}

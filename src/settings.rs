use serde::{Deserialize, Serialize};
use std::env;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Settings {
    pub debug: bool,
    pub database: DatabaseSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            debug: false,
            database: DatabaseSettings {
                url: "sqlite::memory:".to_string(),
                max_connections: 1,
            },
        }
    }
}

impl Settings {
    /// Build settings from `COBALTO_*` environment variables, falling back to
    /// [`Settings::default`] for anything unset or unparsable.
    ///
    /// Recognised: `COBALTO_DEBUG`, `COBALTO_DATABASE_URL`,
    /// `COBALTO_DATABASE_MAX_CONNECTIONS`. `debug` raises SQL statement
    /// logging from `debug` to `info`.
    pub fn from_env() -> Self {
        Self::from_vars(env::vars())
    }

    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut settings = Settings::default();
        for (key, value) in vars {
            let Some(name) = key.strip_prefix("COBALTO_") else {
                continue;
            };
            match name {
                "DEBUG" => settings.debug = matches!(value.as_str(), "1" | "true" | "yes"),
                "DATABASE_URL" => settings.database.url = value,
                "DATABASE_MAX_CONNECTIONS" => match value.parse() {
                    Ok(n) => settings.database.max_connections = n,
                    Err(_) => log::warn!(
                        "Ignoring COBALTO_DATABASE_MAX_CONNECTIONS={}: not a number",
                        value
                    ),
                },
                _ => log::debug!("Ignoring unknown setting {}", key),
            }
        }
        settings
    }
}

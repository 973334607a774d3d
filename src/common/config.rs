use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::prelude::*;

/// Represents the contents of issuesmith's configuration file.
#[derive(Serialize, Deserialize, Default, Debug, Clone)]
#[serde(default)]
pub struct Config {
    pub serve: Serve,
    pub github: GitHub,
    pub cache: Cache,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Serve {
    pub address: String,
    pub port: u16,
    /// Directory holding the browser frontend. Served at `/` and `/static` if it exists.
    pub frontend_dir: Option<PathBuf>,
    /// Allowed CORS origins; `"*"` allows any.
    pub cors_origins: Vec<String>,
}

impl Default for Serve {
    fn default() -> Self {
        Serve {
            address: String::from("0.0.0.0"),
            port: 8000,
            frontend_dir: Some(PathBuf::from("frontend")),
            cors_origins: vec![String::from("*")],
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct GitHub {
    pub api_url: String,
    pub user_agent: String,
    pub api_version: String,
    pub timeout_secs: u64,
    pub create_timeout_secs: u64,
}

impl Default for GitHub {
    fn default() -> Self {
        GitHub {
            api_url: String::from("https://api.github.com"),
            user_agent: format!("issuesmith/{}", env!("CARGO_PKG_VERSION")),
            api_version: String::from("2022-11-28"),
            timeout_secs: 10,
            create_timeout_secs: 30,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Cache {
    /// Maximum number of successful verifications kept around.
    pub verify_capacity: u64,
    pub verify_ttl_secs: u64,
}

impl Default for Cache {
    fn default() -> Self {
        Cache {
            verify_capacity: 1024,
            verify_ttl_secs: 300,
        }
    }
}

impl Config {
    /// Loads the configuration at `path`, falling back to defaults if there is no such file.
    /// Environment overrides are applied afterwards.
    pub fn from_path(path: &Path) -> Result<Self> {
        let mut config = match path.exists() {
            true => {
                let toml_raw = std::fs::read_to_string(path)
                    .wrap_err("Could not read in configuration file.")
                    .suggestion("The configuration file was found, but couldn't be read - try checking your file permissions.")?;

                Self::from_toml(&toml_raw)
                    .wrap_err_with(|| format!("Could not parse configuration file {path:?}."))?
            }
            false => {
                warn!("Configuration file {path:?} not found - using defaults.");
                Self::default()
            }
        };

        config.apply_env();
        Ok(config)
    }

    pub fn from_toml(toml_raw: &str) -> Result<Self> {
        Ok(toml::from_str(toml_raw)?)
    }

    fn apply_env(&mut self) {
        if let Ok(host) = env::var("HOST") {
            self.serve.address = host;
        }

        if let Ok(port) = env::var("PORT") {
            match port.parse() {
                Ok(port) => self.serve.port = port,
                Err(e) => warn!("Ignoring invalid PORT {port:?} ({e})."),
            }
        }

        if let Ok(url) = env::var("ISSUESMITH_GITHUB_API_URL") {
            self.github.api_url = url;
        }
    }
}

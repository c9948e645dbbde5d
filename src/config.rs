//! Runtime configuration.
//!
//! Settings resolve in this order: command-line flag, environment variable,
//! compile-time value, built-in default.
//!
//! - `TASKBOARD_API_URL` - backend base URL. Also read at compile time.
//!   Defaults to `http://localhost:5000/api`.
//! - `TASKBOARD_HOME` - directory for the session file and the board log.
//!   Defaults to `$HOME/.taskboard`.
//! - `TASKBOARD_LOG` - `tracing` filter directive. Defaults to `taskboard=info`.

use std::path::PathBuf;

use url::Url;

use crate::cli::Cli;
use crate::error::{Error, Result};

pub const API_URL_ENV: &str = "TASKBOARD_API_URL";
pub const HOME_ENV: &str = "TASKBOARD_HOME";
pub const LOG_ENV: &str = "TASKBOARD_LOG";
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

/// Base URL baked in at build time, if the builder set one.
const BUILD_API_URL: Option<&str> = option_env!("TASKBOARD_API_URL");

#[derive(Debug, Clone)]
pub struct Config {
    /// Backend base URL, without trailing slash.
    pub api_url: String,
    /// Where the session file and the board log live.
    pub data_dir: PathBuf,
    /// Filter directive for the log subscriber.
    pub log_filter: String,
}

impl Config {
    /// Resolve configuration from parsed arguments and the process environment.
    pub fn load(cli: &Cli) -> Result<Self> {
        Self::resolve(cli, |key| std::env::var(key).ok())
    }

    /// Same as [`Config::load`] with an injectable environment lookup.
    pub fn resolve(cli: &Cli, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let raw_url = cli
            .api_url
            .clone()
            .or_else(|| env(API_URL_ENV))
            .or_else(|| BUILD_API_URL.map(str::to_string))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_url = normalise_api_url(&raw_url)?;

        let data_dir = cli
            .data_dir
            .clone()
            .or_else(|| env(HOME_ENV).map(PathBuf::from))
            .unwrap_or_else(|| {
                let home = env("HOME").unwrap_or_else(|| ".".to_string());
                PathBuf::from(home).join(".taskboard")
            });

        let log_filter = env(LOG_ENV).unwrap_or_else(|| {
            if cli.verbose {
                "taskboard=debug".to_string()
            } else {
                "taskboard=info".to_string()
            }
        });

        Ok(Self {
            api_url,
            data_dir,
            log_filter,
        })
    }

    pub fn session_path(&self) -> PathBuf {
        self.data_dir.join("session.json")
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join("taskboard.log")
    }
}

/// Check that the URL is absolute http(s) and strip trailing slashes.
pub fn normalise_api_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let url = Url::parse(trimmed)
        .map_err(|e| Error::Config(format!("{API_URL_ENV} '{raw}' is not a valid URL: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(trimmed.to_string()),
        other => Err(Error::Config(format!(
            "{API_URL_ENV} must use http or https, got '{other}'"
        ))),
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Interfaces for parsing configuration files and working with a warden
//! server configuration

use camino::{Utf8Path, Utf8PathBuf};
use dropshot::{ConfigDropshot, ConfigLogging};
use serde::Deserialize;
use thiserror::Error;
use warden_types::rules::GroupId;

/// Configuration for a warden server
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// The security group whose ingress rules this server manages.
    pub target_group: GroupId,
    /// Trust the first `X-Forwarded-For` entry as the caller's address.
    ///
    /// Enable only when the server sits behind a proxy that overwrites the
    /// header; a direct caller can forge it.
    #[serde(default)]
    pub trust_forwarded_for: bool,
    /// Rule Store client configuration.
    pub store: StoreConfig,
    /// Configuration for our dropshot server.
    pub dropshot: ConfigDropshot,
    /// Server-wide logging configuration.
    pub log: ConfigLogging,
}

#[derive(Clone, Debug, Deserialize)]
pub struct StoreConfig {
    /// Base URL of the Rule Store API.
    pub base_url: String,
    /// Per-request timeout for Rule Store calls.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    15
}

impl Config {
    /// Load a `Config` from the given TOML file
    pub fn from_file(path: &Utf8Path) -> Result<Config, LoadError> {
        let file_contents = std::fs::read_to_string(path)
            .map_err(|err| LoadError::Io { path: path.into(), err })?;
        let config_parsed: Config = toml::from_str(&file_contents)
            .map_err(|err| LoadError::Parse { path: path.into(), err })?;
        Ok(config_parsed)
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("error reading \"{path}\": {err}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error("error parsing \"{path}\": {err}")]
    Parse {
        path: Utf8PathBuf,
        #[source]
        err: toml::de::Error,
    },
}

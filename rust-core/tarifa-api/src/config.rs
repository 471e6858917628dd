// SPDX-License-Identifier: PMPL-1.0-or-later
//! Engine configuration.
//!
//! Layered with figment, lowest to highest precedence:
//! 1. Built-in defaults
//! 2. An optional YAML file
//! 3. `TARIFA_*` environment variables, `__` separating nested keys
//!    (`TARIFA_DATA_DB__CONN__HOST=db.example.com`)
//!
//! The load and CDR stores are built from the `stor_db` section.

use std::path::Path;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use tarifa_storage::{DataDbConfig, StorDbConfig};

pub const ENV_PREFIX: &str = "TARIFA_";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub data_db: DataDbConfig,
    pub stor_db: StorDbConfig,
}

impl EngineConfig {
    /// The layered figment, without extracting it.
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(EngineConfig::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        figment
            .extract()
            .context("Failed to extract engine configuration")
    }

    /// Load from defaults, the YAML file at `path` if given, and environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let context = match path {
            Some(path) => format!("Failed to load config from {}", path.display()),
            None => "Failed to load config".to_string(),
        };
        Self::from_figment(Self::figment(path)).context(context)
    }
}

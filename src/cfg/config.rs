// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fs, path::{Path, PathBuf}};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

/// Process-wide engine configuration, immutable after startup.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Config {
    /// Root directory for message working directories and the attic.
    #[serde(rename = "RootDir")]
    pub root_dir: PathBuf,

    #[serde(default = "default_retry_secs", rename = "RetrySecs")]
    /// Seconds between retry attempts of a sleeping task.
    pub retry_secs: u64,

    #[serde(default = "default_idle_secs", rename = "IdleSecs")]
    /// Seconds of bearer inactivity before the connection is closed.
    pub idle_secs: u64,

    #[serde(default, rename = "KeepTempFiles")]
    /// Keep per-message working files around after the task finishes.
    pub keep_temp_files: bool,

    #[serde(default, rename = "AtticEnabled")]
    /// Archive unrecognized push PDUs under `<root>/attic/`.
    pub attic_enabled: bool,
}

fn default_retry_secs() -> u64 {
    15
}

fn default_idle_secs() -> u64 {
    20
}

/// Per-SIM settings, queried through a [`SettingsProvider`] by IMSI.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SimSettings {
    #[serde(default = "default_user_agent", rename = "UserAgent")]
    pub user_agent: String,

    #[serde(default, rename = "UserAgentProfile")]
    /// URL advertised through the x-wap-profile request header.
    pub uaprof: String,

    #[serde(default = "default_size_limit", rename = "SizeLimit")]
    /// Maximum size of an outbound m-send.req PDU, in bytes. Zero
    /// disables the limit.
    pub size_limit: u64,

    #[serde(default = "default_max_pixels", rename = "MaxPixels")]
    /// Pixel budget for outbound images; the resize loop steps images
    /// down toward it.
    pub max_pixels: u64,

    #[serde(default = "default_allow_dr", rename = "AllowDeliveryReports")]
    pub allow_dr: bool,
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Sailfish; Jolla)".to_string()
}

fn default_size_limit() -> u64 {
    300 * 1024
}

fn default_max_pixels() -> u64 {
    3_000_000
}

fn default_allow_dr() -> bool {
    true
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            uaprof: String::new(),
            size_limit: default_size_limit(),
            max_pixels: default_max_pixels(),
            allow_dr: default_allow_dr(),
        }
    }
}

/// Supplies per-SIM settings to the tasks that need them.
pub trait SettingsProvider {
    fn sim_settings(&self, imsi: &str) -> SimSettings;
}

/// Static provider handing out the same defaults for every IMSI.
#[derive(Debug, Clone, Default)]
pub struct StaticSettings {
    pub defaults: SimSettings,
}

impl SettingsProvider for StaticSettings {
    fn sim_settings(&self, _imsi: &str) -> SimSettings {
        self.defaults.clone()
    }
}

/// On-disk engine configuration file.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct EngineConfig {
    pub engine: Config,
    #[serde(default)]
    pub sim_defaults: Option<SimSettings>,
}

impl EngineConfig {
    /// Loads the configuration from YAML, validates it, and returns the
    /// ready-to-use value.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        let mut cfg: EngineConfig =
            serde_yaml::from_str(&s).context("failed to parse config YAML")?;
        cfg.validate_and_normalize()?;
        Ok(cfg)
    }

    /// Validates invariants and normalizes derived fields.
    pub fn validate_and_normalize(&mut self) -> Result<()> {
        ensure!(
            !self.engine.root_dir.as_os_str().is_empty(),
            "RootDir must not be empty"
        );
        ensure!(self.engine.retry_secs >= 1, "RetrySecs must be >= 1");
        ensure!(self.engine.idle_secs >= 1, "IdleSecs must be >= 1");
        Ok(())
    }
}

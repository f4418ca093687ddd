//! Configuration loading (spec §6, AMBIENT STACK §Configuration): one
//! `toml` document deserialized once at startup via `core_models::Config`'s
//! `#[serde(default = ...)]` fields, so a partially-specified file still
//! parses. Loaded by value and passed into constructors — no global.

use core_models::Config;

use crate::error::CoreError;

pub fn load(path: &str) -> Result<Config, CoreError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| CoreError::Config(format!("reading {path}: {e}")))?;
    toml::from_str(&raw).map_err(|e| CoreError::Config(format!("parsing {path}: {e}")))
}

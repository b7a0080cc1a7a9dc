use crate::utils::validation::is_empty_or_whitespace;
use serde_json::{Map, Value};
use thiserror::Error;

/// A flat set of GUI configuration keys.
pub type ConfigMap = Map<String, Value>;

const SEPARATOR: char = ',';

#[derive(Debug, Error)]
pub enum OverrideError {
    #[error("invalid key/value pair {0:?}")]
    Pair(String),
    #[error("invalid value for key {key}: {source}")]
    Value { key: String, source: serde_json::Error },
}

/// Parse user overrides like `gisf: true, charmstoreURL: "https://1.2.3.4/cs"`.
/// Values are JSON.
pub fn parse_overrides(input: &str) -> Result<ConfigMap, OverrideError> {
    let mut overrides = ConfigMap::new();
    if is_empty_or_whitespace(input) {
        return Ok(overrides);
    }
    for pair in input.split(SEPARATOR) {
        let pair = pair.trim();
        let (key, value) = pair.split_once(':').ok_or_else(|| OverrideError::Pair(pair.to_string()))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(OverrideError::Pair(pair.to_string()));
        }
        let value: Value =
            serde_json::from_str(value.trim()).map_err(|source| OverrideError::Value { key: key.to_string(), source })?;
        overrides.insert(key.to_string(), value);
    }
    Ok(overrides)
}

/// How a layer combines with the layers before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Every key replaces an earlier value.
    Overwrite,
    /// Keys only land when no earlier layer set them.
    FillMissing,
}

#[derive(Debug, Clone)]
pub struct ConfigLayer {
    pub name: &'static str,
    pub mode: MergeMode,
    pub values: ConfigMap,
}

impl ConfigLayer {
    pub fn new(name: &'static str, mode: MergeMode, values: ConfigMap) -> Self {
        Self { name, mode, values }
    }
}

/// Fold layers in order into a single map.
pub fn merge_layers(layers: &[ConfigLayer]) -> ConfigMap {
    let mut merged = ConfigMap::new();
    for layer in layers {
        for (key, value) in &layer.values {
            match layer.mode {
                MergeMode::Overwrite => {
                    merged.insert(key.clone(), value.clone());
                }
                MergeMode::FillMissing => {
                    merged.entry(key.clone()).or_insert_with(|| value.clone());
                }
            }
        }
    }
    merged
}

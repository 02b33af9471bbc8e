use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use log::info;
use serde::Deserialize;

use crate::error::{ReplitError, Result};

/// Engine limits. Every field has a default, so a config file only needs
/// to list what it changes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Deepest allowed nesting of function calls. The default needs more
    /// native stack than a 2 MiB thread has in debug builds; an [`Engine`]
    /// driven directly from such a thread should lower it.
    ///
    /// [`Engine`]: crate::engine::Engine
    pub max_call_depth: usize,

    /// Stack size of the worker thread that [`run`](crate::engine::run) and
    /// the CLI evaluate programs on.
    pub stack_size_mib: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_call_depth: 128,
            stack_size_mib: 64,
        }
    }
}

impl Config {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Config =
            serde_json::from_str(text).map_err(|e| ReplitError::Config(e.to_string()))?;

        config.validate()
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path: &Path = path.as_ref();
        info!("Loading configuration from {:?}", path);

        let reader: BufReader<File> = BufReader::new(File::open(path)?);
        let config: Config =
            serde_json::from_reader(reader).map_err(|e| ReplitError::Config(e.to_string()))?;

        config.validate()
    }

    fn validate(self) -> Result<Self> {
        if self.max_call_depth == 0 {
            return Err(ReplitError::Config(
                "max_call_depth must be at least 1".to_string(),
            ));
        }

        if self.stack_size_mib == 0 {
            return Err(ReplitError::Config(
                "stack_size_mib must be at least 1".to_string(),
            ));
        }

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config = Config::from_json_str(r#"{ "max_call_depth": 32 }"#).unwrap();

        assert_eq!(config.max_call_depth, 32);
        assert_eq!(config.stack_size_mib, 64);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = Config::from_json_str(r#"{ "max_depth": 32 }"#).unwrap_err();
        assert!(matches!(err, ReplitError::Config(_)));
    }

    #[test]
    fn zero_depth_is_invalid() {
        assert!(Config::from_json_str(r#"{ "max_call_depth": 0 }"#).is_err());
    }
}

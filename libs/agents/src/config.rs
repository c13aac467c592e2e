//! Runtime configuration
//!
//! Loaded from TOML, for example:
//!
//! ```toml
//! default_policy = "dedicated_thread"
//!
//! [worker]
//! thread_name_prefix = "pipeline"
//! stack_size = 1048576
//! ```

use crate::error::{AgentError, Result};
use crate::policy::PolicyKind;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Smallest worker stack accepted by `validate`
pub const MIN_STACK_SIZE: usize = 16 * 1024;

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Policy used by `Policy::default_for`
    pub default_policy: PolicyKind,

    /// Settings for dedicated worker threads
    pub worker: WorkerConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Worker threads are named `{prefix}-{agent}`
    pub thread_name_prefix: String,

    /// Stack size in bytes; platform default when unset
    pub stack_size: Option<usize>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            thread_name_prefix: "agent".to_string(),
            stack_size: None,
        }
    }
}

impl RuntimeConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let config: RuntimeConfig = toml::from_str(toml_str)
            .map_err(|e| AgentError::config(format!("failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AgentError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(
            path = %path.display(),
            default_policy = %config.default_policy,
            "Loaded runtime configuration"
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.worker.validate()
    }
}

impl WorkerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.thread_name_prefix.trim().is_empty() {
            return Err(AgentError::config("worker.thread_name_prefix must not be empty"));
        }
        if let Some(size) = self.stack_size {
            if size < MIN_STACK_SIZE {
                return Err(AgentError::config(format!(
                    "worker.stack_size {} is below the minimum of {} bytes",
                    size, MIN_STACK_SIZE
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.default_policy, PolicyKind::Synchronous);
        assert_eq!(config.worker.thread_name_prefix, "agent");
        assert!(config.worker.stack_size.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let config = RuntimeConfig::from_toml_str(
            r#"
            default_policy = "non_reentrant"

            [worker]
            thread_name_prefix = "pipeline"
            stack_size = 1048576
            "#,
        )
        .unwrap();
        assert_eq!(config.default_policy, PolicyKind::NonReentrant);
        assert_eq!(config.worker.thread_name_prefix, "pipeline");
        assert_eq!(config.worker.stack_size, Some(1024 * 1024));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = RuntimeConfig::from_toml_str("default_policy = \"dedicated_thread\"").unwrap();
        assert_eq!(config.default_policy, PolicyKind::DedicatedThread);
        assert_eq!(config.worker, WorkerConfig::default());
    }

    #[test]
    fn test_invalid_config() {
        assert!(RuntimeConfig::from_toml_str("default_policy = \"fastest\"").is_err());
        assert!(RuntimeConfig::from_toml_str("[worker]\nthread_name_prefix = \"\"").is_err());
        assert!(RuntimeConfig::from_toml_str("[worker]\nstack_size = 1024").is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "default_policy = \"dedicated_thread\"").unwrap();
        writeln!(file, "[worker]").unwrap();
        writeln!(file, "thread_name_prefix = \"io\"").unwrap();

        let config = RuntimeConfig::from_file(file.path()).unwrap();
        assert_eq!(config.default_policy, PolicyKind::DedicatedThread);
        assert_eq!(config.worker.thread_name_prefix, "io");

        assert!(RuntimeConfig::from_file("/nonexistent/agents.toml").is_err());
    }
}

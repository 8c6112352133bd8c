//! Pipeline configuration and per-tool resource records

use crate::{SentieonError, SentieonResult};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Name of the resources entry holding Sentieon settings
pub const SENTIEON_TOOL: &str = "sentieon";

/// Resource settings for a single external tool
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolResources {
    /// License server, license file or environment variables to export.
    /// Kept as raw YAML so the license module decides which shapes are valid.
    #[serde(default)]
    pub keyfile: Option<serde_yaml::Value>,
}

impl ToolResources {
    pub fn with_keyfile(keyfile: impl Into<serde_yaml::Value>) -> Self {
        Self {
            keyfile: Some(keyfile.into()),
        }
    }
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub resources: HashMap<String, ToolResources>,
}

impl Config {
    pub fn from_yaml_str(text: &str) -> SentieonResult<Self> {
        // An empty document deserializes to null
        if text.trim().is_empty() {
            return Ok(Config::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> SentieonResult<Self> {
        let text = std::fs::read_to_string(&path).map_err(|e| {
            SentieonError::Config(format!(
                "Could not read configuration {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        log::debug!("Loaded configuration from {}", path.as_ref().display());
        Self::from_yaml_str(&text)
    }

    /// Resources for `tool`, empty when the configuration has no entry
    pub fn get_resources(&self, tool: &str) -> ToolResources {
        self.resources.get(tool).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_get_resources() {
        let config = Config::from_yaml_str(
            "resources:\n  sentieon:\n    keyfile: 1234@license-server:8990\n  gatk:\n    jvm_opts: [-Xmx2g]\n",
        )
        .unwrap();

        let resources = config.get_resources(SENTIEON_TOOL);
        assert_eq!(
            resources.keyfile,
            Some(serde_yaml::Value::String("1234@license-server:8990".to_string()))
        );
        assert!(config.get_resources("gatk").keyfile.is_none());
        assert!(config.get_resources("bwa").keyfile.is_none());
    }

    #[test]
    fn test_empty_config() {
        let config = Config::from_yaml_str("").unwrap();
        assert!(config.resources.is_empty());
    }

    #[test]
    fn test_from_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "resources:").unwrap();
        writeln!(file, "  sentieon:").unwrap();
        writeln!(file, "    keyfile:").unwrap();
        writeln!(file, "      sentieon_license: 8990@srv").unwrap();
        writeln!(file, "      sentieon_auth_mech: token").unwrap();

        let config = Config::from_path(file.path()).unwrap();
        let keyfile = config.get_resources(SENTIEON_TOOL).keyfile.unwrap();
        assert!(keyfile.is_mapping());

        assert!(matches!(
            Config::from_path("/nonexistent/config.yaml"),
            Err(SentieonError::Config(_))
        ));
    }
}

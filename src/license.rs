//! Sentieon license resolution
//!
//! The `keyfile` resource is either a license server / license file string,
//! exported as `SENTIEON_LICENSE`, or a mapping of environment variables which
//! are exported with upper-cased names in the order they appear.

use crate::command::render_exports;
use crate::config::ToolResources;
use crate::{SentieonError, SentieonResult};
use serde_yaml::Value;

/// Environment variable read by Sentieon for the license location
pub const LICENSE_ENV: &str = "SENTIEON_LICENSE";

const MISSING_KEYFILE: &str = "Need to set resources keyfile with URL:port of license server, \
local license file or environmental variables to export \n\
http://bcbio-nextgen.readthedocs.io/en/latest/contents/configuration.html#resources";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LicenseConfig {
    /// `host:port` of a license server or path to a local license file
    SingleServer(String),
    /// Variables to export, in configuration order
    EnvironmentMap(Vec<(String, String)>),
}

impl LicenseConfig {
    pub fn from_resources(resources: &ToolResources) -> SentieonResult<Self> {
        match &resources.keyfile {
            Some(value) => Self::from_value(value),
            None => Err(SentieonError::Config(MISSING_KEYFILE.to_string())),
        }
    }

    pub fn from_value(value: &Value) -> SentieonResult<Self> {
        match value {
            Value::Null => Err(SentieonError::Config(MISSING_KEYFILE.to_string())),
            Value::String(s) if s.is_empty() => {
                Err(SentieonError::Config(MISSING_KEYFILE.to_string()))
            }
            Value::String(s) => Ok(LicenseConfig::SingleServer(s.clone())),
            Value::Mapping(map) if map.is_empty() => {
                Err(SentieonError::Config(MISSING_KEYFILE.to_string()))
            }
            Value::Mapping(map) => {
                let mut pairs = Vec::with_capacity(map.len());
                for (key, val) in map {
                    let key = key.as_str().ok_or_else(|| {
                        SentieonError::InvalidLicenseValue(format!(
                            "keyfile variable names must be strings, got {:?}",
                            key
                        ))
                    })?;
                    pairs.push((key.to_string(), scalar_to_string(val)?));
                }
                Ok(LicenseConfig::EnvironmentMap(pairs))
            }
            other => Err(SentieonError::InvalidLicenseValue(format!(
                "keyfile must be a string or a mapping, got {:?}",
                other
            ))),
        }
    }

    /// Ordered `(NAME, value)` pairs to export before running Sentieon
    pub fn exports(&self) -> Vec<(String, String)> {
        match self {
            LicenseConfig::SingleServer(server) => vec![(LICENSE_ENV.to_string(), server.clone())],
            LicenseConfig::EnvironmentMap(vars) => vars
                .iter()
                .map(|(k, v)| (k.to_uppercase(), v.clone()))
                .collect(),
        }
    }

    /// Shell prefix such as `export SENTIEON_LICENSE=host:8990 && `
    pub fn export_fragment(&self) -> SentieonResult<String> {
        render_exports(&self.exports())
    }
}

fn scalar_to_string(value: &Value) -> SentieonResult<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(SentieonError::InvalidLicenseValue(format!(
            "keyfile variable values must be scalars, got {:?}",
            other
        ))),
    }
}

/// Export prefix for the Sentieon resources of a run
pub fn license_export(resources: &ToolResources) -> SentieonResult<String> {
    LicenseConfig::from_resources(resources)?.export_fragment()
}

//! Provider configuration.
//!
//! Loaded from the JSON document the cluster hands the cloud provider:
//!
//! ```json
//! {
//!   "cloud": "public",
//!   "tenantId": "...",
//!   "subscriptionId": "...",
//!   "resourceGroup": "kube-rg",
//!   "location": "westus",
//!   "vnetName": "kube-vnet",
//!   "subnetName": "kube-subnet",
//!   "securityGroupName": "kube-nsg"
//! }
//! ```

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default limit on concurrent backend pool updates.
pub const DEFAULT_HOST_UPDATE_CONCURRENCY: usize = 8;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("config field {0} must not be empty")]
    MissingField(&'static str),

    #[error("hostUpdateConcurrency must be at least 1")]
    ZeroConcurrency,
}

/// Which cloud the resource manager endpoint belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CloudEnvironment {
    #[default]
    Public,
    UsGovernment,
    China,
}

impl CloudEnvironment {
    /// Unknown names fall back to the public cloud.
    pub fn from_name(name: &str) -> Self {
        match name {
            "fairfax" => Self::UsGovernment,
            "mooncake" => Self::China,
            _ => Self::Public,
        }
    }

    pub fn resource_manager_endpoint(&self) -> &'static str {
        match self {
            Self::Public => "https://management.azure.com/",
            Self::UsGovernment => "https://management.usgovcloudapi.net/",
            Self::China => "https://management.chinacloudapi.cn/",
        }
    }
}

fn default_concurrency() -> usize {
    DEFAULT_HOST_UPDATE_CONCURRENCY
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudConfig {
    #[serde(default)]
    pub cloud: String,
    #[serde(default)]
    pub tenant_id: String,
    pub subscription_id: String,
    pub resource_group: String,
    pub location: String,
    pub vnet_name: String,
    pub subnet_name: String,
    pub security_group_name: String,
    #[serde(default = "default_concurrency")]
    pub host_update_concurrency: usize,

    // Service principal credentials. Accepted for compatibility, unused.
    #[serde(default, skip_serializing)]
    pub ad_client_id: String,
    #[serde(default, skip_serializing)]
    pub ad_client_secret: String,
    #[serde(default, skip_serializing)]
    pub ad_tenant_id: String,
}

impl CloudConfig {
    pub fn from_reader(reader: impl Read) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Self::from_reader(json.as_bytes())
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    pub fn environment(&self) -> CloudEnvironment {
        CloudEnvironment::from_name(&self.cloud)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("subscriptionId", &self.subscription_id),
            ("resourceGroup", &self.resource_group),
            ("location", &self.location),
            ("vnetName", &self.vnet_name),
            ("subnetName", &self.subnet_name),
            ("securityGroupName", &self.security_group_name),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.is_empty()) {
            return Err(ConfigError::MissingField(*field));
        }
        if self.host_update_concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CONFIG: &str = r#"{
        "cloud": "mooncake",
        "tenantId": "tenant",
        "subscriptionId": "sub-0001",
        "resourceGroup": "kube-rg",
        "location": "chinanorth",
        "vnetName": "kube-vnet",
        "subnetName": "kube-subnet",
        "securityGroupName": "kube-nsg",
        "adClientId": "client",
        "adClientSecret": "secret"
    }"#;

    #[test]
    fn test_parse_config() {
        let config = CloudConfig::from_json(CONFIG).unwrap();
        assert_eq!(config.subscription_id, "sub-0001");
        assert_eq!(config.security_group_name, "kube-nsg");
        assert_eq!(config.host_update_concurrency, DEFAULT_HOST_UPDATE_CONCURRENCY);
        assert_eq!(config.environment(), CloudEnvironment::China);
    }

    #[test]
    fn test_environment_names() {
        assert_eq!(CloudEnvironment::from_name("fairfax"), CloudEnvironment::UsGovernment);
        assert_eq!(CloudEnvironment::from_name("public"), CloudEnvironment::Public);
        assert_eq!(CloudEnvironment::from_name(""), CloudEnvironment::Public);
        assert_eq!(CloudEnvironment::from_name("elsewhere"), CloudEnvironment::Public);
        assert!(
            CloudEnvironment::UsGovernment
                .resource_manager_endpoint()
                .contains("usgovcloudapi")
        );
    }

    #[test]
    fn test_secrets_not_serialized() {
        let config = CloudConfig::from_json(CONFIG).unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains("hostUpdateConcurrency"));
    }

    #[test]
    fn test_validate_rejects_empty_fields() {
        let json = CONFIG.replace("\"kube-nsg\"", "\"\"");
        assert!(matches!(
            CloudConfig::from_json(&json),
            Err(ConfigError::MissingField("securityGroupName"))
        ));

        let json = CONFIG.replace("\"cloud\"", "\"hostUpdateConcurrency\": 0, \"cloud\"");
        assert!(matches!(
            CloudConfig::from_json(&json),
            Err(ConfigError::ZeroConcurrency)
        ));
    }

    #[test]
    fn test_missing_required_key() {
        assert!(matches!(
            CloudConfig::from_json(r#"{"cloud": "public"}"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();
        let config = CloudConfig::from_file(file.path()).unwrap();
        assert_eq!(config.resource_group, "kube-rg");

        let dir = tempfile::TempDir::new().unwrap();
        assert!(matches!(
            CloudConfig::from_file(dir.path().join("missing.json")),
            Err(ConfigError::Io(_))
        ));
    }
}

//! Failure domain of the local host.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::AzureProvider;
use crate::cloud::ResourceManager;
use crate::cluster::Zone;
use crate::error::{CloudError, Result};

/// Where the instance metadata service publishes `InstanceInfo`.
pub const INSTANCE_INFO_URL: &str = "http://169.254.169.254/metadata/v1/InstanceInfo";

/// Instance metadata document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceInfo {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "UD")]
    pub update_domain: String,
    #[serde(rename = "FD")]
    pub fault_domain: String,
}

/// Source of the local host's instance metadata.
#[async_trait]
pub trait InstanceMetadata: Send + Sync {
    async fn instance_info(&self) -> Result<InstanceInfo>;
}

/// Fixed metadata.
pub struct StaticMetadata(pub InstanceInfo);

#[async_trait]
impl InstanceMetadata for StaticMetadata {
    async fn instance_info(&self) -> Result<InstanceInfo> {
        Ok(self.0.clone())
    }
}

/// Metadata read from a JSON file holding an `InstanceInfo` document.
pub struct MetadataFile {
    path: PathBuf,
}

impl MetadataFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl InstanceMetadata for MetadataFile {
    async fn instance_info(&self) -> Result<InstanceInfo> {
        let body = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| CloudError::Metadata(format!("{}: {}", self.path.display(), e)))?;
        serde_json::from_str(&body)
            .map_err(|e| CloudError::Metadata(format!("{}: {}", self.path.display(), e)))
    }
}

impl<C: ResourceManager> AzureProvider<C> {
    /// Zone of the local host. The fault domain is fetched once and cached.
    pub async fn get_zone(&self) -> Result<Zone> {
        let fault_domain = self
            .fault_domain
            .get_or_try_init(|| async {
                let metadata = self.metadata.as_ref().ok_or_else(|| {
                    CloudError::Metadata("no instance metadata source configured".to_string())
                })?;
                let info = metadata.instance_info().await?;
                info!("zone: fault domain resolved. fd={:?}", info.fault_domain);
                Ok::<_, CloudError>(info.fault_domain)
            })
            .await?;

        Ok(Zone {
            failure_domain: fault_domain.clone(),
            region: self.config.location.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_instance_info_keys() {
        let info: InstanceInfo =
            serde_json::from_str(r#"{"ID":"_kube-node-0","UD":"0","FD":"2"}"#).unwrap();
        assert_eq!(info.fault_domain, "2");
        assert_eq!(info.update_domain, "0");
        assert_eq!(info.id, "_kube-node-0");
    }

    #[tokio::test]
    async fn test_metadata_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"ID":"x","UD":"1","FD":"1"}"#).unwrap();
        let info = MetadataFile::new(file.path()).instance_info().await.unwrap();
        assert_eq!(info.fault_domain, "1");

        let err = MetadataFile::new("/nonexistent/instance-info.json")
            .instance_info()
            .await
            .unwrap_err();
        assert!(matches!(err, CloudError::Metadata(_)));
    }
}

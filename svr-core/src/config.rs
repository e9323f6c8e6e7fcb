//! Per-project configuration record
//!
//! Each project directory carries a single `.svrc` JSON file naming the
//! project, its root path, the include set and the remote connection
//! parameters. Commands load the record once at invocation start and pass
//! it down explicitly; nothing re-reads the file mid-operation.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::{Result, SvrError};

/// File name of the per-project configuration record.
pub const CONFIG_FILE_NAME: &str = ".svrc";

/// Remote object-store connection parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteConfig {
    pub bucket: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Optional key prefix scoping all of this project's bundles.
    #[serde(default)]
    pub prefix: String,
}

impl RemoteConfig {
    /// Verify that every field required to reach the remote store is set.
    ///
    /// Returns `RemoteConfigIncomplete` naming the first empty field among
    /// bucket, region, accessKeyId and secretAccessKey. The prefix is
    /// optional and never checked.
    pub fn check(&self) -> Result<()> {
        let required = [
            ("bucket", &self.bucket),
            ("region", &self.region),
            ("accessKeyId", &self.access_key_id),
            ("secretAccessKey", &self.secret_access_key),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(SvrError::RemoteConfigIncomplete(field.to_string()));
            }
        }
        Ok(())
    }
}

/// The persisted per-project configuration record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    /// Project name, identifies the remote namespace. Required.
    pub name: String,
    /// Free-form description. Optional.
    #[serde(default)]
    pub description: String,
    /// Absolute or relative path to the project root. Required.
    pub project_root: String,
    /// Remote connection parameters.
    pub aws: RemoteConfig,
    /// Ordered list of project-root-relative paths to bundle.
    pub include: Vec<String>,
}

impl ProjectConfig {
    /// Create a fresh record with empty remote settings and include set.
    pub fn new<S1, S2, S3>(name: S1, description: S2, project_root: S3) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Self {
            name: name.into(),
            description: description.into(),
            project_root: project_root.into(),
            aws: RemoteConfig::default(),
            include: Vec::new(),
        }
    }

    /// Full path of the configuration file inside `dir`.
    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(CONFIG_FILE_NAME)
    }

    /// Whether a configuration record exists in `dir`.
    pub fn exists(dir: &Path) -> bool {
        Self::path_in(dir).exists()
    }

    /// Load and validate the configuration record from `dir`.
    ///
    /// # Errors
    /// * `ConfigNotFound` if the file is missing
    /// * `Json` if it cannot be parsed
    /// * `ConfigInvalid` if a required field is empty
    pub fn load(dir: &Path) -> Result<Self> {
        let path = Self::path_in(dir);
        if !path.exists() {
            return Err(SvrError::ConfigNotFound(path));
        }

        let raw = fs::read_to_string(&path)?;
        let config: ProjectConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the record into `dir` as pretty-printed JSON.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        let path = Self::path_in(dir);
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(&path, raw)?;
        Ok(path)
    }

    /// Check the required local fields.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(SvrError::config_invalid("name must not be empty"));
        }
        if self.project_root.trim().is_empty() {
            return Err(SvrError::config_invalid("projectRoot must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_config() -> ProjectConfig {
        let mut config = ProjectConfig::new("app", "demo project", "/home/u/app");
        config.aws = RemoteConfig {
            bucket: "b".into(),
            region: "us-east-1".into(),
            access_key_id: "k".into(),
            secret_access_key: "s".into(),
            prefix: "backups".into(),
        };
        config.include = vec!["secrets.env".into(), ".env.local".into()];
        config
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let config = sample_config();

        config.save(dir.path()).unwrap();
        let loaded = ProjectConfig::load(dir.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = ProjectConfig::load(dir.path());
        assert!(matches!(result, Err(SvrError::ConfigNotFound(_))));
    }

    #[test]
    fn test_json_field_names_are_camel_case() {
        let raw = serde_json::to_string(&sample_config()).unwrap();
        assert!(raw.contains("\"projectRoot\""));
        assert!(raw.contains("\"accessKeyId\""));
        assert!(raw.contains("\"secretAccessKey\""));
        assert!(!raw.contains("project_root"));
    }

    #[test]
    fn test_load_parses_camel_case_record() {
        let dir = TempDir::new().unwrap();
        let raw = r#"{
            "name": "app",
            "description": "",
            "projectRoot": "/home/u/app",
            "aws": {
                "bucket": "b",
                "region": "r",
                "accessKeyId": "k",
                "secretAccessKey": "s",
                "prefix": ""
            },
            "include": ["secrets.env"]
        }"#;
        fs::write(ProjectConfig::path_in(dir.path()), raw).unwrap();

        let config = ProjectConfig::load(dir.path()).unwrap();
        assert_eq!(config.name, "app");
        assert_eq!(config.include, vec!["secrets.env".to_string()]);
    }

    #[test]
    fn test_validate_rejects_empty_required_fields() {
        let mut config = sample_config();
        config.name = "".into();
        assert!(matches!(config.validate(), Err(SvrError::ConfigInvalid(_))));

        let mut config = sample_config();
        config.project_root = "  ".into();
        assert!(matches!(config.validate(), Err(SvrError::ConfigInvalid(_))));
    }

    #[test]
    fn test_remote_check_names_first_empty_field() {
        let remote = RemoteConfig {
            bucket: "b".into(),
            region: "".into(),
            access_key_id: "k".into(),
            secret_access_key: "s".into(),
            prefix: "".into(),
        };
        match remote.check() {
            Err(SvrError::RemoteConfigIncomplete(field)) => assert_eq!(field, "region"),
            other => panic!("expected RemoteConfigIncomplete, got {other:?}"),
        }
    }

    #[test]
    fn test_remote_check_ignores_empty_prefix() {
        let remote = RemoteConfig {
            bucket: "b".into(),
            region: "r".into(),
            access_key_id: "k".into(),
            secret_access_key: "s".into(),
            prefix: "".into(),
        };
        assert!(remote.check().is_ok());
    }
}

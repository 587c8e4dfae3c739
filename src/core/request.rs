//! Provisioning request resolution
//!
//! Collects the optional override files and field values for one flash run
//! and validates them before anything touches a device or a partition.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::core::settings::ProvisionDefaults;
use crate::error::{FileRole, ResolveError};
use crate::infra::filesystem;

/// A field that can be substituted into existing config files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Device hostname
    Hostname,
    /// WiFi network name
    WifiSsid,
    /// WiFi pre-shared key
    WifiPassword,
    /// Cluster-lab run-on-boot flag
    ClusterLab,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Hostname => "hostname",
            Self::WifiSsid => "wifi ssid",
            Self::WifiPassword => "wifi password",
            Self::ClusterLab => "cluster-lab flag",
        })
    }
}

/// Unvalidated provisioning inputs as gathered from the command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisioningInputs {
    /// Legacy `device-init.yaml` / `occidentalis.txt` source
    pub legacy_config: Option<PathBuf>,
    /// Replacement for the firmware `config.txt`
    pub boot_conf: Option<PathBuf>,
    /// cloud-init user-data
    pub user_data: Option<PathBuf>,
    /// cloud-init meta-data
    pub meta_data: Option<PathBuf>,
    /// Hostname to set
    pub hostname: Option<String>,
    /// WiFi SSID to set
    pub wifi_ssid: Option<String>,
    /// WiFi password to set
    pub wifi_password: Option<String>,
    /// Cluster-lab run-on-boot flag to set
    pub cluster_lab: Option<String>,
}

impl ProvisioningInputs {
    /// Fill unset fields from configured defaults
    ///
    /// Values given on the command line always win.
    #[must_use]
    pub fn with_defaults(mut self, defaults: &ProvisionDefaults) -> Self {
        self.hostname = self.hostname.or_else(|| defaults.hostname.clone());
        self.wifi_ssid = self.wifi_ssid.or_else(|| defaults.wifi_ssid.clone());
        self.wifi_password = self.wifi_password.or_else(|| defaults.wifi_password.clone());
        self.cluster_lab = self
            .cluster_lab
            .or_else(|| defaults.cluster_lab.map(|flag| flag.to_string()));
        self
    }

    /// Check that every supplied file exists and is readable and that every
    /// field value fits on one line
    ///
    /// Roles are checked in a fixed order and the first failure is reported.
    pub fn resolve(self) -> Result<ProvisioningRequest, ResolveError> {
        for (role, path) in [
            (FileRole::LegacyConfig, &self.legacy_config),
            (FileRole::BootConf, &self.boot_conf),
            (FileRole::UserData, &self.user_data),
            (FileRole::MetaData, &self.meta_data),
        ] {
            if let Some(path) = path {
                if !filesystem::is_readable_file(path) {
                    return Err(ResolveError::MissingFile {
                        role,
                        path: path.clone(),
                    });
                }
            }
        }

        for (field, value) in [
            (Field::Hostname, &self.hostname),
            (Field::WifiSsid, &self.wifi_ssid),
            (Field::WifiPassword, &self.wifi_password),
            (Field::ClusterLab, &self.cluster_lab),
        ] {
            if value.as_deref().is_some_and(|v| v.contains(|c| c == '\r' || c == '\n')) {
                return Err(ResolveError::MultilineValue {
                    field: field.to_string(),
                });
            }
        }

        tracing::debug!(
            legacy_config = ?self.legacy_config,
            boot_conf = ?self.boot_conf,
            user_data = ?self.user_data,
            meta_data = ?self.meta_data,
            "Provisioning inputs resolved"
        );
        Ok(ProvisioningRequest { inputs: self })
    }
}

/// Validated provisioning request
///
/// Only obtainable through [`ProvisioningInputs::resolve`], immutable after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningRequest {
    inputs: ProvisioningInputs,
}

impl ProvisioningRequest {
    /// Legacy config source
    pub fn legacy_config(&self) -> Option<&Path> {
        self.inputs.legacy_config.as_deref()
    }

    /// Firmware `config.txt` source
    pub fn boot_conf(&self) -> Option<&Path> {
        self.inputs.boot_conf.as_deref()
    }

    /// cloud-init user-data source
    pub fn user_data(&self) -> Option<&Path> {
        self.inputs.user_data.as_deref()
    }

    /// cloud-init meta-data source
    pub fn meta_data(&self) -> Option<&Path> {
        self.inputs.meta_data.as_deref()
    }

    /// Value requested for `field`, if any
    pub fn field(&self, field: Field) -> Option<&str> {
        match field {
            Field::Hostname => self.inputs.hostname.as_deref(),
            Field::WifiSsid => self.inputs.wifi_ssid.as_deref(),
            Field::WifiPassword => self.inputs.wifi_password.as_deref(),
            Field::ClusterLab => self.inputs.cluster_lab.as_deref(),
        }
    }

    /// Override files in copy order, paired with their role
    pub fn override_files(&self) -> impl Iterator<Item = (FileRole, &Path)> {
        [
            (FileRole::LegacyConfig, self.legacy_config()),
            (FileRole::BootConf, self.boot_conf()),
            (FileRole::UserData, self.user_data()),
            (FileRole::MetaData, self.meta_data()),
        ]
        .into_iter()
        .filter_map(|(role, path)| path.map(|p| (role, p)))
    }

    /// Whether the request asks for nothing at all
    pub fn is_empty(&self) -> bool {
        self.inputs == ProvisioningInputs::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_inputs_resolve() {
        let request = ProvisioningInputs::default().resolve().unwrap();
        assert!(request.is_empty());
        assert_eq!(request.override_files().count(), 0);
    }

    #[test]
    fn test_missing_file_reports_role_and_path() {
        let inputs = ProvisioningInputs {
            meta_data: Some(PathBuf::from("/nonexistent/meta-data")),
            ..Default::default()
        };

        let err = inputs.resolve().unwrap_err();
        let ResolveError::MissingFile { role, path } = err else {
            panic!("expected MissingFile");
        };
        assert_eq!(role, FileRole::MetaData);
        assert_eq!(path, PathBuf::from("/nonexistent/meta-data"));
    }

    #[test]
    fn test_first_missing_role_wins() {
        let inputs = ProvisioningInputs {
            boot_conf: Some(PathBuf::from("/nonexistent/config.txt")),
            user_data: Some(PathBuf::from("/nonexistent/user-data")),
            ..Default::default()
        };

        let Err(ResolveError::MissingFile { role, .. }) = inputs.resolve() else {
            panic!("expected MissingFile");
        };
        assert_eq!(role, FileRole::BootConf);
    }

    #[test]
    fn test_directory_is_not_a_valid_input() {
        let dir = TempDir::new().unwrap();
        let inputs = ProvisioningInputs {
            user_data: Some(dir.path().to_path_buf()),
            ..Default::default()
        };

        let Err(ResolveError::MissingFile { role, .. }) = inputs.resolve() else {
            panic!("expected MissingFile");
        };
        assert_eq!(role, FileRole::UserData);
    }

    #[test]
    fn test_multiline_values_are_rejected() {
        for (inputs, field) in [
            (
                ProvisioningInputs {
                    hostname: Some("a\nhostname: b".to_string()),
                    ..Default::default()
                },
                "hostname",
            ),
            (
                ProvisioningInputs {
                    wifi_password: Some("secret\r".to_string()),
                    ..Default::default()
                },
                "wifi password",
            ),
        ] {
            let Err(ResolveError::MultilineValue { field: rejected }) = inputs.resolve() else {
                panic!("expected MultilineValue for {field}");
            };
            assert_eq!(rejected, field);
        }
    }

    #[test]
    fn test_missing_file_is_reported_before_bad_value() {
        let inputs = ProvisioningInputs {
            user_data: Some(PathBuf::from("/nonexistent/user-data")),
            hostname: Some("a\nb".to_string()),
            ..Default::default()
        };

        assert!(matches!(
            inputs.resolve(),
            Err(ResolveError::MissingFile { .. })
        ));
    }

    #[test]
    fn test_defaults_fill_only_unset_fields() {
        let defaults = ProvisionDefaults {
            hostname: Some("fleet".to_string()),
            wifi_ssid: Some("office".to_string()),
            wifi_password: None,
            cluster_lab: Some(true),
        };
        let inputs = ProvisioningInputs {
            hostname: Some("node-1".to_string()),
            ..Default::default()
        }
        .with_defaults(&defaults);

        let request = inputs.resolve().unwrap();
        assert_eq!(request.field(Field::Hostname), Some("node-1"));
        assert_eq!(request.field(Field::WifiSsid), Some("office"));
        assert_eq!(request.field(Field::WifiPassword), None);
        assert_eq!(request.field(Field::ClusterLab), Some("true"));
    }

    #[test]
    fn test_override_files_in_copy_order() {
        let dir = TempDir::new().unwrap();
        let user_data = dir.path().join("user-data.yml");
        let boot_conf = dir.path().join("config.txt");
        std::fs::write(&user_data, "#cloud-config\n").unwrap();
        std::fs::write(&boot_conf, "enable_uart=0\n").unwrap();

        let request = ProvisioningInputs {
            user_data: Some(user_data),
            boot_conf: Some(boot_conf),
            ..Default::default()
        }
        .resolve()
        .unwrap();

        let roles: Vec<_> = request.override_files().map(|(role, _)| role).collect();
        assert_eq!(roles, vec![FileRole::BootConf, FileRole::UserData]);
    }
}

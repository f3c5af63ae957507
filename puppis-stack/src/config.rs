//! Configuration surface for the built-in stack
//!
//! All options carry defaults except the administrative principal, which
//! is environment-specific and must be supplied. The access token may be
//! empty; an absent value degrades to the empty string.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use puppis_core::schema::validate_cidr;

/// Environment variable overriding the sensitive access token
pub const ACCESS_TOKEN_ENV: &str = "PUPPIS_ACCESS_TOKEN";

/// Configuration errors, all surfaced before a plan is emitted
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {message}")]
    Io { path: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error(
        "availability_zones has {zones} entries but public_subnet_cidrs has {cidrs}; one CIDR per zone is required"
    )]
    ZoneCidrMismatch { zones: usize, cidrs: usize },

    #[error("availability_zones must not be empty")]
    EmptyZones,

    #[error("Invalid CIDR in {field}: {message}")]
    InvalidCidr { field: String, message: String },

    #[error(
        "Node capacity must satisfy min <= desired <= max, got min={min}, desired={desired}, max={max}"
    )]
    CapacityBounds { min: i64, desired: i64, max: i64 },

    #[error("Node capacity values must not be negative")]
    NegativeCapacity,

    #[error("admin_principal_arn must be set; there is no default administrative principal")]
    MissingAdminPrincipal,

    #[error("Failed to read GitOps manifest {path}: {message}")]
    ManifestRead { path: String, message: String },
}

/// Recognized configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    /// Minimum node count for the cluster node pool
    pub node_min_size: i64,
    /// Maximum node count for the cluster node pool
    pub node_max_size: i64,
    /// Desired node count for the cluster node pool
    pub node_desired_size: i64,
    /// Node instance type
    pub node_instance_type: String,
    /// Virtual network CIDR
    pub vpc_cidr: String,
    /// One public subnet CIDR per availability zone
    pub public_subnet_cidrs: Vec<String>,
    /// Availability zones, same length as `public_subnet_cidrs`
    pub availability_zones: Vec<String>,
    /// ARN of the external principal granted cluster-admin access
    pub admin_principal_arn: String,
    /// Sensitive access token delivered to the GitOps controller;
    /// empty when not configured
    pub access_token: String,
    /// Override for the bundled GitOps controller install manifest
    pub gitops_manifest_path: Option<PathBuf>,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            node_min_size: 3,
            node_max_size: 6,
            node_desired_size: 3,
            node_instance_type: "t3.medium".to_string(),
            vpc_cidr: "10.0.0.0/16".to_string(),
            public_subnet_cidrs: vec!["10.0.0.0/20".to_string(), "10.0.16.0/20".to_string()],
            availability_zones: vec!["us-west-2a".to_string(), "us-west-2b".to_string()],
            admin_principal_arn: String::new(),
            access_token: String::new(),
            gitops_manifest_path: None,
        }
    }
}

impl StackConfig {
    /// Load configuration from a JSON file, then apply environment
    /// overrides.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let mut config: StackConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Pick up the sensitive access token from the environment when set.
    /// Keeps the token out of configuration files.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
            self.access_token = token;
        }
    }

    /// Validate everything that can be checked without building the graph
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.availability_zones.is_empty() {
            return Err(ConfigError::EmptyZones);
        }

        validate_cidr(&self.vpc_cidr).map_err(|message| ConfigError::InvalidCidr {
            field: "vpc_cidr".to_string(),
            message,
        })?;
        for cidr in &self.public_subnet_cidrs {
            validate_cidr(cidr).map_err(|message| ConfigError::InvalidCidr {
                field: "public_subnet_cidrs".to_string(),
                message,
            })?;
        }

        if self.node_min_size < 0 || self.node_desired_size < 0 || self.node_max_size < 0 {
            return Err(ConfigError::NegativeCapacity);
        }
        if self.node_min_size > self.node_desired_size || self.node_desired_size > self.node_max_size
        {
            return Err(ConfigError::CapacityBounds {
                min: self.node_min_size,
                desired: self.node_desired_size,
                max: self.node_max_size,
            });
        }

        if self.admin_principal_arn.is_empty() {
            return Err(ConfigError::MissingAdminPrincipal);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> StackConfig {
        StackConfig {
            admin_principal_arn: "arn:aws:iam::123456789012:user/admin".to_string(),
            ..StackConfig::default()
        }
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = StackConfig::default();
        assert_eq!(config.node_min_size, 3);
        assert_eq!(config.node_max_size, 6);
        assert_eq!(config.node_desired_size, 3);
        assert_eq!(config.node_instance_type, "t3.medium");
        assert_eq!(config.vpc_cidr, "10.0.0.0/16");
        assert_eq!(config.public_subnet_cidrs.len(), 2);
        assert_eq!(config.availability_zones.len(), 2);
        assert_eq!(config.access_token, "");
    }

    #[test]
    fn valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn missing_admin_principal_is_rejected() {
        let config = StackConfig::default();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingAdminPrincipal)
        ));
    }

    #[test]
    fn bad_vpc_cidr_is_rejected() {
        let config = StackConfig {
            vpc_cidr: "10.0.0.0".to_string(),
            ..valid_config()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidCidr { field, .. }) if field == "vpc_cidr"
        ));
    }

    #[test]
    fn capacity_bounds_enforced() {
        let config = StackConfig {
            node_min_size: 5,
            node_desired_size: 3,
            ..valid_config()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::CapacityBounds { .. })
        ));

        let config = StackConfig {
            node_desired_size: 7,
            ..valid_config()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::CapacityBounds { .. })
        ));
    }

    #[test]
    fn zero_minimum_is_allowed() {
        let config = StackConfig {
            node_min_size: 0,
            ..valid_config()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_zone_list_is_rejected() {
        let config = StackConfig {
            availability_zones: vec![],
            public_subnet_cidrs: vec![],
            ..valid_config()
        };
        assert!(matches!(config.validate(), Err(ConfigError::EmptyZones)));
    }

    #[test]
    fn config_json_round_trip() {
        let config = valid_config();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: StackConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.admin_principal_arn, config.admin_principal_arn);
        assert_eq!(parsed.public_subnet_cidrs, config.public_subnet_cidrs);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let parsed: StackConfig =
            serde_json::from_str(r#"{"node_desired_size": 4, "node_max_size": 8}"#).unwrap();
        assert_eq!(parsed.node_desired_size, 4);
        assert_eq!(parsed.node_max_size, 8);
        assert_eq!(parsed.node_min_size, 3);
        assert_eq!(parsed.vpc_cidr, "10.0.0.0/16");
    }
}

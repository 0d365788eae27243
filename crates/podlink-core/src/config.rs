//! Command module configuration.

use std::path::Path;
use std::time::Duration;

use podlink_protocol::MAX_FC;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::registry::BoundedRegistry;

/// Upper bound on name resolution attempts per unlinked pod.
pub const MAX_RESOLVE_ATTEMPTS: u32 = 10;

/// A pod to register at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodConfig {
    /// Operator-assigned pod number.
    pub pod_number: u8,
    /// Node identifier the radio resolves to an address.
    pub name: String,
    /// Telemetry payload length in bytes, code byte excluded.
    pub expected_length: usize,
}

impl PodConfig {
    /// Create a pod definition.
    pub fn new(pod_number: u8, name: impl Into<String>, expected_length: usize) -> Self {
        PodConfig {
            pod_number,
            name: name.into(),
            expected_length,
        }
    }
}

/// Settings for a command module session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleConfig {
    /// Bound on every lock wait, in milliseconds.
    pub lock_timeout_ms: u64,
    /// Name resolution attempts per unlinked pod in one reconcile pass.
    pub resolve_attempts: u32,
    /// Pods registered when the module starts.
    pub pods: Vec<PodConfig>,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        ModuleConfig {
            lock_timeout_ms: 100,
            resolve_attempts: 10,
            pods: Vec::new(),
        }
    }
}

impl ModuleConfig {
    /// Set the lock timeout.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the resolution attempts per reconcile.
    pub fn with_resolve_attempts(mut self, attempts: u32) -> Self {
        self.resolve_attempts = attempts;
        self
    }

    /// Add a pod to register at startup.
    pub fn with_pod(mut self, pod: PodConfig) -> Self {
        self.pods.push(pod);
        self
    }

    /// Lock timeout as a duration.
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// Check that the module can be started with this configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lock_timeout_ms == 0 {
            return Err(ConfigError::ZeroLockTimeout);
        }
        if !(1..=MAX_RESOLVE_ATTEMPTS).contains(&self.resolve_attempts) {
            return Err(ConfigError::ResolveAttempts {
                attempts: self.resolve_attempts,
                max: MAX_RESOLVE_ATTEMPTS,
            });
        }
        if self.pods.len() > MAX_FC {
            return Err(ConfigError::TooManyPods {
                count: self.pods.len(),
                max: MAX_FC,
            });
        }

        // Dry run against a scratch registry.
        let mut scratch = BoundedRegistry::new();
        for pod in &self.pods {
            scratch.register(pod.pod_number, &pod.name, pod.expected_length)?;
        }
        Ok(())
    }

    /// Parse and validate YAML.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: ModuleConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegistryError;

    #[test]
    fn test_defaults() {
        let config = ModuleConfig::default();
        assert_eq!(config.lock_timeout(), Duration::from_millis(100));
        assert_eq!(config.resolve_attempts, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_yaml_with_defaults() {
        let yaml = r#"
pods:
  - pod_number: 3
    name: POD3
    expected_length: 10
"#;
        let config = ModuleConfig::from_yaml_str(yaml).unwrap();

        assert_eq!(config.lock_timeout_ms, 100);
        assert_eq!(config.pods, vec![PodConfig::new(3, "POD3", 10)]);
    }

    #[test]
    fn test_rejects_too_many_pods() {
        let config = (0..=MAX_FC as u8).fold(ModuleConfig::default(), |c, n| {
            c.with_pod(PodConfig::new(n, format!("POD{n}"), 4))
        });

        assert!(matches!(
            config.validate(),
            Err(ConfigError::TooManyPods { count: 7, max: 6 })
        ));
    }

    #[test]
    fn test_rejects_invalid_pods() {
        let duplicate = ModuleConfig::default()
            .with_pod(PodConfig::new(1, "A", 4))
            .with_pod(PodConfig::new(1, "B", 4));
        assert!(matches!(
            duplicate.validate(),
            Err(ConfigError::InvalidPod(RegistryError::DuplicatePod(1)))
        ));

        let oversized = ModuleConfig::default().with_pod(PodConfig::new(1, "A", 101));
        assert!(matches!(
            oversized.validate(),
            Err(ConfigError::InvalidPod(RegistryError::PayloadTooLarge { .. }))
        ));

        let zero = ModuleConfig::default().with_lock_timeout(Duration::ZERO);
        assert!(matches!(zero.validate(), Err(ConfigError::ZeroLockTimeout)));
    }

    #[test]
    fn test_resolve_attempts_bounded() {
        let unbounded = ModuleConfig::default().with_resolve_attempts(u32::MAX);
        assert!(matches!(
            unbounded.validate(),
            Err(ConfigError::ResolveAttempts {
                attempts: u32::MAX,
                max: MAX_RESOLVE_ATTEMPTS
            })
        ));

        let none = ModuleConfig::default().with_resolve_attempts(0);
        assert!(matches!(
            none.validate(),
            Err(ConfigError::ResolveAttempts { attempts: 0, .. })
        ));

        let at_limit = ModuleConfig::default().with_resolve_attempts(MAX_RESOLVE_ATTEMPTS);
        assert!(at_limit.validate().is_ok());
        assert!(matches!(
            ModuleConfig::from_yaml_str("resolve_attempts: 11"),
            Err(ConfigError::ResolveAttempts { attempts: 11, .. })
        ));
    }

    #[test]
    fn test_malformed_yaml_rejected() {
        assert!(matches!(
            ModuleConfig::from_yaml_str("lock_timeout_ms: fast"),
            Err(ConfigError::Yaml(_))
        ));
    }
}

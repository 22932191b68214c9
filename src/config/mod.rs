//! Configuration management module
//!
//! Handles loading and validation of benchmark settings. Values come from
//! an optional TOML file and are overridden by environment variables and
//! command-line flags.

use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::bench::partition::Plan;
use crate::models::result::available_parallelism;
use crate::workload::WorkloadKind;
use crate::{PartbenchError, Result, APP_NAME, CONFIG_FILE, MAX_WORKERS};

/// Longest accepted batch timeout
const MAX_TIMEOUT: Duration = Duration::from_secs(3600);

/// Benchmark configuration structure containing all run parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    /// Worker threads; `None` uses every available execution unit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    /// Workloads to run, in order
    pub workloads: Vec<WorkloadKind>,
    /// End of the input range, overriding each workload's default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    /// Submit the whole range this many times instead of partitioning it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicas: Option<usize>,
    /// Limit for the concurrent phase, e.g. "30s"
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
    /// Show a progress bar during the concurrent phase
    pub progress: bool,
    /// Emit reports as JSON instead of text
    pub json: bool,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            workers: None,
            workloads: WorkloadKind::ALL.to_vec(),
            size: None,
            replicas: None,
            timeout: None,
            progress: true,
            json: false,
        }
    }
}

impl BenchmarkConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker count
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Set the workloads to run
    pub fn with_workloads(mut self, workloads: Vec<WorkloadKind>) -> Self {
        self.workloads = workloads;
        self
    }

    /// Set the range end
    pub fn with_size(mut self, size: i64) -> Self {
        self.size = Some(size);
        self
    }

    /// Switch to a replicated plan with `replicas` copies
    pub fn with_replicas(mut self, replicas: usize) -> Self {
        self.replicas = Some(replicas);
        self
    }

    /// Set the concurrent-phase timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set whether to show a progress bar
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Set whether to emit JSON
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Worker count after applying the default
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(available_parallelism)
    }

    /// Partitioning plan implied by the settings
    pub fn plan(&self) -> Plan {
        match self.replicas {
            Some(copies) => Plan::Replicated { copies },
            None => Plan::Partitioned,
        }
    }

    /// Units submitted to the pool for each workload
    pub fn unit_count(&self) -> usize {
        match self.plan() {
            Plan::Partitioned => self.worker_count(),
            Plan::Replicated { copies } => copies,
        }
    }

    /// Input range for `kind`
    pub fn range_for(&self, kind: WorkloadKind) -> Range<i64> {
        kind.range_with_size(self.size)
    }

    /// Validate the configuration parameters
    pub fn validate(&self) -> Result<()> {
        if let Some(workers) = self.workers {
            if workers == 0 {
                return Err(PartbenchError::InvalidConfiguration(
                    "Worker count must be greater than 0".to_string(),
                ));
            }
            if workers > MAX_WORKERS {
                return Err(PartbenchError::InvalidConfiguration(format!(
                    "Too many workers: {} (max: {})",
                    workers, MAX_WORKERS
                )));
            }
        }

        if self.workloads.is_empty() {
            return Err(PartbenchError::InvalidConfiguration(
                "At least one workload must be selected".to_string(),
            ));
        }

        if let Some(size) = self.size {
            for kind in &self.workloads {
                let start = kind.default_range().start;
                if size <= start {
                    return Err(PartbenchError::InvalidConfiguration(format!(
                        "Size {} must be greater than the {} range start {}",
                        size,
                        kind.description(),
                        start
                    )));
                }
            }
        }

        if let Some(replicas) = self.replicas {
            if replicas == 0 {
                return Err(PartbenchError::InvalidConfiguration(
                    "Replica count must be greater than 0".to_string(),
                ));
            }
            if replicas > MAX_WORKERS {
                return Err(PartbenchError::InvalidConfiguration(format!(
                    "Too many replicas: {} (max: {})",
                    replicas, MAX_WORKERS
                )));
            }
        }

        if let Some(timeout) = self.timeout {
            if timeout.is_zero() {
                return Err(PartbenchError::InvalidConfiguration(
                    "Timeout must be greater than 0".to_string(),
                ));
            }
            if timeout > MAX_TIMEOUT {
                return Err(PartbenchError::InvalidConfiguration(format!(
                    "Timeout too long: {}s (max: {}s)",
                    timeout.as_secs(),
                    MAX_TIMEOUT.as_secs()
                )));
            }
        }

        Ok(())
    }

    /// Load configuration from the standard config file location
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        match Self::config_file_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            PartbenchError::InvalidConfiguration(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            PartbenchError::InvalidConfiguration(format!(
                "Failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })?;

        config.validate()?;

        Ok(config)
    }

    /// Get the standard configuration file path
    /// Uses $CONFIG_HOME/partbench/partbench.toml, `None` when there is no config directory
    pub fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_NAME).join(CONFIG_FILE))
    }
}

// Optional durations are written as humantime strings such as "1m 30s"
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_str(&humantime::format_duration(*d).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = Option::<String>::deserialize(deserializer)?;
        text.map(|t| humantime::parse_duration(&t).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = BenchmarkConfig::new();
        assert_eq!(config.workloads, WorkloadKind::ALL.to_vec());
        assert_eq!(config.plan(), Plan::Partitioned);
        assert_eq!(config.worker_count(), available_parallelism());
        assert!(config.progress);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_and_plan() {
        let config = BenchmarkConfig::new()
            .with_workers(6)
            .with_replicas(4)
            .with_size(1000)
            .with_timeout(Duration::from_secs(5));

        assert_eq!(config.worker_count(), 6);
        assert_eq!(config.plan(), Plan::Replicated { copies: 4 });
        assert_eq!(config.unit_count(), 4);
        assert_eq!(config.range_for(WorkloadKind::Primes), 2..1000);
        assert_eq!(config.range_for(WorkloadKind::Trig), 0..1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let invalid = [
            BenchmarkConfig::new().with_workers(0),
            BenchmarkConfig::new().with_workers(MAX_WORKERS + 1),
            BenchmarkConfig::new().with_replicas(0),
            BenchmarkConfig::new().with_timeout(Duration::ZERO),
            BenchmarkConfig::new().with_timeout(Duration::from_secs(7200)),
            BenchmarkConfig::new().with_workloads(Vec::new()),
            BenchmarkConfig::new().with_size(2),
        ];

        for config in invalid {
            let err = config.validate().unwrap_err();
            assert!(matches!(err, PartbenchError::InvalidConfiguration(_)), "{:?}", config);
        }
    }

    #[test]
    fn test_size_checked_per_workload() {
        // 1 is above the fibonacci start (0) but not the prime start (2)
        let config = BenchmarkConfig::new().with_size(1);
        assert!(config.validate().is_err());

        let config = config.with_workloads(vec![WorkloadKind::Fibonacci]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
            workers = 8
            workloads = ["primes", "fibonacci"]
            size = 100000
            timeout = "1m 30s"
            progress = false
        "#;
        let config: BenchmarkConfig = toml::from_str(toml_str).expect("Failed to parse TOML");

        assert_eq!(config.workers, Some(8));
        assert_eq!(config.workloads, vec![WorkloadKind::Primes, WorkloadKind::Fibonacci]);
        assert_eq!(config.size, Some(100_000));
        assert_eq!(config.timeout, Some(Duration::from_secs(90)));
        assert_eq!(config.replicas, None);
        assert!(!config.progress);
        assert!(!config.json);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "workers = 3\nreplicas = 2").unwrap();

        let config = BenchmarkConfig::load_from(file.path()).unwrap();
        assert_eq!(config.workers, Some(3));
        assert_eq!(config.plan(), Plan::Replicated { copies: 2 });
    }

    #[test]
    fn test_load_from_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "workers = 0").unwrap();
        assert!(matches!(
            BenchmarkConfig::load_from(file.path()),
            Err(PartbenchError::InvalidConfiguration(_))
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "workers = \"many\"").unwrap();
        match BenchmarkConfig::load_from(file.path()) {
            Err(PartbenchError::InvalidConfiguration(msg)) => {
                assert!(msg.starts_with("Failed to parse config file"));
                assert!(msg.contains(&file.path().display().to_string()));
            }
            other => panic!("unexpected result: {:?}", other),
        }

        let missing = tempfile::tempdir().unwrap().path().join("absent.toml");
        assert!(BenchmarkConfig::load_from(&missing).is_err());
    }

    #[test]
    fn test_config_file_path() {
        if let Some(path) = BenchmarkConfig::config_file_path() {
            assert!(path.to_string_lossy().contains("partbench"));
            assert!(path.to_string_lossy().ends_with("partbench.toml"));
        }
    }
}

//! Metrics reports exported by world tests.
//!
//! Reports are written as pretty JSON so CI can archive and diff them.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Top-level metrics report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsReport {
    /// Test identifier
    pub test_name: String,

    /// Timestamp when metrics were collected (RFC 3339)
    pub timestamp: String,

    /// Overall test result
    pub result: TestResult,

    /// Item transfer metrics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfers: Option<TransferMetrics>,

    /// Drop pool metrics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool: Option<PoolMetrics>,

    /// Test execution metrics
    pub test_execution: TestExecutionMetrics,
}

/// Overall test result status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestResult {
    /// Test passed all validations
    Pass,
    /// Test failed
    Fail,
    /// Test was skipped
    Skip,
}

/// Container and world transfer counters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransferMetrics {
    /// Items created through the registry
    pub items_created: usize,

    /// Drops placed into the world
    pub drops_spawned: usize,

    /// Pickup attempts, full and partial
    pub pickups: usize,

    /// Pickups that left a remainder on the drop
    pub partial_pickups: usize,

    /// Clusters alive at the end of the test
    pub clusters: usize,

    /// Targeted moves rejected without side effects
    pub rejected_moves: usize,

    /// Drags settled by cancel
    pub cancelled_drags: usize,
}

/// Drop pool counters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolMetrics {
    /// Drops ever created
    pub total: usize,

    /// Drops in the world at the end of the test
    pub active: usize,

    /// Drops parked for reuse
    pub idle: usize,

    /// Visuals built (pool misses)
    pub instantiated: usize,
}

/// Test execution and infrastructure metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestExecutionMetrics {
    /// Total test duration (seconds)
    pub duration_seconds: f64,

    /// Number of assertions checked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assertions_checked: Option<usize>,

    /// Number of validations passed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validations_passed: Option<usize>,
}

/// Builder for constructing metrics reports
pub struct MetricsReportBuilder {
    report: MetricsReport,
}

impl MetricsReportBuilder {
    /// Create a new builder with test name
    pub fn new(test_name: impl Into<String>) -> Self {
        Self {
            report: MetricsReport {
                test_name: test_name.into(),
                timestamp: chrono::Utc::now().to_rfc3339(),
                result: TestResult::Pass,
                transfers: None,
                pool: None,
                test_execution: TestExecutionMetrics::default(),
            },
        }
    }

    /// Set test result
    pub fn result(mut self, result: TestResult) -> Self {
        self.report.result = result;
        self
    }

    /// Set transfer metrics
    pub fn transfers(mut self, metrics: TransferMetrics) -> Self {
        self.report.transfers = Some(metrics);
        self
    }

    /// Set pool metrics
    pub fn pool(mut self, metrics: PoolMetrics) -> Self {
        self.report.pool = Some(metrics);
        self
    }

    /// Set test execution metrics
    pub fn execution(mut self, metrics: TestExecutionMetrics) -> Self {
        self.report.test_execution = metrics;
        self
    }

    /// Build the metrics report
    pub fn build(self) -> MetricsReport {
        self.report
    }
}

/// Sink for writing metrics reports to JSON files
pub struct MetricsSink {
    path: std::path::PathBuf,
}

impl MetricsSink {
    /// Create a new metrics sink at the specified path
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        Ok(Self { path })
    }

    /// Write metrics report to file
    pub fn write(&self, report: &MetricsReport) -> Result<()> {
        let json = serde_json::to_string_pretty(report)?;
        let mut file = File::create(&self.path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

//! Tunable constants for the classifier, optimizer and simulators.
//!
//! Every field has a default; a JSON document only needs to name the values
//! it overrides.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DesignError, Result};
use crate::schema::WorkloadCategory;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub classifier: ClassifierConfig,
    pub optimizer: OptimizerConfig,
    pub estimator: EstimatorConfig,
    pub simulator: SimulatorConfig,
}

/// Thresholds of the workload rule table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Read share strictly below this is write-heavy.
    pub write_heavy_below: f64,
    /// Read share at or above this is read-heavy.
    pub read_heavy_from: f64,
    pub mixed_low: f64,
    pub mixed_high: f64,
    /// Normalized weight a pattern needs to dominate.
    pub dominant_share: f64,
    /// Combined aggregation + range-scan weight of a scan-oriented workload.
    pub scan_oriented_share: f64,
    pub minimum_pattern_share: f64,
    pub comparable_margin: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            write_heavy_below: 0.5,
            read_heavy_from: 0.7,
            mixed_low: 0.3,
            mixed_high: 0.85,
            dominant_share: 0.5,
            scan_oriented_share: 0.6,
            minimum_pattern_share: 0.2,
            comparable_margin: 0.25,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub max_oltp_index_width: usize,
    pub categorical_min_cardinality: u64,
    pub list_partition_max_values: u64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_oltp_index_width: 3,
            categorical_min_cardinality: 4,
            list_partition_max_values: 64,
        }
    }
}

/// Latency multiplier and throughput multiplier of one workload category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryProfile {
    pub latency_factor: f64,
    pub throughput_factor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    pub default_row_volume: u64,
    pub bottleneck_threshold_rows: u64,
    pub btree_fanout: f64,
    pub page_read_ms: f64,
    pub index_write_ms: f64,
    pub worst_case_spread: f64,
    pub scan_rows_per_ms: f64,
    pub scan_rows_per_sec: f64,
    pub throughput_spread: f64,
    pub partition_multiplier: f64,
    pub unpartitioned_penalty: f64,
    pub contention_scale: f64,
    pub write_amplification_indexes: usize,
    pub oltp: CategoryProfile,
    pub olap: CategoryProfile,
    pub htap: CategoryProfile,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            default_row_volume: 1_000,
            bottleneck_threshold_rows: 10_000_000,
            btree_fanout: 256.0,
            page_read_ms: 0.05,
            index_write_ms: 0.08,
            worst_case_spread: 4.0,
            scan_rows_per_ms: 50_000.0,
            scan_rows_per_sec: 2_000_000.0,
            throughput_spread: 0.4,
            partition_multiplier: 4.0,
            unpartitioned_penalty: 2.5,
            contention_scale: 200.0,
            write_amplification_indexes: 5,
            oltp: CategoryProfile {
                latency_factor: 1.0,
                throughput_factor: 0.4,
            },
            olap: CategoryProfile {
                latency_factor: 4.0,
                throughput_factor: 1.0,
            },
            htap: CategoryProfile {
                latency_factor: 1.6,
                throughput_factor: 0.7,
            },
        }
    }
}

impl EstimatorConfig {
    pub fn profile(&self, category: WorkloadCategory) -> &CategoryProfile {
        match category {
            WorkloadCategory::Oltp => &self.oltp,
            WorkloadCategory::Olap => &self.olap,
            WorkloadCategory::Htap => &self.htap,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Rows produced for every simulated query.
    pub row_count: usize,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self { row_count: 5 }
    }
}

impl CoreConfig {
    pub fn from_json(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: CoreConfig = serde_json::from_str(content)
            .map_err(|e| DesignError::Config(format!("Malformed config JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| DesignError::Config(format!("Failed to read config file: {e}")))?;
        Self::from_json(&content)
    }

    pub fn validate(&self) -> Result<()> {
        let c = &self.classifier;
        for (name, v) in [
            ("write_heavy_below", c.write_heavy_below),
            ("read_heavy_from", c.read_heavy_from),
            ("mixed_low", c.mixed_low),
            ("mixed_high", c.mixed_high),
            ("dominant_share", c.dominant_share),
            ("scan_oriented_share", c.scan_oriented_share),
            ("minimum_pattern_share", c.minimum_pattern_share),
            ("comparable_margin", c.comparable_margin),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(DesignError::Config(format!(
                    "classifier.{name} must be within 0..=1, got {v}"
                )));
            }
        }
        if c.mixed_low > c.mixed_high {
            return Err(DesignError::Config(
                "classifier.mixed_low cannot exceed classifier.mixed_high".to_string(),
            ));
        }

        let e = &self.estimator;
        for (name, v) in [
            ("btree_fanout", e.btree_fanout),
            ("page_read_ms", e.page_read_ms),
            ("scan_rows_per_ms", e.scan_rows_per_ms),
            ("scan_rows_per_sec", e.scan_rows_per_sec),
            ("partition_multiplier", e.partition_multiplier),
            ("unpartitioned_penalty", e.unpartitioned_penalty),
            ("contention_scale", e.contention_scale),
        ] {
            if !(v.is_finite() && v > 0.0) {
                return Err(DesignError::Config(format!(
                    "estimator.{name} must be a positive number, got {v}"
                )));
            }
        }
        if e.btree_fanout < 2.0 {
            return Err(DesignError::Config(
                "estimator.btree_fanout must be at least 2".to_string(),
            ));
        }
        if !(e.worst_case_spread.is_finite() && e.worst_case_spread >= 1.0) {
            return Err(DesignError::Config(
                "estimator.worst_case_spread must be >= 1".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&e.throughput_spread) {
            return Err(DesignError::Config(
                "estimator.throughput_spread must be within 0..1".to_string(),
            ));
        }
        if self.simulator.row_count == 0 {
            return Err(DesignError::Config(
                "simulator.row_count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

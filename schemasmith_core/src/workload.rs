//! Workload traits and the rule table that maps them to a category.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ClassifierConfig;
use crate::error::{DesignError, Result};
use crate::schema::{Schema, Table, WorkloadCategory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueryPattern {
    PointLookup,
    RangeScan,
    Aggregation,
}

impl fmt::Display for QueryPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryPattern::PointLookup => write!(f, "point-lookup"),
            QueryPattern::RangeScan => write!(f, "range-scan"),
            QueryPattern::Aggregation => write!(f, "aggregation"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Consistency {
    #[default]
    Strict,
    Eventual,
}

/// Relative weight of each query pattern. Only ratios matter.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryMix {
    pub point_lookup: f64,
    pub range_scan: f64,
    pub aggregation: f64,
}

impl QueryMix {
    pub fn new(point_lookup: f64, range_scan: f64, aggregation: f64) -> Self {
        Self {
            point_lookup,
            range_scan,
            aggregation,
        }
    }

    /// Weights scaled to sum to one.
    pub fn normalized(&self) -> Result<QueryMix> {
        let parts = [self.point_lookup, self.range_scan, self.aggregation];
        if parts.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(DesignError::unsupported(
                "query_mix weights must be finite and non-negative",
            ));
        }
        let total: f64 = parts.iter().sum();
        if total <= 0.0 {
            return Err(DesignError::unsupported(
                "query_mix must give at least one pattern a positive weight",
            ));
        }
        Ok(QueryMix::new(
            self.point_lookup / total,
            self.range_scan / total,
            self.aggregation / total,
        ))
    }

    /// Heaviest pattern; ties resolve point lookup, then range scan, then aggregation.
    pub fn dominant(&self) -> QueryPattern {
        let mut best = (QueryPattern::PointLookup, self.point_lookup);
        for (pattern, weight) in [
            (QueryPattern::RangeScan, self.range_scan),
            (QueryPattern::Aggregation, self.aggregation),
        ] {
            if weight > best.1 {
                best = (pattern, weight);
            }
        }
        best.0
    }
}

/// Per-table hints supplied with the workload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableWorkload {
    pub dominant: Option<QueryPattern>,
    pub group_by: Vec<String>,
    pub lookup_columns: Vec<String>,
    /// Estimated distinct values per column.
    pub cardinality: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadTraits {
    /// Fraction of operations that are reads, within 0..=1.
    pub read_share: f64,
    pub query_mix: QueryMix,
    #[serde(default)]
    pub consistency: Consistency,
    /// Expected concurrent sessions.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,
    /// Skips the rule table when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<WorkloadCategory>,
    /// Used, and flagged as a default, when no rule matches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<WorkloadCategory>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tables: BTreeMap<String, TableWorkload>,
}

fn default_concurrency() -> u32 {
    1
}

impl WorkloadTraits {
    pub fn new(read_share: f64, query_mix: QueryMix, consistency: Consistency) -> Self {
        Self {
            read_share,
            query_mix,
            consistency,
            concurrency: default_concurrency(),
            category: None,
            fallback: None,
            tables: BTreeMap::new(),
        }
    }

    pub fn with_table(mut self, table: &str, hints: TableWorkload) -> Self {
        self.tables.insert(table.to_string(), hints);
        self
    }

    pub fn table_hints(&self, table: &str) -> Option<&TableWorkload> {
        self.tables.get(table)
    }

    /// Declared dominant pattern of a table, else the workload-wide one.
    pub fn dominant_pattern(&self, table: &str) -> QueryPattern {
        self.tables
            .get(table)
            .and_then(|t| t.dominant)
            .unwrap_or_else(|| self.query_mix.dominant())
    }

    /// Checks value ranges and that per-table hints name real tables and columns.
    pub fn validate(&self, schema: &Schema) -> Result<()> {
        if !(self.read_share.is_finite() && (0.0..=1.0).contains(&self.read_share)) {
            return Err(DesignError::unsupported(format!(
                "read_share must be within 0..=1, got {}",
                self.read_share
            )));
        }
        self.query_mix.normalized()?;
        for (name, hints) in &self.tables {
            let table = schema.table(name).map_err(|_| {
                DesignError::unsupported(format!("workload hints name unknown table '{name}'"))
            })?;
            let columns = hints
                .group_by
                .iter()
                .chain(hints.lookup_columns.iter())
                .chain(hints.cardinality.keys());
            for c in columns {
                if !table.has_column(c) {
                    return Err(DesignError::unsupported(format!(
                        "workload hints name unknown column '{name}.{c}'"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Outcome of classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub category: WorkloadCategory,
    /// Name of the rule that fired, `explicit` or `fallback`.
    pub rule: String,
    /// True when no rule matched and the declared fallback was used.
    pub defaulted: bool,
}

/// Condition → category rules, evaluated in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationRule {
    Transactional,
    Analytical,
    Hybrid,
}

impl ClassificationRule {
    pub const PRIORITY: [ClassificationRule; 3] = [
        ClassificationRule::Transactional,
        ClassificationRule::Analytical,
        ClassificationRule::Hybrid,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ClassificationRule::Transactional => "transactional",
            ClassificationRule::Analytical => "analytical",
            ClassificationRule::Hybrid => "hybrid",
        }
    }

    pub fn category(&self) -> WorkloadCategory {
        match self {
            ClassificationRule::Transactional => WorkloadCategory::Oltp,
            ClassificationRule::Analytical => WorkloadCategory::Olap,
            ClassificationRule::Hybrid => WorkloadCategory::Htap,
        }
    }

    fn matches(&self, traits: &WorkloadTraits, mix: &QueryMix, cfg: &ClassifierConfig) -> bool {
        let reads = traits.read_share;
        match self {
            ClassificationRule::Transactional => {
                reads < cfg.write_heavy_below
                    && mix.point_lookup >= cfg.dominant_share
                    && traits.consistency == Consistency::Strict
            }
            ClassificationRule::Analytical => {
                reads >= cfg.read_heavy_from
                    && mix.aggregation >= mix.point_lookup
                    && mix.aggregation >= mix.range_scan
                    && mix.aggregation + mix.range_scan >= cfg.scan_oriented_share
            }
            ClassificationRule::Hybrid => {
                (cfg.mixed_low..=cfg.mixed_high).contains(&reads)
                    && mix.point_lookup >= cfg.minimum_pattern_share
                    && mix.aggregation >= cfg.minimum_pattern_share
                    && (mix.point_lookup - mix.aggregation).abs() <= cfg.comparable_margin
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Classifier {
    config: ClassifierConfig,
}

impl Classifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn classify(&self, traits: &WorkloadTraits) -> Result<Classification> {
        if !(traits.read_share.is_finite() && (0.0..=1.0).contains(&traits.read_share)) {
            return Err(DesignError::unsupported(format!(
                "read_share must be within 0..=1, got {}",
                traits.read_share
            )));
        }
        let mix = traits.query_mix.normalized()?;

        if let Some(category) = traits.category {
            debug!(%category, "workload category given explicitly");
            return Ok(Classification {
                category,
                rule: "explicit".to_string(),
                defaulted: false,
            });
        }

        for rule in ClassificationRule::PRIORITY {
            let hit = rule.matches(traits, &mix, &self.config);
            debug!(rule = rule.name(), hit, "classification rule evaluated");
            if hit {
                return Ok(Classification {
                    category: rule.category(),
                    rule: rule.name().to_string(),
                    defaulted: false,
                });
            }
        }

        let describe = format!(
            "read_share {:.2}, point lookups {:.2}, range scans {:.2}, aggregations {:.2}, {:?} consistency",
            traits.read_share, mix.point_lookup, mix.range_scan, mix.aggregation, traits.consistency
        );
        match traits.fallback {
            Some(category) => {
                warn!(%category, traits = %describe, "no workload rule matched; using declared fallback");
                Ok(Classification {
                    category,
                    rule: "fallback".to_string(),
                    defaulted: true,
                })
            }
            None => Err(DesignError::unsupported(format!(
                "no workload rule matches ({describe}); declare a category or a fallback"
            ))),
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}

/// Hint lookup shared by the optimizer and simulator.
pub(crate) fn group_by_columns(table: &Table, traits: &WorkloadTraits) -> Vec<Vec<String>> {
    match traits.table_hints(&table.name) {
        Some(h) if !h.group_by.is_empty() => vec![h.group_by.clone()],
        _ => table
            .foreign_keys
            .iter()
            .map(|fk| fk.columns.clone())
            .collect(),
    }
}

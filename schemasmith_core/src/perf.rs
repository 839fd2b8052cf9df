//! Order-of-magnitude latency and throughput estimates with bottleneck findings.
//!
//! Figures are ranges, never point values. The model is deliberately coarse:
//! b-tree depth for lookups, raw scan rate for analysis, and flat multipliers
//! for workload category, partitioning and contention.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::{CategoryProfile, EstimatorConfig};
use crate::error::{DesignError, Result};
use crate::schema::{AdvisoryKind, Schema, Table, WorkloadCategory};
use crate::workload::{group_by_columns, Consistency, QueryPattern, WorkloadTraits};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Milliseconds,
    RowsPerSecond,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::Milliseconds => write!(f, "ms"),
            Unit::RowsPerSecond => write!(f, "rows/s"),
        }
    }
}

/// Inclusive estimate; `low <= high` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EstimateRange {
    pub low: f64,
    pub high: f64,
    pub unit: Unit,
}

impl EstimateRange {
    pub fn new(a: f64, b: f64, unit: Unit) -> Self {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        Self { low, high, unit }
    }
}

impl fmt::Display for EstimateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}-{:.3} {}", self.low, self.high, self.unit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BottleneckKind {
    MissingAccessPath,
    UnpartitionedLargeTable,
    WriteAmplification,
    FullScanFallback,
    MissingPrimaryKey,
    WideIndex,
    HybridTradeoff,
    PartitionKeyOutsideUniqueKey,
}

impl From<AdvisoryKind> for BottleneckKind {
    fn from(kind: AdvisoryKind) -> Self {
        match kind {
            AdvisoryKind::MissingPrimaryKey => BottleneckKind::MissingPrimaryKey,
            AdvisoryKind::WideIndex => BottleneckKind::WideIndex,
            AdvisoryKind::HybridTradeoff => BottleneckKind::HybridTradeoff,
            AdvisoryKind::PartitionKeyOutsideUniqueKey => BottleneckKind::PartitionKeyOutsideUniqueKey,
        }
    }
}

/// Advisory finding; never an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BottleneckAnnotation {
    pub kind: BottleneckKind,
    pub table: Option<String>,
    pub index: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableEstimate {
    pub table: String,
    pub rows: u64,
    pub dominant_pattern: QueryPattern,
    pub has_access_path: bool,
    pub partitioned: bool,
    /// Partitioned on a column the dominant pattern actually filters or groups by.
    pub partition_aligned: bool,
    pub index_count: usize,
    pub lookup_latency: EstimateRange,
    pub scan_throughput: EstimateRange,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryEstimate {
    pub category: WorkloadCategory,
    pub transactional_latency: EstimateRange,
    pub analytical_throughput: EstimateRange,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceReport {
    pub category: WorkloadCategory,
    pub total_rows: u64,
    pub transactional_latency: EstimateRange,
    pub analytical_throughput: EstimateRange,
    pub tables: Vec<TableEstimate>,
    pub bottlenecks: Vec<BottleneckAnnotation>,
    pub comparison: Vec<CategoryEstimate>,
    pub best_transactional: WorkloadCategory,
    pub best_analytical: WorkloadCategory,
}

impl PerformanceReport {
    pub fn bottlenecks_for(&self, table: &str) -> impl Iterator<Item = &BottleneckAnnotation> {
        self.bottlenecks
            .iter()
            .filter(move |b| b.table.as_deref() == Some(table))
    }

    pub fn table(&self, name: &str) -> Option<&TableEstimate> {
        self.tables.iter().find(|t| t.table == name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PerformanceSimulator {
    config: EstimatorConfig,
}

impl PerformanceSimulator {
    pub fn new(config: EstimatorConfig) -> Self {
        Self { config }
    }

    pub fn simulate(
        &self,
        schema: &Schema,
        category: WorkloadCategory,
        row_volumes: &BTreeMap<String, u64>,
        traits: &WorkloadTraits,
    ) -> Result<PerformanceReport> {
        for name in row_volumes.keys() {
            if !schema.contains_table(name) {
                return Err(DesignError::validation(format!(
                    "Row volume given for unknown table '{name}'"
                )));
            }
        }

        let rows_of = |t: &Table| {
            row_volumes
                .get(&t.name)
                .copied()
                .unwrap_or(self.config.default_row_volume)
        };
        let profile = self.config.profile(category);
        let tables: Vec<TableEstimate> = schema
            .tables()
            .iter()
            .map(|t| self.estimate_table(t, rows_of(t), profile, traits))
            .collect();
        let total_rows = tables.iter().fold(0u64, |acc, t| acc.saturating_add(t.rows));

        // Largest table drives both headline figures; ties go to the first declared.
        let hottest = largest(&tables);
        let transactional_latency = hottest.lookup_latency;
        let analytical_throughput = hottest.scan_throughput;

        let bottlenecks = self.bottlenecks(schema, category, &tables, hottest);
        for b in &bottlenecks {
            warn!(kind = ?b.kind, table = ?b.table, "{}", b.message);
        }

        let hot_table = schema.table(&hottest.table)?;
        let comparison: Vec<CategoryEstimate> = WorkloadCategory::ALL
            .iter()
            .map(|&c| {
                let e = self.estimate_table(hot_table, hottest.rows, self.config.profile(c), traits);
                CategoryEstimate {
                    category: c,
                    transactional_latency: e.lookup_latency,
                    analytical_throughput: e.scan_throughput,
                }
            })
            .collect();
        let best_transactional = pick(&comparison, |a, b| {
            a.transactional_latency.high < b.transactional_latency.high
        });
        let best_analytical = pick(&comparison, |a, b| {
            a.analytical_throughput.high > b.analytical_throughput.high
        });

        info!(
            %category,
            total_rows,
            bottlenecks = bottlenecks.len(),
            latency = %transactional_latency,
            throughput = %analytical_throughput,
            "performance simulated"
        );
        Ok(PerformanceReport {
            category,
            total_rows,
            transactional_latency,
            analytical_throughput,
            tables,
            bottlenecks,
            comparison,
            best_transactional,
            best_analytical,
        })
    }

    fn estimate_table(
        &self,
        table: &Table,
        rows: u64,
        profile: &CategoryProfile,
        traits: &WorkloadTraits,
    ) -> TableEstimate {
        let c = &self.config;
        let pattern = traits.dominant_pattern(&table.name);
        let indexed = has_suitable_access(table, pattern, traits);
        let partitioned = table.partitioning.is_some();
        let partition_aligned = partition_serves(table, pattern, traits);
        let index_count = table.index_count();
        let volume = rows.max(1) as f64;

        let depth = (volume.ln() / c.btree_fanout.ln()).ceil().max(1.0);
        let contention_term = f64::from(traits.concurrency) / c.contention_scale;
        let contention = 1.0
            + match traits.consistency {
                Consistency::Strict => 2.0 * contention_term,
                Consistency::Eventual => contention_term,
            };
        let best = (depth * c.page_read_ms + index_count as f64 * c.index_write_ms)
            * profile.latency_factor
            * contention;
        let worst = if indexed {
            best * c.worst_case_spread
        } else {
            (volume / c.scan_rows_per_ms).max(best)
        };

        let mut high = c.scan_rows_per_sec * profile.throughput_factor;
        if partition_aligned {
            high *= c.partition_multiplier;
        }
        let mut low = high * (1.0 - c.throughput_spread);
        if rows > c.bottleneck_threshold_rows && !partition_aligned {
            low /= c.unpartitioned_penalty;
        }

        TableEstimate {
            table: table.name.clone(),
            rows,
            dominant_pattern: pattern,
            has_access_path: indexed,
            partitioned,
            partition_aligned,
            index_count,
            lookup_latency: EstimateRange::new(best, worst, Unit::Milliseconds),
            scan_throughput: EstimateRange::new(low, high, Unit::RowsPerSecond),
        }
    }

    fn bottlenecks(
        &self,
        schema: &Schema,
        category: WorkloadCategory,
        tables: &[TableEstimate],
        hottest: &TableEstimate,
    ) -> Vec<BottleneckAnnotation> {
        let threshold = self.config.bottleneck_threshold_rows;
        let mut out = Vec::new();
        for est in tables {
            let large = est.rows > threshold;
            let scan_heavy = matches!(
                est.dominant_pattern,
                QueryPattern::RangeScan | QueryPattern::Aggregation
            );
            if large && !est.has_access_path && !est.partition_aligned {
                out.push(BottleneckAnnotation {
                    kind: BottleneckKind::MissingAccessPath,
                    table: Some(est.table.clone()),
                    index: None,
                    message: format!(
                        "'{}' holds {} rows with no index or partition key for its {} workload",
                        est.table, est.rows, est.dominant_pattern
                    ),
                });
            } else if large && !est.partition_aligned && scan_heavy {
                let message = if est.partitioned {
                    format!(
                        "'{}' holds {} rows partitioned on a key its {} queries never use; every partition is read",
                        est.table, est.rows, est.dominant_pattern
                    )
                } else {
                    format!(
                        "'{}' holds {} rows without a partition key; {} queries read the whole table",
                        est.table, est.rows, est.dominant_pattern
                    )
                };
                out.push(BottleneckAnnotation {
                    kind: BottleneckKind::UnpartitionedLargeTable,
                    table: Some(est.table.clone()),
                    index: None,
                    message,
                });
            }
            if category != WorkloadCategory::Olap
                && est.index_count > self.config.write_amplification_indexes
            {
                out.push(BottleneckAnnotation {
                    kind: BottleneckKind::WriteAmplification,
                    table: Some(est.table.clone()),
                    index: None,
                    message: format!(
                        "'{}' maintains {} indexes on every write",
                        est.table, est.index_count
                    ),
                });
            }
        }

        let already_flagged = out.iter().any(|b| {
            b.kind == BottleneckKind::MissingAccessPath
                && b.table.as_deref() == Some(hottest.table.as_str())
        });
        if !hottest.has_access_path && !already_flagged {
            out.push(BottleneckAnnotation {
                kind: BottleneckKind::FullScanFallback,
                table: Some(hottest.table.clone()),
                index: None,
                message: format!(
                    "'{}' has no index for its {} workload; worst-case latency is a full scan",
                    hottest.table, hottest.dominant_pattern
                ),
            });
        }

        out.extend(schema.advisories().iter().map(|a| BottleneckAnnotation {
            kind: a.kind.into(),
            table: a.table.clone(),
            index: a.index.clone(),
            message: a.message.clone(),
        }));
        out
    }
}

/// Whether `table` has an access path serving `pattern`.
fn has_suitable_access(table: &Table, pattern: QueryPattern, traits: &WorkloadTraits) -> bool {
    let hints = traits.table_hints(&table.name);
    match pattern {
        QueryPattern::PointLookup => match hints.filter(|h| !h.lookup_columns.is_empty()) {
            Some(h) => h
                .lookup_columns
                .iter()
                .all(|c| table.has_access_path(std::slice::from_ref(c))),
            None => !table.primary_key().is_empty(),
        },
        QueryPattern::RangeScan => {
            let time_like = table
                .columns
                .iter()
                .filter(|c| c.dtype.is_time_like())
                .map(|c| c.name.as_str());
            let lookups = hints
                .into_iter()
                .flat_map(|h| h.lookup_columns.iter().map(String::as_str));
            let pk_lead = table.primary_key().into_iter().next();
            time_like
                .chain(lookups)
                .any(|c| table.has_ordered_access_on(c))
                || pk_lead.is_some_and(|c| table.has_ordered_access_on(&c))
        }
        QueryPattern::Aggregation => group_by_columns(table, traits)
            .iter()
            .any(|cols| table.has_access_path(cols)),
    }
}

/// Whether the partition key is a dimension `pattern` filters or groups on.
/// Time-like keys serve both scan patterns, since analysis is time-bounded.
fn partition_serves(table: &Table, pattern: QueryPattern, traits: &WorkloadTraits) -> bool {
    let Some(partitioning) = &table.partitioning else {
        return false;
    };
    let hints = traits.table_hints(&table.name);
    let lookups: Vec<&String> = hints.into_iter().flat_map(|h| &h.lookup_columns).collect();
    partitioning.columns.iter().any(|key| {
        let time_like = table.column(key).is_some_and(|c| c.dtype.is_time_like());
        match pattern {
            QueryPattern::PointLookup => {
                lookups.contains(&key) || table.primary_key().first() == Some(key)
            }
            QueryPattern::RangeScan => time_like || lookups.contains(&key),
            QueryPattern::Aggregation => {
                time_like
                    || group_by_columns(table, traits)
                        .iter()
                        .any(|cols| cols.contains(key))
            }
        }
    })
}

fn largest(tables: &[TableEstimate]) -> &TableEstimate {
    let mut best = &tables[0];
    for t in &tables[1..] {
        if t.rows > best.rows {
            best = t;
        }
    }
    best
}

fn pick(
    estimates: &[CategoryEstimate],
    better: impl Fn(&CategoryEstimate, &CategoryEstimate) -> bool,
) -> WorkloadCategory {
    let mut best = &estimates[0];
    for e in &estimates[1..] {
        if better(e, best) {
            best = e;
        }
    }
    best.category
}

//! Rule-based physical design: indexes and partitioning per workload category.
//!
//! Rules only add. Declared indexes and partitioning are never removed or
//! replaced, and a rule skips any change an existing access path already
//! provides, so running the optimizer twice adds nothing the second time.

use serde::Serialize;
use tracing::{debug, info};

use crate::config::OptimizerConfig;
use crate::error::Result;
use crate::schema::{
    Advisory, AdvisoryKind, Index, IndexKind, Origin, PartitionKind, Partitioning, Schema, Table,
    WorkloadCategory,
};
use crate::workload::{group_by_columns, QueryPattern, WorkloadTraits};

/// Why the optimizer did (or deliberately did not do) something.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rationale {
    pub rule: &'static str,
    pub table: Option<String>,
    pub index: Option<String>,
    pub partition_key: Option<Vec<String>>,
    pub message: String,
}

impl Rationale {
    fn table(rule: OptimizationRule, table: &str, message: String) -> Self {
        Self {
            rule: rule.name(),
            table: Some(table.to_string()),
            index: None,
            partition_key: None,
            message,
        }
    }
}

/// Result of the pure optimizer entry point.
#[derive(Debug, Clone)]
pub struct Optimized {
    pub schema: Schema,
    pub rationale: Vec<Rationale>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationRule {
    PrimaryKeyCoverage,
    ForeignKeyCovering,
    LookupHashIndex,
    WideIndexAudit,
    Partitioning { selective: bool },
    AggregationIndex,
    HybridTradeoff,
}

impl OptimizationRule {
    /// Rules applied for a category, in evaluation order.
    pub fn for_category(category: WorkloadCategory) -> &'static [OptimizationRule] {
        use OptimizationRule::*;
        match category {
            WorkloadCategory::Oltp => &[
                PrimaryKeyCoverage,
                ForeignKeyCovering,
                LookupHashIndex,
                WideIndexAudit,
            ],
            WorkloadCategory::Olap => &[Partitioning { selective: false }, AggregationIndex],
            WorkloadCategory::Htap => &[
                PrimaryKeyCoverage,
                ForeignKeyCovering,
                WideIndexAudit,
                Partitioning { selective: true },
                HybridTradeoff,
            ],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OptimizationRule::PrimaryKeyCoverage => "primary-key-coverage",
            OptimizationRule::ForeignKeyCovering => "foreign-key-covering",
            OptimizationRule::LookupHashIndex => "lookup-hash-index",
            OptimizationRule::WideIndexAudit => "wide-index-audit",
            OptimizationRule::Partitioning { .. } => "partitioning",
            OptimizationRule::AggregationIndex => "aggregation-index",
            OptimizationRule::HybridTradeoff => "hybrid-tradeoff",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Optimizer {
    config: OptimizerConfig,
}

impl Optimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    /// Returns an optimized copy; the input schema is left untouched.
    pub fn optimize(
        &self,
        schema: &Schema,
        category: WorkloadCategory,
        traits: &WorkloadTraits,
    ) -> Result<Optimized> {
        let mut optimized = schema.clone();
        let rationale = self.apply(&mut optimized, category, traits)?;
        Ok(Optimized {
            schema: optimized,
            rationale,
        })
    }

    /// Optimizes `schema` in place.
    pub fn apply(
        &self,
        schema: &mut Schema,
        category: WorkloadCategory,
        traits: &WorkloadTraits,
    ) -> Result<Vec<Rationale>> {
        schema.set_workload(category);
        let mut rationale = Vec::new();
        for rule in OptimizationRule::for_category(category) {
            let before = rationale.len();
            self.apply_rule(*rule, schema, traits, &mut rationale)?;
            debug!(rule = rule.name(), notes = rationale.len() - before, "optimizer rule applied");
        }
        info!(%category, notes = rationale.len(), "schema optimized");
        Ok(rationale)
    }

    fn apply_rule(
        &self,
        rule: OptimizationRule,
        schema: &mut Schema,
        traits: &WorkloadTraits,
        out: &mut Vec<Rationale>,
    ) -> Result<()> {
        match rule {
            OptimizationRule::PrimaryKeyCoverage => primary_key_coverage(schema, out),
            OptimizationRule::ForeignKeyCovering => foreign_key_covering(schema, out),
            OptimizationRule::LookupHashIndex => lookup_hash_index(schema, traits, out),
            OptimizationRule::WideIndexAudit => {
                wide_index_audit(schema, self.config.max_oltp_index_width, out);
                Ok(())
            }
            OptimizationRule::Partitioning { selective } => {
                self.partitioning(schema, traits, selective, out)
            }
            OptimizationRule::AggregationIndex => aggregation_index(schema, traits, out),
            OptimizationRule::HybridTradeoff => {
                hybrid_tradeoff(schema, out);
                Ok(())
            }
        }
    }

    fn partitioning(
        &self,
        schema: &mut Schema,
        traits: &WorkloadTraits,
        selective: bool,
        out: &mut Vec<Rationale>,
    ) -> Result<()> {
        let rule = OptimizationRule::Partitioning { selective };
        let mut planned: Vec<(Partitioning, String)> = Vec::new();
        let mut notes: Vec<Advisory> = Vec::new();
        for table in schema.tables() {
            if let Some(existing) = &table.partitioning {
                notes.extend(partition_key_advisory(table, &existing.columns));
                out.push(Rationale::table(
                    rule,
                    &table.name,
                    format!(
                        "kept existing {} partitioning on ({})",
                        existing.kind,
                        existing.columns.join(", ")
                    ),
                ));
                continue;
            }
            if selective && !wants_hybrid_partitioning(table, traits) {
                continue;
            }
            if let Some((kind, column, reason)) = self.choose_partition_key(table, traits) {
                planned.push((
                    Partitioning {
                        table: table.name.clone(),
                        kind,
                        columns: vec![column],
                        origin: Origin::Optimizer,
                    },
                    reason,
                ));
            }
        }
        for note in notes {
            schema.add_advisory(note);
        }

        for (partitioning, reason) in planned {
            let table = partitioning.table.clone();
            let key = partitioning.columns.clone();
            let kind = partitioning.kind;
            if schema.set_partitioning(partitioning)? {
                out.push(Rationale {
                    rule: rule.name(),
                    table: Some(table.clone()),
                    index: None,
                    partition_key: Some(key.clone()),
                    message: format!("{kind} partitioning on ({}): {reason}", key.join(", ")),
                });
                let note = partition_key_advisory(schema.table(&table)?, &key);
                if let Some(note) = note {
                    schema.add_advisory(note);
                }
                if selective {
                    schema.add_advisory(Advisory {
                        kind: AdvisoryKind::HybridTradeoff,
                        table: Some(table.clone()),
                        index: None,
                        message: format!(
                            "'{table}' is partitioned on ({}) for analytical scans; transactional point lookups that omit the partition key must probe every partition",
                            key.join(", ")
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    /// Highest-cardinality time-like column, else highest-cardinality categorical column.
    fn choose_partition_key(
        &self,
        table: &Table,
        traits: &WorkloadTraits,
    ) -> Option<(PartitionKind, String, String)> {
        let hints = traits.table_hints(&table.name);
        let cardinality = |col: &str| hints.and_then(|h| h.cardinality.get(col).copied());

        let mut time_like: Vec<(usize, &str)> = table
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.dtype.is_time_like())
            .map(|(i, c)| (i, c.name.as_str()))
            .collect();
        // Declared cardinality first (higher wins), then declaration order.
        time_like.sort_by(|a, b| {
            cardinality(b.1)
                .cmp(&cardinality(a.1))
                .then_with(|| a.0.cmp(&b.0))
        });
        if let Some((_, col)) = time_like.first() {
            return Some((
                PartitionKind::Range,
                col.to_string(),
                format!("'{col}' is time-like, so time-bounded scans prune whole partitions"),
            ));
        }

        let categorical = table
            .columns
            .iter()
            .filter(|c| !c.primary_key && !c.unique && (c.dtype.is_textual() || c.dtype.is_integral()))
            .filter_map(|c| cardinality(&c.name).map(|n| (c.name.as_str(), n)))
            .filter(|(_, n)| *n >= self.config.categorical_min_cardinality)
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))?;
        let (col, distinct) = categorical;
        let kind = if distinct <= self.config.list_partition_max_values {
            PartitionKind::List
        } else {
            PartitionKind::Hash
        };
        Some((
            kind,
            col.to_string(),
            format!("'{col}' is the highest-cardinality categorical column (~{distinct} distinct values)"),
        ))
    }
}

/// Keys are reported, not widened: the optimizer leaves column definitions alone.
fn partition_key_advisory(table: &Table, key: &[String]) -> Option<Advisory> {
    let missing = table.keys_missing(key);
    if missing.is_empty() {
        return None;
    }
    let keys = missing
        .iter()
        .map(|k| format!("({})", k.join(", ")))
        .collect::<Vec<_>>()
        .join(", ");
    Some(Advisory {
        kind: AdvisoryKind::PartitionKeyOutsideUniqueKey,
        table: Some(table.name.clone()),
        index: None,
        message: format!(
            "'{}' is partitioned on ({}) but key {keys} does not include it; add ({}) to each key before running the DDL on PostgreSQL",
            table.name,
            key.join(", "),
            key.join(", ")
        ),
    })
}

fn wants_hybrid_partitioning(table: &Table, traits: &WorkloadTraits) -> bool {
    match traits.table_hints(&table.name).and_then(|h| h.dominant) {
        Some(pattern) => matches!(pattern, QueryPattern::Aggregation | QueryPattern::RangeScan),
        None => {
            table.foreign_keys.iter().any(|fk| !fk.is_self_reference())
                && table.columns.iter().any(|c| c.dtype.is_time_like())
        }
    }
}

fn primary_key_coverage(schema: &mut Schema, out: &mut Vec<Rationale>) -> Result<()> {
    let rule = OptimizationRule::PrimaryKeyCoverage;
    let mut missing: Vec<String> = Vec::new();
    for table in schema.tables() {
        let pk = table.primary_key();
        if pk.is_empty() {
            missing.push(table.name.clone());
            out.push(Rationale::table(
                rule,
                &table.name,
                "no primary key: point lookups and foreign-key checks have no unique index to use"
                    .to_string(),
            ));
        } else {
            out.push(Rationale::table(
                rule,
                &table.name,
                format!("primary key ({}) already provides the unique b-tree index", pk.join(", ")),
            ));
        }
    }
    for table in missing {
        schema.add_advisory(Advisory {
            kind: AdvisoryKind::MissingPrimaryKey,
            message: format!("'{table}' has no primary key; transactional lookups fall back to scans"),
            table: Some(table),
            index: None,
        });
    }
    Ok(())
}

fn add_planned(
    schema: &mut Schema,
    rule: OptimizationRule,
    planned: Vec<(String, Vec<String>, IndexKind, String)>,
    out: &mut Vec<Rationale>,
) -> Result<()> {
    for (table, columns, kind, reason) in planned {
        // An earlier entry in this batch may already cover these columns.
        if schema.table(&table)?.has_access_path(&columns) {
            continue;
        }
        let prefix = if kind == IndexKind::Hash { "hidx" } else { "idx" };
        let name = schema.index_name_for(&table, &columns, prefix);
        let added = schema.add_index(Index {
            name: name.clone(),
            table: table.clone(),
            columns: columns.clone(),
            kind,
            unique: false,
            origin: Origin::Optimizer,
        })?;
        if added {
            out.push(Rationale {
                rule: rule.name(),
                table: Some(table),
                index: Some(name),
                partition_key: None,
                message: reason,
            });
        }
    }
    Ok(())
}

fn foreign_key_covering(schema: &mut Schema, out: &mut Vec<Rationale>) -> Result<()> {
    let mut planned = Vec::new();
    for table in schema.tables() {
        for fk in &table.foreign_keys {
            if table.has_access_path(&fk.columns) {
                continue;
            }
            planned.push((
                table.name.clone(),
                fk.columns.clone(),
                IndexKind::for_columns(&fk.columns),
                format!(
                    "covers foreign key ({}) -> {}: keeps joins and ON DELETE checks off full scans",
                    fk.columns.join(", "),
                    fk.ref_table
                ),
            ));
        }
    }
    add_planned(schema, OptimizationRule::ForeignKeyCovering, planned, out)
}

fn lookup_hash_index(
    schema: &mut Schema,
    traits: &WorkloadTraits,
    out: &mut Vec<Rationale>,
) -> Result<()> {
    let mut planned = Vec::new();
    for table in schema.tables() {
        if traits.dominant_pattern(&table.name) != QueryPattern::PointLookup {
            continue;
        }
        let Some(hints) = traits.table_hints(&table.name) else {
            continue;
        };
        for col in &hints.lookup_columns {
            let columns = vec![col.clone()];
            if table.has_access_path(&columns) {
                continue;
            }
            planned.push((
                table.name.clone(),
                columns,
                IndexKind::Hash,
                format!("equality lookups on '{col}' dominate; a hash index answers them in one probe"),
            ));
        }
    }
    add_planned(schema, OptimizationRule::LookupHashIndex, planned, out)
}

fn wide_index_audit(schema: &mut Schema, max_width: usize, out: &mut Vec<Rationale>) {
    let rule = OptimizationRule::WideIndexAudit;
    let mut wide: Vec<(String, String, usize)> = Vec::new();
    for table in schema.tables() {
        for ix in &table.indexes {
            if ix.columns.len() > max_width {
                wide.push((table.name.clone(), ix.name.clone(), ix.columns.len()));
            }
        }
    }
    for (table, index, width) in wide {
        let message = format!(
            "index '{index}' spans {width} columns (limit {max_width}); every write maintains the full key"
        );
        out.push(Rationale {
            rule: rule.name(),
            table: Some(table.clone()),
            index: Some(index.clone()),
            partition_key: None,
            message: message.clone(),
        });
        schema.add_advisory(Advisory {
            kind: AdvisoryKind::WideIndex,
            table: Some(table),
            index: Some(index),
            message,
        });
    }
}

fn aggregation_index(
    schema: &mut Schema,
    traits: &WorkloadTraits,
    out: &mut Vec<Rationale>,
) -> Result<()> {
    let mut planned = Vec::new();
    for table in schema.tables() {
        for columns in group_by_columns(table, traits) {
            if table.has_access_path(&columns) {
                continue;
            }
            let reason = format!(
                "groups and joins on ({}) read keys in order instead of sorting",
                columns.join(", ")
            );
            let kind = IndexKind::for_columns(&columns);
            planned.push((table.name.clone(), columns, kind, reason));
        }
    }
    add_planned(schema, OptimizationRule::AggregationIndex, planned, out)
}

fn hybrid_tradeoff(schema: &mut Schema, out: &mut Vec<Rationale>) {
    let message = "HTAP design keeps foreign-key indexes for transactional joins and partitions only \
                   scan-heavy tables; each added index costs write latency and each partition key \
                   slows lookups that do not filter on it"
        .to_string();
    out.push(Rationale {
        rule: OptimizationRule::HybridTradeoff.name(),
        table: None,
        index: None,
        partition_key: None,
        message: message.clone(),
    });
    schema.add_advisory(Advisory {
        kind: AdvisoryKind::HybridTradeoff,
        table: None,
        index: None,
        message,
    });
}

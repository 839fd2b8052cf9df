use std::collections::BTreeMap;

use schemasmith_core::config::EstimatorConfig;
use schemasmith_core::optimizer::Optimizer;
use schemasmith_core::perf::{BottleneckKind, PerformanceSimulator, Unit};
use schemasmith_core::schema::{ColumnInput, IndexInput, PartitionInput, PartitionKind, TableInput};
use schemasmith_core::types::datatype::DataType;
use schemasmith_core::workload::{QueryPattern, TableWorkload, WorkloadTraits};
use schemasmith_core::{Schema, WorkloadCategory};

use crate::fixtures::*;

fn volumes(pairs: &[(&str, u64)]) -> BTreeMap<String, u64> {
    pairs.iter().map(|(t, n)| (t.to_string(), *n)).collect()
}

fn orders_aggregate(traits: WorkloadTraits) -> WorkloadTraits {
    traits.with_table(
        "orders",
        TableWorkload {
            dominant: Some(QueryPattern::Aggregation),
            ..TableWorkload::default()
        },
    )
}

fn kinds_for(report: &schemasmith_core::perf::PerformanceReport, table: &str) -> Vec<BottleneckKind> {
    report.bottlenecks_for(table).map(|b| b.kind).collect()
}

#[test]
fn large_unpartitioned_aggregation_table_is_flagged() {
    let traits = orders_aggregate(oltp_traits());
    let optimized = Optimizer::default()
        .optimize(&shop(), WorkloadCategory::Oltp, &traits)
        .unwrap();
    let report = PerformanceSimulator::default()
        .simulate(
            &optimized.schema,
            WorkloadCategory::Oltp,
            &volumes(&[("orders", 50_000_000), ("customers", 2_000_000)]),
            &traits,
        )
        .unwrap();

    assert_eq!(kinds_for(&report, "orders"), vec![BottleneckKind::UnpartitionedLargeTable]);
    assert!(kinds_for(&report, "customers").is_empty());
    assert_eq!(report.total_rows, 52_000_000);
}

#[test]
fn large_table_without_any_access_path_is_flagged() {
    let traits = orders_aggregate(oltp_traits());
    let report = PerformanceSimulator::default()
        .simulate(
            &shop(),
            WorkloadCategory::Oltp,
            &volumes(&[("orders", 50_000_000), ("customers", 2_000_000)]),
            &traits,
        )
        .unwrap();
    assert_eq!(kinds_for(&report, "orders"), vec![BottleneckKind::MissingAccessPath]);
    let orders = report.table("orders").unwrap();
    assert!(!orders.has_access_path);
    // Worst case is a full scan of 50M rows.
    assert_eq!(orders.lookup_latency.high, 1_000.0);
}

#[test]
fn partition_key_clears_the_bottleneck() {
    let traits = orders_aggregate(olap_traits());
    let optimized = Optimizer::default()
        .optimize(&shop(), WorkloadCategory::Olap, &traits)
        .unwrap();
    let report = PerformanceSimulator::default()
        .simulate(
            &optimized.schema,
            WorkloadCategory::Olap,
            &volumes(&[("orders", 50_000_000), ("customers", 2_000_000)]),
            &traits,
        )
        .unwrap();
    // Only the key advisory remains: PRIMARY KEY (id) lacks placed_at.
    assert_eq!(
        kinds_for(&report, "orders"),
        vec![BottleneckKind::PartitionKeyOutsideUniqueKey]
    );
    assert!(kinds_for(&report, "customers").is_empty());
    let orders = report.table("orders").unwrap();
    assert!(orders.partitioned);
    assert!(orders.partition_aligned);
}

#[test]
fn partitioning_on_an_unqueried_column_earns_nothing() {
    let mut input = shop_input();
    input.tables[0].partitioning = Some(PartitionInput {
        kind: PartitionKind::List,
        columns: vec!["status".to_string()],
    });
    let by_status = Schema::from_input(&input).unwrap();
    // Aggregations group on customer_id, the foreign key.
    let traits = orders_aggregate(olap_traits());
    let rows = volumes(&[("orders", 50_000_000)]);
    let sim = PerformanceSimulator::default();

    let report = sim
        .simulate(&by_status, WorkloadCategory::Olap, &rows, &traits)
        .unwrap();
    let orders = report.table("orders").unwrap();
    assert!(orders.partitioned);
    assert!(!orders.partition_aligned);
    assert_eq!(kinds_for(&report, "orders"), vec![BottleneckKind::MissingAccessPath]);

    let plain = sim
        .simulate(&shop(), WorkloadCategory::Olap, &rows, &traits)
        .unwrap();
    assert_eq!(report.analytical_throughput, plain.analytical_throughput);

    let optimized = Optimizer::default()
        .optimize(&by_status, WorkloadCategory::Olap, &traits)
        .unwrap();
    let report = sim
        .simulate(&optimized.schema, WorkloadCategory::Olap, &rows, &traits)
        .unwrap();
    assert_eq!(
        kinds_for(&report, "orders"),
        vec![
            BottleneckKind::UnpartitionedLargeTable,
            BottleneckKind::PartitionKeyOutsideUniqueKey
        ]
    );
    let scan = report.bottlenecks_for("orders").next().unwrap();
    assert!(scan.message.contains("never use"), "{}", scan.message);
}

#[test]
fn huge_volumes_saturate_the_total() {
    let report = PerformanceSimulator::default()
        .simulate(
            &shop(),
            WorkloadCategory::Olap,
            &volumes(&[("orders", u64::MAX), ("customers", 10)]),
            &olap_traits(),
        )
        .unwrap();
    assert_eq!(report.total_rows, u64::MAX);
    assert!(report.transactional_latency.low <= report.transactional_latency.high);
}

#[test]
fn every_estimate_is_an_ordered_range() {
    let schema = shop();
    let sim = PerformanceSimulator::default();
    for category in WorkloadCategory::ALL {
        for rows in [0, 1, 1_000, 9_999_999, 10_000_001, 5_000_000_000] {
            let report = sim
                .simulate(&schema, category, &volumes(&[("orders", rows)]), &olap_traits())
                .unwrap();
            let ranges = report
                .tables
                .iter()
                .flat_map(|t| [t.lookup_latency, t.scan_throughput])
                .chain(
                    report
                        .comparison
                        .iter()
                        .flat_map(|c| [c.transactional_latency, c.analytical_throughput]),
                );
            for r in ranges {
                assert!(r.low <= r.high, "{category} at {rows} rows: {r:?}");
                assert!(r.low >= 0.0);
            }
            assert_eq!(report.transactional_latency.unit, Unit::Milliseconds);
            assert_eq!(report.analytical_throughput.unit, Unit::RowsPerSecond);
        }
    }
}

#[test]
fn unknown_table_in_volumes_is_rejected() {
    let err = PerformanceSimulator::default()
        .simulate(
            &shop(),
            WorkloadCategory::Oltp,
            &volumes(&[("invoices", 10)]),
            &oltp_traits(),
        )
        .unwrap_err();
    assert_eq!(err.kind(), "validation");
    assert!(err.to_string().contains("invoices"));
}

#[test]
fn tables_without_volume_use_the_default() {
    let report = PerformanceSimulator::default()
        .simulate(&shop(), WorkloadCategory::Oltp, &BTreeMap::new(), &oltp_traits())
        .unwrap();
    assert!(report.tables.iter().all(|t| t.rows == 1_000));
    assert_eq!(report.total_rows, 2_000);
}

#[test]
fn comparison_picks_best_category_per_axis() {
    let report = PerformanceSimulator::default()
        .simulate(
            &shop(),
            WorkloadCategory::Htap,
            &volumes(&[("orders", 5_000_000)]),
            &oltp_traits(),
        )
        .unwrap();
    assert_eq!(report.comparison.len(), 3);
    assert_eq!(report.best_transactional, WorkloadCategory::Oltp);
    assert_eq!(report.best_analytical, WorkloadCategory::Olap);
    let htap = report
        .comparison
        .iter()
        .find(|c| c.category == WorkloadCategory::Htap)
        .unwrap();
    assert_eq!(htap.transactional_latency, report.transactional_latency);
}

#[test]
fn latency_grows_with_volume_and_partitioning_raises_throughput() {
    let sim = PerformanceSimulator::default();
    let small = sim
        .simulate(&shop(), WorkloadCategory::Oltp, &volumes(&[("orders", 1_000)]), &oltp_traits())
        .unwrap();
    let large = sim
        .simulate(
            &shop(),
            WorkloadCategory::Oltp,
            &volumes(&[("orders", 1_000_000_000)]),
            &oltp_traits(),
        )
        .unwrap();
    assert!(large.transactional_latency.low > small.transactional_latency.low);

    let partitioned = Optimizer::default()
        .optimize(&shop(), WorkloadCategory::Olap, &olap_traits())
        .unwrap()
        .schema;
    let p = sim
        .simulate(&partitioned, WorkloadCategory::Olap, &volumes(&[("orders", 1_000)]), &olap_traits())
        .unwrap();
    let u = sim
        .simulate(&shop(), WorkloadCategory::Olap, &volumes(&[("orders", 1_000)]), &olap_traits())
        .unwrap();
    assert!(p.analytical_throughput.high > u.analytical_throughput.high);
}

#[test]
fn hottest_table_without_index_falls_back_to_scan() {
    let logs = TableInput::new("logs", vec![ColumnInput::new("message", DataType::Text)]);
    let report = PerformanceSimulator::default()
        .simulate(&schema_of(vec![logs]), WorkloadCategory::Oltp, &BTreeMap::new(), &oltp_traits())
        .unwrap();
    assert_eq!(kinds_for(&report, "logs"), vec![BottleneckKind::FullScanFallback]);
}

#[test]
fn many_indexes_amplify_writes() {
    let mut input = shop_input();
    for cols in [
        &["customer_id"][..],
        &["placed_at"],
        &["status"],
        &["total"],
        &["status", "total"],
    ] {
        input.tables[0].indexes.push(IndexInput::on(cols));
    }
    let schema = Schema::from_input(&input).unwrap();
    let sim = PerformanceSimulator::default();
    let oltp = sim
        .simulate(&schema, WorkloadCategory::Oltp, &BTreeMap::new(), &oltp_traits())
        .unwrap();
    assert!(kinds_for(&oltp, "orders").contains(&BottleneckKind::WriteAmplification));

    let olap = sim
        .simulate(&schema, WorkloadCategory::Olap, &BTreeMap::new(), &olap_traits())
        .unwrap();
    assert!(!kinds_for(&olap, "orders").contains(&BottleneckKind::WriteAmplification));
}

#[test]
fn optimizer_advisories_become_annotations() {
    let optimized = Optimizer::default()
        .optimize(&shop(), WorkloadCategory::Htap, &htap_traits())
        .unwrap();
    let report = PerformanceSimulator::default()
        .simulate(&optimized.schema, WorkloadCategory::Htap, &BTreeMap::new(), &htap_traits())
        .unwrap();
    let tradeoffs = report
        .bottlenecks
        .iter()
        .filter(|b| b.kind == BottleneckKind::HybridTradeoff)
        .count();
    assert_eq!(tradeoffs, 2);
}

#[test]
fn constants_come_from_config() {
    let config = EstimatorConfig {
        bottleneck_threshold_rows: 100,
        ..EstimatorConfig::default()
    };
    let traits = orders_aggregate(oltp_traits());
    let report = PerformanceSimulator::new(config)
        .simulate(&shop(), WorkloadCategory::Oltp, &volumes(&[("orders", 1_000)]), &traits)
        .unwrap();
    assert_eq!(kinds_for(&report, "orders"), vec![BottleneckKind::MissingAccessPath]);
}

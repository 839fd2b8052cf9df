use schemasmith_core::Schema;
use schemasmith_core::sample::{validate_sample_value, validate_samples};
use serde_json::json;

use crate::fixtures::*;

#[test]
fn well_formed_samples_are_clean() {
    let report = validate_samples(
        &shop(),
        r#"{
            "customers": [{ "id": 1, "email": "a@example.com", "country": "PT" }],
            "orders": [
                { "id": 10, "customer_id": 1, "placed_at": "2024-02-01 10:00:00", "status": "new", "total": 12.5 },
                { "id": 11, "customer_id": 1, "placed_at": "2024-02-01T11:00:00", "status": null }
            ]
        }"#,
    )
    .unwrap();
    assert_eq!(report.checked_rows, 3);
    assert!(report.is_clean(), "{:?}", report.findings);
}

#[test]
fn each_bad_row_yields_a_finding() {
    let doc = json!({
        "orders": [
            { "id": "abc", "customer_id": 1, "placed_at": "2024-02-01 10:00:00" },
            { "id": 2, "customer_id": null, "placed_at": "2024-02-01 10:00:00" },
            { "id": 3, "customer_id": 1, "placed_at": "2024-02-01 10:00:00", "discount": 5 },
            { "id": 4, "customer_id": 1 },
            42,
            { "id": 6, "customer_id": 1, "placed_at": "2024-02-01 10:00:00", "status": "x".repeat(21) },
            { "id": 7, "customer_id": 1, "placed_at": "2024-02-01 10:00:00", "total": 1.234 }
        ]
    });
    let report = validate_sample_value(&shop(), &doc).unwrap();
    assert_eq!(report.checked_rows, 7);

    let found: Vec<(usize, Option<&str>)> = report
        .findings
        .iter()
        .map(|f| (f.row, f.column.as_deref()))
        .collect();
    assert_eq!(
        found,
        vec![
            (0, Some("id")),
            (1, Some("customer_id")),
            (2, Some("discount")),
            (3, Some("placed_at")),
            (4, None),
            (5, Some("status")),
            (6, Some("total")),
        ]
    );
    assert!(report.findings.iter().all(|f| f.table == "orders"));
    assert_eq!(report.findings[1].message, "'customer_id' cannot be NULL");
    assert_eq!(report.findings[2].message, "unknown column 'discount'");
    assert_eq!(
        report.findings[3].message,
        "missing value for NOT NULL column 'placed_at'"
    );
    assert_eq!(report.findings[4].message, "row is not a JSON object");
}

#[test]
fn defaulted_columns_may_be_omitted() {
    let mut input = shop_input();
    input.tables[0].columns[2].default = Some("now()".to_string());
    let schema = Schema::from_input(&input).unwrap();
    let doc = json!({ "orders": [{ "id": 1, "customer_id": 1 }] });
    assert!(validate_sample_value(&schema, &doc).unwrap().is_clean());
}

#[test]
fn badly_shaped_documents_are_errors() {
    let schema = shop();
    for doc in [
        json!([{ "id": 1 }]),
        json!({ "invoices": [] }),
        json!({ "orders": { "id": 1 } }),
    ] {
        let err = validate_sample_value(&schema, &doc).unwrap_err();
        assert_eq!(err.kind(), "validation", "{doc}");
    }

    let err = validate_samples(&schema, "{ not json").unwrap_err();
    assert!(err.to_string().contains("Malformed sample JSON"));
}

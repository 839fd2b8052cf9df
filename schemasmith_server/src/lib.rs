//! HTTP front end over the design pipeline.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use schemasmith_core::ddl::{DdlStatement, order_ddl_text, render_script};
use schemasmith_core::parser::parse_ddl;
use schemasmith_core::{DesignError, DesignInput, DesignOutput, DesignSession, SchemaInput};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

#[derive(Clone)]
pub struct AppState {
    session: Arc<DesignSession>,
}

impl AppState {
    pub fn new(session: DesignSession) -> Self {
        Self {
            session: Arc::new(session),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/design", post(design))
        .route("/v1/ddl/order", post(order_ddl))
        .route("/v1/ddl/parse", post(parse))
        .with_state(state)
}

/// Core errors rendered as `422 { kind, message }`.
pub struct ApiError(DesignError);

impl From<DesignError> for ApiError {
    fn from(err: DesignError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!(kind = self.0.kind(), "request rejected: {}", self.0);
        let body = Json(json!({ "kind": self.0.kind(), "message": self.0.to_string() }));
        (StatusCode::UNPROCESSABLE_ENTITY, body).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct DdlRequest {
    pub sql: String,
}

#[derive(Debug, Serialize)]
pub struct OrderedDdl {
    pub order: Vec<String>,
    pub statements: Vec<DdlStatement>,
    pub script: String,
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn design(
    State(state): State<AppState>,
    Json(input): Json<DesignInput>,
) -> Result<Json<DesignOutput>, ApiError> {
    Ok(Json(state.session.run(&input)?))
}

async fn order_ddl(Json(req): Json<DdlRequest>) -> Result<Json<OrderedDdl>, ApiError> {
    let statements = order_ddl_text(&req.sql)?;
    Ok(Json(OrderedDdl {
        order: statements.iter().map(|s| s.table.clone()).collect(),
        script: render_script(&statements),
        statements,
    }))
}

async fn parse(Json(req): Json<DdlRequest>) -> Result<Json<SchemaInput>, ApiError> {
    Ok(Json(parse_ddl(&req.sql)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    fn app() -> Router {
        router(AppState::new(DesignSession::default()))
    }

    async fn post_json(uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let req = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let res = app().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn orders_schema() -> serde_json::Value {
        json!({
            "tables": [
                {
                    "name": "orders",
                    "columns": [
                        { "name": "id", "type": "bigint", "primary_key": true },
                        { "name": "customer_id", "type": "bigint", "nullable": false },
                        { "name": "placed_at", "type": "timestamp" }
                    ],
                    "foreign_keys": [
                        { "columns": ["customer_id"], "ref_table": "customers", "ref_columns": ["id"] }
                    ]
                },
                {
                    "name": "customers",
                    "columns": [{ "name": "id", "type": "bigint", "primary_key": true }]
                }
            ]
        })
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn design_runs_full_pipeline() {
        let (status, body) = post_json(
            "/v1/design",
            json!({
                "schema": orders_schema(),
                "workload": {
                    "read_share": 0.3,
                    "query_mix": { "point_lookup": 0.8, "range_scan": 0.1, "aggregation": 0.1 },
                    "consistency": "strict"
                },
                "queries": ["select id, customer_id from orders"]
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["classification"]["category"], "OLTP");
        assert_eq!(body["creation_order"], json!(["customers", "orders"]));
        assert_eq!(body["result_sets"][0]["rows"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn cyclic_ddl_is_unprocessable() {
        let sql = "create table a (id int primary key, b_id int references b(id));\n\
                   create table b (id int primary key, a_id int references a(id));";
        let (status, body) = post_json("/v1/ddl/order", json!({ "sql": sql })).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["kind"], "cyclic_dependency");
    }

    #[tokio::test]
    async fn order_returns_dependency_order() {
        let sql = "create table orders (id int primary key, customer_id int references customers(id));\n\
                   create table customers (id int primary key);";
        let (status, body) = post_json("/v1/ddl/order", json!({ "sql": sql })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["order"], json!(["customers", "orders"]));
    }

    #[tokio::test]
    async fn parse_returns_schema_input() {
        let sql = "create table users (id int primary key, email varchar(120) unique not null);";
        let (status, body) = post_json("/v1/ddl/parse", json!({ "sql": sql })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tables"][0]["name"], "users");
        assert_eq!(body["tables"][0]["columns"][1]["type"], "varchar(120)");
    }
}

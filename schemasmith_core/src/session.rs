//! One design run: schema in, ordered DDL, estimates and example results out.

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{info, info_span, warn};
use uuid::Uuid;

use crate::config::CoreConfig;
use crate::ddl::{emit_ddl, render_script, DdlStatement};
use crate::dml::{DmlSimulator, QueryShape, SimulatedResultSet};
use crate::error::Result;
use crate::optimizer::{Optimized, Optimizer, Rationale};
use crate::order::creation_order;
use crate::parser::{parse_ddl, parse_select};
use crate::perf::{PerformanceReport, PerformanceSimulator};
use crate::sample::{validate_sample_value, SampleReport};
use crate::schema::{Schema, SchemaInput};
use crate::workload::{Classification, Classifier, WorkloadTraits};

/// A schema given either as structured JSON or as `CREATE TABLE` text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaSource {
    Ddl(String),
    Definition(SchemaInput),
}

/// A query given either as SQL text or as an explicit shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryInput {
    Sql(String),
    Shape(QueryShape),
}

impl QueryInput {
    pub fn to_shape(&self) -> Result<Cow<'_, QueryShape>> {
        match self {
            QueryInput::Sql(sql) => Ok(Cow::Owned(parse_select(sql)?)),
            QueryInput::Shape(shape) => Ok(Cow::Borrowed(shape)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignInput {
    pub schema: SchemaSource,
    pub workload: WorkloadTraits,
    #[serde(default)]
    pub row_volumes: BTreeMap<String, u64>,
    #[serde(default)]
    pub queries: Vec<QueryInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub samples: Option<JsonValue>,
}

impl DesignInput {
    pub fn new(schema: SchemaInput, workload: WorkloadTraits) -> Self {
        Self {
            schema: SchemaSource::Definition(schema),
            workload,
            row_volumes: BTreeMap::new(),
            queries: Vec::new(),
            samples: None,
        }
    }

    pub fn with_volume(mut self, table: &str, rows: u64) -> Self {
        self.row_volumes.insert(table.to_string(), rows);
        self
    }

    pub fn with_query(mut self, query: QueryInput) -> Self {
        self.queries.push(query);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DesignOutput {
    pub session_id: Uuid,
    pub classification: Classification,
    pub rationale: Vec<Rationale>,
    pub schema: Schema,
    pub creation_order: Vec<String>,
    pub ddl: Vec<DdlStatement>,
    pub script: String,
    pub performance: PerformanceReport,
    pub result_sets: Vec<SimulatedResultSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_report: Option<SampleReport>,
}

#[derive(Debug, Clone)]
pub struct DesignSession {
    classifier: Classifier,
    optimizer: Optimizer,
    estimator: PerformanceSimulator,
    simulator: DmlSimulator,
}

impl DesignSession {
    pub fn new(config: CoreConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            classifier: Classifier::new(config.classifier),
            optimizer: Optimizer::new(config.optimizer),
            estimator: PerformanceSimulator::new(config.estimator),
            simulator: DmlSimulator::new(config.simulator),
        })
    }

    /// Runs every stage. The first failing stage ends the run; nothing partial is returned.
    pub fn run(&self, input: &DesignInput) -> Result<DesignOutput> {
        let session_id = Uuid::new_v4();
        let span = info_span!("design_session", %session_id);
        let _guard = span.enter();
        self.run_stages(session_id, input)
            .inspect_err(|e| warn!(kind = e.kind(), "design session failed: {e}"))
    }

    fn run_stages(&self, session_id: Uuid, input: &DesignInput) -> Result<DesignOutput> {
        let schema_input = match &input.schema {
            SchemaSource::Definition(def) => Cow::Borrowed(def),
            SchemaSource::Ddl(sql) => Cow::Owned(parse_ddl(sql)?),
        };
        let declared = Schema::from_input(&schema_input)?;
        input.workload.validate(&declared)?;

        let classification = self.classifier.classify(&input.workload)?;
        let category = classification.category;
        let Optimized { schema, rationale } =
            self.optimizer.optimize(&declared, category, &input.workload)?;

        let creation_order = creation_order(&schema)?;
        let ddl = emit_ddl(&schema)?;
        let script = render_script(&ddl);
        info!(tables = creation_order.len(), "DDL ordered");

        let performance =
            self.estimator
                .simulate(&schema, category, &input.row_volumes, &input.workload)?;

        let result_sets = input
            .queries
            .iter()
            .map(|q| self.simulator.simulate(&schema, &*q.to_shape()?))
            .collect::<Result<Vec<_>>>()?;

        let sample_report = input
            .samples
            .as_ref()
            .map(|doc| validate_sample_value(&schema, doc))
            .transpose()?;

        info!(
            %category,
            rationale = rationale.len(),
            bottlenecks = performance.bottlenecks.len(),
            queries = result_sets.len(),
            "design session complete"
        );
        Ok(DesignOutput {
            session_id,
            classification,
            rationale,
            schema,
            creation_order,
            ddl,
            script,
            performance,
            result_sets,
            sample_report,
        })
    }
}

impl Default for DesignSession {
    fn default() -> Self {
        Self {
            classifier: Classifier::default(),
            optimizer: Optimizer::default(),
            estimator: PerformanceSimulator::default(),
            simulator: DmlSimulator::default(),
        }
    }
}

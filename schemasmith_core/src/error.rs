use thiserror::Error;

pub type Result<T> = std::result::Result<T, DesignError>;

/// Terminal failure of a design session.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DesignError {
    /// Malformed or referentially inconsistent schema input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Foreign keys form a cycle that no creation order can satisfy.
    #[error("cyclic foreign-key dependency between {}: {}", .tables.join(", "), format_edges(.edges))]
    CyclicDependency {
        tables: Vec<String>,
        edges: Vec<(String, String)>,
    },

    /// Workload traits the classifier cannot place in a category.
    #[error("unsupported workload traits: {0}")]
    UnsupportedWorkloadTrait(String),

    /// DDL or query text that could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    #[error("config error: {0}")]
    Config(String),
}

impl DesignError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedWorkloadTrait(msg.into())
    }

    /// Stable machine-readable tag for the error variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::CyclicDependency { .. } => "cyclic_dependency",
            Self::UnsupportedWorkloadTrait(_) => "unsupported_workload_trait",
            Self::Parse(_) => "parse",
            Self::Config(_) => "config",
        }
    }
}

fn format_edges(edges: &[(String, String)]) -> String {
    edges
        .iter()
        .map(|(from, to)| format!("{from} -> {to}"))
        .collect::<Vec<_>>()
        .join(", ")
}

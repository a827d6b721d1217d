use crate::Planner;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown planner: {0}")]
    UnknownPlanner(String),

    #[error("no rule set configured for the {0} planner")]
    MissingRuleSet(Planner),

    #[error("invalid rules document: {0}")]
    RulesDocument(#[source] serde_json::Error),

    #[error("unknown field '{field}' for the {planner} planner")]
    UnknownField { planner: Planner, field: String },

    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("{0} should be numeric")]
    NotNumeric(String),

    #[error("name '{0}' already exists")]
    DuplicateName(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

use namegov_core::Planner;

pub type Result<T, E = SuggestError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum SuggestError {
    #[error("AI provider is not configured")]
    NotConfigured,

    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error("build LLM: {0}")]
    Build(String),

    #[error("chat: {0}")]
    Chat(String),

    #[error("LLM returned empty text")]
    EmptyResponse,

    #[error("no JSON object found in model output")]
    NoJson,

    #[error("malformed JSON in model output: {0}")]
    MalformedJson(#[source] serde_json::Error),

    #[error("model returned no {0} name suggestions")]
    NoSuggestions(Planner),

    #[error(transparent)]
    Core(#[from] namegov_core::Error),
}

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum HookflowError {
    #[error("Parse error at offset {offset}: {message}")]
    ParseError { offset: usize, message: String },

    #[error("Evaluation error: {message}")]
    EvaluationError { message: String },

    #[error("Type error: expected {expected}, got {actual}")]
    TypeError { expected: String, actual: String },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("I/O error: {path}: {message}")]
    IoError { path: String, message: String },

    #[error("JSON error: {message}")]
    JsonError { message: String },

    #[error("Config error: {message}")]
    ConfigError { message: String },

    #[error("Flow error: {message}")]
    FlowError { message: String },
}

impl HookflowError {
    pub fn evaluation(message: impl Into<String>) -> Self {
        HookflowError::EvaluationError {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for HookflowError {
    fn from(e: serde_json::Error) -> Self {
        HookflowError::JsonError {
            message: e.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HookflowError>;

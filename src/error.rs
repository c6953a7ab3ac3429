use thiserror::Error;

/// Errors raised while building or loading a `FormConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid form yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("form has no steps")]
    NoSteps,

    #[error("field '{0}' is declared more than once")]
    DuplicateField(String),

    #[error("field '{field}' references unknown rule '{rule}'")]
    UnknownRule { field: String, rule: String },

    #[error("field '{field}' has unknown type '{kind}'")]
    UnknownFieldType { field: String, kind: String },

    #[error("field '{0}' needs at least one option")]
    MissingOptions(String),

    #[error("field '{field}' has invalid accept pattern '{pattern}': {source}")]
    InvalidAccept {
        field: String,
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("columns must be at least 1")]
    InvalidColumns,
}

/// Errors from driving a `FormSession` outside of its contract.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("field '{field}' does not belong to step {step}")]
    FieldNotInStep { field: String, step: usize },

    #[error("step {0} does not exist")]
    UnknownStep(usize),

    #[error("expected step {expected}, session is on step {actual}")]
    StepMismatch { expected: usize, actual: usize },

    #[error("submit is only available on the last step")]
    NotOnLastStep,

    #[error("session has already been submitted")]
    Closed,
}

/// Failure reported by a validation rule that could not produce a verdict.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuleError {
    /// The rule's collaborator could not be reached. The value is treated as
    /// unverified, not invalid.
    #[error("could not validate: {0}")]
    Unavailable(String),

    /// The rule itself failed.
    #[error("rule failed: {0}")]
    Failed(String),
}

/// Failure reported by the external submit collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("submit rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),
}

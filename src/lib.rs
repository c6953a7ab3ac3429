pub mod config;
pub mod core;
pub mod error;
pub mod state;
pub mod submit;
pub mod task;
pub mod validation;
pub mod widgets;

pub use config::{EngineSettings, FieldConfig, FieldKind, FormConfig, SelectOption, StepConfig};
pub use crate::core::FieldName;
pub use crate::core::form_data::FormData;
pub use crate::core::value::{FileMeta, Value};
pub use error::{ConfigError, RuleError, SessionError, SubmitError};
pub use state::flow::{StepRunner, StepStatus};
pub use state::session::{AdvanceOutcome, FormSession, RecordStatus, SessionState, SubmitOutcome};
pub use state::validation::{StepIssues, ValidationState};
pub use submit::{Draft, DraftSink, SubmitClient, SubmitPayload, SubmitReceipt};
pub use task::ValidationExecutor;
pub use validation::{FieldValidator, Rule, RuleContext, RuleRegistry, ValidationResult};
pub use widgets::{FieldInput, FieldRenderer};

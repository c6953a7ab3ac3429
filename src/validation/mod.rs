pub mod rules;
pub mod sequence;
pub mod validator;

use crate::core::FieldName;
use crate::core::form_data::FormData;
use crate::core::value::Value;
use crate::error::RuleError;
use futures::FutureExt;
use futures::future::{self, BoxFuture};
use std::future::Future;
use std::sync::Arc;

pub use rules::RuleRegistry;
pub use sequence::FieldSequencer;
pub use validator::{
    FieldValidator, ValidationJob, ValidationOutcome, ValidationTrigger, ValidationVerdict,
};

/// Outcome of one validation run. Always replaces the field's previous result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub message: String,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            message: String::new(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            message: message.into(),
        }
    }
}

/// Everything a rule sees: the candidate value and the whole form as it
/// would look with that value applied.
#[derive(Debug, Clone)]
pub struct RuleContext {
    pub field: FieldName,
    pub label: String,
    pub value: Value,
    pub form: FormData,
}

impl RuleContext {
    pub fn other(&self, name: &str) -> &Value {
        self.form.value(name)
    }
}

pub type RuleFuture = BoxFuture<'static, Result<ValidationResult, RuleError>>;

/// A named or ad hoc validation rule. May resolve immediately or after a
/// round trip to some external service.
pub trait Rule: Send + Sync {
    fn check(&self, ctx: RuleContext) -> RuleFuture;
}

pub struct FnRule<F>(F);

impl<F> Rule for FnRule<F>
where
    F: Fn(&RuleContext) -> ValidationResult + Send + Sync,
{
    fn check(&self, ctx: RuleContext) -> RuleFuture {
        future::ready(Ok((self.0)(&ctx))).boxed()
    }
}

pub struct AsyncFnRule<F>(F);

impl<F, Fut> Rule for AsyncFnRule<F>
where
    F: Fn(RuleContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ValidationResult, RuleError>> + Send + 'static,
{
    fn check(&self, ctx: RuleContext) -> RuleFuture {
        (self.0)(ctx).boxed()
    }
}

/// Wrap a synchronous closure as a rule.
pub fn rule_fn<F>(f: F) -> Arc<dyn Rule>
where
    F: Fn(&RuleContext) -> ValidationResult + Send + Sync + 'static,
{
    Arc::new(FnRule(f))
}

/// Wrap an async closure as a rule.
pub fn async_rule<F, Fut>(f: F) -> Arc<dyn Rule>
where
    F: Fn(RuleContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ValidationResult, RuleError>> + Send + 'static,
{
    Arc::new(AsyncFnRule(f))
}

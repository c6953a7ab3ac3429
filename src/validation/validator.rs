use crate::config::{FieldConfig, FormConfig};
use crate::core::FieldName;
use crate::core::form_data::FormData;
use crate::core::value::Value;
use crate::error::{RuleError, SessionError};
use crate::validation::{Rule, RuleContext, ValidationResult};
use futures::FutureExt;
use futures::future::BoxFuture;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

pub const VALIDATION_FAILED: &str = "Validation failed";

/// What caused a validation run. Anything but `Change` reveals the error inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationTrigger {
    Change,
    Blur,
    Advance,
    Submit,
}

impl ValidationTrigger {
    pub fn reveals(self) -> bool {
        !matches!(self, Self::Change)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationVerdict {
    Checked(ValidationResult),
    /// The rule's collaborator was unreachable; the value is neither valid nor invalid.
    Unverified { reason: String },
}

impl ValidationVerdict {
    pub fn result(&self) -> Option<&ValidationResult> {
        match self {
            Self::Checked(result) => Some(result),
            Self::Unverified { .. } => None,
        }
    }

    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::Checked(result) if !result.is_valid)
    }
}

/// A resolved validation, tagged with the sequence it was requested for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub field: FieldName,
    pub seq: u64,
    pub trigger: ValidationTrigger,
    pub verdict: ValidationVerdict,
}

/// A pending validation. Owns everything it needs, so it can run while the
/// session keeps accepting input for other fields.
pub struct ValidationJob {
    field: FieldName,
    seq: u64,
    trigger: ValidationTrigger,
    future: BoxFuture<'static, ValidationVerdict>,
}

impl ValidationJob {
    pub fn field(&self) -> &FieldName {
        &self.field
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn trigger(&self) -> ValidationTrigger {
        self.trigger
    }

    pub async fn run(self) -> ValidationOutcome {
        let verdict = self.future.await;
        ValidationOutcome {
            field: self.field,
            seq: self.seq,
            trigger: self.trigger,
            verdict,
        }
    }
}

impl fmt::Debug for ValidationJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationJob")
            .field("field", &self.field)
            .field("seq", &self.seq)
            .field("trigger", &self.trigger)
            .finish_non_exhaustive()
    }
}

/// Resolves which rule applies to a field and runs it under the configured
/// timeout.
#[derive(Clone)]
pub struct FieldValidator {
    config: Arc<FormConfig>,
}

impl FieldValidator {
    pub fn new(config: Arc<FormConfig>) -> Self {
        Self { config }
    }

    /// Validate `value` for `field_name` against `snapshot` with the value
    /// already applied.
    pub async fn validate(
        &self,
        value: Value,
        field_name: &str,
        snapshot: &FormData,
    ) -> Result<ValidationVerdict, SessionError> {
        let field = self
            .config
            .field(field_name)
            .ok_or_else(|| SessionError::UnknownField(field_name.to_string()))?;
        let mut form = snapshot.clone();
        form.set(field.name.clone(), value);
        Ok(self.job(field, &form, 0, ValidationTrigger::Submit).run().await.verdict)
    }

    /// Build a job for the field's current value in `data`.
    pub fn job(
        &self,
        field: &FieldConfig,
        data: &FormData,
        seq: u64,
        trigger: ValidationTrigger,
    ) -> ValidationJob {
        let rule = field
            .validation_rule
            .as_deref()
            .and_then(|name| self.config.rules().get(name));
        let ctx = RuleContext {
            field: field.name.clone(),
            label: field.display_label().to_string(),
            value: data.value(field.name.as_str()).clone(),
            form: data.clone(),
        };
        let plan = Resolution {
            rule,
            required: field.required,
            numeric: field.kind.is_numeric(),
            timeout: self.config.settings().validator_timeout,
        };

        ValidationJob {
            field: field.name.clone(),
            seq,
            trigger,
            future: plan.resolve(ctx).boxed(),
        }
    }
}

struct Resolution {
    rule: Option<Arc<dyn Rule>>,
    required: bool,
    numeric: bool,
    timeout: Duration,
}

impl Resolution {
    async fn resolve(self, ctx: RuleContext) -> ValidationVerdict {
        let empty = ctx.value.is_empty();
        let required_failure = || {
            ValidationVerdict::Checked(ValidationResult::invalid(format!(
                "{} is required",
                ctx.label
            )))
        };

        // Number fields re-check the parse even when a named rule is set.
        if self.numeric && !empty && ctx.value.as_number().is_none() {
            return ValidationVerdict::Checked(ValidationResult::invalid(format!(
                "{} must be a number",
                ctx.label
            )));
        }

        if let Some(rule) = self.rule {
            let verdict = run_rule(rule, ctx.clone(), self.timeout).await;
            if self.required && empty && !verdict.is_blocking() {
                return required_failure();
            }
            return verdict;
        }

        if self.required && empty {
            return required_failure();
        }

        ValidationVerdict::Checked(ValidationResult::valid())
    }
}

async fn run_rule(rule: Arc<dyn Rule>, ctx: RuleContext, timeout: Duration) -> ValidationVerdict {
    let field = ctx.field.clone();

    let future = match std::panic::catch_unwind(AssertUnwindSafe(|| rule.check(ctx))) {
        Ok(future) => future,
        Err(_) => {
            warn!(field = %field, "validation rule panicked");
            return failed();
        }
    };

    match tokio::time::timeout(timeout, AssertUnwindSafe(future).catch_unwind()).await {
        Ok(Ok(Ok(result))) => ValidationVerdict::Checked(result),
        Ok(Ok(Err(RuleError::Unavailable(reason)))) => {
            warn!(field = %field, %reason, "validation rule unavailable");
            ValidationVerdict::Unverified { reason }
        }
        Ok(Ok(Err(RuleError::Failed(reason)))) => {
            warn!(field = %field, %reason, "validation rule failed");
            failed()
        }
        Ok(Err(_)) => {
            warn!(field = %field, "validation rule panicked");
            failed()
        }
        Err(_) => {
            warn!(
                field = %field,
                timeout_ms = timeout.as_millis() as u64,
                "validation rule timed out"
            );
            failed()
        }
    }
}

fn failed() -> ValidationVerdict {
    ValidationVerdict::Checked(ValidationResult::invalid(VALIDATION_FAILED))
}

#[cfg(test)]
mod tests {
    use super::{FieldValidator, VALIDATION_FAILED, ValidationVerdict};
    use crate::config::{EngineSettings, FieldConfig, FormConfig, StepConfig};
    use crate::core::form_data::FormData;
    use crate::core::value::Value;
    use crate::error::RuleError;
    use crate::validation::{ValidationResult, async_rule, rule_fn};
    use std::sync::Arc;
    use std::time::Duration;

    fn validator(fields: Vec<FieldConfig>) -> FieldValidator {
        let config = FormConfig::builder("T")
            .rule("always_ok", rule_fn(|_| ValidationResult::valid()))
            .rule("no_dashes", rule_fn(|ctx| {
                if ctx.value.display().contains('-') {
                    ValidationResult::invalid("no dashes")
                } else {
                    ValidationResult::valid()
                }
            }))
            .rule("offline", async_rule(|_ctx| async {
                Err::<ValidationResult, _>(RuleError::Unavailable("service down".to_string()))
            }))
            .rule("broken", async_rule(|_ctx| async {
                Err::<ValidationResult, _>(RuleError::Failed("boom".to_string()))
            }))
            .rule("hangs", async_rule(|_ctx| async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok::<_, RuleError>(ValidationResult::valid())
            }))
            .rule("panics", rule_fn(|_| panic!("rule bug")))
            .settings(EngineSettings::default().with_validator_timeout(Duration::from_millis(50)))
            .step(StepConfig::new("A", fields))
            .build()
            .expect("config");
        FieldValidator::new(Arc::new(config))
    }

    async fn check(v: &FieldValidator, name: &str, value: Value) -> ValidationVerdict {
        v.validate(value, name, &FormData::new()).await.expect("known field")
    }

    #[tokio::test]
    async fn required_message_names_the_label() {
        let v = validator(vec![FieldConfig::text("title", "Job title").required()]);
        let ValidationVerdict::Checked(result) = check(&v, "title", Value::text("  ")).await else {
            panic!("expected checked verdict");
        };
        assert!(!result.is_valid);
        assert!(result.message.contains("Job title"));
        assert!(check(&v, "title", Value::text("Engineer")).await.result().is_some_and(|r| r.is_valid));
    }

    #[tokio::test]
    async fn named_rule_runs_before_required() {
        let v = validator(vec![FieldConfig::text("code", "Code").required().rule("no_dashes")]);
        let verdict = check(&v, "code", Value::text("a-b")).await;
        assert_eq!(verdict, ValidationVerdict::Checked(ValidationResult::invalid("no dashes")));

        let v = validator(vec![FieldConfig::text("code", "Code").required().rule("always_ok")]);
        let verdict = check(&v, "code", Value::text("")).await;
        assert!(verdict.is_blocking(), "passing rule must not excuse an empty required field");
    }

    #[tokio::test]
    async fn optional_fields_without_rules_always_pass() {
        let v = validator(vec![FieldConfig::text("notes", "Notes")]);
        assert!(!check(&v, "notes", Value::None).await.is_blocking());
    }

    #[tokio::test]
    async fn numeric_fields_recheck_parseability() {
        let v = validator(vec![FieldConfig::number("years", "Years").required()]);
        assert!(check(&v, "years", Value::text("12a")).await.is_blocking());
        assert!(!check(&v, "years", Value::Number(0.0)).await.is_blocking());

        let v = validator(vec![FieldConfig::number("years", "Years").rule("always_ok")]);
        let verdict = check(&v, "years", Value::text("ten")).await;
        assert_eq!(
            verdict,
            ValidationVerdict::Checked(ValidationResult::invalid("Years must be a number"))
        );
    }

    #[tokio::test]
    async fn unavailable_rules_are_unverified() {
        let v = validator(vec![FieldConfig::text("id", "Id").rule("offline")]);
        let verdict = check(&v, "id", Value::text("x")).await;
        assert!(matches!(verdict, ValidationVerdict::Unverified { .. }));
        assert!(!verdict.is_blocking());
    }

    #[tokio::test]
    async fn failing_and_panicking_rules_degrade_to_generic_message() {
        let v = validator(vec![
            FieldConfig::text("a", "A").rule("broken"),
            FieldConfig::text("b", "B").rule("panics"),
        ]);
        for name in ["a", "b"] {
            let verdict = check(&v, name, Value::text("x")).await;
            assert_eq!(verdict, ValidationVerdict::Checked(ValidationResult::invalid(VALIDATION_FAILED)));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn hung_rules_time_out() {
        let v = validator(vec![FieldConfig::text("slow", "Slow").rule("hangs")]);
        let verdict = check(&v, "slow", Value::text("x")).await;
        assert_eq!(verdict, ValidationVerdict::Checked(ValidationResult::invalid(VALIDATION_FAILED)));
    }

    #[tokio::test]
    async fn unknown_fields_are_rejected() {
        let v = validator(vec![FieldConfig::text("a", "A")]);
        assert!(v.validate(Value::None, "zzz", &FormData::new()).await.is_err());
    }
}

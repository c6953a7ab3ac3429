use crate::config::{FieldConfig, FormConfig, StepConfig};
use crate::core::FieldName;
use crate::core::form_data::FormData;
use crate::core::value::Value;
use crate::error::{SessionError, SubmitError};
use crate::state::flow::{StepRunner, StepStatus};
use crate::state::validation::{ErrorVisibility, StepIssues, ValidationState};
use crate::submit::{Draft, DraftSink, SubmitClient, SubmitPayload, SubmitReceipt};
use crate::validation::{
    FieldSequencer, FieldValidator, ValidationJob, ValidationOutcome, ValidationResult,
    ValidationTrigger,
};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Editing(usize),
    Validating(usize),
    Submitting,
    Submitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    Applied,
    /// The field changed after the validation was requested; result dropped.
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvanceOutcome {
    pub success: bool,
    /// Missing or invalid fields in declaration order.
    pub blocking_fields: Vec<FieldName>,
    pub issues: StepIssues,
    pub state: SessionState,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Submitted(SubmitReceipt),
    Blocked {
        blocking_fields: Vec<FieldName>,
        issues: Vec<(usize, StepIssues)>,
    },
    /// The collaborator failed; the session is editable again with its data intact.
    Failed(SubmitError),
}

/// One form session: the single owner of the form data and the error map.
/// Every mutation goes through a named method.
pub struct FormSession {
    runner: StepRunner,
    validation: ValidationState,
    sequencer: FieldSequencer,
    validator: FieldValidator,
    state: SessionState,
    last_submit_error: Option<SubmitError>,
}

impl FormSession {
    pub fn new(config: Arc<FormConfig>) -> Self {
        Self {
            validator: FieldValidator::new(config.clone()),
            runner: StepRunner::new(config),
            validation: ValidationState::default(),
            sequencer: FieldSequencer::new(),
            state: SessionState::Editing(0),
            last_submit_error: None,
        }
    }

    /// Resume from a saved draft. Fields the config no longer knows are dropped.
    pub fn from_draft(config: Arc<FormConfig>, draft: &Draft) -> Self {
        let mut session = Self::new(config);
        if draft.form != session.config().title() {
            warn!(
                draft = %draft.form,
                form = session.config().title(),
                "restoring a draft saved from another form"
            );
        }
        let mut restored = session.runner.data().clone();
        for (name, value) in draft.data.iter() {
            if session.config().field(name.as_str()).is_none() {
                warn!(field = %name, "dropping unknown draft field");
                continue;
            }
            restored.set(name.clone(), value.clone());
            session.sequencer.bump(name);
        }
        session.runner.replace_data(restored);

        let target = draft.step.min(session.config().last_step_index());
        while session.runner.current_index() < target && session.runner.advance() {}
        session.state = SessionState::Editing(session.runner.current_index());
        debug!(step = session.runner.current_index(), "session restored from draft");
        session
    }

    pub fn config(&self) -> &Arc<FormConfig> {
        self.runner.config()
    }

    pub fn data(&self) -> &FormData {
        self.runner.data()
    }

    pub fn value(&self, name: &str) -> &Value {
        self.runner.data().value(name)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn current_step_index(&self) -> usize {
        self.runner.current_index()
    }

    pub fn current_step(&self) -> &StepConfig {
        self.runner.current_step()
    }

    pub fn status_at(&self, step_index: usize) -> StepStatus {
        self.runner.status_at(step_index)
    }

    pub fn progress(&self) -> f32 {
        self.runner.progress()
    }

    pub fn validation(&self) -> &ValidationState {
        &self.validation
    }

    pub fn visible_error(&self, name: &str) -> Option<&str> {
        self.validation.visible_error(name)
    }

    pub fn validator(&self) -> &FieldValidator {
        &self.validator
    }

    pub fn last_submit_error(&self) -> Option<&SubmitError> {
        self.last_submit_error.as_ref()
    }

    pub fn field(&self, name: &str) -> Result<&FieldConfig, SessionError> {
        self.config()
            .field(name)
            .ok_or_else(|| SessionError::UnknownField(name.to_string()))
    }

    pub fn into_data(self) -> FormData {
        self.runner.data().clone()
    }

    /// Apply a value and return the validations it triggers: the field itself
    /// when it has a rule or a visible error, plus every rule sibling that
    /// holds a value or an error.
    pub fn set_field_value(
        &mut self,
        name: &str,
        value: Value,
    ) -> Result<Vec<ValidationJob>, SessionError> {
        self.ensure_editable()?;
        self.runner.set_value(name, value)?;

        let config = self.config().clone();
        let field = config
            .field(name)
            .ok_or_else(|| SessionError::UnknownField(name.to_string()))?;
        debug!(field = %field.name, "field value updated");

        // Issuing a job takes the next sequence; without one the change
        // still has to invalidate results in flight.
        let mut jobs = Vec::new();
        if field.has_rule() || self.validation.visible_error(name).is_some() {
            jobs.push(self.job_for(field, ValidationTrigger::Change));
        } else {
            self.sequencer.bump(&field.name);
            self.validation.clear_error(name);
        }

        for sibling in config.rule_siblings(name) {
            let sibling_name = sibling.name.as_str();
            if self.validation.has_error(sibling_name)
                || !self.data().is_empty_value(sibling_name)
            {
                jobs.push(self.job_for(sibling, ValidationTrigger::Change));
            }
        }
        Ok(jobs)
    }

    /// First-touch validation. Always produces a job and reveals any hidden error.
    pub fn blur(&mut self, name: &str) -> Result<ValidationJob, SessionError> {
        if self.state == SessionState::Submitted {
            return Err(SessionError::Closed);
        }
        let config = self.config().clone();
        let field = config
            .field(name)
            .ok_or_else(|| SessionError::UnknownField(name.to_string()))?;
        self.validation.mark_touched(&field.name);
        self.validation.reveal(name);
        Ok(self.job_for(field, ValidationTrigger::Blur))
    }

    /// Apply a resolved validation if it is the latest one requested for its field.
    pub fn record_validation(&mut self, outcome: ValidationOutcome) -> RecordStatus {
        if !self
            .sequencer
            .is_current(outcome.field.as_str(), outcome.seq)
        {
            debug!(
                field = %outcome.field,
                seq = outcome.seq,
                current = self.sequencer.current(outcome.field.as_str()),
                "discarding stale validation result"
            );
            return RecordStatus::Stale;
        }
        self.validation
            .record_verdict(&outcome.field, &outcome.verdict, outcome.trigger);
        RecordStatus::Applied
    }

    /// Record a result produced outside the engine, e.g. by a custom step
    /// component. Shown inline; last write wins.
    pub fn record_result(
        &mut self,
        name: &str,
        result: ValidationResult,
    ) -> Result<(), SessionError> {
        let field = self.field(name)?.name.clone();
        self.validation
            .record_result(&field, &result, ErrorVisibility::Inline);
        Ok(())
    }

    pub fn register_step_fields(
        &mut self,
        step_index: usize,
        names: &[&str],
    ) -> Result<(), SessionError> {
        self.runner.register_step_fields(step_index, names)
    }

    pub fn step_fields(&self, step_index: usize) -> Vec<FieldName> {
        self.runner.step_fields(step_index)
    }

    pub fn issues_for(&self, step_index: usize) -> Result<StepIssues, SessionError> {
        let step = self
            .config()
            .step(step_index)
            .ok_or(SessionError::UnknownStep(step_index))?;
        Ok(self.validation.issues_for(step, self.data()))
    }

    pub fn is_step_valid(&self, step_index: usize) -> bool {
        self.config()
            .step(step_index)
            .is_some_and(|step| self.validation.is_step_valid(step, self.data()))
    }

    pub fn is_form_valid(&self) -> bool {
        self.validation.is_form_valid(self.config(), self.data())
    }

    pub fn blocking_fields(&self, step_index: usize) -> Vec<FieldName> {
        self.config()
            .step(step_index)
            .map(|step| {
                self.validation
                    .field_issues(step, self.data())
                    .into_iter()
                    .map(|issue| issue.field)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Jobs re-validating every field of a step against current values.
    pub fn step_jobs(
        &mut self,
        step_index: usize,
        trigger: ValidationTrigger,
    ) -> Vec<ValidationJob> {
        let config = self.config().clone();
        let Some(step) = config.step(step_index) else {
            return Vec::new();
        };
        step.fields
            .iter()
            .map(|field| self.job_for(field, trigger))
            .collect()
    }

    pub async fn validate_step(&mut self, step_index: usize, trigger: ValidationTrigger) -> bool {
        let jobs = self.step_jobs(step_index, trigger);
        self.run_jobs(jobs).await;
        self.is_step_valid(step_index)
    }

    /// Re-validates every field of every validated step, visited or not.
    pub async fn validate_form(&mut self) -> bool {
        let config = self.config().clone();
        let mut jobs = Vec::new();
        for (idx, step) in config.steps().iter().enumerate() {
            if !step.skip_validation {
                jobs.extend(self.step_jobs(idx, ValidationTrigger::Submit));
            }
        }
        self.run_jobs(jobs).await;
        self.is_form_valid()
    }

    /// Validate the current step and move on when it passes. On the last
    /// step a success moves the session to `Submitting`, where it waits for
    /// `submit`. Editing a value drops it back to `Editing`.
    pub async fn advance(&mut self, step_index: usize) -> Result<AdvanceOutcome, SessionError> {
        let current = self.active_index()?;
        if step_index != current {
            return Err(SessionError::StepMismatch {
                expected: step_index,
                actual: current,
            });
        }

        let skip = self
            .config()
            .step(current)
            .is_some_and(|step| step.skip_validation);

        let valid = if skip {
            true
        } else {
            self.state = SessionState::Validating(current);
            self.validate_step(current, ValidationTrigger::Advance).await
        };

        if !valid {
            self.state = SessionState::Editing(current);
            let outcome = AdvanceOutcome {
                success: false,
                blocking_fields: self.blocking_fields(current),
                issues: self.issues_for(current)?,
                state: self.state,
            };
            debug!(step = current, blocking = outcome.blocking_fields.len(), "step blocked");
            return Ok(outcome);
        }

        self.state = if self.runner.advance() {
            info!(from = current, to = self.runner.current_index(), "step advanced");
            SessionState::Editing(self.runner.current_index())
        } else {
            info!(step = current, "form ready to submit");
            SessionState::Submitting
        };

        Ok(AdvanceOutcome {
            success: true,
            blocking_fields: Vec::new(),
            issues: StepIssues::default(),
            state: self.state,
        })
    }

    /// Step back without validating the step being left.
    pub fn go_back(&mut self) -> bool {
        if self.state == SessionState::Submitted {
            return false;
        }
        if self.runner.go_back() {
            self.state = SessionState::Editing(self.runner.current_index());
            debug!(step = self.runner.current_index(), "step back");
            return true;
        }
        false
    }

    pub fn draft(&self) -> Draft {
        Draft {
            form: self.config().title().to_string(),
            step: self.runner.current_index(),
            data: self.data().clone(),
        }
    }

    /// Hands the unvalidated data to `sink` right away.
    pub fn save_draft(&self, sink: &dyn DraftSink) {
        debug!(step = self.runner.current_index(), "saving draft");
        sink.save_draft(&self.draft());
    }

    /// Re-validate the whole form and hand it to `client`. A failed submit
    /// keeps every entered value so the user can retry.
    pub async fn submit(
        &mut self,
        client: &dyn SubmitClient,
    ) -> Result<SubmitOutcome, SessionError> {
        let last = self.config().last_step_index();
        match self.state {
            SessionState::Submitted => return Err(SessionError::Closed),
            SessionState::Submitting => {}
            SessionState::Editing(idx) | SessionState::Validating(idx) if idx == last => {}
            SessionState::Editing(_) | SessionState::Validating(_) => {
                return Err(SessionError::NotOnLastStep);
            }
        }

        self.state = SessionState::Validating(last);
        if !self.validate_form().await {
            self.state = SessionState::Editing(last);
            let issues = self.validation.form_issues(self.config(), self.data());
            let blocking_fields = (0..self.config().step_count())
                .flat_map(|idx| self.blocking_fields(idx))
                .collect();
            debug!(steps = issues.len(), "submit blocked");
            return Ok(SubmitOutcome::Blocked {
                blocking_fields,
                issues,
            });
        }

        self.state = SessionState::Submitting;
        let payload = SubmitPayload::new(self.config().title(), self.data());
        info!(form = %payload.form, fields = payload.fields.len(), "submitting form");

        match client.submit(payload).await {
            Ok(receipt) => {
                self.runner.complete_current();
                self.state = SessionState::Submitted;
                self.last_submit_error = None;
                info!(id = receipt.id.as_deref().unwrap_or(""), "form submitted");
                Ok(SubmitOutcome::Submitted(receipt))
            }
            Err(err) => {
                warn!(error = %err, "submit failed");
                self.state = SessionState::Editing(last);
                self.last_submit_error = Some(err.clone());
                Ok(SubmitOutcome::Failed(err))
            }
        }
    }

    /// Every job gets a fresh sequence, so an older request for the same
    /// field can never land on top of it.
    fn job_for(&mut self, field: &FieldConfig, trigger: ValidationTrigger) -> ValidationJob {
        let seq = self.sequencer.bump(&field.name);
        self.validator.job(field, self.data(), seq, trigger)
    }

    async fn run_jobs(&mut self, jobs: Vec<ValidationJob>) {
        let outcomes = join_all(jobs.into_iter().map(ValidationJob::run)).await;
        for outcome in outcomes {
            self.record_validation(outcome);
        }
    }

    fn ensure_editable(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Submitted => Err(SessionError::Closed),
            SessionState::Submitting => {
                self.state = SessionState::Editing(self.runner.current_index());
                Ok(())
            }
            SessionState::Editing(_) | SessionState::Validating(_) => Ok(()),
        }
    }

    fn active_index(&self) -> Result<usize, SessionError> {
        match self.state {
            SessionState::Editing(idx) | SessionState::Validating(idx) => Ok(idx),
            SessionState::Submitting => Ok(self.runner.current_index()),
            SessionState::Submitted => Err(SessionError::Closed),
        }
    }
}

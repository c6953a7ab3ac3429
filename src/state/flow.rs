use crate::config::{FormConfig, StepConfig};
use crate::core::FieldName;
use crate::core::form_data::FormData;
use crate::core::value::Value;
use crate::error::SessionError;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Pending,
    Active,
    Done,
}

/// Walks the fixed step order and owns the accumulated form data.
#[derive(Debug, Clone)]
pub struct StepRunner {
    config: Arc<FormConfig>,
    current: usize,
    statuses: Vec<StepStatus>,
    data: FormData,
    registered: Vec<Vec<FieldName>>,
}

impl StepRunner {
    pub fn new(config: Arc<FormConfig>) -> Self {
        let data = config
            .fields()
            .map(|field| (field.name.clone(), field.initial_value()))
            .collect();
        let mut statuses = vec![StepStatus::Pending; config.step_count()];
        if let Some(first) = statuses.first_mut() {
            *first = StepStatus::Active;
        }
        let registered = vec![Vec::new(); config.step_count()];
        Self {
            config,
            current: 0,
            statuses,
            data,
            registered,
        }
    }

    pub fn config(&self) -> &Arc<FormConfig> {
        &self.config
    }

    pub fn data(&self) -> &FormData {
        &self.data
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    pub fn current_step(&self) -> &StepConfig {
        &self.config.steps()[self.current]
    }

    pub fn status_at(&self, index: usize) -> StepStatus {
        self.statuses
            .get(index)
            .copied()
            .unwrap_or(StepStatus::Pending)
    }

    pub fn current_status(&self) -> StepStatus {
        self.status_at(self.current)
    }

    pub fn has_next(&self) -> bool {
        self.current + 1 < self.statuses.len()
    }

    pub fn is_last(&self) -> bool {
        !self.has_next()
    }

    /// Fraction of steps already completed, `0.0..=1.0`.
    pub fn progress(&self) -> f32 {
        if self.statuses.is_empty() {
            return 0.0;
        }
        let done = self
            .statuses
            .iter()
            .filter(|status| matches!(status, StepStatus::Done))
            .count();
        done as f32 / self.statuses.len() as f32
    }

    pub fn complete_current(&mut self) {
        if let Some(status) = self.statuses.get_mut(self.current) {
            *status = StepStatus::Done;
        }
    }

    pub fn advance(&mut self) -> bool {
        if !self.has_next() {
            return false;
        }
        self.complete_current();
        self.current += 1;
        if let Some(status) = self.statuses.get_mut(self.current) {
            *status = StepStatus::Active;
        }
        true
    }

    /// Moves one step back without touching any values.
    pub fn go_back(&mut self) -> bool {
        if self.current == 0 {
            return false;
        }
        if let Some(status) = self.statuses.get_mut(self.current)
            && *status == StepStatus::Active
        {
            *status = StepStatus::Pending;
        }
        self.current -= 1;
        if let Some(status) = self.statuses.get_mut(self.current) {
            *status = StepStatus::Active;
        }
        true
    }

    pub fn set_value(&mut self, name: &str, value: Value) -> Result<Option<Value>, SessionError> {
        let field = self
            .config
            .field(name)
            .ok_or_else(|| SessionError::UnknownField(name.to_string()))?;
        Ok(self.data.set(field.name.clone(), value))
    }

    /// Record which declared fields a custom step component reported.
    /// Validation never depends on this list.
    pub fn register_step_fields(
        &mut self,
        step_index: usize,
        names: &[&str],
    ) -> Result<(), SessionError> {
        let step = self
            .config
            .step(step_index)
            .ok_or(SessionError::UnknownStep(step_index))?;

        let mut fields = Vec::with_capacity(names.len());
        for name in names {
            if !step.has_field(name) {
                return Err(SessionError::FieldNotInStep {
                    field: name.to_string(),
                    step: step_index,
                });
            }
            let name = FieldName::from(*name);
            if !fields.contains(&name) {
                fields.push(name);
            }
        }

        if let Some(slot) = self.registered.get_mut(step_index) {
            *slot = fields;
        }
        Ok(())
    }

    /// Fields reported for a step, falling back to its declared fields.
    pub fn step_fields(&self, step_index: usize) -> Vec<FieldName> {
        match self.registered.get(step_index) {
            Some(fields) if !fields.is_empty() => fields.clone(),
            _ => self
                .config
                .step(step_index)
                .map(|step| step.fields.iter().map(|f| f.name.clone()).collect())
                .unwrap_or_default(),
        }
    }

    pub(crate) fn replace_data(&mut self, data: FormData) {
        self.data = data;
    }
}

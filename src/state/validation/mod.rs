use crate::config::{FormConfig, StepConfig};
use crate::core::FieldName;
use crate::core::form_data::FormData;
use crate::validation::{ValidationResult, ValidationTrigger, ValidationVerdict};
use indexmap::{IndexMap, IndexSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorVisibility {
    Hidden,
    Inline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationEntry {
    pub message: String,
    pub visibility: ErrorVisibility,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    /// Required field with an empty value.
    Missing,
    /// Field that failed a rule.
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: FieldName,
    pub label: String,
    pub kind: IssueKind,
    pub message: String,
}

/// Labels of the fields blocking one step, split the way they are shown to
/// the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepIssues {
    pub missing: Vec<String>,
    pub invalid: Vec<String>,
}

impl StepIssues {
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.invalid.is_empty()
    }

    pub fn summary(&self) -> String {
        let mut lines = Vec::with_capacity(2);
        if !self.missing.is_empty() {
            lines.push(format!("Missing: {}", self.missing.join(", ")));
        }
        if !self.invalid.is_empty() {
            lines.push(format!("Invalid: {}", self.invalid.join(", ")));
        }
        lines.join("\n")
    }
}

/// Per-field error map plus the step and form gates derived from it.
///
/// Missing-ness is always recomputed from the form data, so a field that was
/// never validated still blocks when it is required and empty.
#[derive(Debug, Default, Clone)]
pub struct ValidationState {
    entries: IndexMap<FieldName, ValidationEntry>,
    unverified: IndexSet<FieldName>,
    touched: IndexSet<FieldName>,
}

impl ValidationState {
    /// Last write wins: a passing result clears whatever error was there.
    pub fn record_result(
        &mut self,
        field: &FieldName,
        result: &ValidationResult,
        visibility: ErrorVisibility,
    ) {
        self.unverified.shift_remove(field.as_str());
        if result.is_valid {
            self.entries.shift_remove(field.as_str());
        } else {
            self.set_error(field.clone(), result.message.clone(), visibility);
        }
    }

    pub fn record_verdict(
        &mut self,
        field: &FieldName,
        verdict: &ValidationVerdict,
        trigger: ValidationTrigger,
    ) {
        if trigger.reveals() {
            self.touched.insert(field.clone());
        }
        match verdict {
            ValidationVerdict::Checked(result) => {
                let visibility = if trigger.reveals() || self.is_touched(field.as_str()) {
                    ErrorVisibility::Inline
                } else {
                    ErrorVisibility::Hidden
                };
                self.record_result(field, result, visibility);
            }
            ValidationVerdict::Unverified { .. } => {
                self.entries.shift_remove(field.as_str());
                self.unverified.insert(field.clone());
            }
        }
    }

    pub fn set_error(
        &mut self,
        field: impl Into<FieldName>,
        message: impl Into<String>,
        visibility: ErrorVisibility,
    ) {
        self.entries.insert(
            field.into(),
            ValidationEntry {
                message: message.into(),
                visibility,
            },
        );
    }

    pub fn clear_error(&mut self, field: &str) {
        self.entries.shift_remove(field);
    }

    pub fn error(&self, field: &str) -> Option<&ValidationEntry> {
        self.entries.get(field)
    }

    pub fn has_error(&self, field: &str) -> bool {
        self.entries.contains_key(field)
    }

    pub fn visible_error(&self, field: &str) -> Option<&str> {
        self.entries.get(field).and_then(|entry| {
            matches!(entry.visibility, ErrorVisibility::Inline).then_some(entry.message.as_str())
        })
    }

    pub fn is_hidden_invalid(&self, field: &str) -> bool {
        self.entries
            .get(field)
            .is_some_and(|entry| matches!(entry.visibility, ErrorVisibility::Hidden))
    }

    pub fn reveal(&mut self, field: &str) {
        if let Some(entry) = self.entries.get_mut(field) {
            entry.visibility = ErrorVisibility::Inline;
        }
    }

    pub fn mark_touched(&mut self, field: &FieldName) {
        self.touched.insert(field.clone());
    }

    pub fn is_touched(&self, field: &str) -> bool {
        self.touched.contains(field)
    }

    pub fn is_unverified(&self, field: &str) -> bool {
        self.unverified.contains(field)
    }

    pub fn unverified_fields(&self) -> impl Iterator<Item = &FieldName> {
        self.unverified.iter()
    }

    /// Current error map entries, visible or hidden.
    pub fn errors(&self) -> impl Iterator<Item = (&FieldName, &ValidationEntry)> {
        self.entries.iter()
    }

    pub fn visible_entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().filter_map(|(field, entry)| {
            matches!(entry.visibility, ErrorVisibility::Inline)
                .then_some((field.as_str(), entry.message.as_str()))
        })
    }

    /// Blocking issues of one step in field declaration order, one per field.
    pub fn field_issues(&self, step: &StepConfig, data: &FormData) -> Vec<FieldIssue> {
        if step.skip_validation {
            return Vec::new();
        }
        step.fields
            .iter()
            .filter_map(|field| {
                let name = field.name.as_str();
                let label = field.display_label().to_string();
                if field.required && data.is_empty_value(name) {
                    let message = self
                        .error(name)
                        .map(|entry| entry.message.clone())
                        .unwrap_or_else(|| format!("{label} is required"));
                    return Some(FieldIssue {
                        field: field.name.clone(),
                        label,
                        kind: IssueKind::Missing,
                        message,
                    });
                }
                self.error(name).map(|entry| FieldIssue {
                    field: field.name.clone(),
                    label,
                    kind: IssueKind::Invalid,
                    message: entry.message.clone(),
                })
            })
            .collect()
    }

    pub fn issues_for(&self, step: &StepConfig, data: &FormData) -> StepIssues {
        let mut issues = StepIssues::default();
        for issue in self.field_issues(step, data) {
            match issue.kind {
                IssueKind::Missing => issues.missing.push(issue.label),
                IssueKind::Invalid => issues.invalid.push(issue.label),
            }
        }
        issues
    }

    pub fn is_step_valid(&self, step: &StepConfig, data: &FormData) -> bool {
        step.skip_validation || self.field_issues(step, data).is_empty()
    }

    pub fn is_form_valid(&self, config: &FormConfig, data: &FormData) -> bool {
        config
            .steps()
            .iter()
            .all(|step| self.is_step_valid(step, data))
    }

    /// Steps with blocking issues, by index.
    pub fn form_issues(&self, config: &FormConfig, data: &FormData) -> Vec<(usize, StepIssues)> {
        config
            .steps()
            .iter()
            .enumerate()
            .map(|(idx, step)| (idx, self.issues_for(step, data)))
            .filter(|(_, issues)| !issues.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorVisibility, IssueKind, StepIssues, ValidationState};
    use crate::config::{FieldConfig, StepConfig};
    use crate::core::FieldName;
    use crate::core::form_data::FormData;
    use crate::core::value::Value;
    use crate::validation::{ValidationResult, ValidationTrigger, ValidationVerdict};

    fn step() -> StepConfig {
        StepConfig::new(
            "Basics",
            vec![
                FieldConfig::text("title", "Job title").required(),
                FieldConfig::email("email", "Email").rule("email"),
                FieldConfig::text("notes", "Notes"),
            ],
        )
    }

    #[test]
    fn success_clears_previous_error() {
        let mut state = ValidationState::default();
        let field = FieldName::new("email");
        state.record_result(&field, &ValidationResult::invalid("bad"), ErrorVisibility::Inline);
        assert_eq!(state.visible_error("email"), Some("bad"));
        state.record_result(&field, &ValidationResult::valid(), ErrorVisibility::Inline);
        assert!(!state.has_error("email"));
    }

    #[test]
    fn change_errors_stay_hidden_until_revealed() {
        let mut state = ValidationState::default();
        let field = FieldName::new("email");
        let bad = ValidationVerdict::Checked(ValidationResult::invalid("bad"));
        state.record_verdict(&field, &bad, ValidationTrigger::Change);
        assert!(state.is_hidden_invalid("email"));
        assert_eq!(state.visible_error("email"), None);

        state.record_verdict(&field, &bad, ValidationTrigger::Blur);
        assert_eq!(state.visible_error("email"), Some("bad"));

        // once touched, later keystroke errors are shown straight away
        state.record_verdict(&field, &bad, ValidationTrigger::Change);
        assert_eq!(state.visible_error("email"), Some("bad"));
    }

    #[test]
    fn missing_and_invalid_are_split() {
        let mut state = ValidationState::default();
        let mut data = FormData::new();
        data.set("title", Value::text(""));
        data.set("email", Value::text("nope"));
        state.set_error("email", "Email must be a valid email address", ErrorVisibility::Inline);

        let issues = state.issues_for(&step(), &data);
        assert_eq!(
            issues,
            StepIssues {
                missing: vec!["Job title".to_string()],
                invalid: vec!["Email".to_string()],
            }
        );
        assert_eq!(issues.summary(), "Missing: Job title\nInvalid: Email");
        assert!(!state.is_step_valid(&step(), &data));

        let kinds: Vec<IssueKind> = state
            .field_issues(&step(), &data)
            .into_iter()
            .map(|issue| issue.kind)
            .collect();
        assert_eq!(kinds, vec![IssueKind::Missing, IssueKind::Invalid]);
    }

    #[test]
    fn skip_steps_are_always_valid() {
        let state = ValidationState::default();
        let skip = StepConfig::builder("Team")
            .field(FieldConfig::text("lead", "Lead").required())
            .skip_validation()
            .build();
        assert!(state.is_step_valid(&skip, &FormData::new()));
        assert!(state.issues_for(&skip, &FormData::new()).is_empty());
    }

    #[test]
    fn unverified_fields_do_not_block() {
        let mut state = ValidationState::default();
        let field = FieldName::new("email");
        state.set_error("email", "old", ErrorVisibility::Inline);
        state.record_verdict(
            &field,
            &ValidationVerdict::Unverified {
                reason: "offline".to_string(),
            },
            ValidationTrigger::Blur,
        );
        assert!(!state.has_error("email"));
        assert!(state.is_unverified("email"));

        let mut data = FormData::new();
        data.set("title", Value::text("Engineer"));
        assert!(state.is_step_valid(&step(), &data));
    }
}

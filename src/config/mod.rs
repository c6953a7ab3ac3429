pub mod field;
pub mod loader;
pub mod settings;
pub mod step;

use crate::core::FieldName;
use crate::error::ConfigError;
use crate::validation::{Rule, RuleRegistry};
use indexmap::IndexMap;
use std::sync::Arc;

pub use field::{AcceptFilter, FieldConfig, FieldKind, SelectOption, TextFormat};
pub use settings::EngineSettings;
pub use step::{StepBuilder, StepConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FieldSlot {
    step: usize,
    position: usize,
}

/// Declarative multi-step form schema. Immutable once built.
#[derive(Debug, Clone)]
pub struct FormConfig {
    title: String,
    steps: Vec<StepConfig>,
    rules: RuleRegistry,
    columns: usize,
    settings: EngineSettings,
    index: IndexMap<FieldName, FieldSlot>,
}

impl FormConfig {
    pub fn builder(title: impl Into<String>) -> FormConfigBuilder {
        FormConfigBuilder::new(title)
    }

    pub fn from_yaml(src: &str, rules: RuleRegistry) -> Result<Self, ConfigError> {
        loader::parse_form(src, rules)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn steps(&self) -> &[StepConfig] {
        &self.steps
    }

    pub fn step(&self, index: usize) -> Option<&StepConfig> {
        self.steps.get(index)
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn last_step_index(&self) -> usize {
        self.steps.len().saturating_sub(1)
    }

    pub fn rules(&self) -> &RuleRegistry {
        &self.rules
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn field(&self, name: &str) -> Option<&FieldConfig> {
        let slot = self.index.get(name)?;
        self.steps
            .get(slot.step)
            .and_then(|step| step.fields.get(slot.position))
    }

    pub fn step_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).map(|slot| slot.step)
    }

    /// Every field across all steps, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldConfig> {
        self.steps.iter().flat_map(|step| step.fields.iter())
    }

    /// Other fields referencing the same named rule as `name`.
    pub fn rule_siblings<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a FieldConfig> + 'a {
        let rule = self.field(name).and_then(|f| f.validation_rule.as_deref());
        self.fields().filter(move |field| {
            field.name != name && rule.is_some() && field.validation_rule.as_deref() == rule
        })
    }
}

pub struct FormConfigBuilder {
    title: String,
    steps: Vec<StepConfig>,
    rules: RuleRegistry,
    columns: usize,
    settings: EngineSettings,
}

impl FormConfigBuilder {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            steps: Vec::new(),
            rules: RuleRegistry::with_builtins(),
            columns: 1,
            settings: EngineSettings::default(),
        }
    }

    pub fn step(mut self, step: StepConfig) -> Self {
        self.steps.push(step);
        self
    }

    pub fn steps(mut self, steps: impl IntoIterator<Item = StepConfig>) -> Self {
        self.steps.extend(steps);
        self
    }

    /// Replaces the default registry (built-ins only).
    pub fn rules(mut self, rules: RuleRegistry) -> Self {
        self.rules = rules;
        self
    }

    pub fn rule(mut self, name: impl Into<String>, rule: Arc<dyn Rule>) -> Self {
        self.rules.insert(name, rule);
        self
    }

    pub fn columns(mut self, columns: usize) -> Self {
        self.columns = columns;
        self
    }

    pub fn settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> Result<FormConfig, ConfigError> {
        if self.steps.is_empty() {
            return Err(ConfigError::NoSteps);
        }
        if self.columns == 0 {
            return Err(ConfigError::InvalidColumns);
        }

        let mut index = IndexMap::<FieldName, FieldSlot>::new();
        for (step_idx, step) in self.steps.iter().enumerate() {
            for (position, field) in step.fields.iter().enumerate() {
                check_field(field, &self.rules)?;
                let slot = FieldSlot {
                    step: step_idx,
                    position,
                };
                if index.insert(field.name.clone(), slot).is_some() {
                    return Err(ConfigError::DuplicateField(field.name.to_string()));
                }
            }
        }

        Ok(FormConfig {
            title: self.title,
            steps: self.steps,
            rules: self.rules,
            columns: self.columns,
            settings: self.settings,
            index,
        })
    }
}

fn check_field(field: &FieldConfig, rules: &RuleRegistry) -> Result<(), ConfigError> {
    if let Some(rule) = &field.validation_rule
        && !rules.contains(rule)
    {
        return Err(ConfigError::UnknownRule {
            field: field.name.to_string(),
            rule: rule.clone(),
        });
    }

    match &field.kind {
        FieldKind::Select { options } if options.is_empty() => {
            Err(ConfigError::MissingOptions(field.name.to_string()))
        }
        FieldKind::File {
            accept: Some(accept),
            ..
        } => AcceptFilter::parse(field.name.as_str(), accept).map(|_| ()),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldConfig, FormConfig, SelectOption, StepConfig};
    use crate::error::ConfigError;
    use crate::validation::rules::range_pair;

    fn basics() -> StepConfig {
        StepConfig::builder("Basics")
            .field(FieldConfig::text("title", "Job title").required())
            .field(FieldConfig::number("minExperience", "Min experience").rule("range"))
            .field(FieldConfig::number("maxExperience", "Max experience").rule("range"))
            .build()
    }

    #[test]
    fn builder_indexes_fields_by_step() {
        let config = FormConfig::builder("Opening")
            .rule("range", range_pair("minExperience", "maxExperience", "bad"))
            .step(basics())
            .step(StepConfig::new("More", vec![FieldConfig::textarea("notes", "Notes")]))
            .build()
            .expect("config");

        assert_eq!(config.step_count(), 2);
        assert_eq!(config.step_of("notes"), Some(1));
        assert_eq!(config.field("title").map(|f| f.display_label()), Some("Job title"));
        let siblings: Vec<&str> = config
            .rule_siblings("minExperience")
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(siblings, vec!["maxExperience"]);
        assert_eq!(config.rule_siblings("title").count(), 0);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = FormConfig::builder("Dup")
            .step(StepConfig::new("A", vec![FieldConfig::text("x", "X")]))
            .step(StepConfig::new("B", vec![FieldConfig::text("x", "X again")]))
            .build()
            .expect_err("duplicate");
        assert!(matches!(err, ConfigError::DuplicateField(name) if name == "x"));
    }

    #[test]
    fn unknown_rules_and_empty_selects_are_rejected() {
        let err = FormConfig::builder("Rules")
            .step(basics())
            .build()
            .expect_err("range is not registered");
        assert!(matches!(err, ConfigError::UnknownRule { rule, .. } if rule == "range"));

        let err = FormConfig::builder("Select")
            .step(StepConfig::new("A", vec![FieldConfig::select("s", "S", Vec::new())]))
            .build()
            .expect_err("select without options");
        assert!(matches!(err, ConfigError::MissingOptions(_)));

        let ok = FormConfig::builder("Select")
            .step(StepConfig::new(
                "A",
                vec![FieldConfig::select("s", "S", vec![SelectOption::plain("x")])],
            ))
            .build();
        assert!(ok.is_ok());
    }

    #[test]
    fn empty_forms_are_rejected() {
        assert!(matches!(
            FormConfig::builder("Empty").build(),
            Err(ConfigError::NoSteps)
        ));
    }
}

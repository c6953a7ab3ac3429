use crate::config::field::FieldConfig;

/// One page of a multi-step form.
#[derive(Debug, Clone)]
pub struct StepConfig {
    pub title: String,
    pub description: Option<String>,
    pub fields: Vec<FieldConfig>,
    /// Advancement never blocks on this step's fields.
    pub skip_validation: bool,
    /// Name of a custom step renderer. Its fields are still declared in `fields`.
    pub component: Option<String>,
}

impl StepConfig {
    pub fn new(title: impl Into<String>, fields: Vec<FieldConfig>) -> Self {
        Self {
            title: title.into(),
            description: None,
            fields,
            skip_validation: false,
            component: None,
        }
    }

    pub fn builder(title: impl Into<String>) -> StepBuilder {
        StepBuilder::new(title)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldConfig> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FieldConfig> {
        self.fields.iter().filter(|field| field.required)
    }
}

pub struct StepBuilder {
    title: String,
    description: Option<String>,
    fields: Vec<FieldConfig>,
    skip_validation: bool,
    component: Option<String>,
}

impl StepBuilder {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            fields: Vec::new(),
            skip_validation: false,
            component: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn field(mut self, field: FieldConfig) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(mut self, fields: impl IntoIterator<Item = FieldConfig>) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn skip_validation(mut self) -> Self {
        self.skip_validation = true;
        self
    }

    pub fn component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    pub fn build(self) -> StepConfig {
        StepConfig {
            title: self.title,
            description: self.description,
            fields: self.fields,
            skip_validation: self.skip_validation,
            component: self.component,
        }
    }
}

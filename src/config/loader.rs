use crate::config::field::{FieldConfig, FieldKind, SelectOption};
use crate::config::settings::{EngineSettings, RawSettings};
use crate::config::step::StepConfig;
use crate::config::FormConfig;
use crate::core::value::Value;
use crate::error::ConfigError;
use crate::validation::RuleRegistry;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct RawForm {
    title: String,
    #[serde(default = "default_columns")]
    columns: usize,
    #[serde(default)]
    settings: RawSettings,
    steps: Vec<RawStep>,
}

#[derive(Debug, Deserialize)]
struct RawStep {
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    fields: Vec<RawField>,
    #[serde(default, alias = "skipValidation")]
    skip_validation: bool,
    #[serde(default)]
    component: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawField {
    name: String,
    #[serde(default)]
    label: String,
    #[serde(rename = "type", default = "default_type")]
    type_name: String,
    #[serde(default)]
    required: bool,
    #[serde(default, alias = "validationRule")]
    validation_rule: Option<String>,
    #[serde(default)]
    placeholder: Option<String>,
    #[serde(default)]
    prefix: Option<String>,
    #[serde(default)]
    accept: Option<String>,
    #[serde(default)]
    multiple: bool,
    #[serde(default)]
    rows: Option<u16>,
    #[serde(default)]
    options: Vec<RawOption>,
    #[serde(default)]
    default: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawOption {
    Plain(String),
    Labeled {
        value: String,
        #[serde(default)]
        label: Option<String>,
    },
}

fn default_columns() -> usize {
    1
}

fn default_type() -> String {
    "text".to_string()
}

impl From<RawOption> for SelectOption {
    fn from(raw: RawOption) -> Self {
        match raw {
            RawOption::Plain(value) => SelectOption::plain(value),
            RawOption::Labeled { value, label } => match label {
                Some(label) => SelectOption::new(value, label),
                None => SelectOption::plain(value),
            },
        }
    }
}

impl TryFrom<RawField> for FieldConfig {
    type Error = ConfigError;

    fn try_from(raw: RawField) -> Result<Self, Self::Error> {
        let Some(mut kind) = FieldKind::from_type_name(&raw.type_name) else {
            return Err(ConfigError::UnknownFieldType {
                field: raw.name,
                kind: raw.type_name,
            });
        };

        let options: Vec<SelectOption> = raw.options.into_iter().map(Into::into).collect();
        match &mut kind {
            FieldKind::Text { prefix, .. } => *prefix = raw.prefix,
            FieldKind::Select { options: slot } | FieldKind::MultiSelect { options: slot } => {
                *slot = options
            }
            FieldKind::File { accept, multiple } => {
                *accept = raw.accept;
                *multiple = raw.multiple;
            }
            FieldKind::Textarea { rows } => *rows = raw.rows,
        }

        Ok(FieldConfig {
            name: raw.name.into(),
            label: raw.label,
            kind,
            required: raw.required,
            validation_rule: raw.validation_rule,
            placeholder: raw.placeholder,
            default: raw.default,
        })
    }
}

pub(crate) fn parse_form(src: &str, rules: RuleRegistry) -> Result<FormConfig, ConfigError> {
    let raw: RawForm = serde_yaml::from_str(src)?;

    let mut steps = Vec::with_capacity(raw.steps.len());
    for raw_step in raw.steps {
        let fields = raw_step
            .fields
            .into_iter()
            .map(FieldConfig::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        steps.push(StepConfig {
            title: raw_step.title,
            description: raw_step.description,
            fields,
            skip_validation: raw_step.skip_validation,
            component: raw_step.component,
        });
    }

    FormConfig::builder(raw.title)
        .rules(rules)
        .columns(raw.columns)
        .settings(EngineSettings::from(raw.settings))
        .steps(steps)
        .build()
}

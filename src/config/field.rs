use crate::core::FieldName;
use crate::core::value::{FileMeta, Value};
use crate::error::ConfigError;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextFormat {
    #[default]
    Plain,
    Email,
    Tel,
    Number,
    Date,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }

    /// Option whose label is its value.
    pub fn plain(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            label: value.clone(),
            value,
        }
    }
}

/// Field shape. Each variant carries only what its control needs.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Text {
        format: TextFormat,
        prefix: Option<String>,
    },
    Select {
        options: Vec<SelectOption>,
    },
    MultiSelect {
        options: Vec<SelectOption>,
    },
    File {
        accept: Option<String>,
        multiple: bool,
    },
    Textarea {
        rows: Option<u16>,
    },
}

impl FieldKind {
    pub fn text(format: TextFormat) -> Self {
        Self::Text {
            format,
            prefix: None,
        }
    }

    /// Maps the config `type` string onto a kind with default settings.
    pub fn from_type_name(type_name: &str) -> Option<Self> {
        let kind = match type_name.trim().to_ascii_lowercase().as_str() {
            "text" => Self::text(TextFormat::Plain),
            "email" => Self::text(TextFormat::Email),
            "tel" => Self::text(TextFormat::Tel),
            "number" => Self::text(TextFormat::Number),
            "date" => Self::text(TextFormat::Date),
            "select" => Self::Select {
                options: Vec::new(),
            },
            "multiselect" => Self::MultiSelect {
                options: Vec::new(),
            },
            "file" => Self::File {
                accept: None,
                multiple: false,
            },
            "textarea" => Self::Textarea { rows: None },
            _ => return None,
        };
        Some(kind)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Text { format, .. } => match format {
                TextFormat::Plain => "text",
                TextFormat::Email => "email",
                TextFormat::Tel => "tel",
                TextFormat::Number => "number",
                TextFormat::Date => "date",
            },
            Self::Select { .. } => "select",
            Self::MultiSelect { .. } => "multiselect",
            Self::File { .. } => "file",
            Self::Textarea { .. } => "textarea",
        }
    }

    /// Value a fresh session starts with for this kind.
    pub fn empty_value(&self) -> Value {
        match self {
            Self::Text { .. } | Self::Textarea { .. } | Self::Select { .. } => {
                Value::Text(String::new())
            }
            Self::MultiSelect { .. } => Value::List(Vec::new()),
            Self::File { .. } => Value::None,
        }
    }

    pub fn options(&self) -> &[SelectOption] {
        match self {
            Self::Select { options } | Self::MultiSelect { options } => options.as_slice(),
            _ => &[],
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Text {
                format: TextFormat::Number,
                ..
            }
        )
    }
}

#[derive(Debug, Clone)]
pub struct FieldConfig {
    pub name: FieldName,
    pub label: String,
    pub kind: FieldKind,
    pub required: bool,
    pub validation_rule: Option<String>,
    pub placeholder: Option<String>,
    pub default: Option<Value>,
}

impl FieldConfig {
    pub fn new(name: impl Into<FieldName>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind,
            required: false,
            validation_rule: None,
            placeholder: None,
            default: None,
        }
    }

    pub fn text(name: impl Into<FieldName>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::text(TextFormat::Plain))
    }

    pub fn email(name: impl Into<FieldName>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::text(TextFormat::Email))
    }

    pub fn tel(name: impl Into<FieldName>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::text(TextFormat::Tel))
    }

    pub fn number(name: impl Into<FieldName>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::text(TextFormat::Number))
    }

    pub fn date(name: impl Into<FieldName>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::text(TextFormat::Date))
    }

    pub fn textarea(name: impl Into<FieldName>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::Textarea { rows: None })
    }

    pub fn select(
        name: impl Into<FieldName>,
        label: impl Into<String>,
        options: Vec<SelectOption>,
    ) -> Self {
        Self::new(name, label, FieldKind::Select { options })
    }

    pub fn multiselect(
        name: impl Into<FieldName>,
        label: impl Into<String>,
        options: Vec<SelectOption>,
    ) -> Self {
        Self::new(name, label, FieldKind::MultiSelect { options })
    }

    pub fn file(name: impl Into<FieldName>, label: impl Into<String>) -> Self {
        Self::new(
            name,
            label,
            FieldKind::File {
                accept: None,
                multiple: false,
            },
        )
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn rule(mut self, rule: impl Into<String>) -> Self {
        self.validation_rule = Some(rule.into());
        self
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Ignored unless the field is a text field.
    pub fn prefix(mut self, value: impl Into<String>) -> Self {
        if let FieldKind::Text { prefix, .. } = &mut self.kind {
            *prefix = Some(value.into());
        }
        self
    }

    /// Ignored unless the field is a file field.
    pub fn accept(mut self, value: impl Into<String>) -> Self {
        if let FieldKind::File { accept, .. } = &mut self.kind {
            *accept = Some(value.into());
        }
        self
    }

    /// Ignored unless the field is a file field.
    pub fn multiple(mut self) -> Self {
        if let FieldKind::File { multiple, .. } = &mut self.kind {
            *multiple = true;
        }
        self
    }

    pub fn rows(mut self, value: u16) -> Self {
        if let FieldKind::Textarea { rows } = &mut self.kind {
            *rows = Some(value);
        }
        self
    }

    pub fn display_label(&self) -> &str {
        if self.label.trim().is_empty() {
            self.name.as_str()
        } else {
            self.label.as_str()
        }
    }

    pub fn initial_value(&self) -> Value {
        self.default
            .clone()
            .unwrap_or_else(|| self.kind.empty_value())
    }

    /// Whether a value change has anything to validate.
    pub fn has_rule(&self) -> bool {
        self.required || self.validation_rule.is_some() || self.kind.is_numeric()
    }
}

/// Compiled form of an HTML-style `accept` list such as `.pdf,.docx,image/*`.
#[derive(Debug, Clone)]
pub struct AcceptFilter {
    names: GlobSet,
    mimes: GlobSet,
    unrestricted: bool,
}

impl AcceptFilter {
    pub fn any() -> Self {
        Self {
            names: GlobSet::empty(),
            mimes: GlobSet::empty(),
            unrestricted: true,
        }
    }

    pub fn parse(field: &str, accept: &str) -> Result<Self, ConfigError> {
        let mut names = GlobSetBuilder::new();
        let mut mimes = GlobSetBuilder::new();
        let mut unrestricted = true;

        for entry in accept.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            unrestricted = false;
            let (builder, glob) = if entry.contains('/') {
                (&mut mimes, entry.to_string())
            } else {
                (&mut names, format!("*.{}", entry.trim_start_matches('.')))
            };
            let compiled = GlobBuilder::new(&glob)
                .case_insensitive(true)
                .build()
                .map_err(|source| ConfigError::InvalidAccept {
                    field: field.to_string(),
                    pattern: entry.to_string(),
                    source,
                })?;
            builder.add(compiled);
        }

        let build = |builder: GlobSetBuilder, pattern: &str| {
            builder.build().map_err(|source| ConfigError::InvalidAccept {
                field: field.to_string(),
                pattern: pattern.to_string(),
                source,
            })
        };

        Ok(Self {
            names: build(names, accept)?,
            mimes: build(mimes, accept)?,
            unrestricted,
        })
    }

    pub fn allows(&self, file: &FileMeta) -> bool {
        self.unrestricted
            || self.names.is_match(file.name.as_str())
            || (!file.mime_type.is_empty() && self.mimes.is_match(file.mime_type.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::{AcceptFilter, FieldConfig, FieldKind, TextFormat};
    use crate::core::value::{FileMeta, Value};

    #[test]
    fn type_names_map_to_kinds() {
        assert_eq!(
            FieldKind::from_type_name("Number"),
            Some(FieldKind::text(TextFormat::Number))
        );
        assert_eq!(FieldKind::from_type_name("radio"), None);
        assert_eq!(FieldKind::text(TextFormat::Tel).type_name(), "tel");
    }

    #[test]
    fn initial_values_follow_kind() {
        assert_eq!(FieldConfig::text("a", "A").initial_value(), Value::text(""));
        assert_eq!(
            FieldConfig::multiselect("s", "S", Vec::new()).initial_value(),
            Value::List(Vec::new())
        );
        assert_eq!(FieldConfig::file("f", "F").initial_value(), Value::None);
        assert_eq!(
            FieldConfig::number("n", "N").default_value(0i64).initial_value(),
            Value::Number(0.0)
        );
    }

    #[test]
    fn builder_setters_ignore_foreign_kinds() {
        let field = FieldConfig::text("a", "A").accept(".pdf").multiple().prefix("$");
        assert_eq!(
            field.kind,
            FieldKind::Text {
                format: TextFormat::Plain,
                prefix: Some("$".to_string())
            }
        );
        assert_eq!(FieldConfig::text("a", "").display_label(), "a");
    }

    #[test]
    fn accept_filter_matches_extensions_and_mime_globs() {
        let filter = AcceptFilter::parse("cv", ".pdf, .DOCX, image/*").expect("filter");
        assert!(filter.allows(&FileMeta::new("resume.PDF", 1, "")));
        assert!(filter.allows(&FileMeta::new("letter.docx", 1, "")));
        assert!(filter.allows(&FileMeta::new("photo.bin", 1, "image/png")));
        assert!(!filter.allows(&FileMeta::new("notes.txt", 1, "text/plain")));
        assert!(AcceptFilter::parse("cv", "").expect("empty").allows(&FileMeta::new("x", 1, "")));
    }

    #[test]
    fn accept_filter_rejects_broken_globs() {
        assert!(AcceptFilter::parse("cv", "image/[").is_err());
    }
}

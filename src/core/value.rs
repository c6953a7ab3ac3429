use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Metadata for an attached file. The binary content is opaque to the engine
/// and never serialized.
#[derive(Clone, Serialize, Deserialize)]
pub struct FileMeta {
    pub name: String,
    pub size: u64,
    #[serde(rename = "type", default)]
    pub mime_type: String,
    #[serde(skip)]
    pub content: Option<Arc<[u8]>>,
}

impl FileMeta {
    pub fn new(name: impl Into<String>, size: u64, mime_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size,
            mime_type: mime_type.into(),
            content: None,
        }
    }

    pub fn with_content(mut self, content: impl Into<Arc<[u8]>>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Stable key used both for display lists and for removing a file.
    pub fn derived_id(&self) -> String {
        format!("{}:{}:{}", self.name, self.size, self.mime_type)
    }

    pub fn extension(&self) -> Option<&str> {
        self.name
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty())
    }
}

impl PartialEq for FileMeta {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.size == other.size && self.mime_type == other.mime_type
    }
}

impl fmt::Debug for FileMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileMeta")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("mime_type", &self.mime_type)
            .field("content_len", &self.content.as_ref().map(|c| c.len()))
            .finish()
    }
}

/// A single field value. Serialized untagged so the submit payload carries
/// plain JSON scalars, arrays and file objects.
///
/// `Files` is never empty: build it through [`Value::files`], which folds an
/// empty selection into `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    None,
    Number(f64),
    Text(String),
    List(Vec<String>),
    File(FileMeta),
    Files(Vec<FileMeta>),
}

impl Value {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    pub fn files(files: Vec<FileMeta>) -> Self {
        if files.is_empty() {
            Self::None
        } else {
            Self::Files(files)
        }
    }

    /// The single emptiness predicate used by every required check.
    ///
    /// Numbers are always present, `0` included.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::None => true,
            Self::Text(text) => text.trim().is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Files(files) => files.is_empty(),
            Self::Number(_) | Self::File(_) => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// Numeric view of the value. Text is parsed after trimming.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(number) => Some(*number),
            Self::Text(text) => text.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// Normalizes `File` and `Files` into one slice-like list.
    pub fn file_entries(&self) -> Vec<&FileMeta> {
        match self {
            Self::File(file) => vec![file],
            Self::Files(files) => files.iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Short human-readable form used by the text renderer.
    pub fn display(&self) -> String {
        match self {
            Self::None => String::new(),
            Self::Number(number) => format_number(*number),
            Self::Text(text) => text.clone(),
            Self::List(items) => items.join(", "),
            Self::File(_) | Self::Files(_) => self
                .file_entries()
                .iter()
                .map(|file| file.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

fn format_number(number: f64) -> String {
    if number.fract() == 0.0 && number.abs() < 1e15 {
        format!("{}", number as i64)
    } else {
        number.to_string()
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<Vec<String>> for Value {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

impl From<FileMeta> for Value {
    fn from(value: FileMeta) -> Self {
        Self::File(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{FileMeta, Value};

    #[test]
    fn zero_is_present() {
        assert!(!Value::Number(0.0).is_empty());
        assert!(Value::text("   ").is_empty());
        assert!(Value::List(Vec::new()).is_empty());
        assert!(Value::None.is_empty());
    }

    #[test]
    fn empty_file_selection_folds_to_none() {
        assert_eq!(Value::files(Vec::new()), Value::None);
        let value = Value::files(vec![FileMeta::new("cv.pdf", 10, "application/pdf")]);
        assert_eq!(value.file_entries().len(), 1);
    }

    #[test]
    fn file_equality_ignores_content() {
        let with_bytes = FileMeta::new("cv.pdf", 3, "application/pdf").with_content(vec![1u8, 2, 3]);
        let without = FileMeta::new("cv.pdf", 3, "application/pdf");
        assert_eq!(with_bytes, without);
        assert_eq!(with_bytes.extension(), Some("pdf"));
    }

    #[test]
    fn number_parsing_from_text() {
        assert_eq!(Value::text(" 12 ").as_number(), Some(12.0));
        assert_eq!(Value::text("twelve").as_number(), None);
        assert_eq!(Value::Number(3.0).display(), "3");
    }
}

use crate::config::{AcceptFilter, FieldConfig, FieldKind, SelectOption, TextFormat};
use crate::core::value::{FileMeta, Value};
use crate::error::ConfigError;

/// One user interaction with a field control.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldInput {
    Insert(char),
    Paste(String),
    Backspace,
    Clear,
    /// Replace the whole text, e.g. from a date picker.
    SetText(String),
    /// Select the option with this value.
    Choose(String),
    /// Flip a multi-select option by value.
    Toggle(String),
    AddCustomOption(String),
    AttachFiles(Vec<FileMeta>),
    RemoveFile(FileRef),
    Blur,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileRef {
    Index(usize),
    /// A [`FileMeta::derived_id`].
    Id(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionResult {
    pub handled: bool,
    /// New field value to hand to the session.
    pub value: Option<Value>,
    /// Input refused at the boundary; the value is unchanged.
    pub rejected: Option<String>,
    pub blurred: bool,
}

impl InteractionResult {
    pub fn ignored() -> Self {
        Self::default()
    }

    pub fn changed(value: Value) -> Self {
        Self {
            handled: true,
            value: Some(value),
            ..Self::default()
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            handled: true,
            rejected: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn blurred() -> Self {
        Self {
            handled: true,
            blurred: true,
            ..Self::default()
        }
    }
}

/// Char-indexed edit buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextBuffer {
    value: String,
    cursor: usize,
}

impl TextBuffer {
    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn byte_at(&self, char_pos: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_pos)
            .map(|(idx, _)| idx)
            .unwrap_or(self.value.len())
    }

    fn insert(&mut self, text: &str) {
        let at = self.byte_at(self.cursor);
        self.value.insert_str(at, text);
        self.cursor += text.chars().count();
    }

    fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        let at = self.byte_at(self.cursor);
        self.value.remove(at);
        true
    }

    fn replace(&mut self, text: impl Into<String>) {
        self.value = text.into();
        self.cursor = self.value.chars().count();
    }
}

/// Per-kind input state. Every field kind gets exactly one variant.
#[derive(Debug, Clone)]
pub enum FieldControl {
    Text {
        buffer: TextBuffer,
        digits_only: bool,
        multiline: bool,
    },
    Select {
        options: Vec<SelectOption>,
        selected: Option<String>,
    },
    MultiSelect {
        /// Starts from the configured options; custom additions stay local.
        options: Vec<SelectOption>,
        selected: Vec<String>,
    },
    File {
        accept: AcceptFilter,
        multiple: bool,
        files: Vec<FileMeta>,
    },
}

impl FieldControl {
    pub fn for_field(field: &FieldConfig) -> Result<Self, ConfigError> {
        let mut control = match &field.kind {
            FieldKind::Text { format, .. } => Self::Text {
                buffer: TextBuffer::default(),
                digits_only: *format == TextFormat::Number,
                multiline: false,
            },
            FieldKind::Textarea { .. } => Self::Text {
                buffer: TextBuffer::default(),
                digits_only: false,
                multiline: true,
            },
            FieldKind::Select { options } => Self::Select {
                options: options.clone(),
                selected: None,
            },
            FieldKind::MultiSelect { options } => Self::MultiSelect {
                options: options.clone(),
                selected: Vec::new(),
            },
            FieldKind::File { accept, multiple } => Self::File {
                accept: match accept {
                    Some(accept) => AcceptFilter::parse(field.name.as_str(), accept)?,
                    None => AcceptFilter::any(),
                },
                multiple: *multiple,
                files: Vec::new(),
            },
        };
        control.sync(&field.initial_value());
        Ok(control)
    }

    /// Load a value the session holds, e.g. after a draft restore.
    pub fn sync(&mut self, value: &Value) {
        match self {
            Self::Text { buffer, .. } => {
                let text = value.display();
                if buffer.as_str() != text {
                    buffer.replace(text);
                }
            }
            Self::Select { selected, .. } => {
                *selected = value.as_text().filter(|v| !v.is_empty()).map(str::to_string);
            }
            Self::MultiSelect { options, selected } => {
                *selected = value.as_list().map(<[String]>::to_vec).unwrap_or_default();
                for item in selected.iter() {
                    if !options.iter().any(|opt| &opt.value == item) {
                        options.push(SelectOption::plain(item.clone()));
                    }
                }
            }
            Self::File { files, .. } => {
                *files = value.file_entries().into_iter().cloned().collect();
            }
        }
    }

    pub fn value(&self) -> Value {
        match self {
            Self::Text { buffer, .. } => Value::text(buffer.as_str()),
            Self::Select { selected, .. } => Value::text(selected.clone().unwrap_or_default()),
            Self::MultiSelect { selected, .. } => Value::List(selected.clone()),
            Self::File {
                multiple, files, ..
            } => {
                if *multiple {
                    Value::files(files.clone())
                } else {
                    files.last().cloned().map(Value::File).unwrap_or_default()
                }
            }
        }
    }

    pub fn options(&self) -> &[SelectOption] {
        match self {
            Self::Select { options, .. } | Self::MultiSelect { options, .. } => options,
            Self::Text { .. } | Self::File { .. } => &[],
        }
    }

    pub fn handle(&mut self, input: FieldInput) -> InteractionResult {
        if input == FieldInput::Blur {
            return InteractionResult::blurred();
        }
        let edit = match self {
            Self::Text {
                buffer,
                digits_only,
                multiline,
            } => on_text(buffer, *digits_only, *multiline, input),
            Self::Select { options, selected } => on_select(options, selected, input),
            Self::MultiSelect { options, selected } => on_multi_select(options, selected, input),
            Self::File {
                accept,
                multiple,
                files,
            } => on_file(accept, *multiple, files, input),
        };
        match edit {
            Edit::Changed => InteractionResult::changed(self.value()),
            Edit::Unchanged => InteractionResult::ignored(),
            Edit::Rejected(reason) => InteractionResult::rejected(reason),
        }
    }
}

enum Edit {
    Changed,
    Unchanged,
    Rejected(String),
}

fn on_text(buffer: &mut TextBuffer, digits_only: bool, multiline: bool, input: FieldInput) -> Edit {
    let refusal = |text: &str| {
        if digits_only && !text.chars().all(|ch| ch.is_ascii_digit()) {
            Some("Only digits are allowed")
        } else if !multiline && text.contains('\n') {
            Some("Line breaks are not allowed here")
        } else {
            None
        }
    };

    match input {
        FieldInput::Insert(ch) => {
            let mut buf = [0; 4];
            let text = ch.encode_utf8(&mut buf);
            if let Some(reason) = refusal(text) {
                return Edit::Rejected(reason.to_string());
            }
            buffer.insert(text);
        }
        FieldInput::Paste(text) | FieldInput::SetText(text) if refusal(&text).is_some() => {
            return Edit::Rejected(refusal(&text).unwrap_or_default().to_string());
        }
        FieldInput::Paste(text) => buffer.insert(&text),
        FieldInput::SetText(text) => buffer.replace(text),
        FieldInput::Backspace => {
            if !buffer.backspace() {
                return Edit::Unchanged;
            }
        }
        FieldInput::Clear => buffer.replace(String::new()),
        _ => return Edit::Unchanged,
    }
    Edit::Changed
}

fn on_select(options: &[SelectOption], selected: &mut Option<String>, input: FieldInput) -> Edit {
    match input {
        FieldInput::Choose(value) => {
            if !options.iter().any(|opt| opt.value == value) {
                return Edit::Rejected(format!("'{value}' is not one of the options"));
            }
            *selected = Some(value);
        }
        FieldInput::Clear => *selected = None,
        _ => return Edit::Unchanged,
    }
    Edit::Changed
}

fn on_multi_select(
    options: &mut Vec<SelectOption>,
    selected: &mut Vec<String>,
    input: FieldInput,
) -> Edit {
    match input {
        FieldInput::Toggle(value) => {
            if !options.iter().any(|opt| opt.value == value) {
                return Edit::Rejected(format!("'{value}' is not one of the options"));
            }
            if let Some(pos) = selected.iter().position(|item| *item == value) {
                selected.remove(pos);
            } else {
                selected.push(value);
            }
        }
        FieldInput::AddCustomOption(raw) => {
            let label = raw.trim();
            if label.is_empty() {
                return Edit::Rejected("Option cannot be empty".to_string());
            }
            let wanted = label.to_lowercase();
            let existing = options.iter().find(|opt| {
                opt.value.to_lowercase() == wanted || opt.label.to_lowercase() == wanted
            });
            let value = match existing {
                Some(opt) => opt.value.clone(),
                None => {
                    options.push(SelectOption::plain(label));
                    label.to_string()
                }
            };
            if !selected.contains(&value) {
                selected.push(value);
            }
        }
        FieldInput::Clear => selected.clear(),
        _ => return Edit::Unchanged,
    }
    Edit::Changed
}

fn on_file(
    accept: &AcceptFilter,
    multiple: bool,
    files: &mut Vec<FileMeta>,
    input: FieldInput,
) -> Edit {
    match input {
        FieldInput::AttachFiles(incoming) => {
            if incoming.is_empty() {
                return Edit::Unchanged;
            }
            if let Some(bad) = incoming.iter().find(|file| !accept.allows(file)) {
                return Edit::Rejected(format!("{} is not an accepted file type", bad.name));
            }
            if multiple {
                for file in incoming {
                    if !files.iter().any(|f| f.derived_id() == file.derived_id()) {
                        files.push(file);
                    }
                }
            } else {
                *files = incoming.into_iter().last().into_iter().collect();
            }
        }
        FieldInput::RemoveFile(target) => {
            let pos = match target {
                FileRef::Index(idx) => (idx < files.len()).then_some(idx),
                FileRef::Id(id) => files.iter().position(|f| f.derived_id() == id),
            };
            let Some(pos) = pos else {
                return Edit::Unchanged;
            };
            files.remove(pos);
        }
        FieldInput::Clear => files.clear(),
        _ => return Edit::Unchanged,
    }
    Edit::Changed
}

#[cfg(test)]
mod tests {
    use super::{FieldControl, FieldInput, FileRef};
    use crate::config::{FieldConfig, SelectOption};
    use crate::core::value::{FileMeta, Value};

    fn control(field: FieldConfig) -> FieldControl {
        FieldControl::for_field(&field).expect("control")
    }

    #[test]
    fn number_fields_take_digits_only() {
        let mut years = control(FieldConfig::number("years", "Years"));
        assert_eq!(years.handle(FieldInput::Insert('4')).value, Some(Value::text("4")));
        assert!(years.handle(FieldInput::Insert('x')).rejected.is_some());
        assert!(years.handle(FieldInput::Paste("1e3".to_string())).rejected.is_some());
        assert_eq!(
            years.handle(FieldInput::Paste("20".to_string())).value,
            Some(Value::text("420"))
        );
        assert_eq!(years.handle(FieldInput::Backspace).value, Some(Value::text("42")));
    }

    #[test]
    fn text_edits_respect_multibyte_chars() {
        let mut name = control(FieldConfig::text("name", "Name"));
        name.handle(FieldInput::Paste("Zoë".to_string()));
        name.handle(FieldInput::Backspace);
        assert_eq!(name.value(), Value::text("Zo"));
        assert!(name.handle(FieldInput::Insert('\n')).rejected.is_some());

        let mut notes = control(FieldConfig::textarea("notes", "Notes"));
        notes.handle(FieldInput::Paste("a\nb".to_string()));
        assert_eq!(notes.value(), Value::text("a\nb"));
    }

    #[test]
    fn select_only_accepts_known_options() {
        let mut level = control(FieldConfig::select(
            "level",
            "Level",
            vec![SelectOption::new("jr", "Junior"), SelectOption::new("sr", "Senior")],
        ));
        assert_eq!(level.handle(FieldInput::Choose("sr".to_string())).value, Some(Value::text("sr")));
        assert!(level.handle(FieldInput::Choose("cto".to_string())).rejected.is_some());
        assert_eq!(level.value(), Value::text("sr"));
    }

    #[test]
    fn custom_options_dedupe_case_insensitively() {
        let mut skills = control(FieldConfig::multiselect(
            "skills",
            "Skills",
            vec![SelectOption::plain("Rust")],
        ));
        skills.handle(FieldInput::AddCustomOption("  rust ".to_string()));
        assert_eq!(skills.options().len(), 1);
        assert_eq!(skills.value(), Value::list(["Rust"]));

        skills.handle(FieldInput::AddCustomOption("Kafka".to_string()));
        assert_eq!(skills.options().len(), 2);
        assert_eq!(skills.value(), Value::list(["Rust", "Kafka"]));

        skills.handle(FieldInput::Toggle("Rust".to_string()));
        assert_eq!(skills.value(), Value::list(["Kafka"]));
        assert!(skills.handle(FieldInput::AddCustomOption(" ".to_string())).rejected.is_some());
    }

    #[test]
    fn custom_options_dedupe_beyond_ascii() {
        let mut teams = control(FieldConfig::multiselect("teams", "Teams", Vec::new()));
        teams.handle(FieldInput::AddCustomOption("Ärzte".to_string()));
        teams.handle(FieldInput::AddCustomOption("ärzte".to_string()));
        assert_eq!(teams.options().len(), 1);
        assert_eq!(teams.value(), Value::list(["Ärzte"]));
    }

    #[test]
    fn single_file_replaces_and_respects_accept() {
        let mut cv = control(FieldConfig::file("cv", "CV").accept(".pdf,.docx"));
        let rejected = cv.handle(FieldInput::AttachFiles(vec![FileMeta::new("cv.exe", 1, "")]));
        assert!(rejected.rejected.is_some());
        assert_eq!(cv.value(), Value::None);

        cv.handle(FieldInput::AttachFiles(vec![FileMeta::new("old.pdf", 1, "application/pdf")]));
        let result = cv.handle(FieldInput::AttachFiles(vec![FileMeta::new("CV.PDF", 2, "application/pdf")]));
        assert_eq!(result.value, Some(Value::File(FileMeta::new("CV.PDF", 2, "application/pdf"))));

        assert_eq!(cv.handle(FieldInput::RemoveFile(FileRef::Index(0))).value, Some(Value::None));
    }

    #[test]
    fn multiple_files_append_and_remove_by_id() {
        let mut shots = control(FieldConfig::file("shots", "Screenshots").accept("image/*").multiple());
        let a = FileMeta::new("a.png", 10, "image/png");
        let b = FileMeta::new("b.jpg", 20, "image/jpeg");
        shots.handle(FieldInput::AttachFiles(vec![a.clone()]));
        shots.handle(FieldInput::AttachFiles(vec![b.clone(), a.clone()]));
        assert_eq!(shots.value(), Value::Files(vec![a.clone(), b.clone()]));

        shots.handle(FieldInput::RemoveFile(FileRef::Id(a.derived_id())));
        assert_eq!(shots.value(), Value::Files(vec![b]));
        shots.handle(FieldInput::Clear);
        assert_eq!(shots.value(), Value::None);
    }

    #[test]
    fn sync_restores_custom_selections() {
        let mut skills = control(FieldConfig::multiselect("skills", "Skills", Vec::new()));
        skills.sync(&Value::list(["Go"]));
        assert_eq!(skills.options().len(), 1);
        assert_eq!(skills.value(), Value::list(["Go"]));
    }
}

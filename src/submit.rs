use crate::core::FieldName;
use crate::core::form_data::FormData;
use crate::core::value::FileMeta;
use crate::error::SubmitError;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

/// Plain key-value body handed to the submit collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitPayload {
    pub form: String,
    pub fields: FormData,
}

/// One file part for collaborators that encode multipart bodies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attachment<'a> {
    pub field: &'a FieldName,
    pub file: &'a FileMeta,
}

impl SubmitPayload {
    pub fn new(form: impl Into<String>, fields: &FormData) -> Self {
        Self {
            form: form.into(),
            fields: fields.clone(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(src: &str) -> serde_json::Result<Self> {
        serde_json::from_str(src)
    }

    pub fn into_form_data(self) -> FormData {
        self.fields
    }

    pub fn attachments(&self) -> Vec<Attachment<'_>> {
        self.fields
            .iter()
            .flat_map(|(field, value)| {
                value
                    .file_entries()
                    .into_iter()
                    .map(move |file| Attachment { field, file })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Transport boundary. Serialization details beyond the payload (multipart,
/// auth headers, retries) belong to the implementor.
pub trait SubmitClient: Send + Sync {
    fn submit(
        &self,
        payload: SubmitPayload,
    ) -> BoxFuture<'static, Result<SubmitReceipt, SubmitError>>;
}

/// Unvalidated snapshot of an in-progress session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub form: String,
    pub step: usize,
    pub data: FormData,
}

impl Draft {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(src: &str) -> serde_json::Result<Self> {
        serde_json::from_str(src)
    }
}

pub trait DraftSink {
    fn save_draft(&self, draft: &Draft);
}

impl<F> DraftSink for F
where
    F: Fn(&Draft),
{
    fn save_draft(&self, draft: &Draft) {
        self(draft)
    }
}

#[cfg(test)]
mod tests {
    use super::{Draft, SubmitPayload};
    use crate::core::form_data::FormData;
    use crate::core::value::{FileMeta, Value};

    fn sample() -> FormData {
        let mut data = FormData::new();
        data.set("title", Value::text("Backend engineer"));
        data.set("openings", Value::text("3"));
        data.set("years", Value::Number(0.0));
        data.set("skills", Value::list(["rust", "sql"]));
        data.set("tags", Value::List(Vec::new()));
        data.set(
            "cv",
            Value::File(FileMeta::new("cv.pdf", 2048, "application/pdf").with_content(vec![7u8; 4])),
        );
        data.set(
            "samples",
            Value::files(vec![
                FileMeta::new("a.png", 10, "image/png"),
                FileMeta::new("b.png", 20, "image/png"),
            ]),
        );
        data.set("photo", Value::None);
        data
    }

    #[test]
    fn json_round_trip_keeps_value_shapes() {
        let payload = SubmitPayload::new("Opening", &sample());
        let json = payload.to_json().expect("serialize");
        let back = SubmitPayload::from_json(&json).expect("deserialize");

        let data = back.clone().into_form_data();
        assert_eq!(data.value("openings"), &Value::text("3"));
        assert_eq!(data.value("years"), &Value::Number(0.0));
        assert_eq!(data.value("skills"), &Value::list(["rust", "sql"]));
        assert_eq!(data.value("tags"), &Value::List(Vec::new()));
        assert_eq!(data.value("photo"), &Value::None);

        let Value::File(cv) = data.value("cv") else {
            panic!("cv should stay a single file");
        };
        assert_eq!((cv.name.as_str(), cv.size), ("cv.pdf", 2048));
        assert!(cv.content.is_none());

        let Value::Files(samples) = data.value("samples") else {
            panic!("samples should stay a file list");
        };
        assert_eq!(samples.len(), 2);
        assert_eq!(back, payload);
    }

    #[test]
    fn attachments_flatten_single_and_multiple() {
        let payload = SubmitPayload::new("Opening", &sample());
        let names: Vec<(&str, &str)> = payload
            .attachments()
            .iter()
            .map(|a| (a.field.as_str(), a.file.name.as_str()))
            .collect();
        assert_eq!(names, vec![("cv", "cv.pdf"), ("samples", "a.png"), ("samples", "b.png")]);
    }

    #[test]
    fn drafts_serialize() {
        let draft = Draft {
            form: "Opening".to_string(),
            step: 1,
            data: sample(),
        };
        let back = Draft::from_json(&draft.to_json().expect("json")).expect("parse");
        assert_eq!(back, draft);
    }
}

use crate::config::{FieldConfig, FieldKind, FormConfig};
use crate::core::FieldName;
use crate::error::{ConfigError, SessionError};
use crate::state::session::FormSession;
use crate::validation::ValidationJob;
use crate::widgets::control::{FieldControl, FieldInput};
use indexmap::IndexMap;
use tracing::debug;
use unicode_width::UnicodeWidthStr;

const COLUMN_GAP: &str = "   ";

#[derive(Debug, Default)]
pub struct RenderOutcome {
    pub changed: bool,
    pub rejected: Option<String>,
    /// Validations to run; record each outcome back on the session.
    pub jobs: Vec<ValidationJob>,
}

/// Owns one control per field and turns raw input into session updates.
pub struct FieldRenderer {
    controls: IndexMap<FieldName, FieldControl>,
}

impl FieldRenderer {
    pub fn new(config: &FormConfig) -> Result<Self, ConfigError> {
        let controls: IndexMap<FieldName, FieldControl> = config
            .fields()
            .map(|field| Ok((field.name.clone(), FieldControl::for_field(field)?)))
            .collect::<Result<_, ConfigError>>()?;
        Ok(Self { controls })
    }

    pub fn control(&self, name: &str) -> Option<&FieldControl> {
        self.controls.get(name)
    }

    pub fn handle(
        &mut self,
        session: &mut FormSession,
        name: &str,
        input: FieldInput,
    ) -> Result<RenderOutcome, SessionError> {
        let control = self
            .controls
            .get_mut(name)
            .ok_or_else(|| SessionError::UnknownField(name.to_string()))?;
        control.sync(session.value(name));

        let result = control.handle(input);
        if let Some(reason) = result.rejected {
            debug!(field = name, %reason, "input rejected");
            return Ok(RenderOutcome {
                rejected: Some(reason),
                ..RenderOutcome::default()
            });
        }
        if result.blurred {
            return Ok(RenderOutcome {
                jobs: vec![session.blur(name)?],
                ..RenderOutcome::default()
            });
        }
        match result.value {
            Some(value) => Ok(RenderOutcome {
                changed: true,
                rejected: None,
                jobs: session.set_field_value(name, value)?,
            }),
            None => Ok(RenderOutcome::default()),
        }
    }

    /// Plain-text view of one step: a header, then the fields laid out in
    /// the configured number of columns.
    pub fn draw_step(&self, session: &FormSession, step_index: usize) -> Vec<String> {
        let config = session.config();
        let Some(step) = config.step(step_index) else {
            return Vec::new();
        };

        let mut lines = vec![format!(
            "Step {}/{}: {}",
            step_index + 1,
            config.step_count(),
            step.title
        )];
        if let Some(description) = &step.description {
            lines.push(description.clone());
        }

        let label_width = step
            .fields
            .iter()
            .map(|field| label_text(field).width())
            .max()
            .unwrap_or(0);
        let cells: Vec<Vec<String>> = step
            .fields
            .iter()
            .map(|field| self.draw_field(session, field, label_width))
            .collect();

        let columns = config.columns().max(1);
        let mut widths = vec![0usize; columns];
        for (idx, cell) in cells.iter().enumerate() {
            let col = idx % columns;
            let widest = cell.iter().map(|line| line.width()).max().unwrap_or(0);
            widths[col] = widths[col].max(widest);
        }

        for row in cells.chunks(columns) {
            let height = row.iter().map(Vec::len).max().unwrap_or(0);
            for line_idx in 0..height {
                let mut line = String::new();
                for (col, cell) in row.iter().enumerate() {
                    let text = cell.get(line_idx).map(String::as_str).unwrap_or("");
                    if col + 1 == row.len() {
                        line.push_str(text);
                    } else {
                        line.push_str(&pad(text, widths[col]));
                        line.push_str(COLUMN_GAP);
                    }
                }
                lines.push(line.trim_end().to_string());
            }
        }
        lines
    }

    fn draw_field(
        &self,
        session: &FormSession,
        field: &FieldConfig,
        label_width: usize,
    ) -> Vec<String> {
        let value = session.value(field.name.as_str());
        let shown = match &field.kind {
            FieldKind::Select { .. } | FieldKind::MultiSelect { .. } => {
                let options = self
                    .control(field.name.as_str())
                    .map(FieldControl::options)
                    .unwrap_or_else(|| field.kind.options());
                let chosen: Vec<&str> = match value.as_list() {
                    Some(items) => items.iter().map(String::as_str).collect(),
                    None => value.as_text().into_iter().filter(|v| !v.is_empty()).collect(),
                };
                chosen
                    .iter()
                    .map(|v| {
                        options
                            .iter()
                            .find(|opt| opt.value == *v)
                            .map_or(*v, |opt| opt.label.as_str())
                    })
                    .collect::<Vec<_>>()
                    .join(", ")
            }
            FieldKind::Text {
                prefix: Some(prefix),
                ..
            } if !value.is_empty() => format!("{prefix}{}", value.display()),
            _ => value.display(),
        };
        let shown = if shown.is_empty() {
            field
                .placeholder
                .as_ref()
                .map(|p| format!("({p})"))
                .unwrap_or_default()
        } else {
            shown.replace('\n', " ")
        };

        let mut lines = vec![format!("{}: {shown}", pad(&label_text(field), label_width))
            .trim_end()
            .to_string()];
        if let Some(error) = session.visible_error(field.name.as_str()) {
            lines.push(format!("  ✗ {error}"));
        }
        lines
    }
}

fn label_text(field: &FieldConfig) -> String {
    if field.required {
        format!("{} *", field.display_label())
    } else {
        field.display_label().to_string()
    }
}

fn pad(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.width());
    format!("{text}{}", " ".repeat(fill))
}

#[cfg(test)]
mod tests {
    use super::FieldRenderer;
    use crate::config::{FieldConfig, FormConfig, SelectOption, StepConfig};
    use crate::core::value::Value;
    use crate::error::SessionError;
    use crate::state::session::FormSession;
    use crate::widgets::control::FieldInput;
    use std::sync::Arc;

    fn setup(columns: usize) -> (FieldRenderer, FormSession) {
        let config = FormConfig::builder("Opening")
            .columns(columns)
            .step(
                StepConfig::new(
                    "Basics",
                    vec![
                        FieldConfig::text("title", "Job title").required(),
                        FieldConfig::number("openings", "Openings").placeholder("1"),
                        FieldConfig::select(
                            "level",
                            "Level",
                            vec![SelectOption::new("sr", "Senior"), SelectOption::new("jr", "Junior")],
                        ),
                        FieldConfig::text("salary", "Salary").prefix("$"),
                    ],
                )
                .with_description("The basics"),
            )
            .build()
            .expect("config");
        let renderer = FieldRenderer::new(&config).expect("renderer");
        (renderer, FormSession::new(Arc::new(config)))
    }

    #[tokio::test]
    async fn input_flows_into_the_session() {
        let (mut renderer, mut session) = setup(1);
        let outcome = renderer
            .handle(&mut session, "openings", FieldInput::Insert('3'))
            .expect("handle");
        assert!(outcome.changed);
        assert_eq!(outcome.jobs.len(), 1);
        assert_eq!(session.value("openings"), &Value::text("3"));

        let outcome = renderer
            .handle(&mut session, "openings", FieldInput::Insert('x'))
            .expect("handle");
        assert!(outcome.rejected.is_some());
        assert!(outcome.jobs.is_empty());
        assert_eq!(session.value("openings"), &Value::text("3"));

        let outcome = renderer
            .handle(&mut session, "title", FieldInput::Blur)
            .expect("handle");
        for job in outcome.jobs {
            let result = job.run().await;
            session.record_validation(result);
        }
        assert!(session.visible_error("title").is_some());
    }

    #[test]
    fn unknown_fields_are_reported() {
        let (mut renderer, mut session) = setup(1);
        assert!(matches!(
            renderer.handle(&mut session, "nope", FieldInput::Clear),
            Err(SessionError::UnknownField(_))
        ));
    }

    #[test]
    fn draw_aligns_labels_and_marks_required() {
        let (mut renderer, mut session) = setup(1);
        renderer
            .handle(&mut session, "level", FieldInput::Choose("jr".to_string()))
            .expect("handle");
        renderer
            .handle(&mut session, "salary", FieldInput::Paste("90k".to_string()))
            .expect("handle");

        let lines = renderer.draw_step(&session, 0);
        assert_eq!(
            lines,
            vec![
                "Step 1/1: Basics",
                "The basics",
                "Job title *:",
                "Openings   : (1)",
                "Level      : Junior",
                "Salary     : $90k",
            ]
        );
    }

    #[tokio::test]
    async fn draw_shows_visible_errors_in_columns() {
        let (renderer, mut session) = setup(2);
        let job = session.blur("title").expect("blur");
        let outcome = job.run().await;
        session.record_validation(outcome);

        let lines = renderer.draw_step(&session, 0);
        assert_eq!(lines[2], format!("{:<25}   {}", "Job title *:", "Openings   : (1)"));
        assert_eq!(lines[3], "  ✗ Job title is required");
        assert_eq!(lines[4], format!("{:<25}   {}", "Level      :", "Salary     :"));
        assert_eq!(lines.len(), 5);
        assert!(renderer.draw_step(&session, 5).is_empty());
    }
}

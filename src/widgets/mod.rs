pub mod control;
pub mod renderer;

pub use control::{FieldControl, FieldInput, FileRef, InteractionResult};
pub use renderer::{FieldRenderer, RenderOutcome};

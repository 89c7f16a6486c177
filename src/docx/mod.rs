//! Template document handling - .docx package access and rendering

pub mod engine;
pub mod package;
mod xml;

pub use engine::{AppendParagraph, RenderOutcome, Substitution, TemplateEngine};
pub use package::DocxPackage;

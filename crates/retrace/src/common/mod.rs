//! Common infrastructure shared by the front-end and the command-line tool

mod error;
mod span;

pub use error::{DiagnosticReporter, FrontendError, FrontendResult};
pub use span::Span;

//! The mass-import pipeline: request validation, per-record processing
//! and batch orchestration.

mod error;
mod orchestrator;
mod processor;
mod types;
mod validate;

pub use error::{FieldError, ImportError, ValidationErrors};
pub use orchestrator::ImportService;
pub use processor::{RecordContext, RecordOutcome, RecordProcessor};
pub use types::*;
pub use validate::validate_request;

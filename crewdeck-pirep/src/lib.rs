pub mod assembler;
pub mod scoring;
pub mod validation;

pub use assembler::{ReportAssembler, SubmitError};
pub use validation::{ValidationError, ValidationWorkflow, Verdict};

//! Services Module
//!
//! Entry points that open the active workbook, run one operation and
//! report what changed.

pub mod intake;
pub mod resolution;

pub use intake::{FormAnswers, FormSubmission, IntakeOutcome, IntakeReport};
pub use resolution::{IdentityService, ResolutionReport, SingleRowOutcome, SingleRowReport};

//! Q&A generation, reversal, and validation pipeline (C13/C14/C15).

pub mod generator;
pub mod reversal;
pub mod types;
pub mod validator;

pub use generator::QaGenerator;
pub use reversal::generate_reversal_batch;
pub use types::{QABatch, QAPair, QuestionType};
pub use validator::QaValidator;

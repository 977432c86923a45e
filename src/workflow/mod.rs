pub mod editor;
pub mod grading;
pub mod runner;

pub use editor::{AssessmentEditor, DeleteOutcome, EditorMode};
pub use grading::GradingFlow;
pub use runner::{AssessmentRunner, RunnerState, SubmitOutcome};

pub mod assessment_service;
pub mod confirm;
pub mod memory_service;
pub mod warn_writer;

pub use assessment_service::AssessmentService;
pub use confirm::{ConfirmationGate, FixedGate, StdinGate};
pub use memory_service::MemoryAssessmentService;
pub use warn_writer::WarnWriter;

pub mod assessment;
pub mod draft;
pub mod ledger;
pub mod loaders;
pub mod script;
pub mod submission;

pub use assessment::{
    option_label, Assessment, AssessmentType, NewAssessment, Question, QuestionInput,
    QuestionKind, QuestionType,
};
pub use draft::{QuestionDraft, OPTION_SLOTS};
pub use ledger::AnswerLedger;
pub use loaders::{
    load_attempt_scripts, load_author_scripts, load_grade_scripts, load_seed_file,
};
pub use script::{
    AttemptScript, AuthorScript, GradeScript, NewAssessmentSpec, ScriptAnswer,
    ScriptQuestion, ScriptScore, SeedData,
};
pub use submission::{
    Answer, AnswerPayload, AnswerValue, Grade, SubmitRequest, Submission,
    SubmissionPayload, SubmissionStatus,
};

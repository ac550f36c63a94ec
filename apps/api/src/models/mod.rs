pub mod resume;
pub mod submission;

pub use resume::{results_path, Feedback, ResumeRecord};
pub use submission::{DocumentFile, SubmissionInput};

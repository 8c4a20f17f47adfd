#![forbid(unsafe_code)]

pub mod session;
pub mod submission;

pub use session::FormSession;
pub use submission::{ExportTicket, FlowError, SubmissionFlow, SubmissionState, SubmitTicket};

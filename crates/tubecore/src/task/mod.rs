//! Task lifecycle: submission, the poller state machine and its driver.

pub mod poller;
pub mod state;
pub mod submission;

pub use poller::ProgressPoller;
pub use state::{Effect, Machine, PollEvent, PollerState};
pub use submission::{SubmitLatch, TaskSubmissionService, VideoInfoSlot};

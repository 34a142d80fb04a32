//! Tubecore - client core for a remote yt-dlp download service
//!
//! Submits download tasks, polls their progress on a fixed cadence until
//! they finish, and keeps a cached listing of the finished files. Rendering
//! is left to a [`presentation::PresentationPort`] supplied by the
//! front-end.
//!
//! # Module Structure
//!
//! - `core`: configuration, errors and logging
//! - `api`: the remote service contract and its HTTP implementation
//! - `task`: submission, the poller state machine and its timer driver
//! - `registry`: the artifact listing
//! - `presentation`: the boundary towards whatever renders state
//! - `controller`: wires everything together for a front-end

pub mod api;
pub mod controller;
pub mod core;
pub mod presentation;
pub mod registry;
pub mod task;

// Re-export commonly used types for convenience
pub use api::types::{
    DownloadTask, DownloadedFile, FormatMenu, FormatOption, FormatSelector, ProgressSnapshot, TaskId, TaskStatus,
    VideoInfo,
};
pub use api::{Gateway, HttpGateway};
pub use controller::TaskController;
pub use crate::core::{AppError, AppResult, ClientConfig};
pub use presentation::{Control, Notice, NoticeKind, PresentationPort};
pub use registry::DownloadRegistry;
pub use task::{PollerState, ProgressPoller};

//! Boundary between the core and whatever renders it.
//!
//! The core never draws anything. It hands immutable values to a
//! [`PresentationPort`] and asks it for the one piece of user input it
//! needs (delete confirmation). Implementations must not block for long:
//! they are called from the polling task.

use strum::{AsRefStr, Display};

use crate::api::types::{DownloadedFile, ProgressSnapshot, VideoInfo};
use crate::core::error::AppError;

/// Category of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum NoticeKind {
    /// Input rejected before any remote call
    Validation,
    /// A user-triggered remote call failed
    Remote,
    /// Confirmation of a successful action
    Info,
}

/// A transient message for the user. How long it stays visible is up to
/// the presenter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Info, message)
    }

    pub fn from_error(err: &AppError) -> Self {
        Self::new(err.notice_kind(), err.user_message())
    }
}

/// User controls the core toggles while work is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Control {
    /// The "look up video" action
    Lookup,
    /// The "start download" action; busy for the whole task lifetime
    Submit,
}

/// Renders state produced by the core.
pub trait PresentationPort: Send + Sync {
    /// A fresh lookup result. `None` clears the previous one.
    fn show_video_info(&self, info: Option<&VideoInfo>);

    /// Called once per successful progress tick.
    fn show_progress(&self, snapshot: &ProgressSnapshot);

    /// The full artifact listing, in server order.
    fn show_downloads(&self, files: &[DownloadedFile]);

    fn notify(&self, notice: &Notice);

    fn set_busy(&self, control: Control, busy: bool);

    /// Asks the user whether `name` should be deleted.
    fn confirm_delete(&self, name: &str) -> bool;
}

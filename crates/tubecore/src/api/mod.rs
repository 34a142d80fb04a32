//! Remote calls to the download service.
//!
//! The `Gateway` trait is the seam between the task lifecycle and the wire.
//! `HttpGateway` is the real implementation; tests plug in scripted fakes.
//! Every method normalises failures into [`AppError`]: non-2xx responses
//! become `AppError::Remote` with the server's `error` text (or a generic
//! message), bodies that do not parse become `AppError::Decode`.

pub mod http;
pub mod types;

use async_trait::async_trait;
use url::Url;

use crate::core::error::AppError;
use types::{DownloadedFile, ProgressSnapshot, SubmitRequest, TaskId, VideoInfo};

pub use http::HttpGateway;

/// The remote operations the core depends on.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// `POST /api/info`
    async fn video_info(&self, url: &str) -> Result<VideoInfo, AppError>;

    /// `POST /api/download`, yielding the server-assigned task id.
    async fn submit(&self, request: &SubmitRequest) -> Result<TaskId, AppError>;

    /// `GET /api/progress/{task_id}`. Never carries a client timeout.
    async fn progress(&self, task_id: &TaskId) -> Result<ProgressSnapshot, AppError>;

    /// `GET /api/downloads`, in server order.
    async fn list_downloads(&self) -> Result<Vec<DownloadedFile>, AppError>;

    /// `DELETE /api/delete/{name}`
    async fn delete_download(&self, name: &str) -> Result<(), AppError>;

    /// Link to `GET /download/{name}`. Builds the URL only; the core never
    /// fetches artifact bytes.
    fn artifact_url(&self, name: &str) -> Result<Url, AppError>;
}

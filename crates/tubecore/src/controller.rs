//! TaskController — the entry point a front-end drives.
//!
//! Wires the gateway, the submission service, the poller and the registry
//! together around one presenter, and turns failures of user-triggered
//! actions into notices. Background failures (poll ticks, automatic
//! refreshes) are only logged.

use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::api::types::{DownloadedFile, FormatSelector, TaskId, VideoInfo};
use crate::api::{Gateway, HttpGateway};
use crate::core::config::ClientConfig;
use crate::core::error::AppResult;
use crate::presentation::{Notice, PresentationPort};
use crate::registry::DownloadRegistry;
use crate::task::{ProgressPoller, SubmitLatch, TaskSubmissionService, VideoInfoSlot};

pub struct TaskController {
    presenter: Arc<dyn PresentationPort>,
    submission: TaskSubmissionService,
    poller: ProgressPoller,
    registry: DownloadRegistry,
}

impl TaskController {
    pub fn new(gateway: Arc<dyn Gateway>, presenter: Arc<dyn PresentationPort>, poll_interval: Duration) -> Self {
        let latch = SubmitLatch::new(Arc::clone(&presenter));
        let video_info = VideoInfoSlot::default();
        let registry = DownloadRegistry::new(Arc::clone(&gateway), Arc::clone(&presenter));
        let poller = ProgressPoller::new(
            Arc::clone(&gateway),
            Arc::clone(&presenter),
            registry.clone(),
            latch.clone(),
            video_info.clone(),
            poll_interval,
        );
        let submission =
            TaskSubmissionService::new(gateway, Arc::clone(&presenter), poller.clone(), latch, video_info);

        Self {
            presenter,
            submission,
            poller,
            registry,
        }
    }

    /// Controller talking HTTP to the service named in `config`.
    pub fn from_config(config: &ClientConfig, presenter: Arc<dyn PresentationPort>) -> AppResult<Self> {
        let gateway = HttpGateway::new(config)?;
        log::info!("Using download service at {}", gateway.base_url());
        Ok(Self::new(Arc::new(gateway), presenter, config.poll_interval))
    }

    /// Loads the initial artifact listing. A failure is logged, not shown.
    pub async fn start(&self) -> AppResult<Vec<DownloadedFile>> {
        self.registry.refresh().await
    }

    pub async fn fetch_info(&self, url: &str) -> AppResult<VideoInfo> {
        let result = self.submission.lookup_video(url).await;
        self.surface(result)
    }

    /// Submits a task; the poller is armed by the time this returns.
    pub async fn start_download(&self, url: &str, format: FormatSelector, audio_only: bool) -> AppResult<TaskId> {
        let result = self.submission.submit_download(url, format, audio_only).await;
        self.surface(result)
    }

    /// Deletes `name` after the presenter confirms.
    ///
    /// Returns `Ok(false)` when the user declined.
    pub async fn delete_file(&self, name: &str) -> AppResult<bool> {
        if !self.presenter.confirm_delete(name) {
            log::debug!("Delete of {} declined", name);
            return Ok(false);
        }

        let result = self.registry.remove(name).await;
        if result.is_ok() {
            self.presenter.notify(&Notice::info(format!("deleted {}", name)));
        }
        self.surface(result).map(|()| true)
    }

    /// User-requested reload; like every refresh, failure keeps the old listing.
    pub async fn refresh_downloads(&self) -> AppResult<Vec<DownloadedFile>> {
        self.registry.refresh().await
    }

    /// Stops tracking the current task.
    pub fn cancel(&self) {
        self.poller.disarm();
    }

    pub fn artifact_url(&self, name: &str) -> AppResult<Url> {
        self.registry.artifact_url(name)
    }

    pub fn video_info(&self) -> Option<VideoInfo> {
        self.submission.video_info()
    }

    pub fn poller(&self) -> &ProgressPoller {
        &self.poller
    }

    pub fn registry(&self) -> &DownloadRegistry {
        &self.registry
    }

    fn surface<T>(&self, result: AppResult<T>) -> AppResult<T> {
        if let Err(e) = &result {
            self.presenter.notify(&Notice::from_error(e));
        }
        result
    }
}

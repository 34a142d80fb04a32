//! TaskSubmissionService — validates input, looks up videos, submits tasks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::api::types::{DownloadTask, FormatSelector, SubmitRequest, TaskId, VideoInfo};
use crate::api::Gateway;
use crate::core::error::{AppError, AppResult};
use crate::presentation::{Control, PresentationPort};
use crate::task::poller::ProgressPoller;

pub const EMPTY_URL_MESSAGE: &str = "please enter a video URL";
pub const BUSY_MESSAGE: &str = "a download is already in progress";

/// The "submit in flight" flag, mirrored to the presenter's submit control.
///
/// Taken by the submission service, released by the poller on a terminal
/// snapshot or disarm, or by the service when the submit call fails.
#[derive(Clone)]
pub struct SubmitLatch {
    busy: Arc<AtomicBool>,
    presenter: Arc<dyn PresentationPort>,
}

impl SubmitLatch {
    pub fn new(presenter: Arc<dyn PresentationPort>) -> Self {
        Self {
            busy: Arc::new(AtomicBool::new(false)),
            presenter,
        }
    }

    /// Marks the control busy. False if it already was.
    pub fn try_acquire(&self) -> bool {
        let acquired = self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if acquired {
            self.presenter.set_busy(Control::Submit, true);
        }
        acquired
    }

    pub fn release(&self) {
        if self.busy.swap(false, Ordering::SeqCst) {
            self.presenter.set_busy(Control::Submit, false);
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }
}

/// Most recent lookup result.
#[derive(Clone, Default)]
pub struct VideoInfoSlot(Arc<Mutex<Option<VideoInfo>>>);

impl VideoInfoSlot {
    pub fn get(&self) -> Option<VideoInfo> {
        self.lock().clone()
    }

    pub fn replace(&self, info: VideoInfo) {
        *self.lock() = Some(info);
    }

    pub fn clear(&self) {
        self.lock().take();
    }

    fn lock(&self) -> MutexGuard<'_, Option<VideoInfo>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct TaskSubmissionService {
    gateway: Arc<dyn Gateway>,
    presenter: Arc<dyn PresentationPort>,
    poller: ProgressPoller,
    latch: SubmitLatch,
    video_info: VideoInfoSlot,
}

impl TaskSubmissionService {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        presenter: Arc<dyn PresentationPort>,
        poller: ProgressPoller,
        latch: SubmitLatch,
        video_info: VideoInfoSlot,
    ) -> Self {
        Self {
            gateway,
            presenter,
            poller,
            latch,
            video_info,
        }
    }

    /// Fetches metadata for `url` and caches it.
    ///
    /// Empty input fails before any remote call. The previous result is
    /// dropped as soon as a new lookup starts.
    pub async fn lookup_video(&self, url: &str) -> AppResult<VideoInfo> {
        let url = validate_url(url)?;
        self.video_info.clear();

        self.presenter.set_busy(Control::Lookup, true);
        let result = self.gateway.video_info(url).await;
        self.presenter.set_busy(Control::Lookup, false);

        let info = result?;
        log::info!("Looked up {}: {} ({} formats)", url, info.title, info.formats.len());
        self.video_info.replace(info.clone());
        self.presenter.show_video_info(Some(&info));
        Ok(info)
    }

    /// Creates a download task and arms the poller before returning.
    ///
    /// Rejected locally when the URL is empty or another task is in flight.
    /// The submit control stays busy until the task reaches a terminal
    /// state; a failed submit releases it right away.
    pub async fn submit_download(&self, url: &str, format: FormatSelector, audio_only: bool) -> AppResult<TaskId> {
        let url = validate_url(url)?;
        if !self.latch.try_acquire() {
            return Err(AppError::Validation(BUSY_MESSAGE.to_string()));
        }

        let request = SubmitRequest {
            url: url.to_string(),
            format_id: format,
            audio_only,
        };
        let task_id = match self.gateway.submit(&request).await {
            Ok(id) => id,
            Err(e) => {
                log::warn!("Submit failed for {}: {}", url, e);
                self.latch.release();
                return Err(e);
            }
        };

        log::info!(
            "Submitted {} as task {} (format {}, audio_only={})",
            url,
            task_id,
            request.format_id,
            audio_only
        );
        self.poller.arm(DownloadTask::new(task_id.clone(), request));
        Ok(task_id)
    }

    pub fn video_info(&self) -> Option<VideoInfo> {
        self.video_info.get()
    }

    pub fn is_busy(&self) -> bool {
        self.latch.is_busy()
    }
}

/// Trims `url`; empty or whitespace-only input is a validation error.
pub fn validate_url(url: &str) -> AppResult<&str> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(EMPTY_URL_MESSAGE.to_string()));
    }
    Ok(trimmed)
}

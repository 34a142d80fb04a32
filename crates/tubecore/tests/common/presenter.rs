//! Presenter that records everything it is shown

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tubecore::api::types::{DownloadedFile, ProgressSnapshot, VideoInfo};
use tubecore::{Control, Notice, NoticeKind, PresentationPort};

/// One call made on the presenter, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Shown {
    VideoInfo(Option<String>),
    Progress(ProgressSnapshot),
    Downloads(Vec<String>),
    Notice(Notice),
    Busy(Control, bool),
    ConfirmAsked(String),
}

pub struct RecordingPresenter {
    log: Mutex<Vec<Shown>>,
    confirm: AtomicBool,
}

impl RecordingPresenter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            log: Mutex::new(Vec::new()),
            confirm: AtomicBool::new(true),
        })
    }

    /// Answer for the next delete confirmations.
    pub fn set_confirm(&self, answer: bool) {
        self.confirm.store(answer, Ordering::SeqCst);
    }

    pub fn all(&self) -> Vec<Shown> {
        self.log.lock().unwrap().clone()
    }

    pub fn progress(&self) -> Vec<ProgressSnapshot> {
        self.all()
            .into_iter()
            .filter_map(|s| match s {
                Shown::Progress(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.all()
            .into_iter()
            .filter_map(|s| match s {
                Shown::Notice(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    pub fn notices_of(&self, kind: NoticeKind) -> Vec<String> {
        self.notices()
            .into_iter()
            .filter(|n| n.kind == kind)
            .map(|n| n.message)
            .collect()
    }

    /// Every listing shown, oldest first.
    pub fn listings(&self) -> Vec<Vec<String>> {
        self.all()
            .into_iter()
            .filter_map(|s| match s {
                Shown::Downloads(names) => Some(names),
                _ => None,
            })
            .collect()
    }

    pub fn busy_changes(&self, control: Control) -> Vec<bool> {
        self.all()
            .into_iter()
            .filter_map(|s| match s {
                Shown::Busy(c, busy) if c == control => Some(busy),
                _ => None,
            })
            .collect()
    }

    fn record(&self, shown: Shown) {
        self.log.lock().unwrap().push(shown);
    }
}

impl PresentationPort for RecordingPresenter {
    fn show_video_info(&self, info: Option<&VideoInfo>) {
        self.record(Shown::VideoInfo(info.map(|i| i.title.clone())));
    }

    fn show_progress(&self, snapshot: &ProgressSnapshot) {
        self.record(Shown::Progress(snapshot.clone()));
    }

    fn show_downloads(&self, files: &[DownloadedFile]) {
        self.record(Shown::Downloads(files.iter().map(|f| f.name.clone()).collect()));
    }

    fn notify(&self, notice: &Notice) {
        self.record(Shown::Notice(notice.clone()));
    }

    fn set_busy(&self, control: Control, busy: bool) {
        self.record(Shown::Busy(control, busy));
    }

    fn confirm_delete(&self, name: &str) -> bool {
        self.record(Shown::ConfirmAsked(name.to_string()));
        self.confirm.load(Ordering::SeqCst)
    }
}

//! Scripted in-memory gateway
//!
//! Progress answers are scripted per task id and consumed one per call.
//! Once a script runs dry the gateway answers 404, which the poller treats
//! like any other failed tick.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::Instant;
use url::Url;

use tubecore::api::types::{DownloadedFile, ProgressSnapshot, SubmitRequest, TaskId, VideoInfo};
use tubecore::{AppError, Gateway};

/// One scripted answer to a progress query.
#[derive(Debug, Clone)]
pub enum Step {
    /// Answer with this body right away
    Reply(Value),
    /// Answer with this body after a delay
    Slow(Duration, Value),
    /// A body that does not decode
    Garbage,
    /// Service answered non-2xx
    Fail(u16, Option<String>),
}

/// A remote failure to replay: status plus optional server message.
type Failure = (u16, Option<String>);

pub struct FakeGateway {
    info: Mutex<Result<Value, Failure>>,
    task_ids: Mutex<VecDeque<Result<String, Failure>>>,
    progress: Mutex<HashMap<String, VecDeque<Step>>>,
    files: Mutex<Vec<DownloadedFile>>,
    list_fails: AtomicBool,
    delete_failure: Mutex<Option<Failure>>,

    pub info_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    submitted: Mutex<Vec<SubmitRequest>>,
    progress_calls: Mutex<Vec<(String, Instant)>>,
}

impl FakeGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            info: Mutex::new(Err((500, None))),
            task_ids: Mutex::new(VecDeque::new()),
            progress: Mutex::new(HashMap::new()),
            files: Mutex::new(Vec::new()),
            list_fails: AtomicBool::new(false),
            delete_failure: Mutex::new(None),
            info_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
            submitted: Mutex::new(Vec::new()),
            progress_calls: Mutex::new(Vec::new()),
        })
    }

    pub fn set_info(&self, body: Value) {
        *self.info.lock().unwrap() = Ok(body);
    }

    pub fn fail_info(&self, status: u16, message: Option<&str>) {
        *self.info.lock().unwrap() = Err((status, message.map(str::to_string)));
    }

    /// Next submit answers with `id`.
    pub fn queue_task(&self, id: &str) {
        self.task_ids.lock().unwrap().push_back(Ok(id.to_string()));
    }

    /// Next submit fails.
    pub fn queue_submit_failure(&self, status: u16, message: Option<&str>) {
        self.task_ids
            .lock()
            .unwrap()
            .push_back(Err((status, message.map(str::to_string))));
    }

    pub fn script(&self, task_id: &str, steps: Vec<Step>) {
        self.progress
            .lock()
            .unwrap()
            .entry(task_id.to_string())
            .or_default()
            .extend(steps);
    }

    pub fn set_files(&self, files: Vec<DownloadedFile>) {
        *self.files.lock().unwrap() = files;
    }

    pub fn set_list_fails(&self, fails: bool) {
        self.list_fails.store(fails, Ordering::SeqCst);
    }

    pub fn fail_delete(&self, status: u16, message: Option<&str>) {
        *self.delete_failure.lock().unwrap() = Some((status, message.map(str::to_string)));
    }

    pub fn submitted(&self) -> Vec<SubmitRequest> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn progress_calls(&self) -> Vec<(String, Instant)> {
        self.progress_calls.lock().unwrap().clone()
    }

    /// Progress queries issued for `task_id`.
    pub fn progress_calls_for(&self, task_id: &str) -> usize {
        self.progress_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == task_id)
            .count()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn remote((status, message): Failure, generic: &str) -> AppError {
        AppError::remote(Some(status), message, generic)
    }
}

#[async_trait]
impl Gateway for FakeGateway {
    async fn video_info(&self, _url: &str) -> Result<VideoInfo, AppError> {
        self.info_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.info.lock().unwrap().clone();
        match scripted {
            Ok(body) => Ok(serde_json::from_value(body)?),
            Err(failure) => Err(Self::remote(failure, "failed to fetch video info")),
        }
    }

    async fn submit(&self, request: &SubmitRequest) -> Result<TaskId, AppError> {
        self.submitted.lock().unwrap().push(request.clone());
        let next = self.task_ids.lock().unwrap().pop_front();
        match next {
            Some(Ok(id)) => Ok(TaskId::new(id)),
            Some(Err(failure)) => Err(Self::remote(failure, "download failed")),
            None => Err(Self::remote((500, None), "download failed")),
        }
    }

    async fn progress(&self, task_id: &TaskId) -> Result<ProgressSnapshot, AppError> {
        self.progress_calls
            .lock()
            .unwrap()
            .push((task_id.to_string(), Instant::now()));
        let step = self
            .progress
            .lock()
            .unwrap()
            .get_mut(task_id.as_str())
            .and_then(VecDeque::pop_front);

        match step {
            Some(Step::Reply(body)) => Ok(serde_json::from_value(body)?),
            Some(Step::Slow(delay, body)) => {
                tokio::time::sleep(delay).await;
                Ok(serde_json::from_value(body)?)
            }
            Some(Step::Garbage) => Ok(serde_json::from_str("<html>502 Bad Gateway</html>")?),
            Some(Step::Fail(status, message)) => Err(Self::remote((status, message), "failed to fetch progress")),
            None => Err(Self::remote((404, Some("task not found".into())), "failed to fetch progress")),
        }
    }

    async fn list_downloads(&self) -> Result<Vec<DownloadedFile>, AppError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.list_fails.load(Ordering::SeqCst) {
            return Err(Self::remote((500, None), "failed to list downloads"));
        }
        Ok(self.files.lock().unwrap().clone())
    }

    async fn delete_download(&self, name: &str) -> Result<(), AppError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let failure = self.delete_failure.lock().unwrap().clone();
        if let Some(failure) = failure {
            return Err(Self::remote(failure, "delete failed"));
        }
        let mut files = self.files.lock().unwrap();
        let before = files.len();
        files.retain(|f| f.name != name);
        if files.len() == before {
            return Err(Self::remote((404, Some("file not found".into())), "delete failed"));
        }
        Ok(())
    }

    fn artifact_url(&self, name: &str) -> Result<Url, AppError> {
        Ok(Url::parse("http://fake.local/download/")?.join(&urlencoding::encode(name))?)
    }
}

//! Data exchanged with the download service.
//!
//! Responses are decoded into immutable values and normalised on the way
//! in: zero or null sizes, rates and ETAs become `None`, empty strings
//! become `None`, and a progress error message only survives when the
//! status is `error`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use strum::{AsRefStr, Display, EnumString};

/// Maximum number of video formats offered in the selection menu.
pub const MAX_VIDEO_CHOICES: usize = 10;
/// Maximum number of audio formats offered in the selection menu.
pub const MAX_AUDIO_CHOICES: usize = 5;
/// The service keeps at most this many log lines per snapshot.
pub const MAX_LOG_LINES: usize = 10;

/// Message used when an `error` snapshot carries no text.
const GENERIC_TASK_ERROR: &str = "download failed";

/// Opaque, server-assigned task identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ======================== Video info ========================

/// One downloadable format reported by the info lookup.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FormatOption {
    pub format_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ext: String,
    /// e.g. "1920x1080" or "audio only"
    #[serde(default, deserialize_with = "non_empty_string")]
    pub resolution: Option<String>,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub format_note: Option<String>,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub vcodec: Option<String>,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub acodec: Option<String>,
    #[serde(default, deserialize_with = "positive_f64")]
    pub fps: Option<f64>,
    /// Total bitrate in kbit/s
    #[serde(default, deserialize_with = "positive_f64")]
    pub tbr: Option<f64>,
    #[serde(default, deserialize_with = "positive_u64")]
    pub filesize: Option<u64>,
}

impl FormatOption {
    /// True when the format carries a video track.
    ///
    /// A missing `vcodec` counts as "has video"; only an explicit `none`
    /// or an "audio only" resolution marks an audio format.
    pub fn has_video(&self) -> bool {
        let no_codec = self.vcodec.as_deref() == Some("none");
        let audio_res = self.resolution.as_deref() == Some("audio only");
        !no_codec && !audio_res
    }

    pub fn is_audio_only(&self) -> bool {
        !self.has_video()
    }

    /// Resolution for video formats; bitrate ("130kbps") for audio,
    /// falling back to the quality note.
    pub fn quality_label(&self) -> Option<String> {
        if self.has_video() {
            return self.resolution.clone().or_else(|| self.format_note.clone());
        }
        match self.tbr {
            Some(tbr) => Some(format!("{}kbps", tbr.round() as u64)),
            None => self.format_note.clone(),
        }
    }
}

/// Formats grouped for a selection list, best bitrate first.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatMenu<'a> {
    pub video: Vec<&'a FormatOption>,
    pub audio: Vec<&'a FormatOption>,
}

/// Metadata for one video, as returned by the info lookup.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VideoInfo {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub uploader: String,
    /// Length in seconds
    #[serde(default, deserialize_with = "positive_f64")]
    pub duration: Option<f64>,
    #[serde(default, deserialize_with = "positive_u64")]
    pub view_count: Option<u64>,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub thumbnail: Option<String>,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub webpage_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub formats: Vec<FormatOption>,
}

impl VideoInfo {
    /// Splits the formats into video and audio groups for selection.
    pub fn format_menu(&self) -> FormatMenu<'_> {
        let (mut video, mut audio): (Vec<&FormatOption>, Vec<&FormatOption>) =
            self.formats.iter().partition(|f| f.has_video());

        let by_bitrate_desc = |a: &&FormatOption, b: &&FormatOption| {
            b.tbr.unwrap_or(0.0).total_cmp(&a.tbr.unwrap_or(0.0))
        };
        video.sort_by(by_bitrate_desc);
        audio.sort_by(by_bitrate_desc);
        video.truncate(MAX_VIDEO_CHOICES);
        audio.truncate(MAX_AUDIO_CHOICES);

        FormatMenu { video, audio }
    }

    pub fn find_format(&self, format_id: &str) -> Option<&FormatOption> {
        self.formats.iter().find(|f| f.format_id == format_id)
    }
}

// ======================== Download submission ========================

/// Which format the service should download.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FormatSelector {
    /// Let the service pick the best available format
    #[default]
    Best,
    /// A specific `format_id` from the info lookup
    Id(String),
}

impl FormatSelector {
    pub const BEST: &'static str = "best";

    /// Parses user input; empty input and `best` both mean `Best`.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == Self::BEST {
            FormatSelector::Best
        } else {
            FormatSelector::Id(trimmed.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FormatSelector::Best => Self::BEST,
            FormatSelector::Id(id) => id,
        }
    }
}

impl fmt::Display for FormatSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FormatSelector {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Body of `POST /api/download`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitRequest {
    pub url: String,
    pub format_id: FormatSelector,
    pub audio_only: bool,
}

/// Body of `POST /api/info`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct InfoRequest<'a> {
    pub url: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitResponse {
    pub task_id: TaskId,
}

/// One download job as the client tracks it.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadTask {
    pub id: TaskId,
    pub url: String,
    pub format: FormatSelector,
    pub audio_only: bool,
}

impl DownloadTask {
    pub fn new(id: TaskId, request: SubmitRequest) -> Self {
        Self {
            id,
            url: request.url,
            format: request.format_id,
            audio_only: request.audio_only,
        }
    }
}

// ======================== Progress ========================

/// Server-side task status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TaskStatus {
    Starting,
    Downloading,
    Processing,
    Completed,
    Error,
}

impl TaskStatus {
    /// `completed` and `error` end the polling session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Error)
    }
}

/// One immutable progress report for a task.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawProgress")]
pub struct ProgressSnapshot {
    pub status: TaskStatus,
    /// Percent complete, clamped to 0–100
    pub progress: f64,
    /// Bytes per second
    pub speed: Option<f64>,
    /// Seconds remaining
    pub eta: Option<f64>,
    pub downloaded: u64,
    pub total: Option<u64>,
    pub filename: Option<String>,
    /// Most recent log lines, oldest first
    pub logs: Vec<String>,
    /// Present iff `status` is `Error`
    pub error: Option<String>,
}

impl ProgressSnapshot {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// The last `n` log lines.
    pub fn recent_logs(&self, n: usize) -> &[String] {
        let start = self.logs.len().saturating_sub(n);
        &self.logs[start..]
    }
}

#[derive(Deserialize)]
struct RawProgress {
    status: TaskStatus,
    #[serde(default, deserialize_with = "lenient_f64")]
    progress: Option<f64>,
    #[serde(default, deserialize_with = "positive_f64")]
    speed: Option<f64>,
    #[serde(default, deserialize_with = "positive_f64")]
    eta: Option<f64>,
    #[serde(default, deserialize_with = "positive_u64")]
    downloaded: Option<u64>,
    #[serde(default, deserialize_with = "positive_u64")]
    total: Option<u64>,
    #[serde(default, deserialize_with = "non_empty_string")]
    filename: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    logs: Vec<String>,
    #[serde(default, deserialize_with = "non_empty_string")]
    error: Option<String>,
}

impl From<RawProgress> for ProgressSnapshot {
    fn from(raw: RawProgress) -> Self {
        let error = match raw.status {
            TaskStatus::Error => Some(raw.error.unwrap_or_else(|| GENERIC_TASK_ERROR.to_string())),
            _ => None,
        };
        let mut logs = raw.logs;
        if logs.len() > MAX_LOG_LINES {
            logs.drain(..logs.len() - MAX_LOG_LINES);
        }

        Self {
            status: raw.status,
            progress: raw.progress.unwrap_or(0.0).clamp(0.0, 100.0),
            speed: raw.speed,
            eta: raw.eta,
            downloaded: raw.downloaded.unwrap_or(0),
            total: raw.total,
            filename: raw.filename,
            logs,
            error,
        }
    }
}

// ======================== Artifacts ========================

/// A completed file stored on the service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DownloadedFile {
    pub name: String,
    #[serde(default, deserialize_with = "positive_u64")]
    size: Option<u64>,
    /// Modification time (Unix seconds), when reported
    #[serde(default, rename = "mtime", deserialize_with = "positive_f64")]
    pub modified: Option<f64>,
}

impl DownloadedFile {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size: Some(size),
            modified: None,
        }
    }

    /// Size in bytes
    pub fn size(&self) -> u64 {
        self.size.unwrap_or(0)
    }
}

/// Error body carried by non-2xx responses.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: Option<Value>,
}

impl ErrorBody {
    /// The error text, if the field is a non-empty string.
    pub fn message(self) -> Option<String> {
        match self.error {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
            _ => None,
        }
    }
}

// ======================== Lenient field decoders ========================
//
// The service fills unknown values with 0, "" or null depending on the
// field. These collapse all of them into `None`.

fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.and_then(|v| match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }))
}

fn positive_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(lenient_f64(d)?.filter(|v| v.is_finite() && *v > 0.0))
}

fn positive_u64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
    Ok(positive_f64(d)?.map(|v| v.round() as u64).filter(|v| *v > 0))
}

fn non_empty_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = Option::<String>::deserialize(d)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// Absent and `null` both decode to the type's default.
fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

//! ConsolePresenter — renders core state as plain terminal lines

use std::io::{self, BufRead, Write};

use tubecore::api::types::{DownloadedFile, FormatOption, ProgressSnapshot, TaskStatus, VideoInfo};
use tubecore::{Control, Notice, NoticeKind, PresentationPort};

use crate::format::{format_bytes, format_duration, format_eta, format_views};

/// Log lines shown under each progress line
const LOG_TAIL: usize = 3;

pub struct ConsolePresenter {
    /// Answer "yes" to delete confirmations without asking
    auto_confirm: bool,
}

impl ConsolePresenter {
    pub fn new(auto_confirm: bool) -> Self {
        Self { auto_confirm }
    }
}

impl PresentationPort for ConsolePresenter {
    fn show_video_info(&self, info: Option<&VideoInfo>) {
        if let Some(info) = info {
            print!("{}", render_video_info(info));
        }
    }

    fn show_progress(&self, snapshot: &ProgressSnapshot) {
        println!("{}", render_progress(snapshot));
        for line in snapshot.recent_logs(LOG_TAIL) {
            println!("    {}", line);
        }
    }

    fn show_downloads(&self, files: &[DownloadedFile]) {
        print!("{}", render_downloads(files));
    }

    fn notify(&self, notice: &Notice) {
        match notice.kind {
            NoticeKind::Info => println!("{}", notice.message),
            NoticeKind::Validation | NoticeKind::Remote => eprintln!("error: {}", notice.message),
        }
    }

    fn set_busy(&self, control: Control, busy: bool) {
        log::debug!("{} busy={}", control, busy);
    }

    fn confirm_delete(&self, name: &str) -> bool {
        if self.auto_confirm {
            return true;
        }

        print!("Delete {}? [y/N] ", name);
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => is_yes(&answer),
            Err(e) => {
                log::warn!("Failed to read confirmation: {}", e);
                false
            }
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

fn render_video_info(info: &VideoInfo) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", info.title));
    out.push_str(&format!(
        "  by {} | {} | {} views\n",
        info.uploader,
        format_duration(info.duration),
        format_views(info.view_count)
    ));
    if let Some(url) = &info.webpage_url {
        out.push_str(&format!("  {}\n", url));
    }

    let menu = info.format_menu();
    out.push_str("\nFormats:\n  best      best available (default)\n");
    if !menu.video.is_empty() {
        out.push_str("  video:\n");
        for format in &menu.video {
            out.push_str(&render_format(format));
        }
    }
    if !menu.audio.is_empty() {
        out.push_str("  audio:\n");
        for format in &menu.audio {
            out.push_str(&render_format(format));
        }
    }
    out
}

fn render_format(format: &FormatOption) -> String {
    let label = format.quality_label().unwrap_or_else(|| "-".to_string());
    let mut line = format!("    {:<8} {:<5} {}", format.format_id, format.ext, label);
    if let Some(size) = format.filesize {
        line.push_str(&format!(" ({})", format_bytes(size as f64)));
    }
    line.push('\n');
    line
}

fn render_progress(snapshot: &ProgressSnapshot) -> String {
    let mut line = format!("{:>5.1}%", snapshot.progress);
    if let Some(speed) = snapshot.speed {
        line.push_str(&format!("  {}/s", format_bytes(speed)));
    }
    if snapshot.eta.is_some() {
        line.push_str(&format!("  ETA {}", format_eta(snapshot.eta)));
    }
    if let Some(total) = snapshot.total {
        line.push_str(&format!(
            "  {} / {}",
            format_bytes(snapshot.downloaded as f64),
            format_bytes(total as f64)
        ));
    }
    line.push_str("  ");
    line.push_str(&status_text(snapshot));
    line
}

fn status_text(snapshot: &ProgressSnapshot) -> String {
    match snapshot.status {
        TaskStatus::Starting => "starting...".to_string(),
        TaskStatus::Downloading => {
            let name = snapshot.filename.as_deref().unwrap_or("");
            format!("downloading {}", name).trim_end().to_string()
        }
        TaskStatus::Processing => "processing...".to_string(),
        TaskStatus::Completed => "done".to_string(),
        TaskStatus::Error => format!("failed: {}", snapshot.error.as_deref().unwrap_or("")),
    }
}

fn render_downloads(files: &[DownloadedFile]) -> String {
    if files.is_empty() {
        return "No downloaded files\n".to_string();
    }
    files
        .iter()
        .map(|f| format!("{:>10}  {}\n", format_bytes(f.size() as f64), f.name))
        .collect()
}

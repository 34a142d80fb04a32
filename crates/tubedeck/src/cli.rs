use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tubedeck")]
#[command(author, version, about = "Terminal front-end for a remote yt-dlp download service", long_about = None)]
pub struct Cli {
    /// Base URL of the download service (overrides TUBEDECK_SERVER_URL)
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// Log level: error, warn, info, debug, trace (overrides TUBEDECK_LOG_LEVEL)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show title, uploader and available formats for a video
    Info {
        /// Video page URL
        url: String,
    },

    /// Start a download and follow its progress until it finishes
    Download {
        /// Video page URL
        url: String,

        /// Format id from `info`; defaults to the best available
        #[arg(short, long, default_value = "best")]
        format: String,

        /// Extract audio only
        #[arg(short, long)]
        audio: bool,
    },

    /// List files stored on the service
    List,

    /// Delete a stored file
    Delete {
        /// File name as shown by `list`
        name: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Print the download link for a stored file
    Link {
        /// File name as shown by `list`
        name: String,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

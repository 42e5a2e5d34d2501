use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::archive::ExtractOptions;
use crate::fetch::{DEFAULT_USER_AGENT, FetchOptions};

/// Command-line arguments, modelled on `unzip`.
#[derive(Parser, Debug)]
#[command(name = "zipfetch")]
#[command(version)]
#[command(about = "Download a ZIP archive over HTTP(S) and extract it", long_about = None)]
#[command(after_help = "Examples:\n  \
  zipfetch https://github.com/richgel999/miniz/archive/master.zip -d /tmp/some_folder\n  \
  zipfetch -l https://example.com/archive.zip     list files of a remote ZIP\n  \
  zipfetch -j -d out https://example.com/a.zip    extract without the top-level folder")]
pub struct Cli {
    /// HTTP or HTTPS URL of the ZIP archive
    #[arg(value_name = "URL")]
    pub url: String,

    /// Extract files into exdir
    #[arg(short = 'd', value_name = "DIR", default_value = ".")]
    pub extract_dir: PathBuf,

    /// List files (short format)
    #[arg(short = 'l')]
    pub list: bool,

    /// List verbosely
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Strip the archive's top-level folder
    #[arg(short = 'j', long = "strip-root")]
    pub strip_root: bool,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,

    /// Whole-request timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 300)]
    pub timeout: u64,

    /// User-Agent header sent with the request
    #[arg(long, value_name = "UA", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Refuse redirects to another host
    #[arg(long)]
    pub same_origin: bool,
}

impl Cli {
    /// Only `http://` and `https://` URLs are fetched.
    pub fn is_http_url(&self) -> bool {
        self.url.starts_with("http://") || self.url.starts_with("https://")
    }

    /// `-l` or `-v` lists entries instead of extracting them.
    pub fn is_listing(&self) -> bool {
        self.list || self.verbose
    }

    /// `-q` hides the list of extracted files.
    pub fn is_quiet(&self) -> bool {
        self.quiet > 0
    }

    /// `-qq` also hides the progress bar.
    pub fn is_very_quiet(&self) -> bool {
        self.quiet > 1
    }

    /// HTTP client settings selected by the flags.
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            user_agent: self.user_agent.clone(),
            timeout: Duration::from_secs(self.timeout),
            allow_cross_origin_redirects: !self.same_origin,
            ..FetchOptions::default()
        }
    }

    /// Extraction settings selected by the flags.
    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            strip_root_folder: self.strip_root,
        }
    }
}

//! Buffered HTTP(S) download of an archive.
//!
//! A [`Fetcher`] issues exactly one GET per [`Fetcher::fetch`] call and
//! resolves to the complete response body. Progress goes to an optional
//! channel; redirects are re-checked hop by hop by [`check_redirect`].

mod progress;
mod redirect;

pub use progress::{Progress, ProgressReceiver, ProgressSender, progress_channel};
pub use redirect::{RedirectRejected, check_redirect};

use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::{Client, Url};

use crate::error::{Error, Result};

/// Client identifier sent unless overridden.
pub const DEFAULT_USER_AGENT: &str = concat!("zipfetch/", env!("CARGO_PKG_VERSION"));

/// Upper bound on the body buffer reserved from `Content-Length`.
const MAX_PREALLOC: u64 = 64 * 1024 * 1024;

/// HTTP client settings.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub user_agent: String,
    /// Limit for the whole request, body included.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub max_redirects: usize,
    /// Follow redirects to another scheme/host/port. GitHub archive links
    /// need this.
    pub allow_cross_origin_redirects: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(300),
            connect_timeout: Duration::from_secs(30),
            max_redirects: 10,
            allow_cross_origin_redirects: true,
        }
    }
}

/// Downloads whole response bodies into memory.
///
/// Cloning is cheap and clones share the connection pool.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    /// Build the HTTP client described by `options`.
    ///
    /// # Errors
    ///
    /// [`Error::Client`] if the TLS backend cannot be initialized.
    pub fn new(options: FetchOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(options.user_agent.clone())
            .timeout(options.timeout)
            .connect_timeout(options.connect_timeout)
            .redirect(redirect::policy(
                options.max_redirects,
                options.allow_cross_origin_redirects,
            ))
            .build()
            .map_err(Error::Client)?;

        Ok(Self { client })
    }

    /// GET `url` and return the full body.
    ///
    /// When `progress` is given, one [`Progress`] is sent per received
    /// chunk.
    ///
    /// # Errors
    ///
    /// [`Error::Network`] on transport failures, timeouts and rejected
    /// redirects; [`Error::Status`] on a non-2xx response.
    pub async fn fetch(&self, url: &Url, progress: Option<&ProgressSender>) -> Result<Vec<u8>> {
        let network = |source| Error::Network {
            url: url.clone(),
            source,
        };

        tracing::debug!(%url, "fetching archive");
        let mut response = self
            .client
            .get(url.clone())
            .header(ACCEPT, "*/*")
            .send()
            .await
            .map_err(network)?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%url, %status, "download failed");
            return Err(Error::Status {
                url: url.clone(),
                status,
            });
        }

        let total = response.content_length();
        let mut body = Vec::with_capacity(total.unwrap_or(0).min(MAX_PREALLOC) as usize);

        while let Some(chunk) = response.chunk().await.map_err(network)? {
            body.extend_from_slice(&chunk);
            progress::report(progress, body.len() as u64, total);
        }

        tracing::info!(%url, bytes = body.len(), "archive downloaded");
        Ok(body)
    }
}

//! Download-then-extract entry points.
//!
//! The archive is fully buffered before it is parsed. Parsing, decompression
//! and file writes are synchronous, so they run on tokio's blocking pool
//! rather than on the task that awaited the download.

use std::path::{Path, PathBuf};

use reqwest::Url;
use tokio::task::JoinHandle;

use crate::archive::{self, ExtractOptions, ExtractReport, ExtractedBlob};
use crate::error::{Error, Result};
use crate::fetch::{FetchOptions, Fetcher, ProgressSender, progress_channel};

/// A configured download-and-extract pipeline.
#[derive(Debug, Clone)]
pub struct Downloader {
    fetcher: Fetcher,
    extract_options: ExtractOptions,
}

impl Downloader {
    /// Build a pipeline around a new [`Fetcher`].
    ///
    /// # Errors
    ///
    /// [`Error::Client`] if the HTTP client cannot be built.
    pub fn new(fetch_options: FetchOptions, extract_options: ExtractOptions) -> Result<Self> {
        Ok(Self {
            fetcher: Fetcher::new(fetch_options)?,
            extract_options,
        })
    }

    /// The underlying HTTP client, for downloads that are not extracted.
    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    /// Download the archive at `url` and extract it under `destination`.
    ///
    /// The progress sender is dropped before this returns, so a receiver sees
    /// its stream end once the download is over.
    pub async fn download_and_extract(
        &self,
        url: &Url,
        destination: &Path,
        progress: Option<ProgressSender>,
    ) -> Result<ExtractReport> {
        let data = self.fetcher.fetch(url, progress.as_ref()).await?;
        drop(progress);

        let destination = destination.to_path_buf();
        let options = self.extract_options.clone();
        let report = tokio::task::spawn_blocking(move || {
            archive::extract_to_disk(&data, &destination, &options)
        })
        .await??;

        Ok(report)
    }

    /// Download the archive at `url` and decompress its files into memory.
    pub async fn download_to_memory(
        &self,
        url: &Url,
        progress: Option<ProgressSender>,
    ) -> Result<Vec<ExtractedBlob>> {
        let data = self.fetcher.fetch(url, progress.as_ref()).await?;
        drop(progress);

        let blobs = tokio::task::spawn_blocking(move || archive::unzip_all_files_to_memory(&data))
            .await?;
        Ok(blobs)
    }

    /// Run [`download_and_extract`](Self::download_and_extract) on a new task
    /// and report through callbacks.
    ///
    /// Every `on_progress` call happens before the terminal callback, and
    /// exactly one of `on_success` and `on_error` runs. Aborting the returned
    /// handle cancels the operation without calling either.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_with_callbacks<S, P, E>(
        &self,
        url: Url,
        destination: PathBuf,
        on_success: S,
        mut on_progress: P,
        on_error: E,
    ) -> JoinHandle<()>
    where
        S: FnOnce(ExtractReport) + Send + 'static,
        P: FnMut(u64, Option<u64>) + Send + 'static,
        E: FnOnce(Error) + Send + 'static,
    {
        let downloader = self.clone();

        tokio::spawn(async move {
            let (tx, mut rx) = progress_channel();
            let work = downloader.download_and_extract(&url, &destination, Some(tx));
            tokio::pin!(work);

            let result = loop {
                tokio::select! {
                    result = &mut work => break result,
                    Some(progress) = rx.recv() => on_progress(progress.received, progress.total),
                }
            };

            while let Ok(progress) = rx.try_recv() {
                on_progress(progress.received, progress.total);
            }

            match result {
                Ok(report) => on_success(report),
                Err(err) => on_error(err),
            }
        })
    }
}

/// Download `url` and extract it under `destination` with default settings.
pub async fn download_and_extract(
    url: &Url,
    destination: impl AsRef<Path>,
) -> Result<ExtractReport> {
    Downloader::new(FetchOptions::default(), ExtractOptions::default())?
        .download_and_extract(url, destination.as_ref(), None)
        .await
}

/// Callback flavour of [`download_and_extract`].
///
/// Client construction errors are delivered to `on_error` as well.
pub fn spawn_download_and_extract<S, E>(
    url: Url,
    destination: PathBuf,
    on_success: S,
    on_error: E,
) -> JoinHandle<()>
where
    S: FnOnce(ExtractReport) + Send + 'static,
    E: FnOnce(Error) + Send + 'static,
{
    spawn_download_and_extract_with_progress(url, destination, on_success, |_, _| {}, on_error)
}

/// [`spawn_download_and_extract`] with a progress callback receiving
/// `(bytes_received, bytes_total)`.
pub fn spawn_download_and_extract_with_progress<S, P, E>(
    url: Url,
    destination: PathBuf,
    on_success: S,
    on_progress: P,
    on_error: E,
) -> JoinHandle<()>
where
    S: FnOnce(ExtractReport) + Send + 'static,
    P: FnMut(u64, Option<u64>) + Send + 'static,
    E: FnOnce(Error) + Send + 'static,
{
    match Downloader::new(FetchOptions::default(), ExtractOptions::default()) {
        Ok(downloader) => {
            downloader.spawn_with_callbacks(url, destination, on_success, on_progress, on_error)
        }
        Err(err) => tokio::spawn(async move { on_error(err) }),
    }
}

pub mod fetch;
pub mod sequential;

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::{Client, Url};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::catalog::resolve_uri;
use crate::download_stream::{Event, Reporter};
use crate::error::{Error, Result};
use crate::merge::Merger;
use crate::playlist::{parse_media_playlist, MediaPlaylist, Variant};

use fetch::{fetch_text, HttpSource, RetryPolicy, SegmentFetcher, DEFAULT_TIMEOUT};
use sequential::SequentialDownloader;

/// Downloads and parses the media playlist of a variant, segment uris are
/// made absolute against the playlist url.
pub async fn fetch_media_playlist(http: &Client, variant: &Variant) -> Result<MediaPlaylist> {
    let url = Url::parse(&variant.uri)?;
    info!("Fetching media playlist {}", url);
    let text = fetch_text(http, url.clone()).await?;
    let mut playlist = parse_media_playlist(&text)?;
    for segment in playlist.segments.iter_mut() {
        segment.uri = resolve_uri(&url, &segment.uri)?.to_string();
    }
    Ok(playlist)
}

/// What a finished job produced.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSummary {
    pub path: PathBuf,
    pub bytes: u64,
    pub segments: usize,
    pub duration: f64,
}

/// One download of a variant into one file.
///
/// The job owns a temporary directory for the segment files, it is removed
/// when the job is done, whether it succeeded or not.
pub struct DownloadJob {
    http: Client,
    variant: Variant,
    output_dir: PathBuf,
    file_name: String,
    temp_dir: TempDir,
    policy: RetryPolicy,
    timeout: Option<Duration>,
    reporter: Reporter,
    cancel: CancellationToken,
}

impl DownloadJob {
    pub fn new(
        http: Client,
        variant: Variant,
        output_dir: impl Into<PathBuf>,
        file_name: impl Into<String>,
    ) -> Result<Self> {
        let temp_dir = tempfile::Builder::new().prefix("vod_lib-").tempdir()?;
        Ok(Self {
            http,
            variant,
            output_dir: output_dir.into(),
            file_name: file_name.into(),
            temp_dir,
            policy: RetryPolicy::default(),
            timeout: Some(DEFAULT_TIMEOUT),
            reporter: Reporter::silent(),
            cancel: CancellationToken::new(),
        })
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Timeout of a single segment request, `None` disables it.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn reporter(mut self, reporter: Reporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(&self.file_name)
    }

    /// Fetches the media playlist, downloads every segment and merges them.
    pub async fn run(self) -> Result<JobSummary> {
        let output = self.output_path();
        let DownloadJob {
            http,
            variant,
            temp_dir,
            policy,
            timeout,
            reporter,
            cancel,
            ..
        } = self;
        info!(
            "Downloading {} {} to {}",
            variant.quality,
            variant.resolution,
            output.display()
        );

        let playlist = fetch_media_playlist(&http, &variant).await?;
        reporter.report(Event::PlaylistLoaded {
            segments: playlist.segments.len(),
            duration: playlist.total_duration,
        });

        let source = HttpSource::new(http).timeout(timeout);
        let downloader =
            SequentialDownloader::new(SegmentFetcher::new(source, policy), reporter.clone(), cancel.clone());
        let files = downloader
            .download_all(&playlist.segments, temp_dir.path())
            .await?;

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let bytes = Merger::new(reporter.clone()).merge(&files, &output).await?;

        if let Err(e) = temp_dir.close() {
            warn!("Could not remove temporary files: {}", e);
        }
        info!("Wrote {} bytes to {}", bytes, output.display());
        reporter.report(Event::Finished {
            path: output.clone(),
            bytes,
        });

        Ok(JobSummary {
            path: output,
            bytes,
            segments: files.len(),
            duration: playlist.total_duration,
        })
    }
}

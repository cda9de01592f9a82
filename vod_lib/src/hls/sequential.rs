use std::path::{Path, PathBuf};

use reqwest::Url;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::download_stream::{Event, Progress, Reporter};
use crate::error::{Error, Result};
use crate::hls::fetch::{SegmentFetcher, SegmentSource};
use crate::playlist::Segment;

/// Downloads segments one after another into a directory.
pub struct SequentialDownloader<S> {
    fetcher: SegmentFetcher<S>,
    reporter: Reporter,
    cancel: CancellationToken,
}

impl<S: SegmentSource> SequentialDownloader<S> {
    pub fn new(fetcher: SegmentFetcher<S>, reporter: Reporter, cancel: CancellationToken) -> Self {
        Self {
            fetcher,
            reporter,
            cancel,
        }
    }

    /// Fetches every segment in index order to `<dir>/<index>.ts`.
    ///
    /// The returned paths are in the same order as `segments`. The first
    /// fatal error stops the download, files written so far are left in
    /// `dir`.
    pub async fn download_all(&self, segments: &[Segment], dir: &Path) -> Result<Vec<PathBuf>> {
        let total = segments.len();
        let mut files = Vec::with_capacity(total);
        info!("[HLS] Downloading {} segments", total);

        for segment in segments {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let failed = |source: Error| Error::SegmentFetchFailed {
                index: segment.index,
                uri: segment.uri.clone(),
                source: Box::new(source),
            };

            let url = Url::parse(&segment.uri).map_err(|e| failed(e.into()))?;
            let path = dir.join(format!("{}.ts", segment.index));
            debug!("[HLS] Downloads {} to {}", url, path.display());

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(Error::Cancelled),
                res = self.fetcher.fetch(segment.index, &url, &path, &self.reporter) => {
                    res.map_err(failed)?;
                }
            }

            files.push(path);
            self.reporter
                .report(Event::SegmentDownloaded(Progress::new(files.len(), total)));
        }

        Ok(files)
    }
}

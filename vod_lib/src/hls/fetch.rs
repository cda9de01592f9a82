use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, Url};
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{trace, warn};

use crate::download_stream::{Event, Reporter};
use crate::error::{Error, Result};
use crate::WRITE_SIZE;

/// Timeout for a single request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Somewhere segment bytes can be read from.
#[async_trait]
pub trait SegmentSource: Send + Sync {
    /// Streams the body behind `url` into `writer`, returns the number of
    /// bytes written.
    async fn fetch_into(
        &self,
        url: &Url,
        writer: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64>;
}

#[derive(Debug, Clone)]
pub struct HttpSource {
    http: Client,
    timeout: Option<Duration>,
}

impl HttpSource {
    pub fn new(http: Client) -> Self {
        Self {
            http,
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl SegmentSource for HttpSource {
    async fn fetch_into(
        &self,
        url: &Url,
        writer: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64> {
        let mut req = self.http.get(url.clone());
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }
        let res = req.send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(Error::Status {
                status,
                url: url.to_string(),
            });
        }

        let mut stream = res.bytes_stream();
        let mut tsize = 0;
        while let Some(item) = stream.next().await {
            tsize += tokio::io::copy(&mut item?.as_ref(), writer).await?;
        }
        Ok(tsize)
    }
}

/// Downloads a playlist as text.
pub(crate) async fn fetch_text(http: &Client, url: Url) -> Result<String> {
    let res = http.get(url.clone()).timeout(DEFAULT_TIMEOUT).send().await?;
    let status = res.status();
    if !status.is_success() {
        return Err(Error::Status {
            status,
            url: url.to_string(),
        });
    }
    Ok(res.text().await?)
}

/// Delay between two attempts of the same segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backoff {
    #[default]
    None,
    Fixed(Duration),
    /// Doubles after every failure, starting at `initial` and capped at `max`.
    Exponential { initial: Duration, max: Duration },
}

impl Backoff {
    /// Delay after the `failures`th failed attempt.
    pub fn delay(&self, failures: u32) -> Duration {
        match *self {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed(d) => d,
            Backoff::Exponential { initial, max } => {
                let factor = 1u32
                    .checked_shl(failures.saturating_sub(1))
                    .unwrap_or(u32::MAX);
                initial.saturating_mul(factor).min(max)
            }
        }
    }
}

/// When a transiently failing segment is tried again.
///
/// The default retries forever without any delay, which means a link that
/// keeps resetting the connection stalls the download indefinitely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryPolicy {
    /// Total attempts per segment, `None` for no limit.
    pub max_attempts: Option<u32>,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn forever() -> Self {
        Self::default()
    }

    pub fn attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            backoff: Backoff::None,
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    fn allows_retry(&self, attempts: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempts < max)
    }
}

/// Fetches single segments to disk, retrying connection resets.
#[derive(Debug, Clone)]
pub struct SegmentFetcher<S> {
    source: S,
    policy: RetryPolicy,
}

impl<S: SegmentSource> SegmentFetcher<S> {
    pub fn new(source: S, policy: RetryPolicy) -> Self {
        Self { source, policy }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Writes segment `index` to `path`.
    ///
    /// Every attempt truncates `path`, so the file never holds bytes from a
    /// failed attempt.
    pub async fn fetch(
        &self,
        index: usize,
        url: &Url,
        path: &Path,
        reporter: &Reporter,
    ) -> Result<u64> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.fetch_once(url, path).await {
                Ok(size) => {
                    trace!("[HLS] Segment {} done: {} bytes", index, size);
                    return Ok(size);
                }
                Err(e) if e.is_transient() && self.policy.allows_retry(attempt) => {
                    warn!(
                        "[HLS] Segment {} failed on attempt {}: {}, retrying",
                        index, attempt, e
                    );
                    reporter.report(Event::Retrying {
                        index,
                        attempt,
                        reason: e.to_string(),
                    });
                    let delay = self.policy.backoff.delay(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_once(&self, url: &Url, path: &Path) -> Result<u64> {
        let file = File::create(path).await?;
        let mut writer = BufWriter::with_capacity(WRITE_SIZE, file);
        let size = self.source.fetch_into(url, &mut writer).await?;
        writer.flush().await?;
        Ok(size)
    }
}

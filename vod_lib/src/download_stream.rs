use std::path::PathBuf;

use futures_core::stream::Stream;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// How far a stage of the download has come.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    pub percent: f64,
}

impl Progress {
    pub fn new(completed: usize, total: usize) -> Self {
        let percent = if total == 0 {
            100.0
        } else {
            completed as f64 / total as f64 * 100.0
        };
        Self {
            completed,
            total,
            percent,
        }
    }
}

#[derive(Debug)]
pub enum Event {
    /// The media playlist has been parsed, `duration` is in seconds.
    PlaylistLoaded { segments: usize, duration: f64 },
    /// A segment has been written to its temporary file.
    SegmentDownloaded(Progress),
    /// A segment failed with a transient error and is fetched again.
    Retrying {
        index: usize,
        attempt: u32,
        reason: String,
    },
    /// A temporary file has been appended to the output.
    SegmentMerged(Progress),
    Finished {
        path: PathBuf,
        bytes: u64,
    },
}

/// The events of a running job.
#[derive(Debug)]
pub struct DownloadStream {
    rx: UnboundedReceiver<Event>,
}

impl DownloadStream {
    pub fn new() -> (Self, Reporter) {
        let (tx, rx) = unbounded_channel();
        (DownloadStream { rx }, Reporter { tx: Some(tx) })
    }
}

impl Stream for DownloadStream {
    type Item = Event;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Sending half of a [`DownloadStream`].
///
/// Reporting never fails, events are dropped when nobody listens.
#[derive(Debug, Clone, Default)]
pub struct Reporter {
    tx: Option<UnboundedSender<Event>>,
}

impl Reporter {
    pub fn silent() -> Self {
        Self { tx: None }
    }

    pub fn report(&self, event: Event) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}

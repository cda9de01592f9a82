//! This is a small library to download HLS video on demand assets.
//!
//! A master playlist is parsed into a [`VariantCatalog`], one variant is
//! picked and a [`DownloadJob`] fetches its segments one by one before
//! merging them, in playlist order, into a single file.

mod error;

pub mod catalog;
pub mod download_stream;
pub mod duration;
pub mod hls;
pub mod merge;
pub mod playlist;

pub use crate::catalog::VariantCatalog;
pub use crate::download_stream::{DownloadStream, Event, Progress, Reporter};
pub use crate::duration::format_duration;
pub use crate::error::{Error, Result};
pub use crate::hls::fetch::{Backoff, HttpSource, RetryPolicy, SegmentFetcher, SegmentSource};
pub use crate::hls::sequential::SequentialDownloader;
pub use crate::hls::{fetch_media_playlist, DownloadJob, JobSummary};
pub use crate::merge::Merger;
pub use crate::playlist::{MediaPlaylist, Segment, Variant};

pub use tokio_util::sync::CancellationToken;

/// Write buffer
pub const WRITE_SIZE: usize = 131_072;

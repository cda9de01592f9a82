use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info};

use crate::download_stream::{Event, Progress, Reporter};
use crate::error::{Error, Result};
use crate::WRITE_SIZE;

/// Concatenates downloaded segments into the final file.
#[derive(Debug, Clone, Default)]
pub struct Merger {
    reporter: Reporter,
}

impl Merger {
    pub fn new(reporter: Reporter) -> Self {
        Self { reporter }
    }

    /// Writes the content of `files`, in the given order, to `output`.
    ///
    /// `output` is created or truncated. On failure whatever has been written
    /// to `output` so far is left there.
    pub async fn merge(&self, files: &[PathBuf], output: &Path) -> Result<u64> {
        info!("Merging {} files into {}", files.len(), output.display());
        let out = File::create(output).await.map_err(merge_failed(output))?;
        let mut writer = BufWriter::with_capacity(WRITE_SIZE, out);
        let total = files.len();
        let mut size = 0;

        for (i, path) in files.iter().enumerate() {
            let mut input = File::open(path).await.map_err(merge_failed(path))?;
            let copied = tokio::io::copy(&mut input, &mut writer)
                .await
                .map_err(merge_failed(output))?;
            debug!("Merged {} ({} bytes)", path.display(), copied);
            size += copied;
            self.reporter
                .report(Event::SegmentMerged(Progress::new(i + 1, total)));
        }

        writer.flush().await.map_err(merge_failed(output))?;
        Ok(size)
    }
}

fn merge_failed(path: &Path) -> impl Fn(io::Error) -> Error + '_ {
    move |source| Error::MergeFailed {
        path: path.to_path_buf(),
        source,
    }
}

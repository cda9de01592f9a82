use std::error::Error as StdError;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;
use dlget_lib::utils::error::StreamResult;
use dlget_lib::utils::naming::{default_file_name, strip_characters, FORBIDDEN_CHARACTERS};
use dlget_lib::utils::sites::get_site;
use dlget_lib::Asset;
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vod_lib::{
    format_duration, Backoff, CancellationToken, DownloadJob, DownloadStream, Event, RetryPolicy,
    VariantCatalog,
};

#[derive(Parser, Debug)]
#[command(name = "dlget", version, author, about = "Downloads DLive past broadcasts")]
struct Args {
    /// The url of the past broadcast
    url: String,
    /// List available qualities and exit
    #[arg(short, long)]
    list: bool,
    /// Which quality to download, as numbered by --list
    #[arg(short, long, value_name = "#", default_value_t = 1)]
    quality: usize,
    /// Directory to save the video in [default: current directory]
    #[arg(short = 'O', long, env = "DLGET_PATH")]
    path: Option<PathBuf>,
    /// File name of the video
    #[arg(short, long)]
    output: Option<String>,
    /// Give up on a segment after this many retries, retries forever when unset
    #[arg(long, value_name = "N")]
    max_retries: Option<u32>,
    /// Milliseconds to wait before retrying a segment
    #[arg(long, value_name = "MS", default_value_t = 0)]
    retry_delay: u64,
    /// Request timeout in seconds, 0 disables it
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    timeout: u64,
    /// Log more, can be repeated
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn retry_policy(&self) -> RetryPolicy {
        let policy = match self.max_retries {
            Some(retries) => RetryPolicy::attempts(retries.saturating_add(1)),
            None => RetryPolicy::forever(),
        };
        match self.retry_delay {
            0 => policy,
            ms => policy.with_backoff(Backoff::Fixed(Duration::from_millis(ms))),
        }
    }

    fn request_timeout(&self) -> Option<Duration> {
        match self.timeout {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(why) = run(args).await {
        eprintln!("Error: {}", why);
        let mut source = why.source();
        while let Some(err) = source {
            eprintln!("  caused by: {}", err);
            source = err.source();
        }
        process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: Args) -> StreamResult<()> {
    let client = reqwest::Client::new();
    let site = get_site(client.clone(), &args.url)?;
    let asset = site.resolve().await?;
    info!("Resolved {} to {}", site.url(), asset.master_playlist_url);

    let catalog = VariantCatalog::fetch(&client, &asset.master_playlist_url).await?;
    if args.list {
        print_qualities(&asset, &catalog);
        return Ok(());
    }

    let variant = catalog.select(args.quality)?.clone();
    let dir = match &args.path {
        Some(p) => p.clone(),
        None => std::env::current_dir()?,
    };
    let file_name = match &args.output {
        Some(name) => strip_characters(name, FORBIDDEN_CHARACTERS),
        None => default_file_name(&asset, &variant),
    };

    let cancel = CancellationToken::new();
    let (events, reporter) = DownloadStream::new();
    let job = DownloadJob::new(client, variant, dir, file_name.clone())?
        .retry_policy(args.retry_policy())
        .timeout(args.request_timeout())
        .reporter(reporter)
        .cancellation(cancel.clone());

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping download");
            cancel.cancel();
        }
    });

    println!("{} - {}", asset.uploader, asset.title);
    let (result, ()) = tokio::join!(job.run(), show_progress(events, file_name));
    let summary = result?;
    println!("Done! Saved to {}", summary.path.display());
    Ok(())
}

fn print_qualities(asset: &Asset, catalog: &VariantCatalog) {
    println!("\n{} - {}", asset.uploader, asset.title);
    for (i, variant) in catalog.list().iter().enumerate() {
        println!("{} - {} - {}", i + 1, variant.quality, variant.resolution);
    }
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    let style = ProgressStyle::default_bar()
        .template("{bar:40.green/yellow} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}

async fn show_progress(mut events: DownloadStream, file_name: String) {
    let mut download: Option<ProgressBar> = None;
    let mut merge: Option<ProgressBar> = None;

    while let Some(event) = events.next().await {
        match event {
            Event::PlaylistLoaded { segments, duration } => {
                println!("Duration: {}", format_duration(duration));
                download = Some(progress_bar(segments));
            }
            Event::SegmentDownloaded(p) => {
                if let Some(pb) = &download {
                    pb.set_position(p.completed as u64);
                    pb.set_message(format!(
                        "Downloading {} - part {} of {} - {:.2}%",
                        file_name, p.completed, p.total, p.percent
                    ));
                }
            }
            Event::Retrying {
                index,
                attempt,
                reason,
            } => {
                let line = format!(
                    "Failed to download part {} ({}), retrying (attempt {})",
                    index + 1,
                    reason,
                    attempt + 1
                );
                match &download {
                    Some(pb) => pb.println(line),
                    None => eprintln!("{}", line),
                }
            }
            Event::SegmentMerged(p) => {
                if let Some(pb) = download.take() {
                    pb.finish();
                }
                let pb = merge.get_or_insert_with(|| progress_bar(p.total));
                pb.set_position(p.completed as u64);
                pb.set_message(format!("Merging files - {:.2}%", p.percent));
            }
            Event::Finished { .. } => {
                if let Some(pb) = merge.take() {
                    pb.finish();
                }
            }
        }
    }

    for pb in download.into_iter().chain(merge) {
        pb.abandon();
    }
}

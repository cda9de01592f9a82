use reqwest::{Client, Url};

use futures_util::StreamExt as _;
use vod_lib::{DownloadJob, DownloadStream, Event, VariantCatalog};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let args = std::env::args().collect::<Vec<_>>();
    let url = args.get(1).ok_or("Pass a master playlist url as the first argument")?;
    let quality = match args.get(2) {
        Some(q) => q.parse()?,
        None => 1,
    };

    let http = Client::new();
    let catalog = VariantCatalog::fetch(&http, &Url::parse(url)?).await?;
    let variant = catalog.select(quality)?.clone();

    let (mut events, reporter) = DownloadStream::new();
    let job = DownloadJob::new(http, variant, ".", "test.mp4")?.reporter(reporter);

    let printer = async {
        while let Some(event) = events.next().await {
            match event {
                Event::SegmentDownloaded(p) => println!("part {} of {}", p.completed, p.total),
                Event::Retrying { index, .. } => eprintln!("retrying part {}", index + 1),
                Event::Finished { path, bytes } => {
                    println!("wrote {} bytes to {}", bytes, path.display())
                }
                _ => {}
            }
        }
    };
    let (result, ()) = tokio::join!(job.run(), printer);
    result?;
    Ok(())
}

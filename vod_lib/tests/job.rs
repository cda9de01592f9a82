use futures_util::StreamExt;
use reqwest::{Client, Url};
use vod_lib::{
    CancellationToken, DownloadJob, DownloadStream, Error, Event, HttpSource, RetryPolicy,
    SegmentSource, VariantCatalog,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MASTER: &str = "#EXTM3U
#EXT-X-STREAM-INF:PROGRAM-ID=1,BANDWIDTH=5128000,CODECS=\"avc1.64002a,mp4a.40.2\",RESOLUTION=1920x1080,VIDEO=\"src\"
src/index.m3u8
#EXT-X-STREAM-INF:PROGRAM-ID=1,BANDWIDTH=2628000,CODECS=\"avc1.4d401f,mp4a.40.2\",RESOLUTION=1280x720,VIDEO=\"720p\"
720p/index.m3u8
";

const MEDIA: &str = "#EXTM3U
#EXT-X-TARGETDURATION:10
#EXTINF:10.0,
seg0.ts
#EXTINF:10.0,
thumb.jpg
#EXTINF:10.0,
seg1.ts
#EXTINF:5.5,
seg2.ts
#EXT-X-ENDLIST
";

async fn serve(server: &MockServer, route: &str, body: impl Into<Vec<u8>>) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(server)
        .await;
}

async fn vod_server(segments: &[&str]) -> MockServer {
    let server = MockServer::start().await;
    serve(&server, "/vod/master.m3u8", MASTER).await;
    serve(&server, "/vod/720p/index.m3u8", MEDIA).await;
    for seg in segments {
        serve(&server, &format!("/vod/720p/{}.ts", seg), format!("[{}]", seg)).await;
    }
    server
}

fn master_url(server: &MockServer) -> Url {
    Url::parse(&format!("{}/vod/master.m3u8", server.uri())).unwrap()
}

#[tokio::test]
async fn catalog_resolves_variant_uris() {
    let server = vod_server(&[]).await;
    let catalog = VariantCatalog::fetch(&Client::new(), &master_url(&server))
        .await
        .unwrap();

    assert_eq!(catalog.len(), 2);
    assert_eq!(
        catalog.select(2).unwrap().uri,
        format!("{}/vod/720p/index.m3u8", server.uri())
    );
    assert!(matches!(
        catalog.select(3),
        Err(Error::InvalidQualitySelection {
            selected: 3,
            available: 2
        })
    ));
}

#[tokio::test]
async fn job_merges_segments_in_order() {
    let server = vod_server(&["seg0", "seg1", "seg2"]).await;
    let http = Client::new();
    let catalog = VariantCatalog::fetch(&http, &master_url(&server))
        .await
        .unwrap();
    let out = tempfile::tempdir().unwrap();
    let (events, reporter) = DownloadStream::new();

    let job = DownloadJob::new(
        http,
        catalog.select(2).unwrap().clone(),
        out.path(),
        "user-title-1280x720-720p.mp4",
    )
    .unwrap()
    .retry_policy(RetryPolicy::attempts(3))
    .reporter(reporter);
    let temp = job.temp_path().to_path_buf();
    assert!(temp.exists());

    let summary = job.run().await.unwrap();

    let expected = out.path().join("user-title-1280x720-720p.mp4");
    assert_eq!(summary.path, expected);
    assert_eq!(summary.segments, 3);
    assert_eq!(summary.bytes, 18);
    assert!((summary.duration - 35.5).abs() < 1e-9);
    assert_eq!(std::fs::read(&expected).unwrap(), b"[seg0][seg1][seg2]");
    assert!(!temp.exists());

    let events: Vec<Event> = events.collect().await;
    assert!(matches!(
        events.first(),
        Some(Event::PlaylistLoaded { segments: 3, .. })
    ));
    let downloaded: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            Event::SegmentDownloaded(p) => Some(p.completed),
            _ => None,
        })
        .collect();
    assert_eq!(downloaded, vec![1, 2, 3]);
    assert!(matches!(events.last(), Some(Event::Finished { bytes: 18, .. })));
}

#[tokio::test]
async fn missing_segment_aborts_without_output() {
    let server = vod_server(&["seg0", "seg2"]).await;
    let http = Client::new();
    let catalog = VariantCatalog::fetch(&http, &master_url(&server))
        .await
        .unwrap();
    let out = tempfile::tempdir().unwrap();

    let job = DownloadJob::new(http, catalog.select(2).unwrap().clone(), out.path(), "out.mp4")
        .unwrap();
    let temp = job.temp_path().to_path_buf();

    match job.run().await {
        Err(Error::SegmentFetchFailed { index, uri, .. }) => {
            assert_eq!(index, 1);
            assert!(uri.ends_with("/vod/720p/seg1.ts"));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(!out.path().join("out.mp4").exists());
    assert!(!temp.exists());
}

#[tokio::test]
async fn cancelled_job_cleans_up() {
    let server = vod_server(&["seg0", "seg1", "seg2"]).await;
    let http = Client::new();
    let catalog = VariantCatalog::fetch(&http, &master_url(&server))
        .await
        .unwrap();
    let out = tempfile::tempdir().unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let job = DownloadJob::new(http, catalog.select(2).unwrap().clone(), out.path(), "out.mp4")
        .unwrap()
        .cancellation(cancel);
    let temp = job.temp_path().to_path_buf();

    assert!(matches!(job.run().await, Err(Error::Cancelled)));
    assert!(!temp.exists());
    assert!(!out.path().join("out.mp4").exists());
}

#[tokio::test]
async fn master_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = VariantCatalog::fetch(&Client::new(), &master_url(&server))
        .await
        .unwrap_err();
    match err {
        Error::Status { status, .. } => assert_eq!(status.as_u16(), 500),
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn http_source_streams_body() {
    let server = MockServer::start().await;
    let body: Vec<u8> = (0..=255u8).cycle().take(300_000).collect();
    serve(&server, "/big.ts", body.clone()).await;

    let url = Url::parse(&format!("{}/big.ts", server.uri())).unwrap();
    let mut sink = Vec::new();
    let size = HttpSource::new(Client::new())
        .fetch_into(&url, &mut sink)
        .await
        .unwrap();

    assert_eq!(size, body.len() as u64);
    assert_eq!(sink, body);
}

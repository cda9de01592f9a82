use async_trait::async_trait;
use url::Url;

use crate::utils::error::StreamResult;

pub mod plugins;
pub mod utils;

/// A video on demand asset and where its master playlist lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub id: String,
    pub title: String,
    pub uploader: String,
    pub master_playlist_url: Url,
}

#[async_trait]
pub trait AssetResolver: Send + Sync {
    /// Creates a new resolver for `url`
    fn new(client: reqwest::Client, url: String) -> StreamResult<Box<Self>>
    where
        Self: Sized;
    /// Returns the url the resolver was created with
    fn url(&self) -> &str;
    /// Fetches the title, uploader and master playlist of the asset
    async fn resolve(&self) -> StreamResult<Asset>;
}

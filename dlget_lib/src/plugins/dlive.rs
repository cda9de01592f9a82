use async_trait::async_trait;
use regex::Regex;
use serde_derive::Deserialize;
use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use crate::utils::error::{DlgetError, StreamError, StreamResult};
use crate::{Asset, AssetResolver};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PastBroadcast {
    title: String,
    creator: Reference,
    playback_url: String,
}

/// Apollo cache pointer to another entry, e.g. `user:someone`.
#[derive(Debug, Deserialize)]
struct Reference {
    id: String,
}

/// A DLive past broadcast.
#[derive(Debug, Clone)]
pub struct DLive {
    client: reqwest::Client,
    url: String,
    vod_id: String,
}

#[async_trait]
impl AssetResolver for DLive {
    fn new(client: reqwest::Client, url: String) -> StreamResult<Box<DLive>> {
        let vod_id = vod_id(&url)
            .ok_or_else(|| DlgetError::new("[DLive] Cannot find a broadcast id in the url"))?;
        Ok(Box::new(DLive {
            client,
            vod_id: vod_id.to_string(),
            url,
        }))
    }

    fn url(&self) -> &str {
        &self.url
    }

    async fn resolve(&self) -> StreamResult<Asset> {
        let site_url = format!("https://dlive.tv/p/{}", self.vod_id);
        debug!("[DLive] Fetching {}", site_url);
        let html = self
            .client
            .get(&site_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let state = extract_apollo_state(&html)?;
        asset_from_state(&state, &self.vod_id)
    }
}

/// The last non empty path segment of the url.
fn vod_id(url: &str) -> Option<&str> {
    let url = url.split(['?', '#']).next().unwrap_or(url);
    let path = url.split_once("dlive.tv/")?.1;
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
}

/// Finds the json state the page is rendered from.
pub fn extract_apollo_state(html: &str) -> StreamResult<Value> {
    let text = html.replace(['\n', '\t'], "");
    let apollo_state_re = Regex::new(r"<script>window\.__APOLLO_STATE__=(.*);\(function")?;
    let cap = apollo_state_re
        .captures(&text)
        .ok_or_else(|| DlgetError::new("[DLive] Failed to find playback info"))?;
    trace!("[DLive] Apollo state: {}", &cap[1]);
    serde_json::from_str(&cap[1]).map_err(StreamError::from)
}

/// Reads the past broadcast `vod_id` out of an apollo state.
pub fn asset_from_state(state: &Value, vod_id: &str) -> StreamResult<Asset> {
    let root_query = format!("$ROOT_QUERY.pastBroadcast({{\"permlink\":\"{}\"}})", vod_id);
    let info = state["defaultClient"]
        .get(&root_query)
        .ok_or_else(|| DlgetError::new(format!("[DLive] No past broadcast named {}", vod_id)))?;
    let broadcast: PastBroadcast = serde_json::from_value(info.clone())?;

    let uploader = broadcast
        .creator
        .id
        .strip_prefix("user:")
        .ok_or_else(|| {
            DlgetError::new(format!("[DLive] Unexpected creator id {}", broadcast.creator.id))
        })?
        .to_string();

    Ok(Asset {
        id: vod_id.to_string(),
        title: broadcast.title,
        uploader,
        master_playlist_url: Url::parse(&broadcast.playback_url)?,
    })
}

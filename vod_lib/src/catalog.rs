use reqwest::Client;
use tracing::info;
use url::Url;

use crate::error::{Error, Result};
use crate::hls::fetch::fetch_text;
use crate::playlist::{parse_master_playlist, Variant};

/// The variants of one asset, in master playlist order.
#[derive(Debug, Clone, Default)]
pub struct VariantCatalog {
    variants: Vec<Variant>,
}

impl VariantCatalog {
    pub fn new(variants: Vec<Variant>) -> Self {
        Self { variants }
    }

    /// Downloads and parses a master playlist, variant uris are made
    /// absolute against `master_url`.
    pub async fn fetch(http: &Client, master_url: &Url) -> Result<Self> {
        info!("Fetching master playlist {}", master_url);
        let text = fetch_text(http, master_url.clone()).await?;
        let mut variants = parse_master_playlist(&text)?;
        for v in variants.iter_mut() {
            v.uri = resolve_uri(master_url, &v.uri)?.to_string();
        }
        Ok(Self::new(variants))
    }

    pub fn list(&self) -> &[Variant] {
        &self.variants
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Selects a variant by its 1-based position.
    pub fn select(&self, quality: usize) -> Result<&Variant> {
        quality
            .checked_sub(1)
            .and_then(|i| self.variants.get(i))
            .ok_or(Error::InvalidQualitySelection {
                selected: quality,
                available: self.variants.len(),
            })
    }
}

/// Joins a playlist uri onto the url of the playlist it was found in,
/// absolute uris are returned unchanged.
pub fn resolve_uri(base: &Url, uri: &str) -> Result<Url> {
    match Url::parse(uri) {
        Ok(u) => Ok(u),
        Err(_) => Ok(base.join(uri)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(quality: &str) -> Variant {
        Variant {
            resolution: String::from("1280x720"),
            quality: quality.to_string(),
            bandwidth: 1,
            uri: format!("{}.m3u8", quality),
            program_id: None,
            codecs: None,
        }
    }

    #[test]
    fn select_is_one_based() {
        let catalog = VariantCatalog::new(vec![variant("src"), variant("720p")]);
        assert_eq!(catalog.select(1).unwrap().quality, "src");
        assert_eq!(catalog.select(2).unwrap().quality, "720p");
        assert_eq!(catalog.list().len(), 2);
    }

    #[test]
    fn select_out_of_range() {
        let catalog = VariantCatalog::new(vec![variant("src"), variant("720p")]);
        for q in [0, 3, usize::MAX] {
            match catalog.select(q) {
                Err(Error::InvalidQualitySelection {
                    selected,
                    available,
                }) => {
                    assert_eq!(selected, q);
                    assert_eq!(available, 2);
                }
                other => panic!("quality {} gave {:?}", q, other),
            }
        }
        assert!(VariantCatalog::default().select(1).is_err());
    }

    #[test]
    fn resolves_relative_uris() {
        let base = Url::parse("https://cdn.example.com/vod/master.m3u8").unwrap();
        assert_eq!(
            resolve_uri(&base, "720p/playlist.m3u8").unwrap().as_str(),
            "https://cdn.example.com/vod/720p/playlist.m3u8"
        );
        assert_eq!(
            resolve_uri(&base, "https://other.example.com/a.ts").unwrap().as_str(),
            "https://other.example.com/a.ts"
        );
    }
}

use regex::Regex;

use crate::plugins::DLive;
use crate::utils::error::{DlgetError, StreamResult};
use crate::AssetResolver;

/// Picks the resolver for the site `input` belongs to.
pub fn get_site(client: reqwest::Client, input: &str) -> StreamResult<Box<dyn AssetResolver>> {
    let re_dlive = Regex::new(r"^(?:https?://)?(?:www\.)?dlive\.tv/.+")?;

    match input {
        url if re_dlive.is_match(url) => Ok(DLive::new(client, String::from(url))?),
        _ => Err(DlgetError::new(format!("unsupported url: {}", input)).into()),
    }
}

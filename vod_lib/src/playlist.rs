//! Parsing of the small subset of M3U8 used by VOD assets.
//!
//! A master playlist pairs every `#EXT-X-STREAM-INF` tag with the uri on the
//! following line, a media playlist pairs every `#EXTINF` tag with the segment
//! uri on the following line.

use tracing::{debug, trace};

use crate::error::{Error, Result};

pub const STREAM_INF_TAG: &str = "#EXT-X-STREAM-INF:";
pub const EXTINF_TAG: &str = "#EXTINF:";
/// Only uris with this extension are taken as media segments.
pub const SEGMENT_EXTENSION: &str = ".ts";

/// One quality rendition of an asset.
#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    pub resolution: String,
    pub quality: String,
    pub bandwidth: u64,
    pub uri: String,
    pub program_id: Option<u32>,
    pub codecs: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub index: usize,
    pub uri: String,
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MediaPlaylist {
    pub segments: Vec<Segment>,
    /// Sum of every `#EXTINF` duration in seconds.
    pub total_duration: f64,
}

/// Parses the variant streams of a master playlist in the order they appear.
pub fn parse_master_playlist(text: &str) -> Result<Vec<Variant>> {
    let mut variants = Vec::new();
    let mut lines = text.lines().enumerate().peekable();

    while let Some((n, line)) = lines.next() {
        let line = line.trim();
        let Some(attributes) = line.strip_prefix(STREAM_INF_TAG) else {
            continue;
        };
        let line_no = n + 1;

        while lines.next_if(|(_, l)| l.trim().is_empty()).is_some() {}
        let uri = match lines.next() {
            Some((_, next)) if !next.trim().starts_with('#') => next.trim().to_string(),
            Some((m, _)) => {
                return Err(Error::malformed(
                    m + 1,
                    "expected a playlist uri after #EXT-X-STREAM-INF",
                ))
            }
            None => {
                return Err(Error::malformed(
                    line_no,
                    "#EXT-X-STREAM-INF at end of playlist without a uri",
                ))
            }
        };

        let attrs = parse_attributes(attributes);
        let bandwidth = required(&attrs, "BANDWIDTH", line_no)?;
        let bandwidth = match bandwidth.parse::<u64>() {
            Ok(b) if b > 0 => b,
            _ => {
                return Err(Error::malformed(
                    line_no,
                    format!("BANDWIDTH is not a positive integer: {}", bandwidth),
                ))
            }
        };
        let program_id = match lookup(&attrs, "PROGRAM-ID") {
            Some(id) => Some(id.parse::<u32>().map_err(|_| {
                Error::malformed(line_no, format!("PROGRAM-ID is not an integer: {}", id))
            })?),
            None => None,
        };

        let variant = Variant {
            resolution: required(&attrs, "RESOLUTION", line_no)?.to_string(),
            quality: required(&attrs, "VIDEO", line_no)?.to_string(),
            bandwidth,
            uri,
            program_id,
            codecs: lookup(&attrs, "CODECS").map(String::from),
        };
        trace!("Parsed variant: {:?}", variant);
        variants.push(variant);
    }

    debug!("Master playlist has {} variants", variants.len());
    Ok(variants)
}

/// Parses the segments of a media playlist.
///
/// Every `#EXTINF` duration counts towards the total duration, but a segment
/// is only emitted when the uri following the tag ends with
/// [`SEGMENT_EXTENSION`].
pub fn parse_media_playlist(text: &str) -> Result<MediaPlaylist> {
    let mut playlist = MediaPlaylist::default();
    let mut pending: Option<f64> = None;

    for (n, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(value) = line.strip_prefix(EXTINF_TAG) {
            let duration = parse_duration(value, n + 1)?;
            playlist.total_duration += duration;
            pending = Some(duration);
        } else if line.starts_with('#') {
            continue;
        } else {
            match pending.take() {
                Some(duration) if line.ends_with(SEGMENT_EXTENSION) => {
                    playlist.segments.push(Segment {
                        index: playlist.segments.len(),
                        uri: line.to_string(),
                        duration,
                    });
                }
                Some(_) => trace!("Skips non segment uri: {}", line),
                None => trace!("Skips uri without duration: {}", line),
            }
        }
    }

    debug!(
        "Media playlist has {} segments, {:.3}s",
        playlist.segments.len(),
        playlist.total_duration
    );
    Ok(playlist)
}

fn parse_duration(value: &str, line: usize) -> Result<f64> {
    let raw = value.split_once(',').map_or(value, |(d, _)| d).trim();
    match raw.parse::<f64>() {
        Ok(d) if d.is_finite() && d >= 0.0 => Ok(d),
        _ => Err(Error::malformed(
            line,
            format!("invalid #EXTINF duration: {}", raw),
        )),
    }
}

/// Splits an attribute list on commas that are not inside quotes, quotes are
/// stripped from the values.
fn parse_attributes(list: &str) -> Vec<(&str, &str)> {
    let mut attrs = Vec::new();
    let mut start = 0;
    let mut quoted = false;

    for (i, c) in list.char_indices() {
        match c {
            '"' => quoted = !quoted,
            ',' if !quoted => {
                push_attribute(&mut attrs, &list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    push_attribute(&mut attrs, &list[start..]);
    attrs
}

fn push_attribute<'a>(attrs: &mut Vec<(&'a str, &'a str)>, pair: &'a str) {
    if let Some((key, value)) = pair.split_once('=') {
        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);
        attrs.push((key.trim(), value));
    }
}

fn lookup<'a>(attrs: &[(&str, &'a str)], key: &str) -> Option<&'a str> {
    attrs.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

fn required<'a>(attrs: &[(&str, &'a str)], key: &str, line: usize) -> Result<&'a str> {
    match lookup(attrs, key) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(Error::malformed(
            line,
            format!("#EXT-X-STREAM-INF is missing {}", key),
        )),
    }
}

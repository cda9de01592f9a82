use vod_lib::Variant;

use crate::Asset;

/// Characters that are not allowed in a file name on at least one platform.
pub const FORBIDDEN_CHARACTERS: &str = "<>:\"/\\|?*\0";

/// `<uploader>-<title>-<resolution>-<quality>.mp4`
pub fn default_file_name(asset: &Asset, variant: &Variant) -> String {
    strip_characters(
        &format!(
            "{}-{}-{}-{}.mp4",
            asset.uploader, asset.title, variant.resolution, variant.quality
        ),
        FORBIDDEN_CHARACTERS,
    )
}

pub fn strip_characters(original: &str, to_strip: &str) -> String {
    original
        .chars()
        .filter(|&c| !to_strip.contains(c))
        .collect()
}

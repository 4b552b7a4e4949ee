//! Recognizes VK video page links and turns them into embeddable player URLs.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Link shapes tried in order. Each captures an `owner_video` id pair.
const VIDEO_URL_PATTERNS: &[(&str, &str)] = &[
    (
        "vkvideo",
        r"(?i)^(?:https?://)?(?:www\.)?vkvideo\.ru/video(-?\d+_\d+)",
    ),
    (
        "vk_video",
        r"(?i)^(?:https?://)?(?:www\.|m\.)?vk\.(?:com|ru)/video(-?\d+_\d+)",
    ),
    (
        "vk_query",
        r"(?i)^(?:https?://)?(?:www\.|m\.)?vk\.(?:com|ru)/video\?(?:.*&)?z=video(-?\d+_\d+)",
    ),
    (
        "vk_clip",
        r"(?i)^(?:https?://)?(?:www\.|m\.)?vk\.(?:com|ru)/clip(-?\d+_\d+)",
    ),
];

static COMPILED_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    VIDEO_URL_PATTERNS
        .iter()
        .map(|(name, pattern)| {
            (
                *name,
                Regex::new(pattern).expect("video url pattern must compile"),
            )
        })
        .collect()
});

const EMBED_BASE: &str = "https://vk.com/video_ext.php";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoId {
    pub owner_id: String,
    pub video_id: String,
}

impl VideoId {
    pub fn embed_url(&self) -> String {
        format!(
            "{EMBED_BASE}?oid={}&id={}&hd=2",
            self.owner_id, self.video_id
        )
    }
}

/// Extracts the owner/video pair from the first matching link shape.
pub fn parse_video_id(raw: &str) -> Option<VideoId> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    for (name, regex) in COMPILED_PATTERNS.iter() {
        let Some(caps) = regex.captures(raw) else {
            continue;
        };
        let pair = caps.get(1)?.as_str();
        let (owner_id, video_id) = pair.split_once('_')?;
        debug!(pattern = *name, owner_id, video_id, "matched video url");
        return Some(VideoId {
            owner_id: owner_id.to_string(),
            video_id: video_id.to_string(),
        });
    }
    None
}

pub fn normalize_video_url(raw: Option<&str>) -> Option<String> {
    parse_video_id(raw?).map(|id| id.embed_url())
}

/// Already-canonical embed URLs pass through unchanged.
pub fn is_embed_url(src: &str) -> bool {
    src.starts_with(EMBED_BASE)
}

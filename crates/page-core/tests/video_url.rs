use kb_page_core::normalize_video_url;
use kb_page_core::video::{VideoId, is_embed_url, parse_video_id};

fn embed(owner: &str, id: &str) -> String {
    format!("https://vk.com/video_ext.php?oid={owner}&id={id}&hd=2")
}

#[test]
fn recognizes_every_supported_link_shape() {
    let cases = [
        ("https://vk.com/video-123_456", embed("-123", "456")),
        ("http://vk.com/video123_456", embed("123", "456")),
        ("vk.com/video-1_2", embed("-1", "2")),
        ("https://www.vk.com/video-1_2", embed("-1", "2")),
        ("https://m.vk.com/video-1_2", embed("-1", "2")),
        ("https://vk.ru/video-9_10", embed("-9", "10")),
        ("https://vkvideo.ru/video-77_88", embed("-77", "88")),
        ("https://www.vkvideo.ru/video5_6", embed("5", "6")),
        ("https://vk.com/clip-3_4", embed("-3", "4")),
        (
            "https://vk.com/video?z=video-123_456%2Fpl_cat_trends",
            embed("-123", "456"),
        ),
        (
            "https://vk.com/video?section=trends&z=video-5_6",
            embed("-5", "6"),
        ),
    ];

    for (input, expected) in cases {
        assert_eq!(
            normalize_video_url(Some(input)).as_deref(),
            Some(expected.as_str()),
            "input: {input}"
        );
    }
}

#[test]
fn trailing_path_and_query_are_ignored() {
    assert_eq!(
        normalize_video_url(Some("https://vk.com/video-1_2?list=abc&t=10s")),
        Some(embed("-1", "2"))
    );
}

#[test]
fn surrounding_whitespace_is_trimmed() {
    assert_eq!(
        normalize_video_url(Some("  https://vk.com/video-1_2\n")),
        Some(embed("-1", "2"))
    );
}

#[test]
fn unrecognized_input_yields_none() {
    for input in [
        "",
        "   ",
        "https://youtube.com/watch?v=abc",
        "https://vk.com/id123",
        "https://vk.com/video",
        "https://vk.com/video-abc_def",
        "https://notvk.com/video-1_2",
        "video-1_2",
    ] {
        assert_eq!(normalize_video_url(Some(input)), None, "input: {input}");
    }
    assert_eq!(normalize_video_url(None), None);
}

#[test]
fn parse_video_id_splits_owner_and_video() {
    assert_eq!(
        parse_video_id("https://vk.com/video-42_7"),
        Some(VideoId {
            owner_id: "-42".into(),
            video_id: "7".into(),
        })
    );
}

#[test]
fn embed_urls_are_detected() {
    assert!(is_embed_url(&embed("-1", "2")));
    assert!(!is_embed_url("https://vk.com/video-1_2"));
}

#[test]
fn host_and_path_case_is_ignored() {
    assert_eq!(
        normalize_video_url(Some("https://VK.com/video-1_2")).as_deref(),
        Some(embed("-1", "2").as_str())
    );
    assert_eq!(
        normalize_video_url(Some("HTTPS://WWW.VKVIDEO.RU/Video5_6")).as_deref(),
        Some(embed("5", "6").as_str())
    );
}

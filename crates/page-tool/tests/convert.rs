use kb_page_core::EditorConfig;
use kb_page_tool::{json_to_markup, load_config, markup_to_json, normalize_markup, video_embed_url};

#[test]
fn normalize_rewrites_foreign_markup() {
    let out = normalize_markup(
        "<section><h5>Deep</h5>loose <b>text</b></section>",
        EditorConfig::default(),
    );
    assert_eq!(out, "<h3>Deep</h3><p>loose <strong>text</strong></p>");
}

#[test]
fn normalize_of_empty_input_is_one_paragraph() {
    assert_eq!(normalize_markup("", EditorConfig::default()), "<p></p>");
}

#[test]
fn json_conversion_keeps_the_document() {
    let markup = r#"<h2>Plan</h2><p>see <a href="https://example.com">docs</a></p><hr><p></p>"#;
    let json = markup_to_json(markup, EditorConfig::default()).unwrap();

    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["schema"], "kb-page");
    assert_eq!(value["version"], 1);

    let back = json_to_markup(&json, EditorConfig::default()).unwrap();
    assert_eq!(back, markup);
}

#[test]
fn malformed_json_is_reported() {
    let err = json_to_markup("{\"document\": 3}", EditorConfig::default()).unwrap_err();
    assert_eq!(err.to_string(), "failed to decode page value");
}

#[test]
fn video_links_become_embed_urls() {
    assert_eq!(
        video_embed_url(" https://vkvideo.ru/video-77_88 ").unwrap(),
        "https://vk.com/video_ext.php?oid=-77&id=88&hd=2"
    );
    let err = video_embed_url("https://example.com/watch").unwrap_err();
    assert_eq!(err.to_string(), "unrecognized video URL: https://example.com/watch");
}

#[test]
fn config_is_optional() {
    assert_eq!(load_config(None).unwrap(), EditorConfig::default());

    let config = load_config(Some(r#"{ "min_image_width": 48 }"#)).unwrap();
    assert_eq!(config.min_image_width, 48);
    assert_eq!(config.max_undo, 200);

    assert!(load_config(Some("{ nope")).is_err());
}

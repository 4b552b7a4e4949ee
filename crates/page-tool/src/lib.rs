//! Conversions behind the `kb-page` command-line tool.

use anyhow::{Context, Result, bail};
use kb_page_core::{
    Editor, EditorConfig, PageValue, PluginRegistry, Point, Selection, normalize_video_url,
};
use tracing::debug;

pub fn load_config(source: Option<&str>) -> Result<EditorConfig> {
    match source {
        Some(json) => Ok(EditorConfig::from_json_str(json)?),
        None => Ok(EditorConfig::default()),
    }
}

/// Reparses `markup` and renders it back in canonical form.
pub fn normalize_markup(markup: &str, config: EditorConfig) -> String {
    Editor::from_markup(markup, config).to_markup()
}

pub fn markup_to_json(markup: &str, config: EditorConfig) -> Result<String> {
    let editor = Editor::from_markup(markup, config);
    PageValue::from_document(editor.doc().clone())
        .to_json_pretty()
        .context("failed to encode page value")
}

/// Documents read from JSON go through normalization before rendering.
pub fn json_to_markup(json: &str, config: EditorConfig) -> Result<String> {
    let value = PageValue::from_json_str(json).context("failed to decode page value")?;
    debug!(schema = %value.schema, version = value.version, "page value loaded");
    let editor = Editor::with_config(
        value.into_document(),
        Selection::collapsed(Point::new(vec![0, 0], 0)),
        PluginRegistry::page(),
        config,
    );
    Ok(editor.to_markup())
}

pub fn video_embed_url(url: &str) -> Result<String> {
    match normalize_video_url(Some(url)) {
        Some(embed) => Ok(embed),
        None => bail!("unrecognized video URL: {}", url.trim()),
    }
}

use serde_json::Value;
use tracing::{info, warn};

use crate::core::{Editor, Node};
use crate::ops::{NodeAttrs, Op, Path, Transaction};
use crate::schema::{
    ImageAlign, ImageAttrs, ImageAttrsPatch, ImageDisplay, ImageFloat, ImageSize, VideoAttrs,
    VoidNode,
};
use crate::video::{is_embed_url, normalize_video_url};

use super::{
    CommandError, CommandSpec, PagePlugin, QueryError, QuerySpec, apply_command_tx,
    insert_block_with_trailing_paragraph, node_at_path, parse_path_arg, string_arg,
};

pub(super) struct HorizontalRulePlugin;

impl PagePlugin for HorizontalRulePlugin {
    fn id(&self) -> &'static str {
        "core.horizontal_rule"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new(
                "core.insert_horizontal_rule",
                "Insert horizontal rule",
                |editor, _args| {
                    let tx = insert_block_with_trailing_paragraph(
                        editor,
                        Node::horizontal_rule(),
                        "command:core.insert_horizontal_rule",
                    );
                    apply_command_tx(editor, Ok(tx), "Failed to insert horizontal rule")
                },
            )
            .description("Insert a horizontal rule after the current block.")
            .keywords(["divider", "separator", "hr", "rule"]),
        ]
    }
}

pub(super) struct ImagePlugin;

fn image_at(editor: &Editor, path: &[usize]) -> Result<ImageAttrs, CommandError> {
    match node_at_path(editor.doc(), path) {
        Some(Node::Void(VoidNode::Image(attrs))) => Ok(attrs.clone()),
        _ => Err(CommandError::new(format!("No image at path {path:?}"))),
    }
}

fn path_arg(args: Option<&Value>) -> Result<Path, CommandError> {
    parse_path_arg(args).ok_or_else(|| CommandError::new("Missing args.path"))
}

fn patch_arg(args: Option<&Value>) -> Result<ImageAttrsPatch, CommandError> {
    let Some(args) = args else {
        return Ok(ImageAttrsPatch::default());
    };
    serde_json::from_value(args.clone())
        .map_err(|e| CommandError::new(format!("Invalid image attributes: {e}")))
}

/// Replaces the whole attribute set of the image at `path` in one step.
fn replace_image(
    editor: &mut Editor,
    path: Path,
    update: impl FnOnce(ImageAttrs) -> Result<ImageAttrs, String>,
    source: &str,
) -> Result<(), CommandError> {
    let current = image_at(editor, &path)?;
    let next = update(current.clone()).map_err(CommandError::new)?;
    if next == current {
        return Ok(());
    }
    let tx = Transaction::new(vec![Op::SetNodeAttrs {
        path,
        attrs: NodeAttrs::Void(VoidNode::Image(next)),
    }])
    .source(source);
    apply_command_tx(editor, Ok(tx), "Failed to update image")
}

fn placement_command<T: Copy + Send + Sync + 'static>(
    id: &'static str,
    label: &'static str,
    key: &'static str,
    parse: fn(&str) -> Option<T>,
    set: fn(&mut ImageAttrs, T),
) -> CommandSpec {
    CommandSpec::new(id, label, move |editor, args| {
        let path = path_arg(args.as_ref())?;
        let raw = string_arg(args.as_ref(), key)
            .ok_or_else(|| CommandError::new(format!("Missing args.{key}")))?;
        let value =
            parse(&raw).ok_or_else(|| CommandError::new(format!("Invalid {key}: {raw}")))?;
        replace_image(
            editor,
            path,
            |mut attrs| {
                set(&mut attrs, value);
                Ok(attrs)
            },
            &format!("command:{id}"),
        )
    })
}

impl PagePlugin for ImagePlugin {
    fn id(&self) -> &'static str {
        "image"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("image.insert", "Insert image", |editor, args| {
                let patch = patch_arg(args.as_ref())?;
                let attrs = patch
                    .apply_to(&ImageAttrs::default())
                    .map_err(CommandError::new)?;
                if attrs.src.as_deref().is_none_or(|s| s.trim().is_empty()) {
                    return Err(CommandError::new("Missing args.src"));
                }
                let tx = insert_block_with_trailing_paragraph(
                    editor,
                    Node::image(attrs),
                    "command:image.insert",
                );
                apply_command_tx(editor, Ok(tx), "Failed to insert image")
            })
            .description("Insert an image after the current block.")
            .keywords(["image", "picture", "photo"])
            .args_example(serde_json::json!({ "src": "https://example.com/a.png", "alt": "" })),
            CommandSpec::new("image.update", "Update image", |editor, args| {
                let path = path_arg(args.as_ref())?;
                let patch = patch_arg(args.as_ref())?;
                replace_image(
                    editor,
                    path,
                    |attrs| patch.apply_to(&attrs),
                    "command:image.update",
                )
            })
            .description("Merge the given attributes into the image at args.path.")
            .args_example(serde_json::json!({ "path": [1], "alt": "Diagram" })),
            placement_command(
                "image.set_display",
                "Set image display",
                "display",
                ImageDisplay::parse,
                |attrs, v| attrs.display = v,
            )
            .keywords(["image", "inline", "block"]),
            placement_command(
                "image.set_float",
                "Set image float",
                "float",
                ImageFloat::parse,
                |attrs, v| attrs.float = v,
            )
            .keywords(["image", "float", "wrap"]),
            placement_command(
                "image.set_align",
                "Set image alignment",
                "align",
                ImageAlign::parse,
                |attrs, v| attrs.align = v,
            )
            .keywords(["image", "align"]),
            CommandSpec::new("image.reset_size", "Reset image size", |editor, args| {
                let path = path_arg(args.as_ref())?;
                replace_image(
                    editor,
                    path,
                    |mut attrs| {
                        attrs.size = None;
                        Ok(attrs)
                    },
                    "command:image.reset_size",
                )
            })
            .description("Return the image at args.path to its intrinsic size.")
            .keywords(["image", "size", "reset"]),
            CommandSpec::new("image.resize", "Resize image", |editor, args| {
                let path = path_arg(args.as_ref())?;
                let dimension = |key: &str| {
                    args.as_ref()
                        .and_then(|v| v.get(key))
                        .and_then(Value::as_u64)
                        .and_then(|n| u32::try_from(n).ok())
                };
                let size = match (dimension("width"), dimension("height")) {
                    (Some(width), Some(height)) => ImageSize::new(width, height),
                    _ => None,
                }
                .ok_or_else(|| CommandError::new("Image width and height must be positive"))?;
                info!(?path, width = size.width(), height = size.height(), "resizing image");
                replace_image(
                    editor,
                    path,
                    |mut attrs| {
                        attrs.size = Some(size);
                        Ok(attrs)
                    },
                    "command:image.resize",
                )
            })
            .description("Set an explicit size on the image at args.path.")
            .args_example(serde_json::json!({ "path": [1], "width": 320, "height": 180 })),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![QuerySpec::new("image.attrs", |editor, args| {
            let path = parse_path_arg(args.as_ref())
                .ok_or_else(|| QueryError::new("Missing args.path"))?;
            let attrs = image_at(editor, &path).map_err(|e| QueryError::new(e.message()))?;
            serde_json::to_value(attrs)
                .map_err(|e| QueryError::new(format!("Failed to encode image attrs: {e}")))
        })]
    }
}

pub(super) struct VideoPlugin;

impl PagePlugin for VideoPlugin {
    fn id(&self) -> &'static str {
        "video"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("video.insert", "Insert video", |editor, args| {
                let url = string_arg(args.as_ref(), "url")
                    .ok_or_else(|| CommandError::new("Missing args.url"))?;
                let src = if is_embed_url(&url) {
                    Some(url.clone())
                } else {
                    normalize_video_url(Some(&url))
                };
                let Some(src) = src else {
                    warn!(%url, "unrecognized video url");
                    return Err(CommandError::new(format!("Unrecognized video URL: {url}")));
                };

                let dimension = |key: &str, default: u32| {
                    args.as_ref()
                        .and_then(|v| v.get(key))
                        .and_then(Value::as_u64)
                        .and_then(|n| u32::try_from(n).ok())
                        .filter(|n| *n > 0)
                        .unwrap_or(default)
                };
                let attrs = VideoAttrs {
                    src,
                    width: dimension("width", editor.config().default_video_width),
                    height: dimension("height", editor.config().default_video_height),
                };
                let tx = insert_block_with_trailing_paragraph(
                    editor,
                    Node::video(attrs),
                    "command:video.insert",
                );
                apply_command_tx(editor, Ok(tx), "Failed to insert video")
            })
            .description("Embed a VK video after the current block.")
            .keywords(["video", "embed", "vk"])
            .args_example(serde_json::json!({ "url": "https://vk.com/video-1_2" })),
        ]
    }
}

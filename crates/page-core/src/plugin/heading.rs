use serde_json::Value;

use crate::core::{Editor, Node};
use crate::ops::{NodeAttrs, Op, Path, Transaction};
use crate::schema::{ElementKind, HeadingLevel};

use super::marks::ordered_selection_points;
use super::{CommandError, CommandSpec, PagePlugin, QuerySpec, apply_command_tx, node_at_path};

pub(super) struct HeadingPlugin;

impl PagePlugin for HeadingPlugin {
    fn id(&self) -> &'static str {
        "heading"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("block.set_heading", "Set heading", |editor, args| {
                let level = level_arg(args.as_ref())?;
                let tx = set_block_kind(editor, ElementKind::Heading { level }, "command:block.set_heading");
                apply_command_tx(editor, tx, "Failed to set heading")
            })
            .description("Turn the selected blocks into headings of the given level.")
            .keywords(["heading", "title", "h1", "h2", "h3"])
            .args_example(serde_json::json!({ "level": 2 })),
            CommandSpec::new("block.unset_heading", "Paragraph", |editor, _args| {
                let tx = set_block_kind(editor, ElementKind::Paragraph, "command:block.unset_heading");
                apply_command_tx(editor, tx, "Failed to unset heading")
            })
            .description("Turn the selected headings back into paragraphs.")
            .keywords(["paragraph", "text", "normal"]),
            CommandSpec::new("block.toggle_heading", "Toggle heading", |editor, args| {
                let level = level_arg(args.as_ref())?;
                let kind = if active_heading_level(editor) == Some(level) {
                    ElementKind::Paragraph
                } else {
                    ElementKind::Heading { level }
                };
                let tx = set_block_kind(editor, kind, "command:block.toggle_heading");
                apply_command_tx(editor, tx, "Failed to toggle heading")
            })
            .description("Toggle between a heading of the given level and a paragraph.")
            .keywords(["heading", "toggle"])
            .args_example(serde_json::json!({ "level": 1 })),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![QuerySpec::new("block.heading_level", |editor, _args| {
            Ok(active_heading_level(editor)
                .map(|level| Value::from(level.get()))
                .unwrap_or(Value::Null))
        })]
    }
}

fn level_arg(args: Option<&Value>) -> Result<HeadingLevel, CommandError> {
    args.and_then(|v| v.get("level"))
        .and_then(Value::as_u64)
        .map(HeadingLevel::new)
        .ok_or_else(|| CommandError::new("Missing args.level"))
}

fn active_heading_level(editor: &Editor) -> Option<HeadingLevel> {
    let (_, block_path) = editor.selection().focus.path.split_last()?;
    match node_at_path(editor.doc(), block_path) {
        Some(Node::Element(el)) => match el.kind {
            ElementKind::Heading { level } => Some(level),
            _ => None,
        },
        _ => None,
    }
}

/// Paragraph and heading blocks between the selection's start and end blocks,
/// in document order.
fn selected_heading_targets(editor: &Editor) -> Vec<Path> {
    fn walk(nodes: &[Node], path: &mut Vec<usize>, out: &mut Vec<Path>) {
        for (ix, node) in nodes.iter().enumerate() {
            let Node::Element(el) = node else {
                continue;
            };
            path.push(ix);
            if el.kind.is_text_block() {
                out.push(path.clone());
            } else {
                walk(&el.children, path, out);
            }
            path.pop();
        }
    }

    let (start, end) = ordered_selection_points(editor.selection());
    let start_block = start.path.split_last().map(|(_, p)| p.to_vec());
    let end_block = end.path.split_last().map(|(_, p)| p.to_vec());
    let (Some(start_block), Some(end_block)) = (start_block, end_block) else {
        return Vec::new();
    };

    let mut blocks = Vec::new();
    walk(&editor.doc().children, &mut Vec::new(), &mut blocks);
    let (Some(from), Some(to)) = (
        blocks.iter().position(|p| *p == start_block),
        blocks.iter().position(|p| *p == end_block),
    ) else {
        return Vec::new();
    };
    let (from, to) = if from <= to { (from, to) } else { (to, from) };

    blocks
        .into_iter()
        .take(to + 1)
        .skip(from)
        .filter(|path| {
            matches!(
                node_at_path(editor.doc(), path),
                Some(Node::Element(el))
                    if matches!(el.kind, ElementKind::Paragraph | ElementKind::Heading { .. })
            )
        })
        .collect()
}

fn set_block_kind(editor: &Editor, kind: ElementKind, source: &str) -> Result<Transaction, String> {
    let targets = selected_heading_targets(editor);
    if targets.is_empty() {
        return Err("Selection is not in a paragraph or heading".into());
    }

    let ops = targets
        .into_iter()
        .filter(|path| {
            !matches!(node_at_path(editor.doc(), path), Some(Node::Element(el)) if el.kind == kind)
        })
        .map(|path| Op::SetNodeAttrs {
            path,
            attrs: NodeAttrs::Element(kind.clone()),
        })
        .collect();

    Ok(Transaction::new(ops).source(source))
}

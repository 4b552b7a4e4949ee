use std::cmp::Ordering;

use serde_json::Value;

use crate::core::{
    Document, Editor, ElementNode, Marks, Node, Point, Selection, TextNode, clamp_to_char_boundary,
};
use crate::markup::style::css_color;
use crate::ops::{Op, Path, Transaction};
use crate::schema::ElementKind;

use super::{
    CommandError, CommandSpec, PagePlugin, QueryError, QuerySpec, apply_command_tx, color_arg,
    node_at_path, string_arg,
};

pub(super) struct MarksPlugin;

type MarkFlag = (fn(&Marks) -> bool, fn(&mut Marks, bool));

fn bold() -> MarkFlag {
    (|m| m.bold, |m, v| m.bold = v)
}

fn italic() -> MarkFlag {
    (|m| m.italic, |m, v| m.italic = v)
}

fn underline() -> MarkFlag {
    (|m| m.underline, |m, v| m.underline = v)
}

fn strikethrough() -> MarkFlag {
    (|m| m.strikethrough, |m, v| m.strikethrough = v)
}

fn subscript() -> MarkFlag {
    (
        |m| m.subscript,
        |m, v| {
            m.subscript = v;
            if v {
                m.superscript = false;
            }
        },
    )
}

fn superscript() -> MarkFlag {
    (
        |m| m.superscript,
        |m, v| {
            m.superscript = v;
            if v {
                m.subscript = false;
            }
        },
    )
}

fn toggle_command(id: &'static str, label: &'static str, flag: fn() -> MarkFlag) -> CommandSpec {
    let source = format!("command:{id}");
    CommandSpec::new(id, label, move |editor, _args| {
        let (get, set) = flag();
        toggle_bool_mark(editor, get, set, &source)
    })
    .description(format!("{label} on the current selection or caret."))
}

/// Which color mark a color command edits.
#[derive(Clone, Copy)]
enum ColorMark {
    Text,
    Highlight,
}

impl ColorMark {
    fn get(self, marks: &Marks) -> Option<&str> {
        match self {
            ColorMark::Text => marks.text_color.as_deref(),
            ColorMark::Highlight => marks.highlight_color.as_deref(),
        }
    }

    fn set(self, marks: &mut Marks, color: Option<String>) {
        match self {
            ColorMark::Text => marks.text_color = color,
            ColorMark::Highlight => marks.highlight_color = color,
        }
    }

    fn write(
        self,
        editor: &mut Editor,
        value: Option<String>,
        source: &str,
    ) -> Result<(), CommandError> {
        set_mark_value(
            editor,
            &|m: &mut Marks, v: Option<String>| self.set(m, v),
            value,
            source,
        )
    }

    /// Color given in `args`, or the configured default for highlights.
    fn color(self, editor: &Editor, args: Option<&Value>) -> Result<String, CommandError> {
        match (self, color_arg(args, "color")?) {
            (_, Some(color)) => Ok(color),
            (ColorMark::Highlight, None) => css_color(&editor.config().default_highlight_color)
                .ok_or_else(|| CommandError::new("Invalid default highlight color")),
            (ColorMark::Text, None) => Err(CommandError::new("Missing args.color")),
        }
    }
}

fn set_color_command(id: &'static str, label: &'static str, mark: ColorMark) -> CommandSpec {
    let source = format!("command:{id}");
    CommandSpec::new(id, label, move |editor, args| {
        let color = mark.color(editor, args.as_ref())?;
        mark.write(editor, Some(color), &source)
    })
}

fn unset_color_command(id: &'static str, label: &'static str, mark: ColorMark) -> CommandSpec {
    let source = format!("command:{id}");
    CommandSpec::new(id, label, move |editor, _args| {
        mark.write(editor, None, &source)
    })
}

/// Same color already on the whole selection clears the mark; anything else
/// replaces it.
fn toggle_color_command(id: &'static str, label: &'static str, mark: ColorMark) -> CommandSpec {
    let source = format!("command:{id}");
    CommandSpec::new(id, label, move |editor, args| {
        let color = mark.color(editor, args.as_ref())?;
        let sel = editor.selection().clone();
        let active = selection_has_mark(editor, &sel, &|m: &Marks| {
            mark.get(m) == Some(color.as_str())
        })
        .map_err(CommandError::new)?;
        let value = (!active).then_some(color);
        mark.write(editor, value, &source)
    })
}

impl PagePlugin for MarksPlugin {
    fn id(&self) -> &'static str {
        "marks"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            toggle_command("marks.toggle_bold", "Toggle bold", bold)
                .keywords(["bold", "strong", "mark"]),
            toggle_command("marks.toggle_italic", "Toggle italic", italic)
                .keywords(["italic", "emphasis", "mark"]),
            toggle_command("marks.toggle_underline", "Toggle underline", underline)
                .keywords(["underline", "mark"]),
            toggle_command("marks.toggle_strike", "Toggle strikethrough", strikethrough)
                .keywords(["strike", "strikethrough", "mark"]),
            toggle_command("marks.toggle_subscript", "Toggle subscript", subscript)
                .keywords(["subscript", "mark"]),
            toggle_command("marks.toggle_superscript", "Toggle superscript", superscript)
                .keywords(["superscript", "mark"]),
            CommandSpec::new("marks.set_link", "Set link", |editor, args| {
                let href = string_arg(args.as_ref(), "href")
                    .ok_or_else(|| CommandError::new("Missing args.href"))?;
                let set_link = |m: &mut Marks, v: Option<String>| m.link = v;
                set_mark_value(editor, &set_link, Some(href), "command:marks.set_link")
            })
            .description("Link the current selection.")
            .keywords(["link", "url", "href"])
            .args_example(serde_json::json!({ "href": "https://example.com" })),
            CommandSpec::new("marks.unset_link", "Remove link", |editor, _args| {
                let set_link = |m: &mut Marks, v: Option<String>| m.link = v;
                set_mark_value(editor, &set_link, None, "command:marks.unset_link")
            })
            .keywords(["link", "unlink"]),
            set_color_command("marks.set_text_color", "Set text color", ColorMark::Text)
                .description("Replace the text color of the current selection.")
                .keywords(["color", "text", "foreground"])
                .args_example(serde_json::json!({ "color": "#ef4444" })),
            unset_color_command("marks.unset_text_color", "Clear text color", ColorMark::Text)
                .keywords(["color", "text", "clear"]),
            toggle_color_command("marks.toggle_text_color", "Toggle text color", ColorMark::Text)
                .description("Clear the text color when it already has this color, otherwise apply it.")
                .keywords(["color", "text", "toggle"])
                .args_example(serde_json::json!({ "color": "#ef4444" })),
            set_color_command("marks.set_highlight", "Set highlight", ColorMark::Highlight)
                .description("Replace the highlight color of the current selection.")
                .keywords(["highlight", "background", "color"])
                .args_example(serde_json::json!({ "color": "#fef08a" })),
            unset_color_command("marks.unset_highlight", "Clear highlight", ColorMark::Highlight)
                .keywords(["highlight", "clear"]),
            toggle_color_command("marks.toggle_highlight", "Toggle highlight", ColorMark::Highlight)
                .description("Clear the highlight when it already has this color, otherwise apply it.")
                .keywords(["highlight", "toggle"])
                .args_example(serde_json::json!({ "color": "#fef08a" })),
            CommandSpec::new("core.insert_text", "Insert text", |editor, args| {
                let text = args
                    .as_ref()
                    .and_then(|v| v.get("text"))
                    .and_then(Value::as_str)
                    .ok_or_else(|| CommandError::new("Missing args.text"))?
                    .to_string();
                let tx = insert_text_at_caret(editor, &text);
                apply_command_tx(editor, tx, "Failed to insert text")
            })
            .description("Type text at the caret with the caret's marks.")
            .keywords(["text", "type", "insert"])
            .args_example(serde_json::json!({ "text": "hello" })),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![QuerySpec::new("marks.get_active", |editor, _args| {
            serde_json::to_value(active_marks(editor))
                .map_err(|e| QueryError::new(format!("Failed to encode marks: {e}")))
        })]
    }
}

/// Marks the next typed text gets: the pending caret marks when set,
/// otherwise those of the text leaf under the caret.
pub fn active_marks(editor: &Editor) -> Marks {
    if let Some(marks) = editor.pending_marks() {
        return marks.clone();
    }
    let focus = &editor.selection().focus;
    match node_at_path(editor.doc(), &focus.path) {
        Some(Node::Text(text)) => text.marks.clone(),
        _ => Marks::default(),
    }
}

struct TextBlock<'a> {
    path: Path,
    el: &'a ElementNode,
}

fn text_blocks_in_order(doc: &Document) -> Vec<TextBlock<'_>> {
    fn walk<'a>(nodes: &'a [Node], path: &mut Vec<usize>, out: &mut Vec<TextBlock<'a>>) {
        for (ix, node) in nodes.iter().enumerate() {
            let Node::Element(el) = node else {
                continue;
            };
            path.push(ix);
            if el.kind.is_text_block() {
                out.push(TextBlock {
                    path: path.clone(),
                    el,
                });
            } else {
                walk(&el.children, path, out);
            }
            path.pop();
        }
    }

    let mut out = Vec::new();
    walk(&doc.children, &mut Vec::new(), &mut out);
    out
}

fn text_leaves(children: &[Node]) -> impl Iterator<Item = (usize, &TextNode)> {
    children.iter().enumerate().filter_map(|(ix, node)| match node {
        Node::Text(t) => Some((ix, t)),
        _ => None,
    })
}

/// Byte offset of `(child_ix, offset)` within the concatenated inline text.
fn point_global_offset(children: &[Node], child_ix: usize, offset: usize) -> usize {
    let before: usize = text_leaves(children)
        .take_while(|(ix, _)| *ix < child_ix)
        .map(|(_, t)| t.text.len())
        .sum();
    let within = match children.get(child_ix) {
        Some(Node::Text(t)) => clamp_to_char_boundary(&t.text, offset),
        _ => 0,
    };
    before + within
}

/// Inverse of [`point_global_offset`]. A boundary between two leaves maps to
/// the start of the right one; offsets past the end clamp to the last leaf.
fn point_for_global_offset(block_path: &[usize], children: &[Node], global_offset: usize) -> Point {
    let leaf_point = |ix: usize, offset: usize| {
        let mut path = block_path.to_vec();
        path.push(ix);
        Point::new(path, offset)
    };

    let mut remaining = global_offset;
    let mut last = None;
    for (ix, leaf) in text_leaves(children) {
        let len = leaf.text.len();
        match remaining.cmp(&len) {
            Ordering::Less => return leaf_point(ix, clamp_to_char_boundary(&leaf.text, remaining)),
            Ordering::Equal if matches!(children.get(ix + 1), Some(Node::Text(_))) => {
                return leaf_point(ix + 1, 0);
            }
            Ordering::Equal => return leaf_point(ix, len),
            Ordering::Greater => remaining -= len,
        }
        last = Some((ix, len));
    }
    match last {
        Some((ix, len)) => leaf_point(ix, len),
        None => leaf_point(0, 0),
    }
}

fn is_point_in_block(point: &Point, block_path: &[usize]) -> bool {
    point.path.len() == block_path.len() + 1 && point.path.starts_with(block_path)
}

fn total_text_len(children: &[Node]) -> usize {
    text_leaves(children).map(|(_, t)| t.text.len()).sum()
}

/// Anchor and focus in document order.
pub(crate) fn ordered_selection_points(sel: &Selection) -> (Point, Point) {
    let (anchor, focus) = (&sel.anchor, &sel.focus);
    if (&anchor.path, anchor.offset) <= (&focus.path, focus.offset) {
        (anchor.clone(), focus.clone())
    } else {
        (focus.clone(), anchor.clone())
    }
}

/// Per text block in the selection: the block and the `[start, end)` byte range
/// of its inline text that the selection covers.
fn selected_ranges<'a>(
    doc: &'a Document,
    sel: &Selection,
) -> Result<Vec<(TextBlock<'a>, usize, usize)>, String> {
    let (start, end) = ordered_selection_points(sel);

    let Some(start_block_path) = start.path.split_last().map(|(_, p)| p.to_vec()) else {
        return Err("Selection start is not in a text block".into());
    };
    let Some(end_block_path) = end.path.split_last().map(|(_, p)| p.to_vec()) else {
        return Err("Selection end is not in a text block".into());
    };

    let blocks = text_blocks_in_order(doc);
    let start_index = blocks
        .iter()
        .position(|b| b.path == start_block_path)
        .ok_or_else(|| "Selection start is not in a text block".to_string())?;
    let end_index = blocks
        .iter()
        .position(|b| b.path == end_block_path)
        .ok_or_else(|| "Selection end is not in a text block".to_string())?;

    let (start_index, end_index) = if start_index <= end_index {
        (start_index, end_index)
    } else {
        (end_index, start_index)
    };

    let start_inline_ix = start.path.last().copied().unwrap_or(0);
    let end_inline_ix = end.path.last().copied().unwrap_or(0);

    let mut out = Vec::new();
    for (block_index, block) in blocks
        .into_iter()
        .enumerate()
        .take(end_index + 1)
        .skip(start_index)
    {
        if block.el.kind == ElementKind::CodeBlock {
            continue;
        }
        let children = block.el.children.as_slice();
        let total_len = total_text_len(children);
        if total_len == 0 {
            continue;
        }
        let start_global = if block_index == start_index {
            point_global_offset(children, start_inline_ix, start.offset)
        } else {
            0
        };
        let end_global = if block_index == end_index {
            point_global_offset(children, end_inline_ix, end.offset)
        } else {
            total_len
        };
        if start_global >= end_global {
            continue;
        }
        out.push((block, start_global, end_global));
    }
    Ok(out)
}

/// Whether every text leaf touched by the selection satisfies `pred`; at a
/// caret, whether the leaf under the caret does.
pub(crate) fn selection_has_mark(
    editor: &Editor,
    sel: &Selection,
    pred: &dyn Fn(&Marks) -> bool,
) -> Result<bool, String> {
    if sel.is_collapsed() {
        return Ok(pred(&active_marks(editor)));
    }

    let ranges = selected_ranges(editor.doc(), sel)?;
    if ranges.is_empty() {
        return Ok(pred(&active_marks(editor)));
    }

    for (block, start_global, end_global) in ranges {
        let mut cursor = 0usize;
        for node in &block.el.children {
            let Node::Text(t) = node else {
                continue;
            };
            let node_start = cursor;
            let node_end = cursor + t.text.len();
            cursor = node_end;
            if end_global <= node_start || start_global >= node_end {
                continue;
            }
            if !pred(&t.marks) {
                return Ok(false);
            }
        }
    }
    Ok(true)
}

/// Rebuilds a block's inline children with `apply` run over the
/// `[start_global, end_global)` byte range, splitting leaves at the edges.
fn apply_marks_in_block(
    children: &[Node],
    start_global: usize,
    end_global: usize,
    apply: &dyn Fn(Marks) -> Marks,
) -> Vec<Node> {
    let mut out = Vec::with_capacity(children.len() + 2);
    let mut leaf_start = 0usize;

    for node in children {
        let Node::Text(t) = node else {
            out.push(node.clone());
            continue;
        };
        let leaf_end = leaf_start + t.text.len();
        let from = clamp_to_char_boundary(&t.text, start_global.saturating_sub(leaf_start));
        let to = clamp_to_char_boundary(&t.text, end_global.saturating_sub(leaf_start));
        let overlaps = start_global < leaf_end && end_global > leaf_start;
        leaf_start = leaf_end;

        if !overlaps {
            out.push(node.clone());
            continue;
        }
        let pieces = [
            (&t.text[..from], t.marks.clone()),
            (&t.text[from..to], apply(t.marks.clone())),
            (&t.text[to..], t.marks.clone()),
        ];
        out.extend(
            pieces
                .into_iter()
                .filter(|(text, _)| !text.is_empty())
                .map(|(text, marks)| Node::Text(TextNode::marked(text, marks))),
        );
    }

    if out.is_empty() {
        out.push(Node::Text(TextNode::plain("")));
    }
    out
}

fn apply_mark_range(
    editor: &Editor,
    sel: &Selection,
    apply: &dyn Fn(Marks) -> Marks,
) -> Result<(Vec<Op>, Selection), String> {
    let mut ops: Vec<Op> = Vec::new();
    let mut new_anchor = sel.anchor.clone();
    let mut new_focus = sel.focus.clone();

    for (block, start_global, end_global) in selected_ranges(editor.doc(), sel)? {
        let children = block.el.children.as_slice();
        let new_children = apply_marks_in_block(children, start_global, end_global, apply);

        for child_ix in (0..children.len()).rev() {
            let mut remove_path = block.path.clone();
            remove_path.push(child_ix);
            ops.push(Op::RemoveNode { path: remove_path });
        }
        for (child_ix, node) in new_children.iter().cloned().enumerate() {
            let mut insert_path = block.path.clone();
            insert_path.push(child_ix);
            ops.push(Op::InsertNode {
                path: insert_path,
                node,
            });
        }

        for point in [&mut new_anchor, &mut new_focus] {
            if is_point_in_block(point, &block.path) {
                let global = point_global_offset(
                    children,
                    point.path.last().copied().unwrap_or(0),
                    point.offset,
                );
                *point = point_for_global_offset(&block.path, &new_children, global);
            }
        }
    }

    Ok((
        ops,
        Selection {
            anchor: new_anchor,
            focus: new_focus,
        },
    ))
}

/// Types `text` at a collapsed caret. Pending caret marks that differ from
/// the leaf under the caret split it around the new run.
fn insert_text_at_caret(editor: &Editor, text: &str) -> Result<Transaction, String> {
    let sel = editor.selection();
    if !sel.is_collapsed() {
        return Err("Text insertion needs a collapsed caret".into());
    }
    if text.is_empty() {
        return Ok(Transaction::default());
    }

    let focus = &sel.focus;
    let Some(Node::Text(leaf)) = node_at_path(editor.doc(), &focus.path) else {
        return Err("Selection is not in a text node".into());
    };
    let offset = clamp_to_char_boundary(&leaf.text, focus.offset);
    let marks = editor
        .pending_marks()
        .cloned()
        .unwrap_or_else(|| leaf.marks.clone());
    let source = "command:core.insert_text";

    if marks == leaf.marks {
        return Ok(Transaction::new(vec![Op::InsertText {
            path: focus.path.clone(),
            offset,
            text: text.to_string(),
        }])
        .selection_after(Selection::collapsed(Point::new(
            focus.path.clone(),
            offset + text.len(),
        )))
        .source(source));
    }

    let Some((&child_ix, block_path)) = focus.path.split_last() else {
        return Err("Selection is not in a text node".into());
    };
    let left = &leaf.text[..offset];
    let right = &leaf.text[offset..];
    let caret_ix = if left.is_empty() { child_ix } else { child_ix + 1 };
    let pieces = [
        (left, leaf.marks.clone()),
        (text, marks),
        (right, leaf.marks.clone()),
    ];

    let mut ops = vec![Op::RemoveNode {
        path: focus.path.clone(),
    }];
    let inserted = pieces
        .into_iter()
        .filter(|(piece, _)| !piece.is_empty())
        .map(|(piece, marks)| Node::Text(TextNode::marked(piece, marks)));
    for (i, node) in inserted.enumerate() {
        let mut path = block_path.to_vec();
        path.push(child_ix + i);
        ops.push(Op::InsertNode { path, node });
    }

    let mut caret_path = block_path.to_vec();
    caret_path.push(caret_ix);
    Ok(Transaction::new(ops)
        .selection_after(Selection::collapsed(Point::new(caret_path, text.len())))
        .source(source))
}

/// Applies `apply` to the selected text. At a collapsed caret the result is
/// kept as pending marks; code blocks take no marks.
fn run_mark_command(
    editor: &mut Editor,
    apply: &dyn Fn(Marks) -> Marks,
    source: &str,
) -> Result<(), CommandError> {
    let sel = editor.selection().clone();
    if sel.is_collapsed() {
        let Some((_, block_path)) = sel.focus.path.split_last() else {
            return Err(CommandError::new("Selection is not in a text node"));
        };
        match node_at_path(editor.doc(), block_path) {
            Some(Node::Element(el)) if el.kind == ElementKind::CodeBlock => return Ok(()),
            Some(Node::Element(el)) if el.kind.is_text_block() => {}
            _ => return Err(CommandError::new("Selection is not in a text block")),
        }
        let marks = apply(active_marks(editor));
        editor.set_pending_marks(marks);
        return Ok(());
    }

    let (ops, selection_after) = apply_mark_range(editor, &sel, apply).map_err(CommandError::new)?;
    if ops.is_empty() {
        return Ok(());
    }
    let tx = Transaction::new(ops)
        .selection_after(selection_after)
        .source(source);
    apply_command_tx(editor, Ok(tx), "Failed to apply marks")
}

fn toggle_bool_mark(
    editor: &mut Editor,
    get: fn(&Marks) -> bool,
    set: fn(&mut Marks, bool),
    source: &str,
) -> Result<(), CommandError> {
    let sel = editor.selection().clone();
    let target = !selection_has_mark(editor, &sel, &get).map_err(CommandError::new)?;
    run_mark_command(
        editor,
        &|mut marks: Marks| {
            set(&mut marks, target);
            marks
        },
        source,
    )
}

fn set_mark_value(
    editor: &mut Editor,
    set: &dyn Fn(&mut Marks, Option<String>),
    value: Option<String>,
    source: &str,
) -> Result<(), CommandError> {
    run_mark_command(
        editor,
        &|mut marks: Marks| {
            set(&mut marks, value.clone());
            marks
        },
        source,
    )
}

use html5ever::tendril::TendrilSink;
use html5ever::{ParseOpts, parse_document};
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use tracing::debug;

use super::{
    ATTR_VIDEO_WRAPPER, MarkupAttrs, NodeMarkup, highlight_from_markup, text_color_from_markup,
};
use crate::core::{Document, ElementNode, Marks, Node, TextNode};
use crate::schema::{CellAttrs, ElementKind, ImageAttrs, VideoAttrs};
use crate::video::{is_embed_url, normalize_video_url};

/// Elements whose content is dropped entirely.
const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "head", "template", "noscript", "title", "meta", "link",
];

/// Containers that are transparent at block level: their children are read
/// as if they were siblings of the container.
const TRANSPARENT_BLOCK_TAGS: &[&str] = &[
    "html", "body", "div", "section", "article", "header", "footer", "main", "nav", "aside",
    "figure", "figcaption", "center", "form", "fieldset", "details", "summary", "dl", "dd",
    "dt", "address", "thead", "tbody", "tfoot", "caption", "li",
];

pub fn parse_markup(markup: &str) -> Document {
    let dom = parse_document(RcDom::default(), ParseOpts::default()).one(markup);
    let Some(body) = find_element(&dom.document, "body") else {
        return Document::default();
    };

    let mut children = Vec::new();
    let handles: Vec<Handle> = body.children.borrow().iter().cloned().collect();
    parse_blocks(&handles, &mut children);
    debug!(blocks = children.len(), "parsed markup");
    Document { children }
}

fn find_element(handle: &Handle, tag: &str) -> Option<Handle> {
    if element_name(handle).as_deref() == Some(tag) {
        return Some(handle.clone());
    }
    handle
        .children
        .borrow()
        .iter()
        .find_map(|child| find_element(child, tag))
}

fn element_name(handle: &Handle) -> Option<String> {
    match &handle.data {
        NodeData::Element { name, .. } => Some(name.local.as_ref().to_ascii_lowercase()),
        _ => None,
    }
}

fn element_attrs(handle: &Handle) -> MarkupAttrs {
    match &handle.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
            .collect(),
        _ => MarkupAttrs::new(),
    }
}

fn children_of(handle: &Handle) -> Vec<Handle> {
    handle.children.borrow().iter().cloned().collect()
}

/// Inline runs gathered while walking a text block, plus any media found
/// inside them, which are emitted as blocks after the text block.
#[derive(Default)]
struct InlineContent {
    runs: Vec<TextNode>,
    hoisted: Vec<Node>,
}

impl InlineContent {
    fn push_text(&mut self, text: &str, marks: &Marks) {
        if text.is_empty() {
            return;
        }
        if let Some(last) = self.runs.last_mut() {
            if last.marks == *marks {
                last.text.push_str(text);
                return;
            }
        }
        self.runs.push(TextNode::marked(text, marks.clone()));
    }

    fn is_blank(&self) -> bool {
        self.runs.iter().all(|run| run.text.trim().is_empty())
    }

    fn into_block(self, kind: ElementKind, out: &mut Vec<Node>) {
        let InlineContent { mut runs, hoisted } = self;
        let has_text = runs.iter().any(|run| !run.text.is_empty());
        if has_text || hoisted.is_empty() {
            if runs.is_empty() {
                runs.push(TextNode::plain(""));
            }
            out.push(Node::text_block(kind, runs));
        }
        out.extend(hoisted);
    }
}

fn parse_blocks(handles: &[Handle], out: &mut Vec<Node>) {
    let mut pending = InlineContent::default();

    let flush = |pending: &mut InlineContent, out: &mut Vec<Node>| {
        let content = std::mem::take(pending);
        if content.is_blank() {
            out.extend(content.hoisted);
        } else {
            content.into_block(ElementKind::Paragraph, out);
        }
    };

    for handle in handles {
        match &handle.data {
            NodeData::Text { contents } => {
                let text = collapse_whitespace(&contents.borrow());
                pending.push_text(&text, &Marks::default());
                continue;
            }
            NodeData::Element { .. } => {}
            _ => continue,
        }

        let Some(tag) = element_name(handle) else {
            continue;
        };
        if SKIPPED_TAGS.contains(&tag.as_str()) {
            continue;
        }

        if let Some(block) = parse_block_element(handle, &tag) {
            flush(&mut pending, out);
            match block {
                BlockParse::Nodes(nodes) => out.extend(nodes),
                BlockParse::Transparent => parse_blocks(&children_of(handle), out),
            }
        } else {
            parse_inline(handle, &Marks::default(), &mut pending);
        }
    }

    flush(&mut pending, out);
}

enum BlockParse {
    Nodes(Vec<Node>),
    Transparent,
}

/// `None` when `tag` is inline content.
fn parse_block_element(handle: &Handle, tag: &str) -> Option<BlockParse> {
    let nodes = match tag {
        "p" => text_block(handle, ElementKind::Paragraph),
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = tag[1..].parse::<u64>().unwrap_or(1);
            text_block(handle, ElementKind::heading(level))
        }
        "pre" => vec![code_block(handle)],
        "blockquote" => vec![container(handle, ElementKind::Blockquote)],
        "ul" => vec![list(handle, ElementKind::BulletList)],
        "ol" => vec![list(handle, ElementKind::OrderedList)],
        "hr" => vec![Node::horizontal_rule()],
        "table" => table(handle).into_iter().collect(),
        "img" => vec![image(handle)],
        "iframe" => video_from_player(handle).into_iter().collect(),
        "div" if element_attrs(handle).contains(ATTR_VIDEO_WRAPPER) => {
            video(handle).into_iter().collect()
        }
        _ if TRANSPARENT_BLOCK_TAGS.contains(&tag) => return Some(BlockParse::Transparent),
        _ => return None,
    };
    Some(BlockParse::Nodes(nodes))
}

fn text_block(handle: &Handle, kind: ElementKind) -> Vec<Node> {
    let mut content = InlineContent::default();
    for child in children_of(handle) {
        parse_inline(&child, &Marks::default(), &mut content);
    }
    let mut out = Vec::new();
    content.into_block(kind, &mut out);
    out
}

fn parse_inline(handle: &Handle, marks: &Marks, content: &mut InlineContent) {
    let tag = match &handle.data {
        NodeData::Text { contents } => {
            content.push_text(&collapse_whitespace(&contents.borrow()), marks);
            return;
        }
        NodeData::Element { .. } => match element_name(handle) {
            Some(tag) => tag,
            None => return,
        },
        _ => return,
    };

    if SKIPPED_TAGS.contains(&tag.as_str()) {
        return;
    }

    let attrs = element_attrs(handle);
    let mut next = marks.clone();
    match tag.as_str() {
        "br" => {
            content.push_text("\n", marks);
            return;
        }
        "img" => {
            content.hoisted.push(image(handle));
            return;
        }
        "iframe" => {
            content.hoisted.extend(video_from_player(handle));
            return;
        }
        "div" if attrs.contains(ATTR_VIDEO_WRAPPER) => {
            content.hoisted.extend(video(handle));
            return;
        }
        "strong" | "b" => next.bold = true,
        "em" | "i" => next.italic = true,
        "u" => next.underline = true,
        "s" | "strike" | "del" => next.strikethrough = true,
        "sub" => {
            next.subscript = true;
            next.superscript = false;
        }
        "sup" => {
            next.superscript = true;
            next.subscript = false;
        }
        "a" => {
            if let Some(href) = attrs.get("href") {
                next.link = Some(href.to_string());
            }
        }
        "mark" => next.highlight_color = Some(highlight_from_markup(&attrs)),
        "span" | "font" => {
            if let Some(color) = text_color_from_markup(&attrs) {
                next.text_color = Some(color);
            } else if let Some(color) = attrs.get("color").filter(|_| tag == "font") {
                next.text_color = Some(color.to_string());
            }
        }
        _ => {}
    }

    for child in children_of(handle) {
        parse_inline(&child, &next, content);
    }
}

fn code_block(handle: &Handle) -> Node {
    let mut text = String::new();
    collect_text(handle, &mut text);
    Node::text_block(ElementKind::CodeBlock, vec![TextNode::plain(text)])
}

fn collect_text(handle: &Handle, out: &mut String) {
    match &handle.data {
        NodeData::Text { contents } => out.push_str(&contents.borrow()),
        NodeData::Element { .. } => {
            if element_name(handle).as_deref() == Some("br") {
                out.push('\n');
                return;
            }
            for child in handle.children.borrow().iter() {
                collect_text(child, out);
            }
        }
        _ => {}
    }
}

fn container(handle: &Handle, kind: ElementKind) -> Node {
    let mut children = Vec::new();
    parse_blocks(&children_of(handle), &mut children);
    Node::element(kind, children)
}

fn list(handle: &Handle, kind: ElementKind) -> Node {
    let mut items = Vec::new();
    for child in children_of(handle) {
        match element_name(&child).as_deref() {
            Some("li") => items.push(container(&child, ElementKind::ListItem)),
            Some(_) => {
                let mut blocks = Vec::new();
                parse_blocks(std::slice::from_ref(&child), &mut blocks);
                if !blocks.is_empty() {
                    items.push(Node::element(ElementKind::ListItem, blocks));
                }
            }
            None => {}
        }
    }
    Node::element(kind, items)
}

fn table(handle: &Handle) -> Option<Node> {
    let mut rows: Vec<Vec<Node>> = Vec::new();
    collect_rows(handle, &mut rows);
    if rows.is_empty() {
        return None;
    }

    let cols = rows.iter().map(Vec::len).max().unwrap_or(0).max(1);
    let rows = rows
        .into_iter()
        .map(|mut cells| {
            while cells.len() < cols {
                cells.push(Node::element(
                    ElementKind::TableCell(CellAttrs::default()),
                    vec![Node::paragraph("")],
                ));
            }
            Node::element(ElementKind::TableRow, cells)
        })
        .collect();

    Some(Node::element(ElementKind::Table, rows))
}

fn collect_rows(handle: &Handle, rows: &mut Vec<Vec<Node>>) {
    for child in children_of(handle) {
        match element_name(&child).as_deref() {
            Some("tr") => rows.push(row_cells(&child)),
            Some("thead" | "tbody" | "tfoot") => collect_rows(&child, rows),
            _ => {}
        }
    }
}

fn row_cells(row: &Handle) -> Vec<Node> {
    let mut cells = Vec::new();
    for child in children_of(row) {
        let Some(tag) = element_name(&child) else {
            continue;
        };
        let attrs = CellAttrs::from_markup(&element_attrs(&child));
        let kind = match tag.as_str() {
            "td" => ElementKind::TableCell(attrs),
            "th" => ElementKind::TableHeader(attrs),
            _ => continue,
        };
        let mut blocks = Vec::new();
        parse_blocks(&children_of(&child), &mut blocks);
        if blocks.is_empty() {
            blocks.push(Node::paragraph(""));
        }
        cells.push(Node::Element(ElementNode {
            kind,
            children: blocks,
        }));
    }
    cells
}

fn image(handle: &Handle) -> Node {
    Node::image(ImageAttrs::from_markup(&element_attrs(handle)))
}

fn video(wrapper: &Handle) -> Option<Node> {
    let player = find_element(wrapper, "iframe")?;
    video_from_player(&player)
}

fn video_from_player(player: &Handle) -> Option<Node> {
    let mut attrs = VideoAttrs::from_markup(&element_attrs(player));
    if attrs.src.trim().is_empty() {
        return None;
    }
    if !is_embed_url(&attrs.src) {
        if let Some(embed) = normalize_video_url(Some(&attrs.src)) {
            attrs.src = embed;
        }
    }
    Some(Node::video(attrs))
}

/// Markup line breaks are not content outside `<pre>`; `<br>` is.
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_break = false;
    for ch in text.chars() {
        if matches!(ch, '\n' | '\r') {
            if !in_break {
                out.push(' ');
                in_break = true;
            }
            continue;
        }
        in_break = false;
        out.push(ch);
    }
    out
}

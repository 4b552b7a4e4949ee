//! Documents built through editing commands survive rendering to markup and
//! parsing back.

use kb_page_core::{
    Document, Editor, EditorConfig, Node, Path, Point, Selection, parse_markup, render_markup,
};
use proptest::prelude::*;
use serde_json::{Value, json};

const SEED: &str = "<p>alpha beta gamma</p>\
    <ul><li><p>item one</p></li></ul>\
    <blockquote><p>quoted line</p></blockquote>\
    <pre><code>let x = 1;</code></pre>";

/// One user action. Leaf and offset indices wrap around whatever the
/// document holds when the step runs.
#[derive(Debug, Clone)]
enum Step {
    Select((usize, usize), (usize, usize)),
    Caret(usize, usize),
    Command(&'static str),
    Color(&'static str, String),
    Link(String),
    Type(String),
    Heading(u8),
    Table(usize, usize),
    Image(String),
    Video(String),
    Undo,
}

const PLAIN_COMMANDS: &[&str] = &[
    "marks.toggle_bold",
    "marks.toggle_italic",
    "marks.toggle_underline",
    "marks.toggle_strike",
    "marks.toggle_subscript",
    "marks.toggle_superscript",
    "marks.unset_link",
    "marks.unset_text_color",
    "marks.unset_highlight",
    "block.unset_heading",
    "core.insert_horizontal_rule",
    "table.insert_row_below",
    "table.insert_col_right",
    "table.delete_row",
    "table.delete_col",
];

const COLOR_COMMANDS: &[&str] = &[
    "marks.set_text_color",
    "marks.toggle_text_color",
    "marks.set_highlight",
    "marks.toggle_highlight",
    "table.set_cell_color",
];

fn position() -> impl Strategy<Value = (usize, usize)> {
    (0usize..32, 0usize..32)
}

fn color() -> impl Strategy<Value = String> {
    prop_oneof![
        "#[0-9a-f]{6}",
        "rgb\\([0-9]{1,3}, [0-9]{1,3}, [0-9]{1,3}\\)",
        "(red|teal|gold)",
    ]
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => (position(), position()).prop_map(|(a, f)| Step::Select(a, f)),
        2 => position().prop_map(|(leaf, offset)| Step::Caret(leaf, offset)),
        4 => prop::sample::select(PLAIN_COMMANDS).prop_map(Step::Command),
        3 => (prop::sample::select(COLOR_COMMANDS), color())
            .prop_map(|(id, color)| Step::Color(id, color)),
        1 => "https://example\\.com/[a-z]{1,6}".prop_map(Step::Link),
        3 => "[a-zA-Z0-9 ,.<>&\t]{1,8}".prop_map(Step::Type),
        1 => (1u8..=3).prop_map(Step::Heading),
        1 => (1usize..4, 1usize..4).prop_map(|(rows, cols)| Step::Table(rows, cols)),
        1 => "/files/[a-z]{1,8}\\.png".prop_map(Step::Image),
        1 => "https://vk\\.com/video-[0-9]{1,4}_[0-9]{1,4}".prop_map(Step::Video),
        1 => Just(Step::Undo),
    ]
}

/// Every text leaf in document order with its length.
fn text_leaves(doc: &Document) -> Vec<(Path, usize)> {
    fn walk(nodes: &[Node], path: &mut Path, out: &mut Vec<(Path, usize)>) {
        for (ix, node) in nodes.iter().enumerate() {
            path.push(ix);
            match node {
                Node::Text(t) => out.push((path.clone(), t.text.len())),
                Node::Element(el) => walk(&el.children, path, out),
                Node::Void(_) => {}
            }
            path.pop();
        }
    }

    let mut out = Vec::new();
    walk(&doc.children, &mut Vec::new(), &mut out);
    out
}

fn point_at(doc: &Document, (leaf, offset): (usize, usize)) -> Option<Point> {
    let leaves = text_leaves(doc);
    let (path, len) = leaves.get(leaf % leaves.len().max(1))?;
    Some(Point::new(path.clone(), offset % (len + 1)))
}

fn run(editor: &mut Editor, id: &str, args: Option<Value>) {
    // Commands used outside their context may refuse; the document must stay
    // well-formed either way.
    let _ = editor.run_command(id, args);
}

fn apply(editor: &mut Editor, step: &Step) {
    match step {
        Step::Select(anchor, focus) => {
            let points = point_at(editor.doc(), *anchor).zip(point_at(editor.doc(), *focus));
            if let Some((anchor, focus)) = points {
                editor.set_selection(Selection { anchor, focus });
            }
        }
        Step::Caret(leaf, offset) => {
            if let Some(point) = point_at(editor.doc(), (*leaf, *offset)) {
                editor.set_selection(Selection::collapsed(point));
            }
        }
        Step::Command(id) => run(editor, id, None),
        Step::Color(id, color) => run(editor, id, Some(json!({ "color": color }))),
        Step::Link(href) => run(editor, "marks.set_link", Some(json!({ "href": href }))),
        Step::Type(text) => run(editor, "core.insert_text", Some(json!({ "text": text }))),
        Step::Heading(level) => run(
            editor,
            "block.toggle_heading",
            Some(json!({ "level": level })),
        ),
        Step::Table(rows, cols) => run(
            editor,
            "table.insert",
            Some(json!({ "rows": rows, "cols": cols })),
        ),
        Step::Image(src) => run(editor, "image.insert", Some(json!({ "src": src }))),
        Step::Video(url) => run(editor, "video.insert", Some(json!({ "url": url }))),
        Step::Undo => {
            editor.undo();
        }
    }
}

fn has_marked_empty_leaf(nodes: &[Node]) -> bool {
    nodes.iter().any(|node| match node {
        Node::Text(t) => t.text.is_empty() && !t.marks.is_plain(),
        Node::Element(el) => has_marked_empty_leaf(&el.children),
        Node::Void(_) => false,
    })
}

proptest! {
    #[test]
    fn edited_documents_survive_the_markup_codec(steps in prop::collection::vec(step(), 1..16)) {
        let mut editor = Editor::from_markup(SEED, EditorConfig::default());
        for step in &steps {
            apply(&mut editor, step);
        }

        let doc = editor.doc().clone();
        prop_assert!(!has_marked_empty_leaf(&doc.children));

        let markup = render_markup(&doc);
        prop_assert_eq!(parse_markup(&markup), doc, "markup: {}", markup);
    }
}

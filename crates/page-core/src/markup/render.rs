use std::cell::{Cell, RefCell};
use std::rc::Rc;

use html5ever::serialize::{SerializeOpts, TraversalScope};
use html5ever::{Attribute, LocalName, QualName, ns, serialize};
use markup5ever_rcdom::{Handle, Node as DomNode, NodeData, SerializableHandle};
use tracing::error;

use super::{ATTR_HIGHLIGHT_COLOR, ATTR_VIDEO_WRAPPER, MarkupAttrs, NodeMarkup};
use crate::core::{Document, ElementNode, Marks, Node, TextNode};
use crate::schema::{ElementKind, VoidNode};

pub fn render_markup(doc: &Document) -> String {
    let mut output = Vec::new();
    let opts = SerializeOpts {
        traversal_scope: TraversalScope::IncludeNode,
        ..Default::default()
    };

    for block in &doc.children {
        for handle in render_node(block) {
            let serializable = SerializableHandle::from(handle);
            if let Err(err) = serialize(&mut output, &serializable, opts.clone()) {
                error!(error = %err, "failed to serialize block");
            }
        }
    }

    match String::from_utf8(output) {
        Ok(markup) => markup,
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
    }
}

fn render_node(node: &Node) -> Vec<Handle> {
    match node {
        Node::Element(el) => vec![render_element(el)],
        Node::Text(text) => render_run(text),
        Node::Void(void) => vec![render_void(void)],
    }
}

fn render_element(el: &ElementNode) -> Handle {
    let (tag, attrs) = match &el.kind {
        ElementKind::Paragraph => ("p", MarkupAttrs::new()),
        ElementKind::Heading { level } => (
            match level.get() {
                1 => "h1",
                2 => "h2",
                _ => "h3",
            },
            MarkupAttrs::new(),
        ),
        ElementKind::BulletList => ("ul", MarkupAttrs::new()),
        ElementKind::OrderedList => ("ol", MarkupAttrs::new()),
        ElementKind::ListItem => ("li", MarkupAttrs::new()),
        ElementKind::Blockquote => ("blockquote", MarkupAttrs::new()),
        ElementKind::CodeBlock => return render_code_block(el),
        ElementKind::Table => return render_table(el),
        ElementKind::TableRow => ("tr", MarkupAttrs::new()),
        ElementKind::TableCell(cell) => ("td", cell.to_markup()),
        ElementKind::TableHeader(cell) => ("th", cell.to_markup()),
    };

    let handle = create_element(tag, &attrs);
    append_children(&handle, el.children.iter().flat_map(render_node));
    handle
}

fn render_code_block(el: &ElementNode) -> Handle {
    let pre = create_element("pre", &MarkupAttrs::new());
    let code = create_element("code", &MarkupAttrs::new());
    let text = el.text();
    if !text.is_empty() {
        append_children(&code, [create_text(&text)]);
    }
    append_children(&pre, [code]);
    pre
}

fn render_table(el: &ElementNode) -> Handle {
    let table = create_element("table", &MarkupAttrs::new());
    let body = create_element("tbody", &MarkupAttrs::new());
    append_children(&body, el.children.iter().flat_map(render_node));
    append_children(&table, [body]);
    table
}

fn render_void(void: &VoidNode) -> Handle {
    match void {
        VoidNode::HorizontalRule => create_element("hr", &MarkupAttrs::new()),
        VoidNode::Image(attrs) => create_element("img", &attrs.to_markup()),
        VoidNode::Video(attrs) => {
            let wrapper_attrs: MarkupAttrs = [(ATTR_VIDEO_WRAPPER, "")].into_iter().collect();
            let wrapper = create_element("div", &wrapper_attrs);
            append_children(&wrapper, [create_element("iframe", &attrs.to_markup())]);
            wrapper
        }
    }
}

/// Wraps a text run in one element per mark, outermost first:
/// `a > strong > em > u > s > sub > sup > mark > span`.
fn render_run(run: &TextNode) -> Vec<Handle> {
    if run.text.is_empty() {
        return Vec::new();
    }

    let mut content: Vec<Handle> = Vec::new();
    for (ix, line) in run.text.split('\n').enumerate() {
        if ix > 0 {
            content.push(create_element("br", &MarkupAttrs::new()));
        }
        if !line.is_empty() {
            content.push(create_text(line));
        }
    }

    let Marks {
        bold,
        italic,
        underline,
        strikethrough,
        subscript,
        superscript,
        text_color,
        highlight_color,
        link,
    } = &run.marks;

    if let Some(color) = text_color {
        content = wrap("span", style_attrs("color", color), content);
    }
    if let Some(color) = highlight_color {
        let mut attrs = MarkupAttrs::new();
        attrs.set(ATTR_HIGHLIGHT_COLOR, color.as_str());
        attrs.set("style", format!("background-color:{color}"));
        content = wrap("mark", attrs, content);
    }
    for (enabled, tag) in [
        (*superscript, "sup"),
        (*subscript, "sub"),
        (*strikethrough, "s"),
        (*underline, "u"),
        (*italic, "em"),
        (*bold, "strong"),
    ] {
        if enabled {
            content = wrap(tag, MarkupAttrs::new(), content);
        }
    }
    if let Some(href) = link {
        let attrs: MarkupAttrs = [("href", href.as_str())].into_iter().collect();
        content = wrap("a", attrs, content);
    }
    content
}

fn style_attrs(prop: &str, value: &str) -> MarkupAttrs {
    let mut attrs = MarkupAttrs::new();
    attrs.set("style", format!("{prop}:{value}"));
    attrs
}

fn wrap(tag: &str, attrs: MarkupAttrs, content: Vec<Handle>) -> Vec<Handle> {
    let handle = create_element(tag, &attrs);
    append_children(&handle, content);
    vec![handle]
}

fn append_children(parent: &Handle, children: impl IntoIterator<Item = Handle>) {
    parent.children.borrow_mut().extend(children);
}

fn create_element(tag: &str, attrs: &MarkupAttrs) -> Handle {
    let qual_name = QualName::new(None, ns!(html), LocalName::from(tag));
    let attributes = attrs
        .iter()
        .map(|(name, value)| Attribute {
            name: QualName::new(None, ns!(), LocalName::from(name)),
            value: value.to_string().into(),
        })
        .collect();

    Rc::new(DomNode {
        parent: Cell::new(None),
        children: RefCell::new(Vec::new()),
        data: NodeData::Element {
            name: qual_name,
            attrs: RefCell::new(attributes),
            template_contents: Default::default(),
            mathml_annotation_xml_integration_point: false,
        },
    })
}

fn create_text(text: &str) -> Handle {
    Rc::new(DomNode {
        parent: Cell::new(None),
        children: RefCell::new(Vec::new()),
        data: NodeData::Text {
            contents: RefCell::new(text.to_string().into()),
        },
    })
}

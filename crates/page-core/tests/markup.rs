use kb_page_core::markup::{MarkupAttrs, NodeMarkup};
use kb_page_core::{
    CellAttrs, Document, ElementKind, ImageAlign, ImageAttrs, ImageDisplay, ImageFloat,
    ImageSize, Marks, Node, TextNode, VideoAttrs, parse_markup, render_markup,
};

fn cell(kind: ElementKind, text: &str) -> Node {
    Node::element(kind, vec![Node::paragraph(text)])
}

fn sample_document() -> Document {
    let bold = Marks {
        bold: true,
        ..Marks::default()
    };
    let colored = Marks {
        text_color: Some("#ef4444".into()),
        highlight_color: Some("#fef08a".into()),
        ..Marks::default()
    };
    let linked = Marks {
        link: Some("https://example.com/?a=1&b=2".into()),
        italic: true,
        ..Marks::default()
    };

    Document {
        children: vec![
            Node::heading(1, "Handbook"),
            Node::text_block(
                ElementKind::Paragraph,
                vec![
                    TextNode::plain("Hello "),
                    TextNode::marked("world", bold),
                    TextNode::plain(" and "),
                    TextNode::marked("color", colored),
                    TextNode::plain(", see "),
                    TextNode::marked("docs", linked),
                    TextNode::plain("\nsecond line"),
                ],
            ),
            Node::element(
                ElementKind::BulletList,
                vec![
                    Node::element(ElementKind::ListItem, vec![Node::paragraph("one")]),
                    Node::element(ElementKind::ListItem, vec![Node::paragraph("two")]),
                ],
            ),
            Node::element(ElementKind::Blockquote, vec![Node::paragraph("quoted")]),
            Node::text_block(
                ElementKind::CodeBlock,
                vec![TextNode::plain("fn main() {\n    run();\n}")],
            ),
            Node::horizontal_rule(),
            Node::element(
                ElementKind::Table,
                vec![
                    Node::element(
                        ElementKind::TableRow,
                        vec![
                            cell(ElementKind::TableHeader(CellAttrs::default()), "Name"),
                            cell(ElementKind::TableHeader(CellAttrs::default()), "Role"),
                        ],
                    ),
                    Node::element(
                        ElementKind::TableRow,
                        vec![
                            cell(
                                ElementKind::TableCell(CellAttrs::with_background("#dbeafe")),
                                "Ann",
                            ),
                            cell(ElementKind::TableCell(CellAttrs::default()), "Admin"),
                        ],
                    ),
                ],
            ),
            Node::image(ImageAttrs {
                src: Some("/files/chart.png".into()),
                alt: Some("Chart".into()),
                title: None,
                size: ImageSize::new(320, 180),
                display: ImageDisplay::Block,
                float: ImageFloat::None,
                align: ImageAlign::Center,
            }),
            Node::video(VideoAttrs::new(
                "https://vk.com/video_ext.php?oid=-1&id=2&hd=2",
            )),
            Node::paragraph(""),
        ],
    }
}

#[test]
fn document_survives_render_then_parse() {
    let doc = sample_document();
    let markup = render_markup(&doc);
    assert_eq!(parse_markup(&markup), doc);
}

#[test]
fn image_renders_canonical_shape() {
    let doc = Document {
        children: vec![Node::image(ImageAttrs {
            src: Some("a.png".into()),
            size: ImageSize::new(300, 200),
            display: ImageDisplay::Inline,
            float: ImageFloat::Left,
            ..ImageAttrs::default()
        })],
    };

    assert_eq!(
        render_markup(&doc),
        r#"<img src="a.png" width="300" height="200" data-display="inline" data-float="left" data-align="left">"#
    );
}

#[test]
fn image_without_size_still_emits_placement_attributes() {
    let markup = ImageAttrs::new("a.png").to_markup();
    assert_eq!(markup.get("width"), None);
    assert_eq!(markup.get("height"), None);
    assert_eq!(markup.get("data-display"), Some("inline"));
    assert_eq!(markup.get("data-float"), Some("none"));
    assert_eq!(markup.get("data-align"), Some("left"));
}

#[test]
fn image_parse_reads_inline_style_dimensions() {
    let doc = parse_markup(r#"<img src="a.png" style="width: 300px; height:150px">"#);
    let Some(Node::Void(void)) = doc.children.first() else {
        panic!("expected image");
    };
    let attrs = void.as_image().unwrap();
    assert_eq!(attrs.width(), Some(300));
    assert_eq!(attrs.height(), Some(150));
}

#[test]
fn image_parse_degrades_bad_values_to_defaults() {
    let attrs: MarkupAttrs = [
        ("src", "a.png"),
        ("width", "wide"),
        ("height", "120"),
        ("data-display", "sideways"),
        ("data-float", "RIGHT!"),
    ]
    .into_iter()
    .collect();

    let parsed = ImageAttrs::from_markup(&attrs);
    assert_eq!(parsed.size, None);
    assert_eq!(parsed.display, ImageDisplay::Inline);
    assert_eq!(parsed.float, ImageFloat::None);
    assert_eq!(parsed.align, ImageAlign::Left);
}

#[test]
fn image_parse_rejects_zero_dimensions() {
    let attrs: MarkupAttrs = [("width", "0"), ("height", "0")].into_iter().collect();
    assert_eq!(ImageAttrs::from_markup(&attrs).size, None);
}

#[test]
fn cell_color_falls_back_to_inline_style() {
    let doc = parse_markup(
        r#"<table><tr><td style="color: blue; background-color: #fee2e2">x</td></tr></table>"#,
    );
    let Some(Node::Element(table)) = doc.children.first() else {
        panic!("expected table");
    };
    let Node::Element(row) = &table.children[0] else {
        panic!("expected row");
    };
    let Node::Element(cell) = &row.children[0] else {
        panic!("expected cell");
    };
    assert_eq!(
        cell.kind,
        ElementKind::TableCell(CellAttrs::with_background("#fee2e2"))
    );
}

#[test]
fn cell_color_data_attribute_wins_over_style() {
    let attrs: MarkupAttrs = [
        ("data-background-color", "#000000"),
        ("style", "background-color: #ffffff"),
    ]
    .into_iter()
    .collect();
    assert_eq!(
        CellAttrs::from_markup(&attrs),
        CellAttrs::with_background("#000000")
    );
}

#[test]
fn cleared_cell_renders_no_color_markup() {
    let table = Node::element(
        ElementKind::Table,
        vec![Node::element(
            ElementKind::TableRow,
            vec![cell(ElementKind::TableCell(CellAttrs::default()), "x")],
        )],
    );
    let markup = render_markup(&Document {
        children: vec![table],
    });
    assert_eq!(markup, "<table><tbody><tr><td><p>x</p></td></tr></tbody></table>");
    assert!(!markup.contains("data-background-color"));
    assert!(!markup.contains("background-color"));
}

#[test]
fn colored_cell_renders_both_attribute_and_style() {
    let markup = CellAttrs::with_background("#dbeafe").to_markup();
    assert_eq!(markup.get("data-background-color"), Some("#dbeafe"));
    assert_eq!(markup.get("style"), Some("background-color:#dbeafe"));
}

#[test]
fn video_renders_wrapper_and_player() {
    let doc = Document {
        children: vec![Node::video(VideoAttrs::new(
            "https://vk.com/video_ext.php?oid=-1&id=2&hd=2",
        ))],
    };
    let markup = render_markup(&doc);
    assert!(markup.starts_with(r#"<div data-vk-video=""><iframe "#));
    assert!(markup.contains(r#"src="https://vk.com/video_ext.php?oid=-1&amp;id=2&amp;hd=2""#));
    assert!(markup.contains(r#"width="640" height="360""#));
    assert!(markup.contains("allowfullscreen"));
    assert!(markup.ends_with("</iframe></div>"));
}

#[test]
fn video_player_with_page_url_is_normalized() {
    let doc = parse_markup(r#"<iframe src="https://vk.com/video-5_6" width="800"></iframe>"#);
    assert_eq!(
        doc.children,
        vec![Node::video(VideoAttrs {
            src: "https://vk.com/video_ext.php?oid=-5&id=6&hd=2".into(),
            width: 800,
            height: 360,
        })]
    );
}

#[test]
fn foreign_markup_is_accepted_permissively() {
    let doc = parse_markup(
        r#"<section><h5>Deep</h5><custom-tag>loose <b>text</b></custom-tag><script>alert(1)</script></section>"#,
    );
    let bold = Marks {
        bold: true,
        ..Marks::default()
    };
    assert_eq!(
        doc.children,
        vec![
            Node::heading(3, "Deep"),
            Node::text_block(
                ElementKind::Paragraph,
                vec![TextNode::plain("loose "), TextNode::marked("text", bold)],
            ),
        ]
    );
}

#[test]
fn images_inside_paragraphs_are_hoisted_after_the_block() {
    let doc = parse_markup(r#"<p>before <img src="a.png"> after</p><p><img src="b.png"></p>"#);
    assert_eq!(doc.children.len(), 3);
    assert_eq!(doc.children[0], Node::paragraph("before  after"));
    assert!(matches!(&doc.children[1], Node::Void(v) if v.as_image().and_then(|a| a.src.as_deref()) == Some("a.png")));
    assert!(matches!(&doc.children[2], Node::Void(v) if v.as_image().and_then(|a| a.src.as_deref()) == Some("b.png")));
}

#[test]
fn ragged_tables_are_padded_when_parsed() {
    let doc = parse_markup("<table><tr><th>a</th><th>b</th></tr><tr><td>c</td></tr></table>");
    let Some(Node::Element(table)) = doc.children.first() else {
        panic!("expected table");
    };
    for row in &table.children {
        let Node::Element(row) = row else {
            panic!("expected row");
        };
        assert_eq!(row.children.len(), 2);
    }
}

#[test]
fn plain_mark_gets_default_highlight_color() {
    let doc = parse_markup("<p><mark>hi</mark></p>");
    let Some(Node::Element(p)) = doc.children.first() else {
        panic!("expected paragraph");
    };
    let Node::Text(run) = &p.children[0] else {
        panic!("expected text");
    };
    assert_eq!(run.marks.highlight_color.as_deref(), Some("#fef08a"));
}

#[test]
fn empty_input_parses_to_empty_document() {
    assert_eq!(parse_markup(""), Document::default());
    assert_eq!(parse_markup("   \n  "), Document::default());
}

#[test]
fn tabs_in_text_survive_the_codec() {
    let doc = Document {
        children: vec![
            Node::paragraph("a\tb"),
            Node::text_block(ElementKind::CodeBlock, vec![TextNode::plain("\tindented")]),
        ],
    };
    let markup = render_markup(&doc);
    assert_eq!(markup, "<p>a\tb</p><pre><code>\tindented</code></pre>");
    assert_eq!(parse_markup(&markup), doc);
}

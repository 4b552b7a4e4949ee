use kb_page_core::{
    Document, Editor, ElementKind, HeadingLevel, Node, PluginRegistry, Point, Selection,
};

fn editor_with_blocks(children: Vec<Node>, selection: Selection) -> Editor {
    Editor::new(Document { children }, selection, PluginRegistry::page())
}

fn kinds(editor: &Editor) -> Vec<ElementKind> {
    editor
        .doc()
        .children
        .iter()
        .map(|node| match node {
            Node::Element(el) => el.kind.clone(),
            _ => panic!("expected element"),
        })
        .collect()
}

#[test]
fn set_heading_converts_every_selected_block() {
    let mut editor = editor_with_blocks(
        vec![
            Node::paragraph("a"),
            Node::paragraph("b"),
            Node::paragraph("c"),
        ],
        Selection {
            anchor: Point::new(vec![0, 0], 0),
            focus: Point::new(vec![1, 0], 1),
        },
    );

    editor
        .run_command(
            "block.set_heading",
            Some(serde_json::json!({ "level": 2 })),
        )
        .unwrap();

    assert_eq!(
        kinds(&editor),
        vec![
            ElementKind::heading(2),
            ElementKind::heading(2),
            ElementKind::Paragraph,
        ]
    );
    assert_eq!(editor.to_markup(), "<h2>a</h2><h2>b</h2><p>c</p>");
}

#[test]
fn toggle_heading_switches_back_to_paragraph() {
    let mut editor = editor_with_blocks(
        vec![Node::paragraph("title")],
        Selection::collapsed(Point::new(vec![0, 0], 2)),
    );

    editor
        .run_command(
            "block.toggle_heading",
            Some(serde_json::json!({ "level": 1 })),
        )
        .unwrap();
    assert_eq!(
        editor.run_query::<Option<u8>>("block.heading_level", None).unwrap(),
        Some(1)
    );

    editor
        .run_command(
            "block.toggle_heading",
            Some(serde_json::json!({ "level": 3 })),
        )
        .unwrap();
    assert_eq!(kinds(&editor), vec![ElementKind::heading(3)]);

    editor
        .run_command(
            "block.toggle_heading",
            Some(serde_json::json!({ "level": 3 })),
        )
        .unwrap();
    assert_eq!(kinds(&editor), vec![ElementKind::Paragraph]);
    assert_eq!(
        editor.run_query::<Option<u8>>("block.heading_level", None).unwrap(),
        None
    );
}

#[test]
fn out_of_range_levels_are_clamped() {
    let mut editor = editor_with_blocks(
        vec![Node::paragraph("deep")],
        Selection::collapsed(Point::new(vec![0, 0], 0)),
    );
    editor
        .run_command(
            "block.set_heading",
            Some(serde_json::json!({ "level": 6 })),
        )
        .unwrap();
    assert_eq!(
        kinds(&editor),
        vec![ElementKind::Heading {
            level: HeadingLevel::H3
        }]
    );
}

#[test]
fn unset_heading_restores_paragraphs() {
    let mut editor = editor_with_blocks(
        vec![Node::heading(1, "a"), Node::heading(2, "b")],
        Selection {
            anchor: Point::new(vec![1, 0], 1),
            focus: Point::new(vec![0, 0], 0),
        },
    );
    editor.run_command("block.unset_heading", None).unwrap();
    assert_eq!(
        kinds(&editor),
        vec![ElementKind::Paragraph, ElementKind::Paragraph]
    );
}

#[test]
fn set_heading_requires_a_level() {
    let mut editor = editor_with_blocks(
        vec![Node::paragraph("a")],
        Selection::collapsed(Point::new(vec![0, 0], 0)),
    );
    let err = editor.run_command("block.set_heading", None).unwrap_err();
    assert_eq!(err.message(), "Missing args.level");
    assert!(!editor.can_undo());
}

#[test]
fn heading_inside_a_code_block_is_rejected() {
    let mut editor = editor_with_blocks(
        vec![Node::text_block(
            ElementKind::CodeBlock,
            vec![kb_page_core::TextNode::plain("let x = 1;")],
        )],
        Selection::collapsed(Point::new(vec![0, 0], 0)),
    );
    assert!(editor
        .run_command(
            "block.set_heading",
            Some(serde_json::json!({ "level": 1 })),
        )
        .is_err());
}

use kb_page_core::{
    Document, Editor, EditorConfig, ElementKind, Marks, Node, PluginRegistry, Point, Selection,
    TextNode, active_marks, parse_markup, render_markup,
};

fn editor_with_selection(text: &str, start: usize, end: usize) -> Editor {
    let doc = Document {
        children: vec![Node::paragraph(text)],
    };
    let selection = Selection {
        anchor: Point::new(vec![0, 0], start),
        focus: Point::new(vec![0, 0], end),
    };
    Editor::new(doc, selection, PluginRegistry::page())
}

fn runs(editor: &Editor) -> Vec<(String, Marks)> {
    let Node::Element(paragraph) = &editor.doc().children[0] else {
        panic!("expected paragraph element");
    };
    paragraph
        .children
        .iter()
        .map(|n| match n {
            Node::Text(t) => (t.text.clone(), t.marks.clone()),
            _ => panic!("expected text leaf"),
        })
        .collect()
}

#[test]
fn text_color_replaces_instead_of_stacking() {
    let mut editor = editor_with_selection("hello", 0, 5);

    editor
        .run_command(
            "marks.set_text_color",
            Some(serde_json::json!({ "color": "red" })),
        )
        .unwrap();
    editor
        .run_command(
            "marks.set_text_color",
            Some(serde_json::json!({ "color": "blue" })),
        )
        .unwrap();

    let runs = runs(&editor);
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].1.text_color.as_deref(), Some("blue"));
    assert_eq!(editor.to_markup(), r#"<p><span style="color:blue">hello</span></p>"#);

    editor.run_command("marks.unset_text_color", None).unwrap();
    assert!(runs_are_plain(&editor));
    assert_eq!(editor.to_markup(), "<p>hello</p>");
}

fn runs_are_plain(editor: &Editor) -> bool {
    runs(editor).iter().all(|(_, marks)| marks.is_plain())
}

#[test]
fn color_on_part_of_a_run_splits_it() {
    let mut editor = editor_with_selection("abcdef", 2, 4);
    editor
        .run_command(
            "marks.set_text_color",
            Some(serde_json::json!({ "color": "#ef4444" })),
        )
        .unwrap();

    let texts: Vec<_> = runs(&editor)
        .into_iter()
        .map(|(t, m)| (t, m.text_color))
        .collect();
    assert_eq!(
        texts,
        vec![
            ("ab".to_string(), None),
            ("cd".to_string(), Some("#ef4444".to_string())),
            ("ef".to_string(), None),
        ]
    );
}

#[test]
fn subscript_and_superscript_are_exclusive() {
    let mut editor = editor_with_selection("x2", 1, 2);

    editor.run_command("marks.toggle_subscript", None).unwrap();
    let marked = runs(&editor).pop().unwrap().1;
    assert!(marked.subscript && !marked.superscript);

    editor.run_command("marks.toggle_superscript", None).unwrap();
    let marked = runs(&editor).pop().unwrap().1;
    assert!(marked.superscript && !marked.subscript);

    editor.run_command("marks.toggle_superscript", None).unwrap();
    assert!(runs_are_plain(&editor));
}

#[test]
fn toggle_highlight_clears_matching_color_and_replaces_other_colors() {
    let mut editor = editor_with_selection("note", 0, 4);

    editor.run_command("marks.toggle_highlight", None).unwrap();
    assert_eq!(
        runs(&editor)[0].1.highlight_color.as_deref(),
        Some("#fef08a")
    );

    editor
        .run_command(
            "marks.toggle_highlight",
            Some(serde_json::json!({ "color": "#bbf7d0" })),
        )
        .unwrap();
    assert_eq!(
        runs(&editor)[0].1.highlight_color.as_deref(),
        Some("#bbf7d0")
    );

    editor
        .run_command(
            "marks.toggle_highlight",
            Some(serde_json::json!({ "color": "#bbf7d0" })),
        )
        .unwrap();
    assert!(runs_are_plain(&editor));
}

#[test]
fn highlight_renders_color_attribute() {
    let mut editor = editor_with_selection("note", 0, 4);
    editor
        .run_command(
            "marks.set_highlight",
            Some(serde_json::json!({ "color": "#fde68a" })),
        )
        .unwrap();
    assert_eq!(
        editor.to_markup(),
        r##"<p><mark data-color="#fde68a" style="background-color:#fde68a">note</mark></p>"##
    );
    editor.run_command("marks.unset_highlight", None).unwrap();
    assert_eq!(editor.to_markup(), "<p>note</p>");
}

#[test]
fn link_is_set_and_removed() {
    let mut editor = editor_with_selection("docs", 0, 4);
    assert!(editor.run_command("marks.set_link", None).is_err());

    editor
        .run_command(
            "marks.set_link",
            Some(serde_json::json!({ "href": "https://example.com" })),
        )
        .unwrap();
    assert_eq!(
        editor.to_markup(),
        r#"<p><a href="https://example.com">docs</a></p>"#
    );

    editor.run_command("marks.unset_link", None).unwrap();
    assert!(runs_are_plain(&editor));
}

#[test]
fn toggle_bold_round_trips_through_active_marks() {
    let mut editor = editor_with_selection("abc", 0, 3);
    editor.run_command("marks.toggle_bold", None).unwrap();
    assert!(active_marks(&editor).bold);

    let active: Marks = editor.run_query("marks.get_active", None).unwrap();
    assert!(active.bold);

    editor.run_command("marks.toggle_bold", None).unwrap();
    assert!(runs_are_plain(&editor));
    assert_eq!(runs(&editor).len(), 1);
}

#[test]
fn caret_toggle_marks_the_next_typed_text() {
    let doc = Document {
        children: vec![Node::paragraph("")],
    };
    let mut editor = Editor::new(
        doc,
        Selection::collapsed(Point::new(vec![0, 0], 0)),
        PluginRegistry::page(),
    );
    editor.run_command("marks.toggle_italic", None).unwrap();
    assert!(active_marks(&editor).italic);
}

#[test]
fn caret_color_waits_for_typed_text() {
    let mut editor = editor_with_selection("hello", 2, 2);
    editor
        .run_command(
            "marks.set_text_color",
            Some(serde_json::json!({ "color": "red" })),
        )
        .unwrap();

    assert_eq!(runs(&editor), vec![("hello".to_string(), Marks::default())]);
    assert_eq!(active_marks(&editor).text_color.as_deref(), Some("red"));
    assert!(!editor.can_undo());
    assert_eq!(parse_markup(&render_markup(editor.doc())), *editor.doc());

    editor
        .run_command("core.insert_text", Some(serde_json::json!({ "text": "X" })))
        .unwrap();
    assert_eq!(
        editor.to_markup(),
        r#"<p>he<span style="color:red">X</span>llo</p>"#
    );
    assert_eq!(editor.selection().focus, Point::new(vec![0, 1], 1));
    assert_eq!(active_marks(&editor).text_color.as_deref(), Some("red"));

    editor
        .run_command("core.insert_text", Some(serde_json::json!({ "text": "Y" })))
        .unwrap();
    assert_eq!(
        editor.to_markup(),
        r#"<p>he<span style="color:red">XY</span>llo</p>"#
    );
}

#[test]
fn moving_the_caret_drops_pending_marks() {
    let mut editor = editor_with_selection("hello", 5, 5);
    editor.run_command("marks.toggle_bold", None).unwrap();
    assert_eq!(editor.pending_marks().map(|m| m.bold), Some(true));

    editor.set_selection(Selection::collapsed(Point::new(vec![0, 0], 1)));
    assert_eq!(editor.pending_marks(), None);
    assert!(!active_marks(&editor).bold);

    editor
        .run_command("core.insert_text", Some(serde_json::json!({ "text": "!" })))
        .unwrap();
    assert_eq!(runs(&editor), vec![("h!ello".to_string(), Marks::default())]);
}

#[test]
fn empty_marked_leaves_are_pruned() {
    let red = Marks {
        text_color: Some("red".into()),
        ..Marks::default()
    };
    let doc = Document {
        children: vec![
            Node::text_block(
                ElementKind::Paragraph,
                vec![
                    TextNode::plain("he"),
                    TextNode::marked("", red.clone()),
                    TextNode::plain("llo"),
                ],
            ),
            Node::text_block(ElementKind::Paragraph, vec![TextNode::marked("", red)]),
        ],
    };
    let editor = Editor::new(
        doc,
        Selection::collapsed(Point::new(vec![0, 1], 0)),
        PluginRegistry::page(),
    );

    assert_eq!(
        editor.doc().children,
        vec![Node::paragraph("hello"), Node::paragraph("")]
    );
    assert_eq!(editor.selection().focus.path, vec![0, 0]);
}

#[test]
fn colors_that_are_not_single_values_are_rejected() {
    let mut editor = editor_with_selection("hello", 0, 5);

    for id in [
        "marks.set_text_color",
        "marks.toggle_text_color",
        "marks.set_highlight",
        "marks.toggle_highlight",
    ] {
        let err = editor
            .run_command(
                id,
                Some(serde_json::json!({ "color": "red;font-size:40px" })),
            )
            .unwrap_err();
        assert_eq!(err.message(), "Invalid color: red;font-size:40px");
    }
    let err = editor
        .run_command(
            "marks.set_text_color",
            Some(serde_json::json!({ "color": "\"red\"" })),
        )
        .unwrap_err();
    assert_eq!(err.message(), "Invalid color: \"red\"");

    assert!(runs_are_plain(&editor));
    assert!(!editor.can_undo());
}

#[test]
fn toggle_text_color_clears_matching_color_and_replaces_other_colors() {
    let mut editor = editor_with_selection("note", 0, 4);
    let toggle = |editor: &mut Editor, color: &str| {
        editor
            .run_command(
                "marks.toggle_text_color",
                Some(serde_json::json!({ "color": color })),
            )
            .unwrap();
    };

    toggle(&mut editor, "red");
    assert_eq!(runs(&editor)[0].1.text_color.as_deref(), Some("red"));
    toggle(&mut editor, "blue");
    assert_eq!(runs(&editor)[0].1.text_color.as_deref(), Some("blue"));
    toggle(&mut editor, "blue");
    assert!(runs_are_plain(&editor));

    let err = editor
        .run_command("marks.toggle_text_color", None)
        .unwrap_err();
    assert_eq!(err.message(), "Missing args.color");
}

#[test]
fn code_blocks_take_no_marks() {
    let mut editor = Editor::from_markup("<pre><code>let x</code></pre>", EditorConfig::default());
    editor.set_selection(Selection {
        anchor: Point::new(vec![0, 0], 0),
        focus: Point::new(vec![0, 0], 3),
    });

    editor.run_command("marks.toggle_bold", None).unwrap();
    assert_eq!(editor.to_markup(), "<pre><code>let x</code></pre>");
    assert!(!editor.can_undo());

    editor.set_selection(Selection::collapsed(Point::new(vec![0, 0], 3)));
    editor.run_command("marks.toggle_italic", None).unwrap();
    assert_eq!(editor.pending_marks(), None);
    editor
        .run_command("core.insert_text", Some(serde_json::json!({ "text": "!" })))
        .unwrap();
    assert_eq!(editor.to_markup(), "<pre><code>let! x</code></pre>");
}

#[test]
fn marked_code_text_loaded_from_json_is_made_plain() {
    let bold = Marks {
        bold: true,
        ..Marks::default()
    };
    let doc = Document {
        children: vec![Node::text_block(
            ElementKind::CodeBlock,
            vec![TextNode::marked("let", bold), TextNode::plain(" x")],
        )],
    };
    let editor = Editor::new(
        doc,
        Selection::collapsed(Point::new(vec![0, 0], 0)),
        PluginRegistry::page(),
    );
    assert_eq!(
        editor.doc().children,
        vec![Node::text_block(
            ElementKind::CodeBlock,
            vec![TextNode::plain("let x")]
        )]
    );
}

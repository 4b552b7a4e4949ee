//! Property-based tests for the node attribute codec.
//!
//! Every attribute set the editing commands can produce must survive
//! rendering to markup and parsing back.

use kb_page_core::markup::NodeMarkup;
use kb_page_core::{
    CellAttrs, Document, ElementKind, ImageAlign, ImageAttrs, ImageDisplay, ImageFloat,
    ImageSize, Node, parse_markup, render_markup,
};
use proptest::prelude::*;

fn src_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        // Relative upload paths
        "/files/[a-z0-9]{1,12}\\.(png|jpg|gif)",
        // Absolute URLs with a query
        "https://[a-z]{3,10}\\.com/[a-z0-9/]{1,12}\\?w=[0-9]{1,4}&h=[0-9]{1,4}",
    ]
}

/// Alt text, including characters that need escaping in attributes.
fn alt_strategy() -> impl Strategy<Value = Option<String>> {
    prop::option::of("[a-zA-Z0-9 &<>\"']{0,16}")
}

fn size_strategy() -> impl Strategy<Value = Option<ImageSize>> {
    prop::option::of((1u32..5000, 1u32..5000)).prop_map(|size| {
        size.and_then(|(width, height)| ImageSize::new(width, height))
    })
}

fn image_strategy() -> impl Strategy<Value = ImageAttrs> {
    (
        src_strategy(),
        alt_strategy(),
        size_strategy(),
        prop::sample::select(ImageDisplay::ALL.to_vec()),
        prop::sample::select(ImageFloat::ALL.to_vec()),
        prop::sample::select(ImageAlign::ALL.to_vec()),
    )
        .prop_map(|(src, alt, size, display, float, align)| ImageAttrs {
            src: Some(src),
            alt,
            title: None,
            size,
            display,
            float,
            align,
        })
}

fn color_strategy() -> impl Strategy<Value = Option<String>> {
    prop::option::of(prop_oneof![
        "#[0-9a-f]{6}",
        "rgb\\([0-9]{1,3}, [0-9]{1,3}, [0-9]{1,3}\\)",
        "(red|teal|gold)",
    ])
}

proptest! {
    #[test]
    fn image_attrs_survive_attribute_codec(attrs in image_strategy()) {
        prop_assert_eq!(ImageAttrs::from_markup(&attrs.to_markup()), attrs);
    }

    #[test]
    fn image_attrs_survive_serialized_markup(attrs in image_strategy()) {
        let doc = Document { children: vec![Node::image(attrs)] };
        let markup = render_markup(&doc);
        prop_assert_eq!(parse_markup(&markup), doc, "markup: {}", markup);
    }

    #[test]
    fn cell_color_survives_serialized_markup(color in color_strategy(), header in any::<bool>()) {
        let attrs = CellAttrs { background_color: color };
        let kind = if header {
            ElementKind::TableHeader(attrs)
        } else {
            ElementKind::TableCell(attrs)
        };
        let doc = Document {
            children: vec![Node::element(
                ElementKind::Table,
                vec![Node::element(
                    ElementKind::TableRow,
                    vec![Node::element(kind, vec![Node::paragraph("cell")])],
                )],
            )],
        };
        let markup = render_markup(&doc);
        prop_assert_eq!(parse_markup(&markup), doc, "markup: {}", markup);
    }

    #[test]
    fn parsing_arbitrary_image_attributes_never_yields_partial_size(
        width in "[ 0-9a-z%.+-]{0,6}",
        height in "[ 0-9a-z%.+-]{0,6}",
    ) {
        let markup = format!(r#"<img src="a.png" width="{width}" height="{height}">"#);
        let doc = parse_markup(&markup);
        let Some(Node::Void(void)) = doc.children.first() else {
            return Err(TestCaseError::fail("expected an image block"));
        };
        let attrs = void.as_image().unwrap();
        prop_assert_eq!(attrs.width().is_some(), attrs.height().is_some());
    }
}

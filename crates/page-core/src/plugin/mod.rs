use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::core::{
    Document, Editor, ElementNode, Node, Point, Selection, clamp_to_char_boundary, node_ref,
};
use crate::markup::style::css_color;
use crate::ops::{Op, Path, Transaction};
use crate::schema::ElementKind;

mod heading;
mod marks;
mod media;
mod normalize;
mod table;

pub use marks::active_marks;
pub use table::{TableCursor, table_cursor};

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct CommandError {
    message: String,
}

impl CommandError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct QueryError {
    message: String,
}

impl QueryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

pub type CommandHandler =
    Arc<dyn Fn(&mut Editor, Option<Value>) -> Result<(), CommandError> + Send + Sync>;

pub type QueryHandler = Arc<dyn Fn(&Editor, Option<Value>) -> Result<Value, QueryError> + Send + Sync>;

#[derive(Clone)]
pub struct CommandSpec {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
    pub keywords: Vec<String>,
    pub args_example: Option<Value>,
    pub handler: CommandHandler,
}

impl CommandSpec {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        handler: impl Fn(&mut Editor, Option<Value>) -> Result<(), CommandError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: None,
            keywords: Vec::new(),
            args_example: None,
            handler: Arc::new(handler),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn args_example(mut self, args_example: Value) -> Self {
        self.args_example = Some(args_example);
        self
    }
}

#[derive(Clone)]
pub struct QuerySpec {
    pub id: String,
    pub handler: QueryHandler,
}

impl QuerySpec {
    pub fn new(
        id: impl Into<String>,
        handler: impl Fn(&Editor, Option<Value>) -> Result<Value, QueryError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            handler: Arc::new(handler),
        }
    }
}

pub trait NormalizePass: Send + Sync {
    fn id(&self) -> &'static str;
    fn run(&self, doc: &Document, registry: &PluginRegistry) -> Vec<Op>;
}

#[derive(Debug, Clone)]
pub struct TransactionPreview {
    pub doc: Document,
    pub selection: Selection,
}

pub trait PagePlugin: Send + Sync {
    fn id(&self) -> &'static str;
    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        Vec::new()
    }
    fn commands(&self) -> Vec<CommandSpec> {
        Vec::new()
    }
    fn queries(&self) -> Vec<QuerySpec> {
        Vec::new()
    }
}

#[derive(Default)]
pub struct PluginRegistry {
    plugin_ids: Vec<&'static str>,
    normalize_passes: Vec<Box<dyn NormalizePass>>,
    commands: HashMap<String, CommandSpec>,
    queries: HashMap<String, QuerySpec>,
}

impl PluginRegistry {
    pub fn new(plugins: impl IntoIterator<Item = Box<dyn PagePlugin>>) -> Result<Self, String> {
        let mut registry = Self::default();
        for plugin in plugins {
            registry.register_plugin(plugin)?;
        }
        Ok(registry)
    }

    /// Structural normalization and horizontal rules only.
    pub fn core() -> Self {
        let plugins: Vec<Box<dyn PagePlugin>> = vec![
            Box::new(normalize::CoreNormalizePlugin),
            Box::new(media::HorizontalRulePlugin),
        ];
        Self::new(plugins).expect("core registry must be valid")
    }

    /// Everything the page editor offers.
    pub fn page() -> Self {
        let plugins: Vec<Box<dyn PagePlugin>> = vec![
            Box::new(normalize::CoreNormalizePlugin),
            Box::new(media::HorizontalRulePlugin),
            Box::new(marks::MarksPlugin),
            Box::new(heading::HeadingPlugin),
            Box::new(table::TablePlugin),
            Box::new(media::ImagePlugin),
            Box::new(media::VideoPlugin),
        ];
        Self::new(plugins).expect("page registry must be valid")
    }

    pub fn register_plugin(&mut self, plugin: Box<dyn PagePlugin>) -> Result<(), String> {
        let id = plugin.id();
        if self.plugin_ids.contains(&id) {
            return Err(format!("Duplicate plugin id: {id}"));
        }

        for spec in plugin.commands() {
            match self.commands.entry(spec.id.clone()) {
                Entry::Occupied(_) => return Err(format!("Duplicate command id: {}", spec.id)),
                Entry::Vacant(slot) => {
                    slot.insert(spec);
                }
            }
        }
        for spec in plugin.queries() {
            match self.queries.entry(spec.id.clone()) {
                Entry::Occupied(_) => return Err(format!("Duplicate query id: {}", spec.id)),
                Entry::Vacant(slot) => {
                    slot.insert(spec);
                }
            }
        }

        self.normalize_passes.extend(plugin.normalize_passes());
        self.plugin_ids.push(id);
        Ok(())
    }

    pub fn plugin_ids(&self) -> &[&'static str] {
        &self.plugin_ids
    }

    pub fn normalize_passes(&self) -> &[Box<dyn NormalizePass>] {
        &self.normalize_passes
    }

    pub fn commands(&self) -> &HashMap<String, CommandSpec> {
        &self.commands
    }

    pub fn command(&self, id: &str) -> Option<CommandSpec> {
        self.commands.get(id).cloned()
    }

    pub fn queries(&self) -> &HashMap<String, QuerySpec> {
        &self.queries
    }

    pub fn query(&self, id: &str) -> Option<QuerySpec> {
        self.queries.get(id).cloned()
    }

    /// Ops of the first pass with work to do. Each pass computes paths against
    /// the document it was given, so passes never share a batch.
    pub fn normalize(&self, doc: &Document) -> Vec<Op> {
        self.normalize_passes
            .iter()
            .map(|pass| pass.run(doc, self))
            .find(|ops| !ops.is_empty())
            .unwrap_or_default()
    }

    /// Moves both selection points onto existing text leaves. A point that
    /// cannot be resolved borrows the other one.
    pub fn normalize_selection(&self, doc: &Document, selection: &Selection) -> Selection {
        let anchor = resolve_text_point(doc, &selection.anchor)
            .or_else(|| resolve_text_point(doc, &selection.focus))
            .or_else(|| first_text_descendant(&doc.children, &[]))
            .unwrap_or_else(|| Point::new(vec![0], 0));
        let focus = resolve_text_point(doc, &selection.focus).unwrap_or_else(|| anchor.clone());
        Selection { anchor, focus }
    }
}

fn first_text_descendant(children: &[Node], prefix: &[usize]) -> Option<Point> {
    children.iter().enumerate().find_map(|(ix, node)| {
        let mut path = prefix.to_vec();
        path.push(ix);
        match node {
            Node::Text(_) => Some(Point::new(path, 0)),
            Node::Element(el) => first_text_descendant(&el.children, &path),
            Node::Void(_) => None,
        }
    })
}

/// Follows `point.path` as far as it exists, clamping each index, and lands
/// on the nearest text leaf.
fn resolve_text_point(doc: &Document, point: &Point) -> Option<Point> {
    let mut path = Vec::with_capacity(point.path.len());
    let mut children: &[Node] = &doc.children;

    for &wanted in &point.path {
        let Some(last) = children.len().checked_sub(1) else {
            break;
        };
        let ix = wanted.min(last);
        path.push(ix);
        match &children[ix] {
            Node::Text(t) => {
                let offset = clamp_to_char_boundary(&t.text, point.offset);
                return Some(Point::new(path, offset));
            }
            Node::Element(el) => children = &el.children,
            Node::Void(_) => break,
        }
    }

    match node_at_path(doc, &path)? {
        Node::Element(el) => first_text_descendant(&el.children, &path),
        Node::Text(_) | Node::Void(_) => None,
    }
}

pub(crate) fn node_at_path<'a>(doc: &'a Document, path: &[usize]) -> Option<&'a Node> {
    node_ref(doc, path)
}

pub(crate) fn element_at_path<'a>(doc: &'a Document, path: &[usize]) -> Option<&'a ElementNode> {
    node_at_path(doc, path).and_then(Node::as_element)
}

/// Deepest element on `path` (inclusive) whose kind satisfies `pred`.
pub(crate) fn ancestor_element_path(
    doc: &Document,
    path: &[usize],
    pred: impl Fn(&ElementKind) -> bool,
) -> Option<Path> {
    (1..=path.len()).rev().find_map(|len| {
        let candidate = &path[..len];
        match node_at_path(doc, candidate) {
            Some(Node::Element(el)) if pred(&el.kind) => Some(candidate.to_vec()),
            _ => None,
        }
    })
}

pub(crate) fn parse_path_arg(args: Option<&Value>) -> Option<Path> {
    let path = args?.get("path")?.as_array()?;
    path.iter()
        .map(|v| v.as_u64().and_then(|n| usize::try_from(n).ok()))
        .collect()
}

pub(crate) fn string_arg(args: Option<&Value>, key: &str) -> Option<String> {
    args?
        .get(key)?
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Position right after the top-level block holding the caret, used when a
/// command inserts a new block.
pub(crate) fn insertion_point_after_focus(editor: &Editor) -> (Path, usize) {
    let focus = &editor.selection().focus;
    match focus.path.first() {
        Some(&top) => (Vec::new(), (top + 1).min(editor.doc().children.len())),
        None => (Vec::new(), editor.doc().children.len()),
    }
}

/// Color argument under `key`. Absent or blank is `None`; anything that is not
/// a single CSS color value is rejected.
pub(crate) fn color_arg(args: Option<&Value>, key: &str) -> Result<Option<String>, CommandError> {
    let Some(raw) = string_arg(args, key) else {
        return Ok(None);
    };
    css_color(&raw)
        .map(Some)
        .ok_or_else(|| CommandError::new(format!("Invalid color: {raw}")))
}

/// Inserts `node` after the caret's block followed by an empty paragraph that
/// receives the caret.
pub(crate) fn insert_block_with_trailing_paragraph(
    editor: &Editor,
    node: Node,
    source: &str,
) -> Transaction {
    let (parent_path, insert_at) = insertion_point_after_focus(editor);

    let mut node_path = parent_path.clone();
    node_path.push(insert_at);
    let mut paragraph_path = parent_path;
    paragraph_path.push(insert_at + 1);

    let mut caret_path = paragraph_path.clone();
    caret_path.push(0);

    Transaction::new(vec![
        Op::InsertNode {
            path: node_path,
            node,
        },
        Op::InsertNode {
            path: paragraph_path,
            node: Node::paragraph(""),
        },
    ])
    .selection_after(Selection::collapsed(Point::new(caret_path, 0)))
    .source(source)
}

pub(crate) fn apply_command_tx(
    editor: &mut Editor,
    tx: Result<Transaction, String>,
    failure: &str,
) -> Result<(), CommandError> {
    let tx = tx.map_err(CommandError::new)?;
    if tx.is_empty() && tx.selection_after.is_none() {
        return Ok(());
    }
    editor
        .apply(tx)
        .map_err(|e| CommandError::new(format!("{failure}: {e}")))
}

use std::cmp::Ordering;
use std::ops::Range;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::EditorConfig;
use crate::ops::{NodeAttrs, Op, Path, Transaction};
use crate::plugin::{CommandError, PluginRegistry, QueryError, TransactionPreview};
use crate::schema::{ElementKind, ImageAttrs, VideoAttrs, VoidNode};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Document {
    #[serde(default)]
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Element(ElementNode),
    Text(TextNode),
    Void(VoidNode),
}

impl Node {
    pub fn paragraph(text: impl Into<String>) -> Self {
        Node::text_block(ElementKind::Paragraph, vec![TextNode::plain(text)])
    }

    pub fn heading(level: u64, text: impl Into<String>) -> Self {
        Node::text_block(ElementKind::heading(level), vec![TextNode::plain(text)])
    }

    pub fn text_block(kind: ElementKind, runs: Vec<TextNode>) -> Self {
        Node::Element(ElementNode {
            kind,
            children: runs.into_iter().map(Node::Text).collect(),
        })
    }

    pub fn element(kind: ElementKind, children: Vec<Node>) -> Self {
        Node::Element(ElementNode { kind, children })
    }

    pub fn horizontal_rule() -> Self {
        Node::Void(VoidNode::HorizontalRule)
    }

    pub fn image(attrs: ImageAttrs) -> Self {
        Node::Void(VoidNode::Image(attrs))
    }

    pub fn video(attrs: VideoAttrs) -> Self {
        Node::Void(VoidNode::Video(attrs))
    }

    pub fn as_element(&self) -> Option<&ElementNode> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementNode {
    pub kind: ElementKind,
    #[serde(default)]
    pub children: Vec<Node>,
}

impl ElementNode {
    /// Concatenated text of the inline children.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|n| match n {
                Node::Text(t) => Some(t.text.as_str()),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextNode {
    pub text: String,
    #[serde(default)]
    pub marks: Marks,
}

impl TextNode {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: Marks::default(),
        }
    }

    pub fn marked(text: impl Into<String>, marks: Marks) -> Self {
        Self {
            text: text.into(),
            marks,
        }
    }
}

/// Inline formatting of a text run. Color and link marks hold at most one
/// value each, so applying a new value replaces the old one and clearing
/// removes the mark entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Marks {
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
    #[serde(default)]
    pub strikethrough: bool,
    #[serde(default)]
    pub subscript: bool,
    #[serde(default)]
    pub superscript: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl Marks {
    pub fn is_plain(&self) -> bool {
        *self == Marks::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    #[serde(default)]
    pub path: Path,
    pub offset: usize,
}

impl Point {
    pub fn new(path: Path, offset: usize) -> Self {
        Self { path, offset }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: Point,
    pub focus: Point,
}

impl Selection {
    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point.clone(),
            focus: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }
}

/// One history step: the ops that revert it and the selections around it.
#[derive(Debug, Clone)]
struct HistoryEntry {
    revert: Vec<Op>,
    selection_before: Selection,
    selection_after: Selection,
}

pub struct Editor {
    doc: Document,
    selection: Selection,
    registry: PluginRegistry,
    config: EditorConfig,
    undo_stack: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    /// Marks chosen at a collapsed caret. They apply to the next inserted
    /// text and never enter the document on their own.
    pending_marks: Option<Marks>,
}

impl Editor {
    pub fn new(doc: Document, selection: Selection, registry: PluginRegistry) -> Self {
        Self::with_config(doc, selection, registry, EditorConfig::default())
    }

    pub fn with_config(
        doc: Document,
        selection: Selection,
        registry: PluginRegistry,
        config: EditorConfig,
    ) -> Self {
        let mut editor = Self {
            doc,
            selection,
            registry,
            config: config.with_defaults(),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            pending_marks: None,
        };
        editor.normalize_in_place();
        editor
    }

    pub fn with_core_plugins() -> Self {
        Self::new(Self::blank_doc(), Self::start_caret(), PluginRegistry::core())
    }

    pub fn with_page_plugins() -> Self {
        Self::new(Self::blank_doc(), Self::start_caret(), PluginRegistry::page())
    }

    /// Editor over an imported document with the caret at its first text position.
    pub fn from_markup(markup: &str, config: EditorConfig) -> Self {
        let doc = crate::markup::parse_markup(markup);
        Self::with_config(doc, Self::start_caret(), PluginRegistry::page(), config)
    }

    fn blank_doc() -> Document {
        Document {
            children: vec![Node::paragraph("")],
        }
    }

    fn start_caret() -> Selection {
        Selection::collapsed(Point::new(vec![0, 0], 0))
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn to_markup(&self) -> String {
        crate::markup::render_markup(&self.doc)
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.pending_marks = None;
        self.selection = selection;
        self.normalize_selection_in_place();
    }

    pub fn pending_marks(&self) -> Option<&Marks> {
        self.pending_marks.as_ref()
    }

    pub(crate) fn set_pending_marks(&mut self, marks: Marks) {
        self.pending_marks = Some(marks);
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn node(&self, path: &[usize]) -> Option<&Node> {
        node_ref(&self.doc, path)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo(&mut self) -> bool {
        let Some(entry) = self.undo_stack.pop() else {
            return false;
        };
        let restore = entry.selection_before.clone();
        let entry = self.replay(entry, restore, "undo");
        self.redo_stack.push(entry);
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(entry) = self.redo_stack.pop() else {
            return false;
        };
        let restore = entry.selection_after.clone();
        let entry = self.replay(entry, restore, "redo");
        self.undo_stack.push(entry);
        true
    }

    /// Applies the revert ops of `entry` and returns the entry that reverts
    /// the replay itself.
    fn replay(&mut self, entry: HistoryEntry, restore: Selection, step: &str) -> HistoryEntry {
        let mut revert = Vec::with_capacity(entry.revert.len());
        for op in entry.revert {
            match self.apply_op(op) {
                Ok(inverse) => revert.push(inverse),
                Err(err) => {
                    warn!(error = %err, step, "history replay stopped on an inapplicable op");
                    break;
                }
            }
        }
        revert.reverse();

        self.pending_marks = None;
        self.selection = restore;
        self.normalize_in_place();
        HistoryEntry {
            revert,
            selection_before: entry.selection_before,
            selection_after: entry.selection_after,
        }
    }

    /// Applies every op of `tx` or none of them.
    pub fn apply(&mut self, tx: Transaction) -> Result<(), ApplyError> {
        // A failing op must leave the document untouched.
        let preview = self.preview_transaction(&tx)?;
        let selection_before = self.selection.clone();

        let mut revert = tx
            .ops
            .iter()
            .cloned()
            .map(|op| self.apply_op(op))
            .collect::<Result<Vec<_>, _>>()?;
        self.pending_marks = None;
        if let Some(selection) = tx.selection_after {
            self.selection = selection;
        }
        revert.extend(self.normalize_with_inverse_ops()?);
        revert.reverse();

        self.normalize_selection_in_place();
        debug_assert_eq!(self.doc, preview.doc);
        debug!(
            source = tx.meta.source.as_deref().unwrap_or("unknown"),
            ops = revert.len(),
            "applied transaction"
        );

        self.undo_stack.push(HistoryEntry {
            revert,
            selection_before,
            selection_after: self.selection.clone(),
        });
        self.redo_stack.clear();
        if self.undo_stack.len() > self.config.max_undo {
            self.undo_stack.remove(0);
        }
        Ok(())
    }

    pub fn preview_transaction(&self, tx: &Transaction) -> Result<TransactionPreview, ApplyError> {
        let mut doc = self.doc.clone();
        let mut selection = self.selection.clone();

        for op in tx.ops.iter().cloned() {
            apply_op_to(&mut doc, &mut selection, op)?;
        }
        if let Some(after) = &tx.selection_after {
            selection = after.clone();
        }

        normalize_to_fixpoint(
            &self.registry,
            self.config.max_normalize_iterations,
            &mut doc,
            &mut selection,
        )?;

        let selection = self.registry.normalize_selection(&doc, &selection);
        Ok(TransactionPreview { doc, selection })
    }

    pub fn run_command(&mut self, id: &str, args: Option<Value>) -> Result<(), CommandError> {
        let command = self
            .registry
            .command(id)
            .ok_or_else(|| CommandError::new(format!("Unknown command: {id}")))?;
        debug!(command = id, "running command");
        (command.handler)(self, args)
    }

    pub fn run_query_json(&self, id: &str, args: Option<Value>) -> Result<Value, QueryError> {
        let query = self
            .registry
            .query(id)
            .ok_or_else(|| QueryError::new(format!("Unknown query: {id}")))?;
        (query.handler)(self, args)
    }

    pub fn run_query<T>(&self, id: &str, args: Option<Value>) -> Result<T, QueryError>
    where
        T: DeserializeOwned,
    {
        let value = self.run_query_json(id, args)?;
        serde_json::from_value(value)
            .map_err(|err| QueryError::new(format!("Failed to decode query result: {err}")))
    }

    fn normalize_in_place(&mut self) {
        if let Err(err) = self.normalize_with_inverse_ops() {
            warn!(error = %err, "document normalization failed");
        }
        self.normalize_selection_in_place();
    }

    fn normalize_selection_in_place(&mut self) {
        self.selection = self
            .registry
            .normalize_selection(&self.doc, &self.selection);
    }

    fn normalize_with_inverse_ops(&mut self) -> Result<Vec<Op>, ApplyError> {
        normalize_to_fixpoint(
            &self.registry,
            self.config.max_normalize_iterations,
            &mut self.doc,
            &mut self.selection,
        )
    }

    fn apply_op(&mut self, op: Op) -> Result<Op, ApplyError> {
        apply_op_to(&mut self.doc, &mut self.selection, op)
    }
}

/// Runs the registry's normalization until a pass produces no ops. Returns
/// the inverse of every applied op, in application order.
fn normalize_to_fixpoint(
    registry: &PluginRegistry,
    max_passes: usize,
    doc: &mut Document,
    selection: &mut Selection,
) -> Result<Vec<Op>, ApplyError> {
    let mut revert = Vec::new();
    for _ in 0..max_passes {
        let ops = registry.normalize(doc);
        if ops.is_empty() {
            return Ok(revert);
        }
        for op in ops {
            revert.push(apply_op_to(doc, selection, op)?);
        }
    }
    warn!(max_passes, "normalization did not converge");
    Err(ApplyError::NormalizeDidNotConverge)
}

/// Applies one op and returns its inverse, keeping `selection` pointing at
/// the same content.
fn apply_op_to(doc: &mut Document, selection: &mut Selection, op: Op) -> Result<Op, ApplyError> {
    let inverse = match op {
        Op::InsertText { path, offset, text } => {
            let leaf = text_mut(doc, &path)?;
            let offset = clamp_to_char_boundary(&leaf.text, offset);
            leaf.text.insert_str(offset, &text);
            let len = text.len();
            selection.map_points(|p| p.shift_for_inserted_text(&path, offset, len));
            Op::RemoveText {
                path,
                range: offset..offset + len,
            }
        }
        Op::RemoveText { path, range } => {
            let leaf = text_mut(doc, &path)?;
            let start = clamp_to_char_boundary(&leaf.text, range.start);
            let end = clamp_to_char_boundary(&leaf.text, range.end).max(start);
            let removed: String = leaf.text.drain(start..end).collect();
            if !removed.is_empty() {
                selection.map_points(|p| p.shift_for_removed_text(&path, start..end));
            }
            Op::InsertText {
                path,
                offset: start,
                text: removed,
            }
        }
        Op::InsertNode { path, node } => {
            insert_node(doc, &path, node)?;
            selection.map_points(|p| p.shift_for_inserted_node(&path));
            Op::RemoveNode { path }
        }
        Op::RemoveNode { path } => {
            let removed = remove_node(doc, &path)?;
            let landing = merge_landing(doc, &path, &removed);
            selection.map_points(|p| p.shift_for_removed_node(&path, landing));
            Op::InsertNode {
                path,
                node: removed,
            }
        }
        Op::SetNodeAttrs { path, attrs } => {
            let previous = match (node_mut(doc, &path)?, attrs) {
                (Node::Element(el), NodeAttrs::Element(kind)) => {
                    NodeAttrs::Element(std::mem::replace(&mut el.kind, kind))
                }
                (Node::Void(void), NodeAttrs::Void(next)) => {
                    NodeAttrs::Void(std::mem::replace(void, next))
                }
                (Node::Text(_), _) => {
                    return Err(ApplyError::InvalidPath("Text has no attrs".into()));
                }
                _ => {
                    return Err(ApplyError::InvalidPath(
                        "Attribute set does not match the node".into(),
                    ));
                }
            };
            Op::SetNodeAttrs {
                path,
                attrs: previous,
            }
        }
        Op::SetTextMarks { path, marks } => {
            let leaf = text_mut(doc, &path)?;
            Op::SetTextMarks {
                path,
                marks: std::mem::replace(&mut leaf.marks, marks),
            }
        }
    };
    Ok(inverse)
}

/// When a removed text leaf was just merged into its left sibling, points
/// inside it land in that sibling at `(prefix_len, removed_len)`.
fn merge_landing(doc: &Document, path: &[usize], removed: &Node) -> Option<(usize, usize)> {
    let Node::Text(removed) = removed else {
        return None;
    };
    let (&index, parent) = path.split_last()?;
    let mut left_path = parent.to_vec();
    left_path.push(index.checked_sub(1)?);
    match node_ref(doc, &left_path)? {
        Node::Text(left) if left.marks == removed.marks && left.text.ends_with(&removed.text) => {
            Some((left.text.len() - removed.text.len(), removed.text.len()))
        }
        _ => None,
    }
}

impl Selection {
    fn map_points(&mut self, mut f: impl FnMut(&mut Point)) {
        f(&mut self.anchor);
        f(&mut self.focus);
    }
}

impl Point {
    /// Index of this point's path below `parent`, if it lies in that subtree.
    fn child_index_under(&self, parent: &[usize]) -> Option<usize> {
        (self.path.len() > parent.len() && self.path.starts_with(parent))
            .then(|| self.path[parent.len()])
    }

    fn shift_for_inserted_text(&mut self, path: &[usize], offset: usize, len: usize) {
        if self.path == path && self.offset >= offset {
            self.offset = self.offset.saturating_add(len);
        }
    }

    fn shift_for_removed_text(&mut self, path: &[usize], range: Range<usize>) {
        if self.path != path || self.offset <= range.start {
            return;
        }
        self.offset = if self.offset >= range.end {
            self.offset - range.len()
        } else {
            range.start
        };
    }

    fn shift_for_inserted_node(&mut self, path: &[usize]) {
        let Some((&index, parent)) = path.split_last() else {
            return;
        };
        if self.child_index_under(parent).is_some_and(|ix| ix >= index) {
            self.path[parent.len()] += 1;
        }
    }

    fn shift_for_removed_node(&mut self, path: &[usize], landing: Option<(usize, usize)>) {
        let Some((&index, parent)) = path.split_last() else {
            return;
        };
        let Some(ix) = self.child_index_under(parent) else {
            return;
        };
        let depth = parent.len();
        match ix.cmp(&index) {
            Ordering::Less => {}
            Ordering::Greater => self.path[depth] = ix - 1,
            Ordering::Equal => {
                self.path.truncate(depth + 1);
                self.path[depth] = index.saturating_sub(1);
                self.offset = match landing {
                    Some((prefix, len)) => prefix + self.offset.min(len),
                    None => 0,
                };
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("normalization did not converge")]
    NormalizeDidNotConverge,
}

impl From<PathError> for ApplyError {
    fn from(value: PathError) -> Self {
        ApplyError::InvalidPath(value.0)
    }
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct PathError(pub String);

pub(crate) fn clamp_to_char_boundary(s: &str, ix: usize) -> usize {
    (0..=ix.min(s.len()))
        .rev()
        .find(|&i| s.is_char_boundary(i))
        .unwrap_or(0)
}

pub(crate) fn node_ref<'a>(doc: &'a Document, path: &[usize]) -> Option<&'a Node> {
    let (first, rest) = path.split_first()?;
    rest.iter()
        .try_fold(doc.children.get(*first)?, |node, &ix| match node {
            Node::Element(el) => el.children.get(ix),
            Node::Void(_) | Node::Text(_) => None,
        })
}

fn node_mut<'a>(doc: &'a mut Document, path: &[usize]) -> Result<&'a mut Node, PathError> {
    let (&first, rest) = path
        .split_first()
        .ok_or_else(|| PathError("Empty path".into()))?;
    let mut node = child_mut(&mut doc.children, first, 0)?;
    for (depth, &ix) in rest.iter().enumerate() {
        node = match node {
            Node::Element(el) => child_mut(&mut el.children, ix, depth + 1)?,
            Node::Void(_) | Node::Text(_) => {
                return Err(PathError(format!("Non-container node at depth {depth}")));
            }
        };
    }
    Ok(node)
}

fn child_mut(children: &mut [Node], ix: usize, depth: usize) -> Result<&mut Node, PathError> {
    let len = children.len();
    children.get_mut(ix).ok_or_else(|| {
        PathError(format!("Path out of bounds at depth {depth}: {ix} >= {len}"))
    })
}

fn text_mut<'a>(doc: &'a mut Document, path: &[usize]) -> Result<&'a mut TextNode, PathError> {
    match node_mut(doc, path)? {
        Node::Text(t) => Ok(t),
        _ => Err(PathError("Expected Text node".into())),
    }
}

fn children_mut<'a>(
    doc: &'a mut Document,
    parent_path: &[usize],
) -> Result<&'a mut Vec<Node>, PathError> {
    if parent_path.is_empty() {
        return Ok(&mut doc.children);
    }
    match node_mut(doc, parent_path)? {
        Node::Element(el) => Ok(&mut el.children),
        Node::Void(_) | Node::Text(_) => Err(PathError("Parent is not a container".into())),
    }
}

fn insert_node(doc: &mut Document, path: &[usize], node: Node) -> Result<(), PathError> {
    let (&index, parent_path) = path
        .split_last()
        .ok_or_else(|| PathError("Empty insert path".into()))?;
    let children = children_mut(doc, parent_path)?;
    if index > children.len() {
        return Err(PathError(format!(
            "Insert index out of bounds: {index} > {}",
            children.len()
        )));
    }
    children.insert(index, node);
    Ok(())
}

fn remove_node(doc: &mut Document, path: &[usize]) -> Result<Node, PathError> {
    let (&index, parent_path) = path
        .split_last()
        .ok_or_else(|| PathError("Empty remove path".into()))?;
    let children = children_mut(doc, parent_path)?;
    if index >= children.len() {
        return Err(PathError(format!(
            "Remove index out of bounds: {index} >= {}",
            children.len()
        )));
    }
    Ok(children.remove(index))
}

use crate::core::{Document, ElementNode, Marks, Node, TextNode};
use crate::ops::Op;
use crate::schema::{CellAttrs, ChildConstraint, ElementKind};

use super::{NormalizePass, PagePlugin, PluginRegistry};

pub(super) struct CoreNormalizePlugin;

impl PagePlugin for CoreNormalizePlugin {
    fn id(&self) -> &'static str {
        "core.normalize"
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![
            Box::new(EnsureNonEmptyDocument),
            Box::new(EnsureContainersHaveChildren),
            Box::new(NormalizeTableStructure),
            Box::new(EnsureTextBlockHasTextLeaf),
            Box::new(PruneTextLeaves),
            Box::new(MergeAdjacentTextLeaves),
        ]
    }
}

pub(crate) fn table_cell_node() -> Node {
    Node::element(
        ElementKind::TableCell(CellAttrs::default()),
        vec![Node::paragraph("")],
    )
}

pub(crate) fn table_header_node() -> Node {
    Node::element(
        ElementKind::TableHeader(CellAttrs::default()),
        vec![Node::paragraph("")],
    )
}

pub(crate) fn table_row_node(cols: usize) -> Node {
    let cols = cols.max(1);
    Node::element(
        ElementKind::TableRow,
        (0..cols).map(|_| table_cell_node()).collect(),
    )
}

pub(crate) fn table_header_row_node(cols: usize) -> Node {
    let cols = cols.max(1);
    Node::element(
        ElementKind::TableRow,
        (0..cols).map(|_| table_header_node()).collect(),
    )
}

/// `rows` rows in total, the first of which is the header row.
pub(crate) fn table_node(rows: usize, cols: usize) -> Node {
    let rows = rows.max(1);
    let mut children = vec![table_header_row_node(cols)];
    children.extend((1..rows).map(|_| table_row_node(cols)));
    Node::element(ElementKind::Table, children)
}

fn child_path(path: &[usize], ix: usize) -> Vec<usize> {
    let mut out = path.to_vec();
    out.push(ix);
    out
}

struct EnsureNonEmptyDocument;

impl NormalizePass for EnsureNonEmptyDocument {
    fn id(&self) -> &'static str {
        "core.ensure_non_empty_document"
    }

    fn run(&self, doc: &Document, _registry: &PluginRegistry) -> Vec<Op> {
        if doc.children.is_empty() {
            return vec![Op::InsertNode {
                path: vec![0],
                node: Node::paragraph(""),
            }];
        }
        Vec::new()
    }
}

/// Block containers never end up empty: lists hold an item, items and quotes
/// hold a paragraph, tables hold a row, rows hold a cell.
struct EnsureContainersHaveChildren;

impl NormalizePass for EnsureContainersHaveChildren {
    fn id(&self) -> &'static str {
        "core.ensure_containers_have_children"
    }

    fn run(&self, doc: &Document, _registry: &PluginRegistry) -> Vec<Op> {
        fn default_child(kind: &ElementKind) -> Node {
            match kind {
                ElementKind::BulletList | ElementKind::OrderedList => {
                    Node::element(ElementKind::ListItem, vec![Node::paragraph("")])
                }
                ElementKind::Table => table_row_node(1),
                ElementKind::TableRow => table_cell_node(),
                _ => Node::paragraph(""),
            }
        }

        fn walk(children: &[Node], path: &mut Vec<usize>, ops: &mut Vec<Op>) {
            for (ix, node) in children.iter().enumerate() {
                let Node::Element(el) = node else {
                    continue;
                };
                path.push(ix);
                if el.kind.children() == ChildConstraint::BlockOnly {
                    if el.children.is_empty() {
                        ops.push(Op::InsertNode {
                            path: child_path(path, 0),
                            node: default_child(&el.kind),
                        });
                    } else {
                        walk(&el.children, path, ops);
                    }
                }
                path.pop();
            }
        }

        let mut ops = Vec::new();
        walk(&doc.children, &mut Vec::new(), &mut ops);
        ops
    }
}

/// Pads every row to the widest row's cell count. Padding cells follow the
/// row's flavor: header rows get header cells.
struct NormalizeTableStructure;

impl NormalizePass for NormalizeTableStructure {
    fn id(&self) -> &'static str {
        "table.normalize_structure"
    }

    fn run(&self, doc: &Document, _registry: &PluginRegistry) -> Vec<Op> {
        fn normalize_table(table: &ElementNode, path: &[usize], ops: &mut Vec<Op>) {
            let max_cols = table
                .children
                .iter()
                .filter_map(Node::as_element)
                .filter(|row| row.kind == ElementKind::TableRow)
                .map(|row| row.children.len())
                .max()
                .unwrap_or(0)
                .max(1);

            for (row_ix, row_node) in table.children.iter().enumerate() {
                let Node::Element(row) = row_node else {
                    continue;
                };
                if row.kind != ElementKind::TableRow || row.children.is_empty() {
                    continue;
                }
                let header_row = row.children.iter().all(|cell| {
                    matches!(cell, Node::Element(el) if matches!(el.kind, ElementKind::TableHeader(_)))
                });
                for col_ix in row.children.len()..max_cols {
                    ops.push(Op::InsertNode {
                        path: child_path(&child_path(path, row_ix), col_ix),
                        node: if header_row {
                            table_header_node()
                        } else {
                            table_cell_node()
                        },
                    });
                }
            }
        }

        fn walk(nodes: &[Node], path: &mut Vec<usize>, ops: &mut Vec<Op>) {
            for (ix, node) in nodes.iter().enumerate() {
                let Node::Element(el) = node else {
                    continue;
                };
                path.push(ix);
                if el.kind == ElementKind::Table {
                    normalize_table(el, path, ops);
                }
                walk(&el.children, path, ops);
                path.pop();
            }
        }

        let mut ops = Vec::new();
        walk(&doc.children, &mut Vec::new(), &mut ops);
        ops
    }
}

struct EnsureTextBlockHasTextLeaf;

impl NormalizePass for EnsureTextBlockHasTextLeaf {
    fn id(&self) -> &'static str {
        "core.ensure_text_block_has_text_leaf"
    }

    fn run(&self, doc: &Document, _registry: &PluginRegistry) -> Vec<Op> {
        fn walk(children: &[Node], path: &mut Vec<usize>, ops: &mut Vec<Op>) {
            for (ix, node) in children.iter().enumerate() {
                let Node::Element(el) = node else {
                    continue;
                };
                path.push(ix);
                if el.kind.is_text_block() {
                    let has_text = el.children.iter().any(|n| matches!(n, Node::Text(_)));
                    if !has_text {
                        ops.push(Op::InsertNode {
                            path: child_path(path, 0),
                            node: Node::Text(TextNode::plain("")),
                        });
                    }
                } else {
                    walk(&el.children, path, ops);
                }
                path.pop();
            }
        }

        let mut ops = Vec::new();
        walk(&doc.children, &mut Vec::new(), &mut ops);
        ops
    }
}

/// Empty text leaves carry no marks and only survive as a block's sole
/// leaf. Code block text is plain.
struct PruneTextLeaves;

impl NormalizePass for PruneTextLeaves {
    fn id(&self) -> &'static str {
        "core.prune_text_leaves"
    }

    fn run(&self, doc: &Document, _registry: &PluginRegistry) -> Vec<Op> {
        fn prune_block(el: &ElementNode, path: &[usize], ops: &mut Vec<Op>) {
            let leaves: Vec<(usize, &TextNode)> = el
                .children
                .iter()
                .enumerate()
                .filter_map(|(ix, node)| match node {
                    Node::Text(t) => Some((ix, t)),
                    _ => None,
                })
                .collect();
            let keep_empty = leaves
                .iter()
                .all(|(_, t)| t.text.is_empty())
                .then(|| leaves.first().map(|(ix, _)| *ix))
                .flatten();

            let mut removals = Vec::new();
            for (ix, leaf) in &leaves {
                let strip = leaf.text.is_empty() || el.kind == ElementKind::CodeBlock;
                if leaf.text.is_empty() && keep_empty != Some(*ix) {
                    removals.push(*ix);
                } else if strip && !leaf.marks.is_plain() {
                    ops.push(Op::SetTextMarks {
                        path: child_path(path, *ix),
                        marks: Marks::default(),
                    });
                }
            }
            ops.extend(removals.into_iter().rev().map(|ix| Op::RemoveNode {
                path: child_path(path, ix),
            }));
        }

        fn walk(children: &[Node], path: &mut Vec<usize>, ops: &mut Vec<Op>) {
            for (ix, node) in children.iter().enumerate() {
                let Node::Element(el) = node else {
                    continue;
                };
                path.push(ix);
                if el.kind.is_text_block() {
                    prune_block(el, path, ops);
                } else {
                    walk(&el.children, path, ops);
                }
                path.pop();
            }
        }

        let mut ops = Vec::new();
        walk(&doc.children, &mut Vec::new(), &mut ops);
        ops
    }
}

struct MergeAdjacentTextLeaves;

impl NormalizePass for MergeAdjacentTextLeaves {
    fn id(&self) -> &'static str {
        "core.merge_adjacent_text_leaves"
    }

    fn run(&self, doc: &Document, _registry: &PluginRegistry) -> Vec<Op> {
        fn merge_block(el: &ElementNode, path: &[usize], ops: &mut Vec<Op>) {
            let mut ix = el.children.len();
            while ix > 0 {
                ix -= 1;
                let Node::Text(right) = &el.children[ix] else {
                    continue;
                };

                let mut start = ix;
                while start > 0 {
                    let Some(Node::Text(left)) = el.children.get(start - 1) else {
                        break;
                    };
                    if left.marks != right.marks {
                        break;
                    }
                    start -= 1;
                }

                if start == ix {
                    continue;
                }

                let Some(Node::Text(first)) = el.children.get(start) else {
                    continue;
                };
                let appended: String = el.children[start + 1..=ix]
                    .iter()
                    .filter_map(|n| match n {
                        Node::Text(t) => Some(t.text.as_str()),
                        _ => None,
                    })
                    .collect();

                if !appended.is_empty() {
                    ops.push(Op::InsertText {
                        path: child_path(path, start),
                        offset: first.text.len(),
                        text: appended,
                    });
                }

                for remove_ix in (start + 1..=ix).rev() {
                    ops.push(Op::RemoveNode {
                        path: child_path(path, remove_ix),
                    });
                }

                ix = start;
            }
        }

        fn walk(children: &[Node], path: &mut Vec<usize>, ops: &mut Vec<Op>) {
            for (ix, node) in children.iter().enumerate() {
                let Node::Element(el) = node else {
                    continue;
                };
                path.push(ix);
                if el.kind.is_text_block() {
                    if el.children.len() >= 2 {
                        merge_block(el, path, ops);
                    }
                } else {
                    walk(&el.children, path, ops);
                }
                path.pop();
            }
        }

        let mut ops = Vec::new();
        walk(&doc.children, &mut Vec::new(), &mut ops);
        ops
    }
}

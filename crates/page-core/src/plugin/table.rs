use serde_json::Value;
use tracing::debug;

use crate::core::{Document, Editor, Node, Point, Selection};
use crate::ops::{NodeAttrs, Op, Path, Transaction};
use crate::schema::{CellAttrs, ElementKind};

use super::normalize::{table_cell_node, table_header_node, table_node, table_row_node};
use super::{
    CommandSpec, PagePlugin, QuerySpec, ancestor_element_path, apply_command_tx, color_arg,
    element_at_path, insert_block_with_trailing_paragraph,
};

pub(super) struct TablePlugin;

/// Where a point sits inside a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCursor {
    pub table_path: Path,
    pub row: usize,
    pub col: usize,
    pub rows: usize,
    pub cols: usize,
}

impl TableCursor {
    pub fn cell_path(&self, row: usize, col: usize) -> Path {
        let mut path = self.table_path.clone();
        path.extend([row, col]);
        path
    }

    /// Caret position at the start of a cell's first paragraph.
    fn caret_in(&self, row: usize, col: usize) -> Selection {
        let mut path = self.cell_path(row, col);
        path.extend([0, 0]);
        Selection::collapsed(Point::new(path, 0))
    }
}

pub fn table_cursor(doc: &Document, point_path: &[usize]) -> Option<TableCursor> {
    let cell_path = ancestor_element_path(doc, point_path, ElementKind::is_table_cell)?;
    let (&col, row_path) = cell_path.split_last()?;
    let (&row, table_path) = row_path.split_last()?;
    let table = element_at_path(doc, table_path)?;
    if table.kind != ElementKind::Table {
        return None;
    }
    let cols = table
        .children
        .iter()
        .filter_map(Node::as_element)
        .map(|r| r.children.len())
        .max()
        .unwrap_or(0);
    Some(TableCursor {
        table_path: table_path.to_vec(),
        row,
        col,
        rows: table.children.len(),
        cols,
    })
}

fn focus_cursor(editor: &Editor, command: &str) -> Option<TableCursor> {
    let cursor = table_cursor(editor.doc(), &editor.selection().focus.path);
    if cursor.is_none() {
        debug!(command, "table command outside a table, ignoring");
    }
    cursor
}

type TableEdit = fn(&Editor, &TableCursor) -> Result<Transaction, String>;

fn structural_command(
    id: &'static str,
    label: &'static str,
    description: &'static str,
    edit: TableEdit,
) -> CommandSpec {
    CommandSpec::new(id, label, move |editor, _args| {
        let Some(cursor) = focus_cursor(editor, id) else {
            return Ok(());
        };
        let tx = edit(editor, &cursor).map(|tx| tx.source(format!("command:{id}")));
        apply_command_tx(editor, tx, &format!("Failed to run {id}"))
    })
    .description(description)
}

impl PagePlugin for TablePlugin {
    fn id(&self) -> &'static str {
        "table"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("table.insert", "Insert table", |editor, args| {
                let dimension = |key: &str, max: usize| {
                    args.as_ref()
                        .and_then(|v| v.get(key))
                        .and_then(Value::as_u64)
                        .unwrap_or(2)
                        .clamp(1, max.max(1) as u64) as usize
                };
                let rows = dimension("rows", editor.config().table_grid_rows);
                let cols = dimension("cols", editor.config().table_grid_cols);
                let tx = Ok(insert_table(editor, rows, cols));
                apply_command_tx(editor, tx, "Failed to insert table")
            })
            .description("Insert a table with a header row after the current block.")
            .keywords(["table", "grid"])
            .args_example(serde_json::json!({ "rows": 3, "cols": 5 })),
            structural_command(
                "table.insert_row_above",
                "Insert row above",
                "Insert a new row above the current row.",
                insert_row_above,
            )
            .keywords(["table", "row", "insert"]),
            structural_command(
                "table.insert_row_below",
                "Insert row below",
                "Insert a new row below the current row.",
                insert_row_below,
            )
            .keywords(["table", "row", "insert"]),
            structural_command(
                "table.insert_col_left",
                "Insert column left",
                "Insert a new column to the left of the current column.",
                insert_col_left,
            )
            .keywords(["table", "column", "insert"]),
            structural_command(
                "table.insert_col_right",
                "Insert column right",
                "Insert a new column to the right of the current column.",
                insert_col_right,
            )
            .keywords(["table", "column", "insert"]),
            structural_command(
                "table.delete_row",
                "Delete row",
                "Delete the current row; deleting the last row deletes the table.",
                delete_row,
            )
            .keywords(["table", "row", "delete", "remove"]),
            structural_command(
                "table.delete_col",
                "Delete column",
                "Delete the current column; deleting the last column deletes the table.",
                delete_col,
            )
            .keywords(["table", "column", "delete", "remove"]),
            structural_command(
                "table.delete_table",
                "Delete table",
                "Delete the current table and replace it with a paragraph.",
                delete_table,
            )
            .keywords(["table", "delete", "remove"]),
            CommandSpec::new("table.set_cell_color", "Set cell color", |editor, args| {
                let color = color_arg(args.as_ref(), "color")?;
                let Some(cursor) = focus_cursor(editor, "table.set_cell_color") else {
                    return Ok(());
                };
                let tx = Ok(set_cell_color(editor, &cursor, color));
                apply_command_tx(editor, tx, "Failed to set cell color")
            })
            .description("Set or clear the background color of the selected cells.")
            .keywords(["table", "cell", "color", "background"])
            .args_example(serde_json::json!({ "color": "#dbeafe" })),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![
            QuerySpec::new("table.is_active", |editor, _args| {
                let active = table_cursor(editor.doc(), &editor.selection().focus.path).is_some();
                Ok(Value::Bool(active))
            }),
            QuerySpec::new("table.cell_color", |editor, _args| {
                let color = table_cursor(editor.doc(), &editor.selection().focus.path)
                    .and_then(|cursor| {
                        let path = cursor.cell_path(cursor.row, cursor.col);
                        element_at_path(editor.doc(), &path)?
                            .kind
                            .cell_attrs()?
                            .background_color
                            .clone()
                    });
                Ok(color.map(Value::String).unwrap_or(Value::Null))
            }),
        ]
    }
}

fn insert_table(editor: &Editor, rows: usize, cols: usize) -> Transaction {
    let tx = insert_block_with_trailing_paragraph(
        editor,
        table_node(rows, cols),
        "command:table.insert",
    );
    let Some(Op::InsertNode { path, .. }) = tx.ops.first() else {
        return tx;
    };
    let mut caret = path.clone();
    caret.extend([0, 0, 0, 0]);
    tx.selection_after(Selection::collapsed(Point::new(caret, 0)))
}

fn insert_row_above(_editor: &Editor, cursor: &TableCursor) -> Result<Transaction, String> {
    let mut insert_path = cursor.table_path.clone();
    insert_path.push(cursor.row);
    Ok(Transaction::new(vec![Op::InsertNode {
        path: insert_path,
        node: table_row_node(cursor.cols),
    }])
    .selection_after(cursor.caret_in(cursor.row, cursor.col)))
}

fn insert_row_below(_editor: &Editor, cursor: &TableCursor) -> Result<Transaction, String> {
    let mut insert_path = cursor.table_path.clone();
    insert_path.push(cursor.row + 1);
    Ok(Transaction::new(vec![Op::InsertNode {
        path: insert_path,
        node: table_row_node(cursor.cols),
    }])
    .selection_after(cursor.caret_in(cursor.row + 1, cursor.col)))
}

/// New cells copy the header flavor of the cell they are placed next to.
fn insert_column(
    editor: &Editor,
    cursor: &TableCursor,
    insert_ix: usize,
) -> Result<Transaction, String> {
    let table = element_at_path(editor.doc(), &cursor.table_path).ok_or("Invalid table")?;

    let mut ops = Vec::new();
    for (row_ix, row_node) in table.children.iter().enumerate() {
        let Some(row) = row_node.as_element() else {
            continue;
        };
        let reference = row
            .children
            .get(cursor.col)
            .or_else(|| row.children.last())
            .and_then(Node::as_element);
        let header = matches!(reference, Some(el) if matches!(el.kind, ElementKind::TableHeader(_)));
        let mut path = cursor.table_path.clone();
        path.extend([row_ix, insert_ix.min(row.children.len())]);
        ops.push(Op::InsertNode {
            path,
            node: if header {
                table_header_node()
            } else {
                table_cell_node()
            },
        });
    }

    Ok(Transaction::new(ops).selection_after(cursor.caret_in(cursor.row, insert_ix)))
}

fn insert_col_left(editor: &Editor, cursor: &TableCursor) -> Result<Transaction, String> {
    insert_column(editor, cursor, cursor.col)
}

fn insert_col_right(editor: &Editor, cursor: &TableCursor) -> Result<Transaction, String> {
    insert_column(editor, cursor, cursor.col + 1)
}

fn delete_table(_editor: &Editor, cursor: &TableCursor) -> Result<Transaction, String> {
    let mut caret = cursor.table_path.clone();
    caret.push(0);
    Ok(Transaction::new(vec![
        Op::RemoveNode {
            path: cursor.table_path.clone(),
        },
        Op::InsertNode {
            path: cursor.table_path.clone(),
            node: Node::paragraph(""),
        },
    ])
    .selection_after(Selection::collapsed(Point::new(caret, 0))))
}

fn delete_row(editor: &Editor, cursor: &TableCursor) -> Result<Transaction, String> {
    if cursor.rows <= 1 {
        return delete_table(editor, cursor);
    }
    let target_row = cursor.row.min(cursor.rows - 2);
    let mut row_path = cursor.table_path.clone();
    row_path.push(cursor.row);
    Ok(Transaction::new(vec![Op::RemoveNode { path: row_path }])
        .selection_after(cursor.caret_in(target_row, cursor.col)))
}

fn delete_col(editor: &Editor, cursor: &TableCursor) -> Result<Transaction, String> {
    if cursor.cols <= 1 {
        return delete_table(editor, cursor);
    }
    let table = element_at_path(editor.doc(), &cursor.table_path).ok_or("Invalid table")?;

    let mut ops = Vec::new();
    for (row_ix, row_node) in table.children.iter().enumerate() {
        let Some(row) = row_node.as_element() else {
            continue;
        };
        if cursor.col >= row.children.len() {
            continue;
        }
        ops.push(Op::RemoveNode {
            path: cursor.cell_path(row_ix, cursor.col),
        });
    }

    let target_col = cursor.col.min(cursor.cols - 2);
    Ok(Transaction::new(ops).selection_after(cursor.caret_in(cursor.row, target_col)))
}

/// Colors every cell in the rectangle spanned by the selection's anchor and
/// focus cells. An anchor outside the focus table colors the focus cell only.
fn set_cell_color(editor: &Editor, focus: &TableCursor, color: Option<String>) -> Transaction {
    let anchor = table_cursor(editor.doc(), &editor.selection().anchor.path)
        .filter(|anchor| anchor.table_path == focus.table_path)
        .unwrap_or_else(|| focus.clone());

    let rows = anchor.row.min(focus.row)..=anchor.row.max(focus.row);
    let cols = anchor.col.min(focus.col)..=anchor.col.max(focus.col);
    let attrs = CellAttrs {
        background_color: color,
    };

    let mut ops = Vec::new();
    for row in rows {
        for col in cols.clone() {
            let path = focus.cell_path(row, col);
            let Some(cell) = element_at_path(editor.doc(), &path) else {
                continue;
            };
            if cell.kind.cell_attrs() == Some(&attrs) {
                continue;
            }
            if let Some(kind) = cell.kind.with_cell_attrs(attrs.clone()) {
                ops.push(Op::SetNodeAttrs {
                    path,
                    attrs: NodeAttrs::Element(kind),
                });
            }
        }
    }

    Transaction::new(ops).source("command:table.set_cell_color")
}

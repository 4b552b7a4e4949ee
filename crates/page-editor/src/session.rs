use kb_page_core::{
    CommandError, Editor, EditorConfig, ImageAlign, ImageAttrs, ImageAttrsPatch, ImageDisplay,
    ImageFloat, Marks, PageValue, Path, Selection, active_marks,
};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::error::SessionError;
use crate::listeners::ListenerRegistry;
use crate::popover::{PopoverKind, PopoverOwner};
use crate::resize::{
    ImageResize, PointerPosition, PreviewSize, RenderedSize, ResizeCommit, ResizeCorner,
};
use crate::table_picker::{GridSize, TableGridPicker};
use crate::upload::{ImageUploader, UploadError, UploadFile, UploadOutcome, block_on};

/// One open page editor: the document engine plus the interaction state
/// around it. Document changes go through registered commands only.
pub struct EditorSession {
    editor: Editor,
    listeners: ListenerRegistry,
    popover: PopoverOwner,
    resize: ImageResize,
    table_picker: TableGridPicker,
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("selection", self.editor.selection())
            .field("listeners", &self.listeners)
            .field("popover", &self.popover)
            .field("resize", &self.resize)
            .field("table_picker", &self.table_picker)
            .finish_non_exhaustive()
    }
}

fn command_args(value: impl Serialize) -> Result<Value, SessionError> {
    serde_json::to_value(value)
        .map_err(|e| CommandError::new(format!("Failed to encode command args: {e}")).into())
}

impl EditorSession {
    pub fn new(editor: Editor) -> Self {
        let table_picker = TableGridPicker::from_config(editor.config());
        Self {
            editor,
            listeners: ListenerRegistry::new(),
            popover: PopoverOwner::new(),
            resize: ImageResize::new(),
            table_picker,
        }
    }

    pub fn from_markup(markup: &str, config: EditorConfig) -> Self {
        Self::new(Editor::from_markup(markup, config))
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }

    pub fn popover(&self) -> &PopoverOwner {
        &self.popover
    }

    pub fn resize(&self) -> &ImageResize {
        &self.resize
    }

    pub fn table_picker(&self) -> &TableGridPicker {
        &self.table_picker
    }

    pub fn to_markup(&self) -> String {
        self.editor.to_markup()
    }

    pub fn page_value(&self) -> PageValue {
        PageValue::from_document(self.editor.doc().clone())
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.editor.set_selection(selection);
    }

    pub fn can_undo(&self) -> bool {
        self.editor.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.editor.can_redo()
    }

    /// History moves invalidate node paths, so a running gesture is dropped.
    pub fn undo(&mut self) -> bool {
        self.resize.cancel();
        self.editor.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.resize.cancel();
        self.editor.redo()
    }

    /// A command that changes the document under a running resize gesture
    /// cancels the gesture, since the image path may no longer hold.
    pub fn run_command(&mut self, id: &str, args: Option<Value>) -> Result<(), SessionError> {
        if !self.resize.is_resizing() {
            return Ok(self.editor.run_command(id, args)?);
        }
        let before = self.editor.doc().clone();
        let result = self.editor.run_command(id, args);
        if *self.editor.doc() != before {
            debug!(command = id, "document changed during image resize");
            self.resize.cancel();
        }
        Ok(result?)
    }

    // Queries.

    pub fn active_marks(&self) -> Marks {
        active_marks(&self.editor)
    }

    pub fn heading_level(&self) -> Result<Option<u8>, SessionError> {
        Ok(self.editor.run_query("block.heading_level", None)?)
    }

    pub fn is_in_table(&self) -> Result<bool, SessionError> {
        Ok(self.editor.run_query("table.is_active", None)?)
    }

    pub fn cell_color(&self) -> Result<Option<String>, SessionError> {
        Ok(self.editor.run_query("table.cell_color", None)?)
    }

    pub fn image_attrs(&self, path: &[usize]) -> Result<ImageAttrs, SessionError> {
        self.editor
            .run_query("image.attrs", Some(json!({ "path": path })))
            .map_err(|_| SessionError::ImageNotFound(path.to_vec()))
    }

    // Images.

    pub fn insert_image(&mut self, attrs: ImageAttrsPatch) -> Result<(), SessionError> {
        let args = command_args(attrs)?;
        self.run_command("image.insert", Some(args))
    }

    pub fn update_image_attributes(
        &mut self,
        path: &[usize],
        patch: ImageAttrsPatch,
    ) -> Result<(), SessionError> {
        let mut args = command_args(patch)?;
        if let Value::Object(map) = &mut args {
            map.insert("path".into(), json!(path));
        }
        self.run_command("image.update", Some(args))
    }

    pub fn set_image_display(
        &mut self,
        path: &[usize],
        display: ImageDisplay,
    ) -> Result<(), SessionError> {
        self.run_command(
            "image.set_display",
            Some(json!({ "path": path, "display": display.as_str() })),
        )
    }

    pub fn set_image_float(&mut self, path: &[usize], float: ImageFloat) -> Result<(), SessionError> {
        self.run_command(
            "image.set_float",
            Some(json!({ "path": path, "float": float.as_str() })),
        )
    }

    pub fn set_image_align(&mut self, path: &[usize], align: ImageAlign) -> Result<(), SessionError> {
        self.run_command(
            "image.set_align",
            Some(json!({ "path": path, "align": align.as_str() })),
        )
    }

    pub fn reset_image_size(&mut self, path: &[usize]) -> Result<(), SessionError> {
        self.run_command("image.reset_size", Some(json!({ "path": path })))
    }

    pub fn begin_image_resize(
        &mut self,
        path: &[usize],
        corner: ResizeCorner,
        pointer: PointerPosition,
        rendered: RenderedSize,
    ) -> Result<(), SessionError> {
        self.image_attrs(path)?;
        let min_width = self.editor.config().min_image_width;
        self.resize.begin(
            &self.listeners,
            path.to_vec(),
            corner,
            pointer,
            rendered,
            min_width,
        )
    }

    pub fn update_image_resize(&mut self, pointer: PointerPosition) -> Option<PreviewSize> {
        self.resize.update(pointer)
    }

    /// Writes the final size as one attribute update. Returns `None` when no
    /// gesture was running.
    pub fn end_image_resize(&mut self) -> Result<Option<ResizeCommit>, SessionError> {
        let Some(commit) = self.resize.end() else {
            return Ok(None);
        };
        self.run_command(
            "image.resize",
            Some(json!({
                "path": commit.path,
                "width": commit.width,
                "height": commit.height,
            })),
        )?;
        Ok(Some(commit))
    }

    pub fn cancel_image_resize(&mut self) -> bool {
        self.resize.cancel()
    }

    /// Uploads `file` and inserts the stored image after the caret block.
    /// Each call reports its own outcome; failures are not retried.
    pub async fn upload_image<U: ImageUploader>(
        &mut self,
        uploader: &U,
        file: UploadFile,
        alt: Option<String>,
    ) -> Result<UploadOutcome, SessionError> {
        if let Err(err) = file.check() {
            warn!(file = %file.name, error = %err, "image upload refused");
            return Err(err.into());
        }

        let name = file.name.clone();
        let src = match uploader.upload(file).await {
            Ok(src) if !src.trim().is_empty() => src.trim().to_string(),
            Ok(_) => {
                warn!(file = %name, "uploader returned an empty url");
                return Err(UploadError::EmptyUrl.into());
            }
            Err(err) => {
                warn!(file = %name, error = %err, "image upload failed");
                return Err(err.into());
            }
        };

        self.insert_image(ImageAttrsPatch {
            src: Some(src.clone()),
            alt,
            ..ImageAttrsPatch::default()
        })?;
        let path = self.block_before_caret();
        info!(file = %name, %src, ?path, "image uploaded");
        Ok(UploadOutcome { src, path })
    }

    pub fn upload_image_blocking<U: ImageUploader>(
        &mut self,
        uploader: &U,
        file: UploadFile,
        alt: Option<String>,
    ) -> Result<UploadOutcome, SessionError> {
        block_on(self.upload_image(uploader, file, alt))
    }

    /// Inserted blocks are followed by the paragraph holding the caret.
    fn block_before_caret(&self) -> Path {
        let top = self
            .editor
            .selection()
            .focus
            .path
            .first()
            .copied()
            .unwrap_or(0);
        vec![top.saturating_sub(1)]
    }

    // Video.

    pub fn insert_video(
        &mut self,
        url: &str,
        width: Option<u32>,
        height: Option<u32>,
    ) -> Result<(), SessionError> {
        let mut args = json!({ "url": url });
        if let Value::Object(map) = &mut args {
            if let Some(width) = width {
                map.insert("width".into(), json!(width));
            }
            if let Some(height) = height {
                map.insert("height".into(), json!(height));
            }
        }
        self.run_command("video.insert", Some(args))
    }

    // Tables.

    pub fn insert_table(&mut self, rows: usize, cols: usize) -> Result<(), SessionError> {
        self.run_command("table.insert", Some(json!({ "rows": rows, "cols": cols })))
    }

    pub fn insert_row_above(&mut self) -> Result<(), SessionError> {
        self.run_command("table.insert_row_above", None)
    }

    pub fn insert_row_below(&mut self) -> Result<(), SessionError> {
        self.run_command("table.insert_row_below", None)
    }

    pub fn insert_col_left(&mut self) -> Result<(), SessionError> {
        self.run_command("table.insert_col_left", None)
    }

    pub fn insert_col_right(&mut self) -> Result<(), SessionError> {
        self.run_command("table.insert_col_right", None)
    }

    pub fn delete_row(&mut self) -> Result<(), SessionError> {
        self.run_command("table.delete_row", None)
    }

    pub fn delete_col(&mut self) -> Result<(), SessionError> {
        self.run_command("table.delete_col", None)
    }

    pub fn delete_table(&mut self) -> Result<(), SessionError> {
        self.run_command("table.delete_table", None)
    }

    /// `None` clears the color.
    pub fn set_cell_color(&mut self, color: Option<&str>) -> Result<(), SessionError> {
        self.run_command("table.set_cell_color", Some(json!({ "color": color })))
    }

    pub fn hover_table_grid(&mut self, row: usize, col: usize) -> GridSize {
        self.table_picker.hover(row, col)
    }

    pub fn leave_table_grid(&mut self) {
        self.table_picker.leave();
    }

    /// Inserts a table of the hovered size and closes the grid popover.
    pub fn commit_table_grid(&mut self) -> Result<Option<GridSize>, SessionError> {
        let Some(size) = self.table_picker.commit() else {
            return Ok(None);
        };
        if self.popover.is_open(PopoverKind::TableGrid) {
            self.popover.close();
        }
        self.insert_table(size.rows, size.cols)?;
        Ok(Some(size))
    }

    // Marks and blocks.

    /// Types at the caret, carrying any marks picked at the caret.
    pub fn insert_text(&mut self, text: &str) -> Result<(), SessionError> {
        self.run_command("core.insert_text", Some(json!({ "text": text })))
    }

    pub fn set_text_color(&mut self, color: &str) -> Result<(), SessionError> {
        self.run_command("marks.set_text_color", Some(json!({ "color": color })))
    }

    pub fn clear_text_color(&mut self) -> Result<(), SessionError> {
        self.run_command("marks.unset_text_color", None)
    }

    pub fn toggle_text_color(&mut self, color: &str) -> Result<(), SessionError> {
        self.run_command("marks.toggle_text_color", Some(json!({ "color": color })))
    }

    pub fn set_highlight(&mut self, color: &str) -> Result<(), SessionError> {
        self.run_command("marks.set_highlight", Some(json!({ "color": color })))
    }

    pub fn clear_highlight(&mut self) -> Result<(), SessionError> {
        self.run_command("marks.unset_highlight", None)
    }

    pub fn toggle_highlight(&mut self, color: Option<&str>) -> Result<(), SessionError> {
        let args = color.map(|color| json!({ "color": color }));
        self.run_command("marks.toggle_highlight", args)
    }

    pub fn set_link(&mut self, href: &str) -> Result<(), SessionError> {
        self.run_command("marks.set_link", Some(json!({ "href": href })))
    }

    pub fn unset_link(&mut self) -> Result<(), SessionError> {
        self.run_command("marks.unset_link", None)
    }

    pub fn toggle_heading(&mut self, level: u8) -> Result<(), SessionError> {
        self.run_command("block.toggle_heading", Some(json!({ "level": level })))
    }

    pub fn set_paragraph(&mut self) -> Result<(), SessionError> {
        self.run_command("block.unset_heading", None)
    }

    // Popovers.

    pub fn open_popover(&mut self, kind: PopoverKind) -> Option<PopoverKind> {
        if kind == PopoverKind::TableGrid {
            self.table_picker.leave();
        }
        self.popover.open(kind, &self.listeners)
    }

    pub fn close_popover(&mut self) -> Option<PopoverKind> {
        self.popover.close()
    }

    pub fn toggle_popover(&mut self, kind: PopoverKind) -> bool {
        self.popover.toggle(kind, &self.listeners)
    }

    pub fn outside_interaction(&mut self) -> Option<PopoverKind> {
        let closed = self.popover.outside_interaction();
        if closed == Some(PopoverKind::TableGrid) {
            self.table_picker.leave();
        }
        closed
    }

    /// Applies a swatch from the open color popover, then closes it. `None`
    /// is the "no color" swatch.
    pub fn pick_color(&mut self, color: Option<&str>) -> Result<(), SessionError> {
        let kind = self
            .popover
            .active()
            .filter(|kind| kind.is_color_picker())
            .ok_or(SessionError::NoColorPopover)?;
        debug!(?kind, color, "color picked");

        let result = match (kind, color) {
            (PopoverKind::TextColor, Some(color)) => self.set_text_color(color),
            (PopoverKind::TextColor, None) => self.clear_text_color(),
            (PopoverKind::Highlight, Some(color)) => self.set_highlight(color),
            (PopoverKind::Highlight, None) => self.clear_highlight(),
            _ => self.set_cell_color(color),
        };
        self.popover.close();
        result
    }
}

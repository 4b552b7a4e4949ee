use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::{DEFAULT_VIDEO_HEIGHT, DEFAULT_VIDEO_WIDTH};

pub const DEFAULT_MAX_UNDO: usize = 200;
pub const DEFAULT_MAX_NORMALIZE_ITERATIONS: usize = 100;
pub const DEFAULT_MIN_IMAGE_WIDTH: u32 = 100;
pub const DEFAULT_TABLE_GRID_ROWS: usize = 10;
pub const DEFAULT_TABLE_GRID_COLS: usize = 10;
pub const DEFAULT_HIGHLIGHT_COLOR: &str = "#fef08a";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse editor config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Tunables for an editor session. Zero values and empty strings mean
/// "use the default"; call [`EditorConfig::with_defaults`] to resolve them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub max_undo: usize,
    pub max_normalize_iterations: usize,
    pub min_image_width: u32,
    pub table_grid_rows: usize,
    pub table_grid_cols: usize,
    pub default_video_width: u32,
    pub default_video_height: u32,
    pub default_highlight_color: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_undo: DEFAULT_MAX_UNDO,
            max_normalize_iterations: DEFAULT_MAX_NORMALIZE_ITERATIONS,
            min_image_width: DEFAULT_MIN_IMAGE_WIDTH,
            table_grid_rows: DEFAULT_TABLE_GRID_ROWS,
            table_grid_cols: DEFAULT_TABLE_GRID_COLS,
            default_video_width: DEFAULT_VIDEO_WIDTH,
            default_video_height: DEFAULT_VIDEO_HEIGHT,
            default_highlight_color: DEFAULT_HIGHLIGHT_COLOR.to_string(),
        }
    }
}

impl EditorConfig {
    pub fn with_defaults(mut self) -> Self {
        if self.max_undo == 0 {
            self.max_undo = DEFAULT_MAX_UNDO;
        }
        if self.max_normalize_iterations == 0 {
            self.max_normalize_iterations = DEFAULT_MAX_NORMALIZE_ITERATIONS;
        }
        if self.min_image_width == 0 {
            self.min_image_width = DEFAULT_MIN_IMAGE_WIDTH;
        }
        if self.table_grid_rows == 0 {
            self.table_grid_rows = DEFAULT_TABLE_GRID_ROWS;
        }
        if self.table_grid_cols == 0 {
            self.table_grid_cols = DEFAULT_TABLE_GRID_COLS;
        }
        if self.default_video_width == 0 {
            self.default_video_width = DEFAULT_VIDEO_WIDTH;
        }
        if self.default_video_height == 0 {
            self.default_video_height = DEFAULT_VIDEO_HEIGHT;
        }
        if self.default_highlight_color.trim().is_empty() {
            self.default_highlight_color = DEFAULT_HIGHLIGHT_COLOR.to_string();
        }
        self
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: EditorConfig = serde_json::from_str(s)?;
        Ok(config.with_defaults())
    }
}

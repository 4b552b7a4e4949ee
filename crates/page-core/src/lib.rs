mod config;
mod core;
pub mod markup;
mod ops;
mod plugin;
mod schema;
mod serde_value;
pub mod video;

pub use crate::config::*;
pub use crate::core::*;
pub use crate::markup::{parse_markup, render_markup};
pub use crate::ops::*;
pub use crate::plugin::*;
pub use crate::schema::*;
pub use crate::serde_value::*;
pub use crate::video::normalize_video_url;

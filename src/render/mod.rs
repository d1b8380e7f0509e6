//! Rendering of run metadata: Markdown table previews and PNG charts.

pub mod chart;
pub mod font;
pub mod markdown;

pub use chart::{markdown_image, render_bar_chart};
pub use markdown::table_preview;

pub mod display;
pub mod metrics;

pub use display::{render_heatmap, render_image_preview, render_matrix};
pub use metrics::{ClassMetrics, ClassificationReport, ConfusionMatrix};

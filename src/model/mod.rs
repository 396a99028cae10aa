pub mod class_index;
pub mod config;

pub use class_index::ClassIndex;
pub use config::PipelineConfig;

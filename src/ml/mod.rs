pub mod augment;
pub mod evaluation;
pub mod inference;
pub mod ml_model;
pub mod training;

pub use augment::{AugmentConfig, RandomTransform};
pub use evaluation::{argmax, collect_predictions};
pub use inference::{exact_match_label, run_single_image, InferenceEngine, Predictor};
pub use ml_model::{
    load_resized_image, normalize_pixels, resize_image, FlowerClassifier, ModelConfig,
    IMAGE_SIZE,
};
pub use training::{train_model, FlowerBatch, FlowerBatcher, FlowerDataset, FlowerItem};

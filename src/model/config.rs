//! パイプライン設定
//!
//! 学習・評価・推論で使用する値をすべてここに集約します。
//! 値はすべて固定で、設定ファイルの読み書きは行いません。

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::ml::{AugmentConfig, ModelConfig, IMAGE_SIZE};

/// パイプライン全体の設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// 学習データのルート（クラスごとのサブフォルダを含む）
    pub training_dir: PathBuf,
    /// テストデータのルート
    pub test_dir: PathBuf,
    /// 単一画像推論に使う画像
    pub prediction_image: PathBuf,
    /// 入力画像サイズ（正方形）
    pub image_size: usize,
    /// バッチサイズ
    pub batch_size: usize,
    /// エポック数
    pub num_epochs: usize,
    /// 学習率 (RMSProp)
    pub learning_rate: f64,
    /// データローダーのワーカー数
    pub num_workers: usize,
    /// 学習時のデータ拡張
    pub augment: AugmentConfig,
    /// モデル設定
    pub model: ModelConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            training_dir: PathBuf::from("training_set"),
            test_dir: PathBuf::from("test_set"),
            prediction_image: PathBuf::from("prediction/s.jpg"),
            image_size: IMAGE_SIZE,
            batch_size: 32,
            num_epochs: 10,
            learning_rate: 1e-3,
            num_workers: 0,
            augment: AugmentConfig::new(),
            model: ModelConfig::new(),
        }
    }
}

impl PipelineConfig {
    /// 設定情報を表示
    pub fn display(&self) {
        println!("=== パイプライン設定 ===");
        println!("学習データ: {}", self.training_dir.display());
        println!("テストデータ: {}", self.test_dir.display());
        println!("推論画像: {}", self.prediction_image.display());
        println!("画像サイズ: {}x{}", self.image_size, self.image_size);
        println!("\n--- トレーニング設定 ---");
        println!("エポック数: {}", self.num_epochs);
        println!("バッチサイズ: {}", self.batch_size);
        println!("学習率: {}", self.learning_rate);
        println!("\n--- データ拡張 ---");
        println!("シアー: ±{}°", self.augment.shear_range);
        println!("ズーム: ±{}", self.augment.zoom_range);
        println!("左右反転: {}", self.augment.horizontal_flip);
        println!("\n--- モデル設定 ---");
        println!("分類クラス数: {}", self.model.num_classes);
        println!("ドロップアウト率: {}", self.model.dropout);
        println!("========================\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.image_size, 64);
        assert_eq!(config.batch_size, 32);
        assert_eq!(config.num_epochs, 10);
        assert_eq!(config.model.num_classes, 5);
        assert_eq!(config.model.dropout, 0.5);
        assert_eq!(config.prediction_image, PathBuf::from("prediction/s.jpg"));
    }

    #[test]
    fn test_serialization() {
        let config = PipelineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: PipelineConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.training_dir, config.training_dir);
        assert_eq!(deserialized.test_dir, config.test_dir);
        assert_eq!(deserialized.num_epochs, config.num_epochs);
        assert_eq!(deserialized.learning_rate, config.learning_rate);
        assert_eq!(deserialized.augment.zoom_range, config.augment.zoom_range);
        assert_eq!(deserialized.model.num_classes, config.model.num_classes);
    }

    #[test]
    fn test_model_input_matches_pipeline() {
        let config = PipelineConfig::default();
        assert_eq!(config.model.image_size, config.image_size);
    }
}

//! 単一画像の推論

use anyhow::Result;
use burn::tensor::{backend::Backend, Tensor};
use std::io::Write;
use std::path::Path;

use crate::analyzer::render_image_preview;
use crate::ml::{load_resized_image, normalize_pixels, FlowerClassifier};

/// 出力ベクトルの位置ごとの表示名（先頭から順に判定）
pub const PREDICTION_LABELS: [&str; 4] = ["Daisy", "Dandelion", "Rose", "Sunflower"];

/// プレビュー表示の横幅（文字数）
const PREVIEW_COLUMNS: u32 = 32;

/// 1枚の正規化済み画像 (C, H, W) からクラス確率を返す
pub trait Predictor {
    fn predict(&self, pixels: &[f32], image_size: usize) -> Result<Vec<f32>>;
}

/// 推論エンジン
pub struct InferenceEngine<B: Backend> {
    model: FlowerClassifier<B>,
    device: B::Device,
}

impl<B: Backend> InferenceEngine<B> {
    pub fn new(model: FlowerClassifier<B>, device: B::Device) -> Self {
        Self { model, device }
    }
}

impl<B: Backend> Predictor for InferenceEngine<B> {
    fn predict(&self, pixels: &[f32], image_size: usize) -> Result<Vec<f32>> {
        // バッチ次元を追加 [1, 3, size, size]
        let tensor = Tensor::<B, 1>::from_floats(pixels, &self.device)
            .reshape([1, 3, image_size, image_size]);

        self.model
            .forward_probabilities(tensor)
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| anyhow::anyhow!("推論結果の取得エラー: {:?}", e))
    }
}

/// 確率ベクトルの各位置が厳密に 1.0 かを先頭から順に調べる
///
/// argmax ではない。確率が1つのクラスに完全に集中したときだけ名前が決まり、
/// 通常の softmax 出力では `None` になる。位置4は判定しない。
/// 1.0 が複数あれば先頭のものを採用する（softmax 出力では起こらない）。
pub fn exact_match_label(probabilities: &[f32]) -> Option<&'static str> {
    PREDICTION_LABELS
        .iter()
        .enumerate()
        .find(|(i, _)| probabilities.get(*i) == Some(&1.0))
        .map(|(_, label)| *label)
}

/// 単一画像の推論結果
#[derive(Debug, Clone, PartialEq)]
pub struct SinglePrediction {
    pub probabilities: Vec<f32>,
    pub label: Option<&'static str>,
}

/// 画像を1枚読み込んで推論し、結果を `out` に書き出す
///
/// 出力: ラベル（一致した場合のみ）、確率ベクトル、画像プレビュー
pub fn run_single_image<P: Predictor, W: Write>(
    predictor: &P,
    image_path: &Path,
    image_size: usize,
    out: &mut W,
) -> Result<SinglePrediction> {
    let image = load_resized_image(image_path, image_size)?;
    let pixels = normalize_pixels(&image);

    let probabilities = predictor.predict(&pixels, image_size)?;
    let label = exact_match_label(&probabilities);

    if let Some(label) = label {
        writeln!(out, "{}", label)?;
    }
    writeln!(out, "[{:?}]", probabilities)?;
    write!(out, "{}", render_image_preview(&image, PREVIEW_COLUMNS))?;

    Ok(SinglePrediction {
        probabilities,
        label,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::ModelConfig;
    use burn_ndarray::NdArray;
    use image::{Rgb, RgbImage};
    use std::path::PathBuf;

    /// 常に同じ出力を返すスタブ
    struct FixedPredictor(Vec<f32>);

    impl Predictor for FixedPredictor {
        fn predict(&self, pixels: &[f32], image_size: usize) -> Result<Vec<f32>> {
            assert_eq!(pixels.len(), 3 * image_size * image_size);
            Ok(self.0.clone())
        }
    }

    fn sample_image(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("flower_predict_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        RgbImage::from_pixel(80, 50, Rgb([200, 180, 20]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn test_exact_match_label() {
        assert_eq!(exact_match_label(&[1.0, 0.0, 0.0, 0.0, 0.0]), Some("Daisy"));
        assert_eq!(exact_match_label(&[0.0, 1.0, 0.0, 0.0, 0.0]), Some("Dandelion"));
        assert_eq!(exact_match_label(&[0.0, 0.0, 1.0, 0.0, 0.0]), Some("Rose"));
        assert_eq!(exact_match_label(&[0.0, 0.0, 0.0, 1.0, 0.0]), Some("Sunflower"));
        // 位置4は判定されない
        assert_eq!(exact_match_label(&[0.0, 0.0, 0.0, 0.0, 1.0]), None);
    }

    #[test]
    fn test_first_exact_match_wins() {
        assert_eq!(exact_match_label(&[1.0, 1.0, 0.0, 0.0, 0.0]), Some("Daisy"));
        assert_eq!(exact_match_label(&[0.0, 0.0, 1.0, 1.0, 0.0]), Some("Rose"));
    }

    #[test]
    fn test_non_degenerate_output_has_no_label() {
        assert_eq!(exact_match_label(&[0.96, 0.01, 0.01, 0.01, 0.01]), None);
        assert_eq!(exact_match_label(&[0.2, 0.2, 0.2, 0.2, 0.2]), None);
        assert_eq!(exact_match_label(&[0.9999999, 0.0000001, 0.0, 0.0, 0.0]), None);
        assert_eq!(exact_match_label(&[]), None);
    }

    #[test]
    fn test_stub_model_prints_daisy() {
        let path = sample_image("daisy.png");
        let predictor = FixedPredictor(vec![1.0, 0.0, 0.0, 0.0, 0.0]);
        let mut out = Vec::new();

        let result = run_single_image(&predictor, &path, 64, &mut out).unwrap();
        assert_eq!(result.label, Some("Daisy"));

        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Daisy"));
        assert_eq!(lines.next(), Some("[[1.0, 0.0, 0.0, 0.0, 0.0]]"));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_typical_output_prints_vector_only() {
        let path = sample_image("typical.png");
        let predictor = FixedPredictor(vec![0.5, 0.25, 0.125, 0.0625, 0.0625]);
        let mut out = Vec::new();

        let result = run_single_image(&predictor, &path, 64, &mut out).unwrap();
        assert_eq!(result.label, None);

        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text.lines().next(),
            Some("[[0.5, 0.25, 0.125, 0.0625, 0.0625]]")
        );

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_image_is_error() {
        let predictor = FixedPredictor(vec![1.0, 0.0, 0.0, 0.0, 0.0]);
        let mut out = Vec::new();
        let missing = std::env::temp_dir().join("flower_predict_missing").join("s.jpg");
        assert!(run_single_image(&predictor, &missing, 64, &mut out).is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn test_engine_returns_distribution() {
        let device = Default::default();
        let model = ModelConfig::new().init::<NdArray<f32>>(&device);
        let engine = InferenceEngine::new(model, device);

        let probs = engine.predict(&vec![0.5; 3 * 64 * 64], 64).unwrap();
        assert_eq!(probs.len(), 5);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
    }
}

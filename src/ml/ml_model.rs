//! 機械学習モデルの共通定義
//!
//! 花画像5クラス分類用のCNNモデルと、画像の読み込み・正規化を提供します。

use anyhow::{Context, Result};
use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        loss::CrossEntropyLossConfig,
        pool::{MaxPool2d, MaxPool2dConfig},
        Dropout, DropoutConfig, Linear, LinearConfig, Relu,
    },
    tensor::{activation::softmax, backend::Backend, Int, Tensor},
    train::ClassificationOutput,
};
use image::{imageops::FilterType, RgbImage};
use std::path::Path;

/// 画像サイズ
pub const IMAGE_SIZE: usize = 64;

/// モデル設定
#[derive(Config, Debug)]
pub struct ModelConfig {
    /// 分類クラス数
    #[config(default = 5)]
    pub num_classes: usize,
    /// ドロップアウト率
    #[config(default = 0.5)]
    pub dropout: f64,
    /// 入力画像サイズ（正方形）
    #[config(default = 64)]
    pub image_size: usize,
    /// 畳み込みのフィルタ数
    #[config(default = 64)]
    pub conv_filters: usize,
    /// 隠れ層のユニット数
    #[config(default = 128)]
    pub hidden_units: usize,
}

impl ModelConfig {
    /// 2回目のプーリング後の特徴マップサイズ
    ///
    /// Conv (3x3, no padding): size -> size - 2
    /// Pool (2x2, stride 2): size -> size / 2 (切り捨て)
    pub fn feature_map_size(&self) -> usize {
        let after_conv1 = self.image_size.saturating_sub(2);
        let after_pool1 = after_conv1 / 2;
        let after_conv2 = after_pool1.saturating_sub(2);
        after_conv2 / 2
    }

    /// モデルを初期化
    pub fn init<B: Backend>(&self, device: &B::Device) -> FlowerClassifier<B> {
        let feature_map_size = self.feature_map_size();
        if feature_map_size == 0 {
            panic!("入力サイズが小さすぎます: {} (最小10x10が必要)", self.image_size);
        }

        let d = self.conv_filters * feature_map_size * feature_map_size;

        println!("[Model] 入力サイズ: 3 x {}x{}", self.image_size, self.image_size);
        println!(
            "[Model] Conv2 + Pool2後: {} x {}x{}",
            self.conv_filters, feature_map_size, feature_map_size
        );
        println!("[Model] Flatten後の特徴次元 d: {}", d);
        println!("[Model] FC1: {} -> {}", d, self.hidden_units);
        println!("[Model] FC2: {} -> {}", self.hidden_units, self.num_classes);

        FlowerClassifier {
            conv1: Conv2dConfig::new([3, self.conv_filters], [3, 3])
                .with_stride([1, 1])
                .init(device),
            pool1: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            conv2: Conv2dConfig::new([self.conv_filters, self.conv_filters], [3, 3])
                .with_stride([1, 1])
                .init(device),
            pool2: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            dropout: DropoutConfig::new(self.dropout).init(),
            fc1: LinearConfig::new(d, self.hidden_units).init(device),
            fc2: LinearConfig::new(self.hidden_units, self.num_classes).init(device),
            activation: Relu::new(),
        }
    }
}

/// 花画像分類用CNNモデル
///
/// # アーキテクチャ
/// - {Conv 3x3 (no padding) + ReLU + MaxPool 2x2} x 2層
/// - Dropout
/// - Flatten
/// - FC: d -> 128 + ReLU
/// - FC: 128 -> num_classes
/// - Softmax (確率出力時)
#[derive(Module, Debug)]
pub struct FlowerClassifier<B: Backend> {
    conv1: Conv2d<B>, // 3 -> 64
    pool1: MaxPool2d,
    conv2: Conv2d<B>, // 64 -> 64
    pool2: MaxPool2d,
    dropout: Dropout,

    fc1: Linear<B>,
    fc2: Linear<B>,

    activation: Relu,
}

impl<B: Backend> FlowerClassifier<B> {
    /// 順伝播
    ///
    /// # 引数
    /// - `images`: バッチ画像 [batch_size, 3, size, size]
    ///
    /// # 戻り値
    /// - クラスごとのロジット [batch_size, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let [batch_size, _, _, _] = images.dims();

        let x = self.conv1.forward(images);
        let x = self.activation.forward(x);
        let x = self.pool1.forward(x);

        let x = self.conv2.forward(x);
        let x = self.activation.forward(x);
        let x = self.pool2.forward(x);

        let x = self.dropout.forward(x);

        let [_, c, h, w] = x.dims();
        let x = x.reshape([batch_size, c * h * w]);

        let x = self.fc1.forward(x);
        let x = self.activation.forward(x);

        self.fc2.forward(x)
    }

    /// クラスごとの確率 [batch_size, num_classes]（各行の合計は1）
    pub fn forward_probabilities(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        softmax(self.forward(images), 1)
    }

    /// 順伝播と損失計算（学習用）
    ///
    /// ロジットに対するカテゴリカル交差エントロピーを計算します。
    pub fn forward_classification(
        &self,
        images: Tensor<B, 4>,
        targets: Tensor<B, 1, Int>,
    ) -> ClassificationOutput<B> {
        let output = self.forward(images);
        let loss = CrossEntropyLossConfig::new()
            .init(&output.device())
            .forward(output.clone(), targets.clone());

        ClassificationOutput::new(loss, output, targets)
    }
}

/// 画像を読み込んでRGB・指定サイズにリサイズ（最近傍補間）
pub fn load_resized_image(path: &Path, size: usize) -> Result<RgbImage> {
    let img = image::open(path)
        .with_context(|| format!("画像の読み込みに失敗しました: {}", path.display()))?
        .to_rgb8();
    Ok(resize_image(&img, size))
}

/// 正方形にリサイズ（最近傍補間）
pub fn resize_image(img: &RgbImage, size: usize) -> RgbImage {
    let (width, height) = img.dimensions();
    if width == size as u32 && height == size as u32 {
        return img.clone();
    }
    image::imageops::resize(img, size as u32, size as u32, FilterType::Nearest)
}

/// 画素値を [0, 255] -> [0, 1] に線形変換
///
/// # 戻り値
/// - (C, H, W) の順で平坦化した画素データ
pub fn normalize_pixels(img: &RgbImage) -> Vec<f32> {
    let (width, height) = img.dimensions();
    let mut data = Vec::with_capacity(3 * (width * height) as usize);

    for channel in 0..3 {
        for y in 0..height {
            for x in 0..width {
                let pixel = img.get_pixel(x, y);
                data.push(pixel[channel] as f32 / 255.0);
            }
        }
    }

    data
}

//! データセット読み込みとモデル学習

use anyhow::{Context, Result};
use burn::{
    data::dataloader::batcher::Batcher,
    tensor::{
        backend::{AutodiffBackend, Backend},
        Int, Tensor,
    },
    train::{ClassificationOutput, TrainOutput, TrainStep, ValidStep},
};
use burn_dataset::Dataset;
use image::RgbImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::ml::{load_resized_image, normalize_pixels, AugmentConfig, FlowerClassifier};
use crate::model::{ClassIndex, PipelineConfig};

/// 読み込み対象の拡張子
const IMAGE_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "bmp", "ppm", "tif", "tiff"];

/// データセットアイテム（リサイズ済み画像とクラスID）
#[derive(Clone, Debug)]
pub struct FlowerItem {
    pub image: RgbImage,
    pub label: usize,
}

/// クラスごとのサブフォルダから読み込んだ画像データセット
pub struct FlowerDataset {
    items: Vec<FlowerItem>,
    class_index: ClassIndex,
}

impl FlowerDataset {
    /// ディレクトリから画像を読み込む
    ///
    /// クラスIDはサブフォルダ名の昇順、各クラス内はファイル名の昇順です。
    pub fn from_directory(root: &Path, image_size: usize) -> Result<Self> {
        let class_index = ClassIndex::from_directory(root)?;
        let mut items = Vec::new();

        for (label, class_name) in class_index.names().iter().enumerate() {
            let mut paths = Vec::new();
            collect_image_paths(&root.join(class_name), &mut paths)?;
            paths.sort();

            for path in paths {
                let image = load_resized_image(&path, image_size)?;
                items.push(FlowerItem { image, label });
            }
        }

        if items.is_empty() {
            anyhow::bail!("No images found in {}", root.display());
        }

        println!(
            "[Data] Found {} images belonging to {} classes. ({})",
            items.len(),
            class_index.len(),
            root.display()
        );
        for (i, name) in class_index.names().iter().enumerate() {
            let count = items.iter().filter(|item| item.label == i).count();
            println!("[Data]   Class {}: {} ({} images)", i, name, count);
        }

        Ok(Self { items, class_index })
    }

    pub fn class_index(&self) -> &ClassIndex {
        &self.class_index
    }

    /// クラスフォルダ数がモデルの出力数と一致するか確認
    pub fn ensure_num_classes(&self, num_classes: usize) -> Result<()> {
        anyhow::ensure!(
            self.class_index.len() == num_classes,
            "クラス数がモデルの出力数と一致しません: {} クラス ({:?}), 出力数 {}",
            self.class_index.len(),
            self.class_index.names(),
            num_classes
        );
        Ok(())
    }
}

impl Dataset<FlowerItem> for FlowerDataset {
    fn get(&self, index: usize) -> Option<FlowerItem> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// クラスフォルダ以下を再帰的にたどって画像ファイルを集める
fn collect_image_paths(dir: &Path, paths: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("ディレクトリを開けません: {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_dir() {
            collect_image_paths(&path, paths)?;
        } else if path.is_file() && has_image_extension(&path) {
            paths.push(path);
        }
    }
    Ok(())
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// バッチャー
///
/// 学習用はバッチ作成のたびに画像ごとのランダム変換をかけます。
#[derive(Clone)]
pub struct FlowerBatcher {
    image_size: usize,
    augment: Option<AugmentConfig>,
}

impl FlowerBatcher {
    /// 学習用（データ拡張あり）
    pub fn training(image_size: usize, augment: AugmentConfig) -> Self {
        Self {
            image_size,
            augment: Some(augment),
        }
    }

    /// テスト用（正規化のみ）
    pub fn test(image_size: usize) -> Self {
        Self {
            image_size,
            augment: None,
        }
    }
}

/// バッチデータ
#[derive(Clone, Debug)]
pub struct FlowerBatch<B: Backend> {
    pub images: Tensor<B, 4>,
    pub targets: Tensor<B, 1, Int>,
}

impl<B: Backend> Batcher<B, FlowerItem, FlowerBatch<B>> for FlowerBatcher {
    fn batch(&self, items: Vec<FlowerItem>, device: &B::Device) -> FlowerBatch<B> {
        let batch_size = items.len();
        let size = self.image_size;
        let mut all_pixels = Vec::with_capacity(batch_size * 3 * size * size);
        let mut targets_vec = Vec::with_capacity(batch_size);
        let mut rng = rand::thread_rng();

        for item in items {
            let pixels = match &self.augment {
                Some(augment) => normalize_pixels(&augment.augment(&item.image, &mut rng)),
                None => normalize_pixels(&item.image),
            };
            all_pixels.extend_from_slice(&pixels);
            targets_vec.push(item.label as i64);
        }

        let images = Tensor::<B, 1>::from_floats(all_pixels.as_slice(), device)
            .reshape([batch_size, 3, size, size]);
        let targets = Tensor::<B, 1, Int>::from_ints(targets_vec.as_slice(), device);

        FlowerBatch { images, targets }
    }
}

/// TrainStep実装 (学習時の順伝播 + 逆伝播)
impl<B: AutodiffBackend> TrainStep<FlowerBatch<B>, ClassificationOutput<B>> for FlowerClassifier<B> {
    fn step(&self, batch: FlowerBatch<B>) -> TrainOutput<ClassificationOutput<B>> {
        let item = self.forward_classification(batch.images, batch.targets);
        let grads = item.loss.backward();
        TrainOutput::new(self, grads, item)
    }
}

/// ValidStep実装 (検証時の順伝播のみ)
impl<B: Backend> ValidStep<FlowerBatch<B>, ClassificationOutput<B>> for FlowerClassifier<B> {
    fn step(&self, batch: FlowerBatch<B>) -> ClassificationOutput<B> {
        self.forward_classification(batch.images, batch.targets)
    }
}

/// モデル学習を実行
///
/// 毎エポック、学習データを1周したあとテストデータで損失と正解率を測ります。
/// 早期終了やチェックポイントはなく、最終エポック後のモデルを返します。
/// テストデータは評価でも使うため `Arc` で共有します。
pub fn train_model<B: AutodiffBackend>(
    config: &PipelineConfig,
    dataset_train: FlowerDataset,
    dataset_test: Arc<FlowerDataset>,
    device: B::Device,
) -> Result<FlowerClassifier<B::InnerBackend>> {
    use burn::{
        data::dataloader::DataLoaderBuilder,
        optim::RmsPropConfig,
        train::{
            metric::{AccuracyMetric, LossMetric},
            LearnerBuilder, LearningStrategy,
        },
    };

    dataset_train.ensure_num_classes(config.model.num_classes)?;
    dataset_test.ensure_num_classes(config.model.num_classes)?;

    println!("[Train] 学習データ: {} 枚", dataset_train.len());
    println!("[Train] 検証データ: {} 枚", dataset_test.len());

    let batcher_train = FlowerBatcher::training(config.image_size, config.augment.clone());
    let batcher_test = FlowerBatcher::test(config.image_size);

    // シードは実行ごとに変わる
    let dataloader_train = DataLoaderBuilder::<B, _, _>::new(batcher_train)
        .batch_size(config.batch_size)
        .shuffle(rand::random::<u64>())
        .num_workers(config.num_workers)
        .build(dataset_train);

    let dataloader_test = DataLoaderBuilder::<B::InnerBackend, _, _>::new(batcher_test)
        .batch_size(config.batch_size)
        .num_workers(config.num_workers)
        .build(dataset_test);

    let model = config.model.init::<B>(&device);

    // Learnerのメトリクスログ用（学習後に削除）
    let artifact_dir = std::env::temp_dir().join(format!("flower_classifier_{}", std::process::id()));
    std::fs::create_dir_all(&artifact_dir)?;
    let artifact_dir_str = artifact_dir.to_string_lossy().to_string();

    println!(
        "[Train] エポック数: {}, バッチサイズ: {}, 学習率: {}",
        config.num_epochs, config.batch_size, config.learning_rate
    );

    let learner = LearnerBuilder::new(&artifact_dir_str)
        .metric_train_numeric(AccuracyMetric::new())
        .metric_valid_numeric(AccuracyMetric::new())
        .metric_train_numeric(LossMetric::new())
        .metric_valid_numeric(LossMetric::new())
        .learning_strategy(LearningStrategy::SingleDevice(device.clone()))
        .num_epochs(config.num_epochs)
        .summary()
        .build(
            model,
            RmsPropConfig::new().with_alpha(0.9).with_epsilon(1e-7).init(),
            config.learning_rate,
        );

    let model_trained = learner.fit(dataloader_train, dataloader_test);
    println!("[Train] 学習完了 ({} エポック)", config.num_epochs);

    std::fs::remove_dir_all(&artifact_dir).ok();

    Ok(model_trained.model)
}

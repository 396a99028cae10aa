#![recursion_limit = "256"]

// 花画像分類パイプライン
//
// データ読み込み -> モデル構築 -> 学習 -> テストデータ評価 -> 単一画像推論
// を上から順に1回だけ実行します。

pub mod analyzer;
pub mod ml;
pub mod model;

use anyhow::Result;
use burn::backend::{Autodiff, Wgpu};
use burn::data::dataloader::DataLoaderBuilder;
use burn_wgpu::WgpuDevice;
use std::sync::Arc;

use analyzer::{render_heatmap, render_matrix, ClassificationReport, ConfusionMatrix};
use ml::{collect_predictions, run_single_image, train_model, FlowerBatcher, FlowerDataset, InferenceEngine};
use model::PipelineConfig;

type TrainBackend = Autodiff<Wgpu>;

pub fn run() -> Result<()> {
    let started_at = chrono::Local::now();
    println!("=== Flower Classifier ===");
    println!("開始: {}\n", started_at.to_rfc3339());

    let config = PipelineConfig::default();
    config.display();

    // 1. データ読み込み
    let dataset_train = FlowerDataset::from_directory(&config.training_dir, config.image_size)?;
    let dataset_test = Arc::new(FlowerDataset::from_directory(&config.test_dir, config.image_size)?);

    // 混同行列とレポートの軸は学習データのクラス順
    let class_index = dataset_train.class_index().clone();
    println!("[Data] クラスインデックス:");
    class_index.print_info();

    // 2-3. モデル構築と学習
    let device = WgpuDevice::default();
    println!("[Train] 使用デバイス: {:?}", device);
    let model = train_model::<TrainBackend>(&config, dataset_train, dataset_test.clone(), device.clone())?;

    // 4. テストデータ全体で評価
    let dataloader_test = DataLoaderBuilder::<Wgpu, _, _>::new(FlowerBatcher::test(config.image_size))
        .batch_size(config.batch_size)
        .num_workers(config.num_workers)
        .build(dataset_test);
    let (truth, predicted) = collect_predictions(&model, dataloader_test)?;

    let matrix = ConfusionMatrix::from_labels(config.model.num_classes, &truth, &predicted);
    let report = ClassificationReport::from_confusion(&matrix);

    println!("\n=== Confusion Matrix ===");
    println!("{}", render_matrix(&matrix));
    println!("\n=== Classification Report ===");
    println!("{}", report.render(class_index.names()));
    println!("Accuracy:  {:.4}", report.accuracy);
    println!("Precision: {:.4}", report.weighted_avg.precision);
    println!("Recall:    {:.4}", report.weighted_avg.recall);
    println!("F1 score:  {:.4}", report.weighted_avg.f1);
    println!("\n=== Heatmap ===");
    print!("{}", render_heatmap(&matrix, class_index.names()));

    // 5. 単一画像の推論
    println!("\n[Predict] {}", config.prediction_image.display());
    let engine = InferenceEngine::new(model, device);
    run_single_image(
        &engine,
        &config.prediction_image,
        config.image_size,
        &mut std::io::stdout().lock(),
    )?;

    let finished_at = chrono::Local::now();
    println!(
        "\n終了: {} (所要時間: {}秒)",
        finished_at.to_rfc3339(),
        (finished_at - started_at).num_seconds()
    );

    Ok(())
}

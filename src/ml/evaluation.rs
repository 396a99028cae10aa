//! テストデータ全体に対する予測の収集

use anyhow::Result;
use burn::{data::dataloader::DataLoader, tensor::backend::Backend};
use std::sync::Arc;

use crate::ml::training::FlowerBatch;
use crate::ml::FlowerClassifier;

/// 最大値のインデックス（同値の場合は小さいインデックス）
pub fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, value) in values.iter().enumerate().skip(1) {
        if *value > values[best] {
            best = i;
        }
    }
    best
}

/// 行ごとの確率ベクトルをクラスIDに変換
pub fn argmax_rows(probabilities: &[f32], num_classes: usize) -> Vec<usize> {
    if num_classes == 0 {
        return Vec::new();
    }
    probabilities.chunks(num_classes).map(argmax).collect()
}

/// テストデータを1周して (正解ラベル, 予測ラベル) を返す
///
/// データローダーの順序どおりに処理します。
pub fn collect_predictions<B: Backend>(
    model: &FlowerClassifier<B>,
    dataloader: Arc<dyn DataLoader<B, FlowerBatch<B>>>,
) -> Result<(Vec<usize>, Vec<usize>)> {
    let mut truth = Vec::new();
    let mut predicted = Vec::new();

    for batch in dataloader.iter() {
        let probabilities = model.forward_probabilities(batch.images);
        let [_, num_classes] = probabilities.dims();

        let values = probabilities
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| anyhow::anyhow!("推論結果の取得エラー: {:?}", e))?;
        let targets = batch
            .targets
            .into_data()
            .convert::<i64>()
            .to_vec::<i64>()
            .map_err(|e| anyhow::anyhow!("正解ラベルの取得エラー: {:?}", e))?;

        predicted.extend(argmax_rows(&values, num_classes));
        truth.extend(targets.into_iter().map(|t| t as usize));
    }

    println!("[Eval] {} 枚を評価しました", truth.len());
    Ok((truth, predicted))
}

//! 混同行列と分類レポート

use std::fmt::Write as _;

/// 混同行列（行 = 正解クラス、列 = 予測クラス）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfusionMatrix {
    counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    pub fn new(num_classes: usize) -> Self {
        Self {
            counts: vec![vec![0; num_classes]; num_classes],
        }
    }

    /// (正解, 予測) の組から作成
    ///
    /// 範囲外のラベルは数えません。
    pub fn from_labels(num_classes: usize, truth: &[usize], predicted: &[usize]) -> Self {
        let mut matrix = Self::new(num_classes);
        for (&t, &p) in truth.iter().zip(predicted.iter()) {
            if t < num_classes && p < num_classes {
                matrix.counts[t][p] += 1;
            }
        }
        matrix
    }

    /// 行列をそのまま作成（正方行列であること）
    pub fn from_counts(counts: Vec<Vec<usize>>) -> Self {
        let n = counts.len();
        assert!(counts.iter().all(|row| row.len() == n), "confusion matrix must be square");
        Self { counts }
    }

    pub fn num_classes(&self) -> usize {
        self.counts.len()
    }

    pub fn counts(&self) -> &[Vec<usize>] {
        &self.counts
    }

    pub fn get(&self, truth: usize, predicted: usize) -> usize {
        self.counts[truth][predicted]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    /// 対角成分の合計
    pub fn trace(&self) -> usize {
        (0..self.num_classes()).map(|i| self.counts[i][i]).sum()
    }

    /// 正解クラスごとの件数 (support)
    pub fn row_sum(&self, class: usize) -> usize {
        self.counts[class].iter().sum()
    }

    /// 予測クラスごとの件数
    pub fn column_sum(&self, class: usize) -> usize {
        self.counts.iter().map(|row| row[class]).sum()
    }

    pub fn max_count(&self) -> usize {
        self.counts.iter().flatten().copied().max().unwrap_or(0)
    }

    /// 正解率 = 対角和 / 総数（空の行列は 0.0）
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.trace() as f64 / total as f64
    }
}

/// クラスごとの指標
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// 分類レポート
///
/// 分母が0になる指標は 0.0 とします。
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    pub per_class: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

impl ClassificationReport {
    pub fn from_confusion(matrix: &ConfusionMatrix) -> Self {
        let n = matrix.num_classes();
        let per_class: Vec<ClassMetrics> = (0..n)
            .map(|c| {
                let tp = matrix.get(c, c) as f64;
                let support = matrix.row_sum(c);
                let precision = safe_div(tp, matrix.column_sum(c) as f64);
                let recall = safe_div(tp, support as f64);
                let f1 = safe_div(2.0 * precision * recall, precision + recall);
                ClassMetrics {
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect();

        let total = matrix.total();
        let macro_avg = ClassMetrics {
            precision: safe_div(per_class.iter().map(|m| m.precision).sum(), n as f64),
            recall: safe_div(per_class.iter().map(|m| m.recall).sum(), n as f64),
            f1: safe_div(per_class.iter().map(|m| m.f1).sum(), n as f64),
            support: total,
        };

        let weighted = |f: fn(&ClassMetrics) -> f64| {
            safe_div(
                per_class.iter().map(|m| f(m) * m.support as f64).sum(),
                total as f64,
            )
        };
        let weighted_avg = ClassMetrics {
            precision: weighted(|m| m.precision),
            recall: weighted(|m| m.recall),
            f1: weighted(|m| m.f1),
            support: total,
        };

        Self {
            per_class,
            accuracy: matrix.accuracy(),
            macro_avg,
            weighted_avg,
        }
    }

    /// レポートをテキストに整形
    pub fn render(&self, class_names: &[String]) -> String {
        let name_width = class_names
            .iter()
            .map(|n| n.len())
            .chain(["weighted avg".len()])
            .max()
            .unwrap_or(12);

        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:>w$} {:>9} {:>9} {:>9} {:>9}\n",
            "",
            "precision",
            "recall",
            "f1-score",
            "support",
            w = name_width
        );
        for (i, metrics) in self.per_class.iter().enumerate() {
            let fallback = i.to_string();
            let name = class_names.get(i).map(String::as_str).unwrap_or(&fallback);
            let _ = writeln!(
                out,
                "{:>w$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name,
                metrics.precision,
                metrics.recall,
                metrics.f1,
                metrics.support,
                w = name_width
            );
        }
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{:>w$} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy",
            "",
            "",
            self.accuracy,
            self.weighted_avg.support,
            w = name_width
        );
        for (label, metrics) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            let _ = writeln!(
                out,
                "{:>w$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                label,
                metrics.precision,
                metrics.recall,
                metrics.f1,
                metrics.support,
                w = name_width
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_two_class_hand_computed() {
        // 正解: 0 0 1 1 / 予測: 0 1 1 1
        let matrix = ConfusionMatrix::from_labels(2, &[0, 0, 1, 1], &[0, 1, 1, 1]);
        assert_eq!(matrix.counts(), &[vec![1, 1], vec![0, 2]]);
        assert_eq!(matrix.total(), 4);
        assert_eq!(matrix.trace(), 3);
        assert!(close(matrix.accuracy(), 0.75));

        let report = ClassificationReport::from_confusion(&matrix);
        assert!(close(report.per_class[0].precision, 1.0));
        assert!(close(report.per_class[0].recall, 0.5));
        assert!(close(report.per_class[0].f1, 2.0 / 3.0));
        assert!(close(report.per_class[1].precision, 2.0 / 3.0));
        assert!(close(report.per_class[1].recall, 1.0));
        assert!(close(report.per_class[1].f1, 0.8));
        assert_eq!(report.per_class[1].support, 2);

        assert!(close(report.weighted_avg.precision, (1.0 + 2.0 / 3.0) / 2.0));
        assert!(close(report.weighted_avg.recall, 0.75));
        assert!(close(report.weighted_avg.f1, (2.0 / 3.0 + 0.8) / 2.0));
        assert!(close(report.macro_avg.recall, 0.75));
    }

    #[test]
    fn test_accuracy_is_trace_over_total() {
        let matrix = ConfusionMatrix::from_counts(vec![
            vec![5, 1, 0],
            vec![2, 3, 4],
            vec![0, 0, 9],
        ]);
        assert!(close(matrix.accuracy(), 17.0 / 24.0));
    }

    #[test]
    fn test_degenerate_matrices() {
        let empty = ConfusionMatrix::new(3);
        assert_eq!(empty.accuracy(), 0.0);
        let report = ClassificationReport::from_confusion(&empty);
        assert!(report.per_class.iter().all(|m| m.precision == 0.0 && m.f1 == 0.0));
        assert_eq!(report.weighted_avg.precision, 0.0);

        // 1クラスのみ
        let single = ConfusionMatrix::from_counts(vec![vec![0, 0], vec![0, 6]]);
        assert_eq!(single.accuracy(), 1.0);
        let report = ClassificationReport::from_confusion(&single);
        assert_eq!(report.per_class[0].precision, 0.0);
        assert_eq!(report.per_class[1].f1, 1.0);
        assert_eq!(report.weighted_avg.f1, 1.0);
    }

    #[test]
    fn test_out_of_range_labels_ignored() {
        let matrix = ConfusionMatrix::from_labels(2, &[0, 5, 1], &[0, 0, 9]);
        assert_eq!(matrix.total(), 1);
    }

    #[test]
    fn test_render_contains_rows() {
        let matrix = ConfusionMatrix::from_labels(2, &[0, 1], &[0, 1]);
        let report = ClassificationReport::from_confusion(&matrix);
        let text = report.render(&["daisy".to_string(), "rose".to_string()]);
        assert!(text.contains("precision"));
        assert!(text.contains("daisy"));
        assert!(text.contains("weighted avg"));
        assert!(text.contains("1.00"));
    }
}

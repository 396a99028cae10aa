//! 端末表示（混同行列のヒートマップ、画像プレビュー）

use image::{imageops::FilterType, RgbImage};
use std::fmt::Write as _;

use crate::analyzer::metrics::ConfusionMatrix;

const RESET: &str = "\x1b[0m";

/// 混同行列をテキストで整形
pub fn render_matrix(matrix: &ConfusionMatrix) -> String {
    let width = matrix.max_count().to_string().len().max(1);
    let mut out = String::from("[");
    for (r, row) in matrix.counts().iter().enumerate() {
        if r > 0 {
            out.push_str("\n ");
        }
        out.push('[');
        let cells: Vec<String> = row.iter().map(|v| format!("{:>w$}", v, w = width)).collect();
        out.push_str(&cells.join(" "));
        out.push(']');
    }
    out.push(']');
    out
}

/// 白 -> 濃い青 のカラーマップ（t は 0.0 ～ 1.0）
fn blues(t: f64) -> (u8, u8, u8) {
    let t = t.clamp(0.0, 1.0);
    let lerp = |a: f64, b: f64| (a + (b - a) * t).round() as u8;
    (lerp(247.0, 8.0), lerp(251.0, 48.0), lerp(255.0, 107.0))
}

/// 数値入りのヒートマップ（ANSI 24bit カラー）
///
/// 行 = 正解クラス、列 = 予測クラス。色の濃さは 件数 / 最大件数。
pub fn render_heatmap(matrix: &ConfusionMatrix, class_names: &[String]) -> String {
    let n = matrix.num_classes();
    let label = |i: usize| -> String {
        class_names.get(i).cloned().unwrap_or_else(|| i.to_string())
    };

    let row_width = (0..n).map(|i| label(i).len()).max().unwrap_or(0).max("true\\pred".len());
    let cell_width = (0..n)
        .map(|i| label(i).len())
        .chain([matrix.max_count().to_string().len()])
        .max()
        .unwrap_or(1)
        + 2;
    let max = matrix.max_count().max(1) as f64;

    let mut out = String::new();
    let _ = write!(out, "{:>w$} ", "true\\pred", w = row_width);
    for c in 0..n {
        let _ = write!(out, "{:^w$}", label(c), w = cell_width);
    }
    out.push('\n');

    for r in 0..n {
        let _ = write!(out, "{:>w$} ", label(r), w = row_width);
        for c in 0..n {
            let count = matrix.get(r, c);
            let t = count as f64 / max;
            let (red, green, blue) = blues(t);
            // 濃い背景には白文字
            let fg = if t > 0.5 { "97" } else { "30" };
            let _ = write!(
                out,
                "\x1b[48;2;{};{};{}m\x1b[{}m{:^w$}{}",
                red,
                green,
                blue,
                fg,
                count,
                RESET,
                w = cell_width
            );
        }
        out.push('\n');
    }
    out
}

/// 画像を端末にプレビュー表示（上下2画素を "▀" 1文字で表現）
pub fn render_image_preview(img: &RgbImage, columns: u32) -> String {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 || columns == 0 {
        return String::new();
    }

    let columns = columns.min(width);
    let rows = ((height as f64 * columns as f64 / width as f64).round() as u32).max(2);
    let rows = rows + rows % 2;
    let small = image::imageops::resize(img, columns, rows, FilterType::Nearest);

    let mut out = String::new();
    for y in (0..rows).step_by(2) {
        for x in 0..columns {
            let top = small.get_pixel(x, y);
            let bottom = small.get_pixel(x, y + 1);
            let _ = write!(
                out,
                "\x1b[38;2;{};{};{}m\x1b[48;2;{};{};{}m▀",
                top[0], top[1], top[2], bottom[0], bottom[1], bottom[2]
            );
        }
        out.push_str(RESET);
        out.push('\n');
    }
    out
}

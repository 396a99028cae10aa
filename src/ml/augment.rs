//! 学習時のデータ拡張
//!
//! シアー・ズーム・左右反転をランダムに適用します。シードは固定しません。

use burn::config::Config;
use image::RgbImage;
use rand::Rng;

/// データ拡張の設定
#[derive(Config, Debug)]
pub struct AugmentConfig {
    /// シアー角の範囲（度）
    #[config(default = 0.2)]
    pub shear_range: f64,
    /// ズーム率の範囲: [1 - zoom_range, 1 + zoom_range]
    #[config(default = 0.2)]
    pub zoom_range: f64,
    /// 左右反転を行うか（確率0.5）
    #[config(default = true)]
    pub horizontal_flip: bool,
}

/// 1枚の画像に適用する変換パラメータ
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandomTransform {
    pub shear_deg: f64,
    /// 行方向のズーム
    pub zoom_row: f64,
    /// 列方向のズーム
    pub zoom_col: f64,
    pub flip: bool,
}

impl RandomTransform {
    pub fn identity() -> Self {
        Self {
            shear_deg: 0.0,
            zoom_row: 1.0,
            zoom_col: 1.0,
            flip: false,
        }
    }

    /// 画像に変換を適用
    ///
    /// 出力画素 (r, c) は中心まわりの逆アフィン変換で入力座標に写し、
    /// 最近傍の画素を取ります。範囲外は端の画素で埋めます。
    pub fn apply(&self, img: &RgbImage) -> RgbImage {
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return img.clone();
        }

        let shear = self.shear_deg.to_radians();
        // [[zr, -sin(s) * zc], [0, cos(s) * zc]]
        let m00 = self.zoom_row;
        let m01 = -shear.sin() * self.zoom_col;
        let m11 = shear.cos() * self.zoom_col;

        let center_r = (height as f64 - 1.0) / 2.0;
        let center_c = (width as f64 - 1.0) / 2.0;
        let max_r = height as i64 - 1;
        let max_c = width as i64 - 1;

        let mut out = RgbImage::new(width, height);
        for r in 0..height {
            for c in 0..width {
                let dr = r as f64 - center_r;
                let dc = c as f64 - center_c;
                let src_r = m00 * dr + m01 * dc + center_r;
                let src_c = m11 * dc + center_c;

                let src_r = (src_r.round() as i64).clamp(0, max_r) as u32;
                let src_c = (src_c.round() as i64).clamp(0, max_c) as u32;

                let dst_c = if self.flip { width - 1 - c } else { c };
                out.put_pixel(dst_c, r, *img.get_pixel(src_c, src_r));
            }
        }
        out
    }
}

impl AugmentConfig {
    /// 変換パラメータをランダムに決める
    pub fn sample<R: Rng>(&self, rng: &mut R) -> RandomTransform {
        let shear_deg = if self.shear_range > 0.0 {
            rng.gen_range(-self.shear_range..=self.shear_range)
        } else {
            0.0
        };
        let (zoom_row, zoom_col) = if self.zoom_range > 0.0 {
            let low = 1.0 - self.zoom_range;
            let high = 1.0 + self.zoom_range;
            (rng.gen_range(low..=high), rng.gen_range(low..=high))
        } else {
            (1.0, 1.0)
        };
        let flip = self.horizontal_flip && rng.gen_bool(0.5);

        RandomTransform {
            shear_deg,
            zoom_row,
            zoom_col,
            flip,
        }
    }

    /// ランダムな変換を1枚に適用
    pub fn augment<R: Rng>(&self, img: &RgbImage, rng: &mut R) -> RgbImage {
        self.sample(rng).apply(img)
    }
}

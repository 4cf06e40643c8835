// 该文件是 HemoScan （血色扫描） 项目的一部分。
// src/output/draw.rs - 估计结果可视化与记录
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use image::{ImageBuffer, Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_rect_mut},
  rect::Rect,
};
use serde_json::json;

use crate::{frame::AsRgbFrame, model::HbEstimate, roi::RoiRect};

const ROI_COLOR: [u8; 3] = [0, 255, 0]; // lime
const ANEMIC_COLOR: [u8; 3] = [255, 191, 0]; // 琥珀色
const OUTLINE_THICKNESS: u32 = 2;
const SWATCH_MIN_SIZE: u32 = 8;
const SWATCH_DIVISOR: u32 = 6;

pub struct Draw {
  roi_color: [u8; 3],
  anemic_color: [u8; 3],
  thickness: u32,
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      roi_color: ROI_COLOR,
      anemic_color: ANEMIC_COLOR,
      thickness: OUTLINE_THICKNESS,
    }
  }
}

impl Draw {
  /// 沿取色矩形的内侧描边，不会画到测量区域之外
  fn draw_roi(&self, image: &mut RgbImage, roi: &RoiRect) {
    if roi.is_empty() || !roi.fits_within(image.width(), image.height()) {
      return;
    }

    for t in 0..self.thickness {
      if 2 * t >= roi.width() || 2 * t >= roi.height() {
        break;
      }
      let rect = Rect::at((roi.left + t) as i32, (roi.top + t) as i32)
        .of_size(roi.width() - 2 * t, roi.height() - 2 * t);
      draw_hollow_rect_mut(image, rect, Rgb(self.roi_color));
    }
  }

  /// 左上角的均值颜色色块，边框颜色表示贫血状态
  fn draw_swatch(&self, image: &mut RgbImage, estimate: &HbEstimate) {
    let side = image.width().min(image.height());
    let size = (side / SWATCH_DIVISOR).max(SWATCH_MIN_SIZE).min(side);
    if size == 0 {
      return;
    }

    let border = if estimate.is_anemic() {
      self.anemic_color
    } else {
      self.roi_color
    };
    draw_filled_rect_mut(image, Rect::at(0, 0).of_size(size, size), Rgb(estimate.rgb));
    draw_hollow_rect_mut(image, Rect::at(0, 0).of_size(size, size), Rgb(border));
  }
}

pub trait DrawEstimateOnImage {
  fn draw_estimate_on_image(&self, image: &mut RgbImage, estimate: &HbEstimate);
}

impl DrawEstimateOnImage for Draw {
  fn draw_estimate_on_image(&self, image: &mut RgbImage, estimate: &HbEstimate) {
    self.draw_roi(image, &estimate.roi);
    self.draw_swatch(image, estimate);
  }
}

pub trait ToRgbImage {
  fn to_rgb_image(&self) -> RgbImage;
}

impl<F: AsRgbFrame> ToRgbImage for F {
  fn to_rgb_image(&self) -> RgbImage {
    ImageBuffer::from_fn(self.width(), self.height(), |x, y| Rgb(self.pixel(x, y)))
  }
}

pub trait DrawEstimateOnFrame<Frame> {
  fn draw_estimate(&self, frame: &Frame, estimate: &HbEstimate) -> RgbImage;
}

impl<Frame: ToRgbImage, D: DrawEstimateOnImage> DrawEstimateOnFrame<Frame> for D {
  fn draw_estimate(&self, frame: &Frame, estimate: &HbEstimate) -> RgbImage {
    let mut image = frame.to_rgb_image();
    self.draw_estimate_on_image(&mut image, estimate);
    image
  }
}

/// 把估计结果写成与图像同名的 JSON 文件
pub struct Record;

impl Record {
  pub fn to_json(&self, estimate: &HbEstimate) -> serde_json::Value {
    json!({
      "hb": estimate.hb,
      "delta": estimate.delta_from_reference(),
      "status": estimate.status().to_string(),
      "rgb": estimate.rgb,
      "feature": {
        "r": estimate.feature.r,
        "g": estimate.feature.g,
        "b": estimate.feature.b,
      },
      "roi": {
        "top": estimate.roi.top,
        "bottom": estimate.roi.bottom,
        "left": estimate.roi.left,
        "right": estimate.roi.right,
      },
    })
  }

  pub fn record(&self, estimate: &HbEstimate, path: &std::path::Path) -> Result<(), std::io::Error> {
    let bytes = serde_json::to_vec_pretty(&self.to_json(estimate))?;
    std::fs::write(path.with_extension("json"), bytes)?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{Model, frame::RgbFrame, model::HbEstimator};

  const SKIN: [u8; 3] = [200, 150, 140];

  fn estimate_for(frame: &RgbFrame) -> HbEstimate {
    HbEstimator::<RgbFrame>::default().infer(frame).unwrap()
  }

  #[test]
  fn outline_sits_on_the_measured_rectangle() {
    let frame = RgbFrame::from_fn(64, 48, |_, _| SKIN);
    let estimate = estimate_for(&frame);
    let roi = estimate.roi;
    let image = Draw::default().draw_estimate(&frame, &estimate);

    assert_eq!(image.get_pixel(roi.left, roi.top).0, ROI_COLOR);
    assert_eq!(image.get_pixel(roi.right - 1, roi.bottom - 1).0, ROI_COLOR);
    assert_eq!(image.get_pixel(roi.left + 1, roi.top + 1).0, ROI_COLOR);
    // 描边之外与矩形内部保持原样
    assert_eq!(image.get_pixel(roi.left - 1, roi.top - 1).0, SKIN);
    assert_eq!(image.get_pixel(roi.right, roi.bottom).0, SKIN);
    assert_eq!(image.get_pixel(roi.left + 2, roi.top + 2).0, SKIN);
  }

  #[test]
  fn swatch_shows_mean_color_and_status() {
    let frame = RgbFrame::from_fn(60, 60, |_, _| SKIN);
    let estimate = estimate_for(&frame);
    let image = Draw::default().draw_estimate(&frame, &estimate);

    assert_eq!(image.get_pixel(4, 4).0, estimate.rgb);
    let border = if estimate.is_anemic() { ANEMIC_COLOR } else { ROI_COLOR };
    assert_eq!(image.get_pixel(0, 0).0, border);
  }

  #[test]
  fn frame_converts_to_matching_rgb_image() {
    let frame = RgbFrame::from_fn(5, 3, |x, y| [x as u8 * 40, y as u8 * 60, 9]);
    let image = frame.to_rgb_image();
    assert_eq!(image.dimensions(), (5, 3));
    assert_eq!(image.get_pixel(4, 2).0, [160, 120, 9]);
    assert_eq!(image.as_raw().as_slice(), frame.as_rgb());
  }

  #[test]
  fn record_contains_estimate_fields() {
    let frame = RgbFrame::from_fn(16, 16, |_, _| [180, 140, 130]);
    let estimate = estimate_for(&frame);
    let value = Record.to_json(&estimate);

    assert_eq!(value["hb"], json!(12.4));
    assert_eq!(value["status"], json!("NORMAL"));
    assert_eq!(value["rgb"], json!([180, 140, 130]));
    assert_eq!(value["roi"]["top"], json!(4));
    assert_eq!(value["roi"]["right"], json!(12));
  }
}

// 该文件是 HemoScan （血色扫描） 项目的一部分。
// src/frame.rs - 规范 RGB 帧定义
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

//! 帧在进入流水线时统一转换为 RGB 交错（HWC）排列。
//! 通道顺序只在这里转换一次，之后的 ROI、特征、估计都只认 RGB。

use std::str::FromStr;

use image::{DynamicImage, RgbImage};

use crate::model::EstimateError;

const RGB_CHANNELS: usize = 3;

/// 原始像素数据的通道顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelOrder {
  #[default]
  Rgb,
  Bgr,
}

impl FromStr for PixelOrder {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "rgb" => Ok(PixelOrder::Rgb),
      "bgr" => Ok(PixelOrder::Bgr),
      other => Err(format!("未知的通道顺序: {}", other)),
    }
  }
}

/// 只读的 RGB 帧视图
pub trait AsRgbFrame {
  /// HWC 排列、RGB 顺序的像素数据
  fn as_rgb(&self) -> &[u8];
  fn width(&self) -> u32;
  fn height(&self) -> u32;

  fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
    let idx = (y as usize * self.width() as usize + x as usize) * RGB_CHANNELS;
    let data = self.as_rgb();
    [data[idx], data[idx + 1], data[idx + 2]]
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbFrame {
  data: Box<[u8]>,
  width: u32,
  height: u32,
}

impl RgbFrame {
  /// 从原始字节构建帧，`order` 描述数据源的通道顺序
  pub fn from_raw(
    mut data: Vec<u8>,
    width: u32,
    height: u32,
    order: PixelOrder,
  ) -> Result<Self, EstimateError> {
    if width == 0 || height == 0 {
      return Err(EstimateError::InvalidImage(format!(
        "图像尺寸无效: {}x{}",
        width, height
      )));
    }

    let expected = RGB_CHANNELS * width as usize * height as usize;
    if data.len() != expected {
      return Err(EstimateError::InvalidImage(format!(
        "数据长度不匹配: 期望长度 {}, 实际长度 {}",
        expected,
        data.len()
      )));
    }

    if order == PixelOrder::Bgr {
      for pixel in data.chunks_exact_mut(RGB_CHANNELS) {
        pixel.swap(0, 2);
      }
    }

    Ok(Self {
      data: data.into_boxed_slice(),
      width,
      height,
    })
  }

  /// 从编码后的图像字节（PNG、JPEG、BMP 等）解码
  pub fn decode(bytes: &[u8]) -> Result<Self, EstimateError> {
    Self::decode_with_order(bytes, PixelOrder::Rgb)
  }

  /// 解码后按 `order` 重新解释通道顺序，用于把 BGR 数据存成图像文件的来源
  pub fn decode_with_order(bytes: &[u8], order: PixelOrder) -> Result<Self, EstimateError> {
    let image = image::load_from_memory(bytes)
      .map_err(|e| EstimateError::InvalidImage(format!("无法解码图像: {}", e)))?
      .into_rgb8();
    let (width, height) = image.dimensions();
    Self::from_raw(image.into_raw(), width, height, order)
  }

  pub fn from_fn<F>(width: u32, height: u32, f: F) -> Self
  where
    F: Fn(u32, u32) -> [u8; 3],
  {
    let mut data = Vec::with_capacity(RGB_CHANNELS * width as usize * height as usize);
    for y in 0..height {
      for x in 0..width {
        data.extend_from_slice(&f(x, y));
      }
    }
    Self {
      data: data.into_boxed_slice(),
      width,
      height,
    }
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }
}

impl AsRgbFrame for RgbFrame {
  fn as_rgb(&self) -> &[u8] {
    &self.data
  }

  fn width(&self) -> u32 {
    self.width
  }

  fn height(&self) -> u32 {
    self.height
  }
}

impl From<RgbImage> for RgbFrame {
  fn from(image: RgbImage) -> Self {
    let (width, height) = image.dimensions();
    Self {
      data: image.into_raw().into_boxed_slice(),
      width,
      height,
    }
  }
}

impl From<DynamicImage> for RgbFrame {
  fn from(image: DynamicImage) -> Self {
    Self::from(image.to_rgb8())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  #[test]
  fn bgr_is_normalized_at_ingestion() {
    let bgr = vec![30, 20, 10, 60, 50, 40];
    let frame = RgbFrame::from_raw(bgr, 2, 1, PixelOrder::Bgr).unwrap();
    assert_eq!(frame.pixel(0, 0), [10, 20, 30]);
    assert_eq!(frame.pixel(1, 0), [40, 50, 60]);

    let rgb = vec![10, 20, 30, 40, 50, 60];
    let same = RgbFrame::from_raw(rgb, 2, 1, PixelOrder::Rgb).unwrap();
    assert_eq!(frame, same);
  }

  #[test]
  fn raw_length_mismatch_is_invalid_image() {
    let err = RgbFrame::from_raw(vec![0; 5], 2, 1, PixelOrder::Rgb).unwrap_err();
    assert!(matches!(err, EstimateError::InvalidImage(_)));
  }

  #[test]
  fn zero_sized_raw_frame_is_invalid_image() {
    let err = RgbFrame::from_raw(Vec::new(), 0, 4, PixelOrder::Rgb).unwrap_err();
    assert!(matches!(err, EstimateError::InvalidImage(_)));
  }

  #[test]
  fn garbage_bytes_fail_to_decode() {
    let err = RgbFrame::decode(b"definitely not an image").unwrap_err();
    assert!(matches!(err, EstimateError::InvalidImage(_)));
  }

  #[test]
  fn decoded_bgr_file_is_swapped() {
    let image = RgbImage::from_fn(4, 4, |_, _| Rgb([130, 140, 180]));
    let mut bytes = Vec::new();
    image
      .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
      .unwrap();

    let as_rgb = RgbFrame::decode(&bytes).unwrap();
    let as_bgr = RgbFrame::decode_with_order(&bytes, PixelOrder::Bgr).unwrap();
    assert_eq!(as_rgb.pixel(1, 1), [130, 140, 180]);
    assert_eq!(as_bgr.pixel(1, 1), [180, 140, 130]);
  }

  #[test]
  fn rgb_image_round_trips_through_frame() {
    let image = RgbImage::from_fn(3, 2, |x, y| Rgb([x as u8, y as u8, 7]));
    let frame = RgbFrame::from(image.clone());
    assert_eq!(frame.width(), 3);
    assert_eq!(frame.height(), 2);
    assert_eq!(frame.pixel(2, 1), [2, 1, 7]);
    assert_eq!(frame.as_rgb(), image.as_raw().as_slice());
  }

  #[test]
  fn pixel_order_parses_case_insensitively() {
    assert_eq!("BGR".parse::<PixelOrder>().unwrap(), PixelOrder::Bgr);
    assert_eq!("rgb".parse::<PixelOrder>().unwrap(), PixelOrder::Rgb);
    assert!("rgba".parse::<PixelOrder>().is_err());
  }
}

// 该文件是 HemoScan （血色扫描） 项目的一部分。
// src/feature.rs - 颜色特征提取
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

use crate::{frame::AsRgbFrame, model::EstimateError, roi::RoiRect};

/// ROI 内各通道的平均强度，取值 [0, 255]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorFeature {
  pub r: f64,
  pub g: f64,
  pub b: f64,
}

impl ColorFeature {
  pub const fn new(r: f64, g: f64, b: f64) -> Self {
    Self { r, g, b }
  }

  pub fn as_array(&self) -> [f64; 3] {
    [self.r, self.g, self.b]
  }

  /// 四舍五入到整数，用于展示
  pub fn to_display_rgb(&self) -> [u8; 3] {
    self.as_array().map(|c| c.round().clamp(0.0, 255.0) as u8)
  }
}

/// 计算 ROI 内的 RGB 均值
///
/// 按行优先顺序累加整数和，最后只做一次除法，相同输入得到逐位相同的结果。
pub fn reduce<F: AsRgbFrame>(frame: &F, roi: &RoiRect) -> Result<ColorFeature, EstimateError> {
  let (width, height) = (frame.width(), frame.height());

  if roi.is_empty() {
    return Err(EstimateError::InvalidImage("ROI 面积为零".to_string()));
  }
  if !roi.fits_within(width, height) {
    return Err(EstimateError::InvalidImage(format!(
      "ROI {:?} 超出图像范围 {}x{}",
      roi, width, height
    )));
  }

  let data = frame.as_rgb();
  let stride = width as usize * 3;
  if data.len() < stride * height as usize {
    return Err(EstimateError::InvalidImage(format!(
      "帧数据长度 {} 与尺寸 {}x{} 不符",
      data.len(),
      width,
      height
    )));
  }

  let mut sums = [0u64; 3];
  for y in roi.top as usize..roi.bottom as usize {
    let row = &data[y * stride + roi.left as usize * 3..y * stride + roi.right as usize * 3];
    for pixel in row.chunks_exact(3) {
      sums[0] += pixel[0] as u64;
      sums[1] += pixel[1] as u64;
      sums[2] += pixel[2] as u64;
    }
  }

  let count = roi.area() as f64;
  Ok(ColorFeature::new(
    sums[0] as f64 / count,
    sums[1] as f64 / count,
    sums[2] as f64 / count,
  ))
}

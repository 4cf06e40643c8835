// 该文件是 HemoScan （血色扫描） 项目的一部分。
// src/roi.rs - 感兴趣区域（ROI）提取
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

use thiserror::Error;

use crate::{frame::AsRgbFrame, model::EstimateError};

pub const DEFAULT_CROP_FRACTION: f64 = 0.5;

/// 半开区间矩形：行 `[top, bottom)`，列 `[left, right)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoiRect {
  pub top: u32,
  pub bottom: u32,
  pub left: u32,
  pub right: u32,
}

impl RoiRect {
  pub fn width(&self) -> u32 {
    self.right.saturating_sub(self.left)
  }

  pub fn height(&self) -> u32 {
    self.bottom.saturating_sub(self.top)
  }

  pub fn area(&self) -> u64 {
    self.width() as u64 * self.height() as u64
  }

  pub fn is_empty(&self) -> bool {
    self.area() == 0
  }

  pub fn fits_within(&self, width: u32, height: u32) -> bool {
    self.left <= self.right && self.top <= self.bottom && self.right <= width && self.bottom <= height
  }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RoiPolicyError {
  #[error("裁剪比例必须在 (0, 1] 区间内: {0}")]
  InvalidFraction(f64),
  #[error("未知的 ROI 策略: {0}")]
  UnknownPolicy(String),
}

/// ROI 选取策略。同一个策略同时用于取色和结果标注。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RoiPolicy {
  /// 取两个方向上居中的 `fraction` 部分
  CenterCrop { fraction: f64 },
  /// 取两个方向上的中间三分之一
  MiddleThird,
  /// 以 (w/2, 0.75h) 为中心、半边长 min(w, h)/8 的正方形，对应下眼睑的大致位置
  Offset,
}

impl Default for RoiPolicy {
  fn default() -> Self {
    RoiPolicy::CenterCrop {
      fraction: DEFAULT_CROP_FRACTION,
    }
  }
}

impl RoiPolicy {
  pub fn center_crop(fraction: f64) -> Result<Self, RoiPolicyError> {
    if !fraction.is_finite() || fraction <= 0.0 || fraction > 1.0 {
      return Err(RoiPolicyError::InvalidFraction(fraction));
    }
    Ok(RoiPolicy::CenterCrop { fraction })
  }

  /// 按名称构建策略：`center`、`third`、`offset`
  pub fn from_name(name: &str, fraction: Option<f64>) -> Result<Self, RoiPolicyError> {
    match name {
      "center" => Self::center_crop(fraction.unwrap_or(DEFAULT_CROP_FRACTION)),
      "third" => Ok(RoiPolicy::MiddleThird),
      "offset" => Ok(RoiPolicy::Offset),
      other => Err(RoiPolicyError::UnknownPolicy(other.to_string())),
    }
  }

  pub fn name(&self) -> &'static str {
    match self {
      RoiPolicy::CenterCrop { .. } => "center",
      RoiPolicy::MiddleThird => "third",
      RoiPolicy::Offset => "offset",
    }
  }

  pub fn extract_roi(&self, width: u32, height: u32) -> Result<RoiRect, EstimateError> {
    let rect = match *self {
      RoiPolicy::CenterCrop { fraction } => {
        let (top, bottom) = centered_span(height, fraction);
        let (left, right) = centered_span(width, fraction);
        RoiRect {
          top,
          bottom,
          left,
          right,
        }
      }
      RoiPolicy::MiddleThird => RoiRect {
        top: height / 3,
        bottom: (2 * height as u64 / 3) as u32,
        left: width / 3,
        right: (2 * width as u64 / 3) as u32,
      },
      RoiPolicy::Offset => {
        let center_x = width / 2;
        let center_y = (3 * height as u64 / 4) as u32;
        let half = width.min(height) / 8;
        RoiRect {
          top: center_y.saturating_sub(half),
          bottom: center_y.saturating_add(half).min(height),
          left: center_x.saturating_sub(half),
          right: center_x.saturating_add(half).min(width),
        }
      }
    };

    if rect.is_empty() {
      return Err(EstimateError::InvalidImage(format!(
        "图像尺寸 {}x{} 过小，{} 策略得到的 ROI 面积为零",
        width,
        height,
        self.name()
      )));
    }

    Ok(rect)
  }
}

fn centered_span(len: u32, fraction: f64) -> (u32, u32) {
  let len_f = len as f64;
  let start = (len_f * (1.0 - fraction) / 2.0).floor() as u32;
  let end = ((len_f * (1.0 + fraction) / 2.0).floor() as u32).min(len);
  (start.min(end), end)
}

/// 使用默认策略提取 ROI
pub fn extract_roi<F: AsRgbFrame>(frame: &F) -> Result<RoiRect, EstimateError> {
  RoiPolicy::default().extract_roi(frame.width(), frame.height())
}

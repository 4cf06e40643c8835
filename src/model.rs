// 该文件是 HemoScan （血色扫描） 项目的一部分。
// src/model.rs - 模型
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

use std::fmt;

use thiserror::Error;

use crate::{feature::ColorFeature, roi::RoiRect};

/// 低于该值（g/dL）视为贫血
pub const ANEMIA_THRESHOLD_G_DL: f64 = 12.0;
/// 展示差值时使用的参考 Hb（g/dL）
pub const REFERENCE_HB_G_DL: f64 = 13.5;

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EstimateError {
  #[error("无效图像: {0}")]
  InvalidImage(String),
  #[error("模型不可用: {0}")]
  ModelUnavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnemiaStatus {
  MildAnemia,
  Normal,
}

impl fmt::Display for AnemiaStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      AnemiaStatus::MildAnemia => write!(f, "MILD ANEMIA"),
      AnemiaStatus::Normal => write!(f, "NORMAL"),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HbEstimate {
  /// 保留一位小数的 Hb，g/dL
  pub hb: f64,
  /// 四舍五入后的 ROI 平均颜色
  pub rgb: [u8; 3],
  pub feature: ColorFeature,
  /// 实际取色的区域，标注时使用同一个矩形
  pub roi: RoiRect,
}

impl HbEstimate {
  pub fn status(&self) -> AnemiaStatus {
    if self.hb < ANEMIA_THRESHOLD_G_DL {
      AnemiaStatus::MildAnemia
    } else {
      AnemiaStatus::Normal
    }
  }

  pub fn is_anemic(&self) -> bool {
    self.status() == AnemiaStatus::MildAnemia
  }

  pub fn delta_from_reference(&self) -> f64 {
    round_to_tenth(self.hb - REFERENCE_HB_G_DL)
  }
}

impl fmt::Display for HbEstimate {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "Hb {:.1} g/dL ({:+.1}, {}), RGB({}, {}, {})",
      self.hb,
      self.delta_from_reference(),
      self.status(),
      self.rgb[0],
      self.rgb[1],
      self.rgb[2]
    )
  }
}

pub fn round_to_tenth(value: f64) -> f64 {
  (value * 10.0).round() / 10.0
}

mod fitter;
mod formula;
mod hb;
mod mlp;

pub use self::fitter::{
  DEFAULT_HIDDEN_LAYERS, FitConfig, ModelFitter, TRAINING_SAMPLES, TrainingSample,
};
pub use self::formula::LinearFormula;
pub use self::hb::{HbEstimator, HbEstimatorBuilder, HbModelBuilderError, HbStrategy};
pub use self::mlp::MlpRegressor;

#[cfg(test)]
mod tests {
  use super::*;

  fn estimate_with_hb(hb: f64) -> HbEstimate {
    HbEstimate {
      hb,
      rgb: [0, 0, 0],
      feature: ColorFeature::new(0.0, 0.0, 0.0),
      roi: RoiRect::default(),
    }
  }

  #[test]
  fn anemia_threshold_is_exclusive() {
    assert_eq!(estimate_with_hb(11.9).status(), AnemiaStatus::MildAnemia);
    assert_eq!(estimate_with_hb(12.0).status(), AnemiaStatus::Normal);
    assert!(estimate_with_hb(9.5).is_anemic());
  }

  #[test]
  fn delta_is_relative_to_reference() {
    assert_eq!(estimate_with_hb(12.4).delta_from_reference(), -1.1);
    assert_eq!(estimate_with_hb(14.0).delta_from_reference(), 0.5);
  }

  #[test]
  fn rounding_keeps_one_decimal() {
    assert_eq!(round_to_tenth(12.400000000000002), 12.4);
    assert_eq!(round_to_tenth(9.96), 10.0);
    assert_eq!(round_to_tenth(-0.04), -0.0);
  }

  #[test]
  fn display_shows_value_status_and_color() {
    let mut estimate = estimate_with_hb(12.4);
    estimate.rgb = [180, 140, 130];
    assert_eq!(
      estimate.to_string(),
      "Hb 12.4 g/dL (-1.1, NORMAL), RGB(180, 140, 130)"
    );
  }
}

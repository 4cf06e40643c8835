// 该文件是 HemoScan （血色扫描） 项目的一部分。
// src/model/fitter.rs - 回归模型训练与缓存
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

use std::sync::{Arc, Mutex, PoisonError};

use ndarray::{Array1, Array2};
use tracing::{debug, info};

use crate::model::{EstimateError, MlpRegressor, mlp};

pub const DEFAULT_HIDDEN_LAYERS: [usize; 2] = [64, 32];
const DEFAULT_MAX_ITER: usize = 2000;
const DEFAULT_LEARNING_RATE: f64 = 0.01;
const DEFAULT_ALPHA: f64 = 1e-4;
const DEFAULT_SEED: u64 = 42;
const DEFAULT_TOLERANCE: f64 = 1e-7;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingSample {
  pub rgb: [f64; 3],
  pub hb: f64,
}

impl TrainingSample {
  pub const fn new(rgb: [f64; 3], hb: f64) -> Self {
    Self { rgb, hb }
  }
}

/// 内置训练集：前四个为苍白（贫血），后四个为粉红（正常）
pub const TRAINING_SAMPLES: [TrainingSample; 8] = [
  TrainingSample::new([180.0, 140.0, 130.0], 9.5),
  TrainingSample::new([175.0, 135.0, 125.0], 10.2),
  TrainingSample::new([182.0, 142.0, 128.0], 9.8),
  TrainingSample::new([170.0, 130.0, 120.0], 11.0),
  TrainingSample::new([220.0, 170.0, 160.0], 14.2),
  TrainingSample::new([225.0, 175.0, 165.0], 15.1),
  TrainingSample::new([218.0, 168.0, 158.0], 13.8),
  TrainingSample::new([230.0, 180.0, 170.0], 14.5),
];

#[derive(Debug, Clone, PartialEq)]
pub struct FitConfig {
  pub hidden_layers: Vec<usize>,
  /// 迭代上限，只是收敛保护，不保证收敛
  pub max_iter: usize,
  pub learning_rate: f64,
  /// L2 正则系数
  pub alpha: f64,
  pub seed: u64,
  /// 训练误差低于该值时提前结束
  pub tolerance: f64,
}

impl Default for FitConfig {
  fn default() -> Self {
    Self {
      hidden_layers: DEFAULT_HIDDEN_LAYERS.to_vec(),
      max_iter: DEFAULT_MAX_ITER,
      learning_rate: DEFAULT_LEARNING_RATE,
      alpha: DEFAULT_ALPHA,
      seed: DEFAULT_SEED,
      tolerance: DEFAULT_TOLERANCE,
    }
  }
}

/// 在内置训练集上训练一次回归模型并缓存结果。
///
/// 第一次调用 [`ModelFitter::fit`] 时训练，之后返回同一个 `Arc`。
/// 训练失败不会被缓存。
#[derive(Debug)]
pub struct ModelFitter {
  config: FitConfig,
  samples: Vec<TrainingSample>,
  fitted: Mutex<Option<Arc<MlpRegressor>>>,
}

impl ModelFitter {
  pub fn new(config: FitConfig) -> Self {
    Self::with_samples(config, TRAINING_SAMPLES.to_vec())
  }

  pub(crate) fn with_samples(config: FitConfig, samples: Vec<TrainingSample>) -> Self {
    Self {
      config,
      samples,
      fitted: Mutex::new(None),
    }
  }

  pub fn config(&self) -> &FitConfig {
    &self.config
  }

  pub fn is_fitted(&self) -> bool {
    self
      .fitted
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .is_some()
  }

  pub fn fit(&self) -> Result<Arc<MlpRegressor>, EstimateError> {
    let mut fitted = self.fitted.lock().unwrap_or_else(PoisonError::into_inner);

    if let Some(model) = fitted.as_ref() {
      debug!("复用已训练的回归模型");
      return Ok(Arc::clone(model));
    }

    info!(
      "开始训练回归模型: {} 个样本, 种子 {}",
      self.samples.len(),
      self.config.seed
    );
    let x = Array2::from_shape_fn((self.samples.len(), 3), |(i, j)| self.samples[i].rgb[j]);
    let y = Array1::from_iter(self.samples.iter().map(|s| s.hb));
    let model = Arc::new(mlp::train(&x, &y, &self.config)?);

    *fitted = Some(Arc::clone(&model));
    Ok(model)
  }
}

impl Default for ModelFitter {
  fn default() -> Self {
    Self::new(FitConfig::default())
  }
}

// 该文件是 HemoScan （血色扫描） 项目的一部分。
// src/model/hb.rs - 血红蛋白估计器
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

use std::{str::FromStr, sync::Arc};

use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  feature::{ColorFeature, reduce},
  frame::{AsRgbFrame, RgbFrame},
  model::{
    EstimateError, FitConfig, HbEstimate, LinearFormula, Model, ModelFitter, round_to_tenth,
  },
  roi::{RoiPolicy, RoiPolicyError},
};

/// 颜色到 Hb 的映射策略，二者只能选其一
#[derive(Debug, Clone)]
pub enum HbStrategy {
  Formula(LinearFormula),
  Regression(Arc<ModelFitter>),
}

impl Default for HbStrategy {
  fn default() -> Self {
    HbStrategy::Formula(LinearFormula::default())
  }
}

impl HbStrategy {
  pub fn name(&self) -> &'static str {
    match self {
      HbStrategy::Formula(_) => "formula",
      HbStrategy::Regression(_) => "mlp",
    }
  }

  /// 未取整的 Hb 估计值，超出训练范围时不做截断
  pub fn estimate(&self, feature: &ColorFeature) -> Result<f64, EstimateError> {
    match self {
      HbStrategy::Formula(formula) => Ok(formula.estimate(feature)),
      HbStrategy::Regression(fitter) => Ok(fitter.fit()?.predict(feature)),
    }
  }
}

pub struct HbEstimator<Frame = RgbFrame> {
  roi_policy: RoiPolicy,
  strategy: HbStrategy,
  _phantom: std::marker::PhantomData<fn(&Frame)>,
}

impl<Frame> HbEstimator<Frame> {
  pub fn new(roi_policy: RoiPolicy, strategy: HbStrategy) -> Self {
    Self {
      roi_policy,
      strategy,
      _phantom: std::marker::PhantomData,
    }
  }

  pub fn roi_policy(&self) -> RoiPolicy {
    self.roi_policy
  }

  pub fn strategy(&self) -> &HbStrategy {
    &self.strategy
  }
}

impl<Frame> Default for HbEstimator<Frame> {
  fn default() -> Self {
    Self::new(RoiPolicy::default(), HbStrategy::default())
  }
}

impl<Frame> Clone for HbEstimator<Frame> {
  fn clone(&self) -> Self {
    Self::new(self.roi_policy, self.strategy.clone())
  }
}

impl<Frame> std::fmt::Debug for HbEstimator<Frame> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("HbEstimator")
      .field("roi_policy", &self.roi_policy)
      .field("strategy", &self.strategy)
      .finish()
  }
}

impl<Frame: AsRgbFrame> Model for HbEstimator<Frame> {
  type Input = Frame;
  type Output = HbEstimate;
  type Error = EstimateError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let roi = self
      .roi_policy
      .extract_roi(input.width(), input.height())?;
    debug!("ROI: {:?}", roi);

    let feature = reduce(input, &roi)?;
    debug!(
      "ROI 平均颜色: ({:.2}, {:.2}, {:.2})",
      feature.r, feature.g, feature.b
    );

    let hb = self.strategy.estimate(&feature)?;
    debug!("{} 策略估计 Hb: {:.4}", self.strategy.name(), hb);

    Ok(HbEstimate {
      hb: round_to_tenth(hb),
      rgb: feature.to_display_rgb(),
      feature,
      roi,
    })
  }
}

#[derive(Error, Debug)]
pub enum HbModelBuilderError {
  #[error("模型路径必须使用 {0} 方案")]
  SchemeMismatch(String),
  #[error("未知的估计策略: {0}")]
  UnknownStrategy(String),
  #[error("参数 {key} 的值无效: {value}")]
  InvalidParameter { key: String, value: String },
  #[error("ROI 配置错误: {0}")]
  Roi(#[from] RoiPolicyError),
  #[error("模型初始化失败: {0}")]
  Estimate(#[from] EstimateError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum StrategyKind {
  #[default]
  Formula,
  Regression,
}

/// 从 URL 构建估计器，例如：
///
/// - `hb://formula?roi=center&fraction=0.5`
/// - `hb://mlp?seed=42&max_iter=2000&hidden=64,32&roi=offset`
#[derive(Debug, Clone, Default)]
pub struct HbEstimatorBuilder {
  kind: StrategyKind,
  roi_policy: RoiPolicy,
  formula: LinearFormula,
  fit_config: FitConfig,
}

impl FromUrlWithScheme for HbEstimatorBuilder {
  const SCHEME: &'static str = "hb";
}

fn parse_param<T: FromStr>(key: &str, value: &str) -> Result<T, HbModelBuilderError> {
  value
    .parse()
    .map_err(|_| HbModelBuilderError::InvalidParameter {
      key: key.to_string(),
      value: value.to_string(),
    })
}

fn parse_layers(key: &str, value: &str) -> Result<Vec<usize>, HbModelBuilderError> {
  let layers = value
    .split(',')
    .map(|part| parse_param::<usize>(key, part.trim()))
    .collect::<Result<Vec<_>, _>>()?;
  if layers.iter().any(|&width| width == 0) {
    return Err(HbModelBuilderError::InvalidParameter {
      key: key.to_string(),
      value: value.to_string(),
    });
  }
  Ok(layers)
}

impl FromUrl for HbEstimatorBuilder {
  type Error = HbModelBuilderError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(HbModelBuilderError::SchemeMismatch(Self::SCHEME.to_string()));
    }

    let kind = match url.host_str().unwrap_or("formula") {
      "formula" | "" => StrategyKind::Formula,
      "mlp" | "regression" => StrategyKind::Regression,
      other => return Err(HbModelBuilderError::UnknownStrategy(other.to_string())),
    };

    let mut builder = HbEstimatorBuilder {
      kind,
      ..Default::default()
    };
    let mut roi_name = None;
    let mut fraction = None;

    for (key, value) in url.query_pairs() {
      match key.as_ref() {
        "roi" => roi_name = Some(value.to_string()),
        "fraction" => fraction = Some(parse_param(&key, &value)?),
        "seed" => builder.fit_config.seed = parse_param(&key, &value)?,
        "max_iter" => builder.fit_config.max_iter = parse_param(&key, &value)?,
        "lr" => builder.fit_config.learning_rate = parse_param(&key, &value)?,
        "alpha" => builder.fit_config.alpha = parse_param(&key, &value)?,
        "hidden" => builder.fit_config.hidden_layers = parse_layers(&key, &value)?,
        "base" => builder.formula.base = parse_param(&key, &value)?,
        "r0" => builder.formula.r0 = parse_param(&key, &value)?,
        "kr" => builder.formula.kr = parse_param(&key, &value)?,
        "g0" => builder.formula.g0 = parse_param(&key, &value)?,
        "kg" => builder.formula.kg = parse_param(&key, &value)?,
        other => warn!("忽略未知的模型参数: {}={}", other, value),
      }
    }

    if roi_name.is_some() || fraction.is_some() {
      builder.roi_policy = RoiPolicy::from_name(roi_name.as_deref().unwrap_or("center"), fraction)?;
    }

    Ok(builder)
  }
}

impl HbEstimatorBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn roi_policy(mut self, roi_policy: RoiPolicy) -> Self {
    self.roi_policy = roi_policy;
    self
  }

  pub fn formula(mut self, formula: LinearFormula) -> Self {
    self.kind = StrategyKind::Formula;
    self.formula = formula;
    self
  }

  pub fn regression(mut self, fit_config: FitConfig) -> Self {
    self.kind = StrategyKind::Regression;
    self.fit_config = fit_config;
    self
  }

  /// 构建估计器。回归策略在这里完成训练，训练失败时返回错误。
  pub fn build<Frame>(self) -> Result<HbEstimator<Frame>, HbModelBuilderError> {
    let strategy = match self.kind {
      StrategyKind::Formula => {
        info!("使用线性公式估计 Hb: {:?}", self.formula);
        HbStrategy::Formula(self.formula)
      }
      StrategyKind::Regression => {
        info!("使用回归模型估计 Hb: {:?}", self.fit_config);
        let fitter = Arc::new(ModelFitter::new(self.fit_config));
        let model = fitter.fit()?;
        info!(
          "回归模型就绪: 迭代 {} 次, 损失 {:.3e}",
          model.iterations(),
          model.final_loss()
        );
        HbStrategy::Regression(fitter)
      }
    };

    info!("ROI 策略: {:?}", self.roi_policy);
    Ok(HbEstimator::new(self.roi_policy, strategy))
  }
}

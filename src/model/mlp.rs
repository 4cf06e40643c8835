// 该文件是 HemoScan （血色扫描） 项目的一部分。
// src/model/mlp.rs - 小型多层感知机回归
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

//! 全连接回归网络：隐藏层 ReLU，输出层线性。
//!
//! 训练在 burn 的 `Autodiff<NdArray>` 后端上进行，全批量 Adam 优化平方误差加 L2 正则。
//! 输入和目标值都按训练集统计量做标准化，初始化使用固定种子的 Glorot 均匀分布，
//! 因此相同配置的训练结果完全一致。训练结束后权重导出为 `ndarray` 矩阵用于推理。

use burn::{
  backend::{Autodiff, NdArray},
  module::{Module, Param},
  nn::{Linear, LinearConfig, Relu},
  optim::{AdamConfig, GradientsParams, Optimizer},
  tensor::{ElementConversion, Tensor, TensorData, backend::Backend},
};
use ndarray::{Array1, Array2, Axis};
use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::{debug, info};

use crate::{
  feature::ColorFeature,
  model::{EstimateError, FitConfig},
};

type TrainBackend = Autodiff<NdArray<f64>>;

const ADAM_BETA1: f32 = 0.9;
const ADAM_BETA2: f32 = 0.999;
const ADAM_EPSILON: f32 = 1e-8;
const LOG_EVERY: usize = 500;

#[derive(Module, Debug)]
struct Network<B: Backend> {
  hidden: Vec<Linear<B>>,
  output: Linear<B>,
  activation: Relu,
}

impl<B: Backend> Network<B> {
  fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
    let x = self
      .hidden
      .iter()
      .fold(x, |x, layer| self.activation.forward(layer.forward(x)));
    self.output.forward(x)
  }

  /// 所有权重（不含偏置）的平方和
  fn weight_penalty(&self) -> Tensor<B, 1> {
    let square_sum = |layer: &Linear<B>| layer.weight.val().powf_scalar(2.0).sum();
    self
      .hidden
      .iter()
      .fold(square_sum(&self.output), |acc, layer| acc + square_sum(layer))
  }

  fn layers(&self) -> impl Iterator<Item = &Linear<B>> {
    self.hidden.iter().chain(std::iter::once(&self.output))
  }
}

/// Glorot 均匀初始化，权重和偏置都取自同一个带种子的随机数发生器
fn glorot_linear<B: Backend>(
  rng: &mut StdRng,
  fan_in: usize,
  fan_out: usize,
  device: &B::Device,
) -> Linear<B> {
  let limit = (6.0 / (fan_in + fan_out) as f64).sqrt();
  let weight: Vec<f64> = (0..fan_in * fan_out)
    .map(|_| rng.gen_range(-limit..limit))
    .collect();
  let bias: Vec<f64> = (0..fan_out).map(|_| rng.gen_range(-limit..limit)).collect();

  let mut linear = LinearConfig::new(fan_in, fan_out).init(device);
  linear.weight = Param::from_tensor(Tensor::from_data(
    TensorData::new(weight, [fan_in, fan_out]),
    device,
  ));
  linear.bias = Some(Param::from_tensor(Tensor::from_data(
    TensorData::new(bias, [fan_out]),
    device,
  )));
  linear
}

#[derive(Debug, Clone)]
struct DenseLayer {
  /// [输入维度, 输出维度]
  weights: Array2<f64>,
  bias: Array1<f64>,
}

impl DenseLayer {
  fn export<B: Backend>(linear: &Linear<B>) -> Result<Self, EstimateError> {
    let [fan_in, fan_out] = linear.weight.val().dims();
    let weights = linear
      .weight
      .val()
      .into_data()
      .to_vec::<f64>()
      .map_err(|e| unavailable(format!("无法导出权重: {:?}", e)))?;
    let weights = Array2::from_shape_vec((fan_in, fan_out), weights)
      .map_err(|e| unavailable(format!("权重形状错误: {}", e)))?;
    let bias = match linear.bias.as_ref() {
      Some(bias) => bias
        .val()
        .into_data()
        .to_vec::<f64>()
        .map(Array1::from_vec)
        .map_err(|e| unavailable(format!("无法导出偏置: {:?}", e)))?,
      None => Array1::zeros(fan_out),
    };
    Ok(Self { weights, bias })
  }
}

/// 按列标准化，方差为零的列缩放系数取 1
#[derive(Debug, Clone)]
struct Standardizer {
  mean: Array1<f64>,
  scale: Array1<f64>,
}

impl Standardizer {
  fn fit(x: &Array2<f64>) -> Option<Self> {
    let mean = x.mean_axis(Axis(0))?;
    let scale = x
      .std_axis(Axis(0), 0.0)
      .mapv(|s| if s > f64::EPSILON { s } else { 1.0 });
    Some(Self { mean, scale })
  }

  fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
    (x - &self.mean) / &self.scale
  }
}

#[derive(Debug, Clone)]
pub struct MlpRegressor {
  layers: Vec<DenseLayer>,
  input_scaler: Standardizer,
  target_mean: f64,
  target_scale: f64,
  final_loss: f64,
  iterations: usize,
}

impl MlpRegressor {
  pub fn predict(&self, feature: &ColorFeature) -> f64 {
    let values = feature.as_array();
    let x = Array2::from_shape_fn((1, values.len()), |(_, j)| values[j]);
    self.predict_batch(&x)[0]
  }

  /// 每行一个样本，列为 R、G、B
  pub fn predict_batch(&self, x: &Array2<f64>) -> Array1<f64> {
    let scaled = self.input_scaler.transform(x);
    let output = forward(&self.layers, &scaled);
    output.column(0).mapv(|v| v * self.target_scale + self.target_mean)
  }

  pub fn hidden_layers(&self) -> Vec<usize> {
    self
      .layers
      .iter()
      .take(self.layers.len().saturating_sub(1))
      .map(|layer| layer.bias.len())
      .collect()
  }

  /// 训练结束时标准化空间中的损失
  pub fn final_loss(&self) -> f64 {
    self.final_loss
  }

  pub fn iterations(&self) -> usize {
    self.iterations
  }
}

fn relu(x: f64) -> f64 {
  x.max(0.0)
}

fn forward(layers: &[DenseLayer], x: &Array2<f64>) -> Array2<f64> {
  let mut activation = x.to_owned();
  for (i, layer) in layers.iter().enumerate() {
    let mut z = activation.dot(&layer.weights) + &layer.bias;
    if i + 1 < layers.len() {
      z.mapv_inplace(relu);
    }
    activation = z;
  }
  activation
}

fn unavailable(msg: impl Into<String>) -> EstimateError {
  EstimateError::ModelUnavailable(msg.into())
}

fn to_tensor<B: Backend>(x: &Array2<f64>, device: &B::Device) -> Tensor<B, 2> {
  let shape = [x.nrows(), x.ncols()];
  Tensor::from_data(TensorData::new(x.iter().copied().collect::<Vec<_>>(), shape), device)
}

/// 训练回归网络，`x` 每行一个样本，`y` 为对应标签
pub(crate) fn train(
  x: &Array2<f64>,
  y: &Array1<f64>,
  config: &FitConfig,
) -> Result<MlpRegressor, EstimateError> {
  let n_samples = x.nrows();
  if n_samples == 0 {
    return Err(unavailable("训练集为空"));
  }
  if y.len() != n_samples {
    return Err(unavailable(format!(
      "样本数与标签数不一致: {} != {}",
      n_samples,
      y.len()
    )));
  }
  if x.ncols() == 0 {
    return Err(unavailable("样本特征维度为零"));
  }
  if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
    return Err(unavailable("训练数据包含非有限值"));
  }
  if config.hidden_layers.iter().any(|&width| width == 0) {
    return Err(unavailable(format!(
      "隐藏层宽度必须为正: {:?}",
      config.hidden_layers
    )));
  }
  if config.max_iter == 0 {
    return Err(unavailable("最大迭代次数必须为正"));
  }
  if !config.learning_rate.is_finite() || config.learning_rate <= 0.0 {
    return Err(unavailable(format!("学习率无效: {}", config.learning_rate)));
  }

  let input_scaler = Standardizer::fit(x).ok_or_else(|| unavailable("无法计算输入统计量"))?;
  let target_mean = y.mean().ok_or_else(|| unavailable("无法计算标签均值"))?;
  let target_scale = {
    let s = y.std(0.0);
    if s > f64::EPSILON { s } else { 1.0 }
  };

  let device = <TrainBackend as Backend>::Device::default();
  let xs = to_tensor::<TrainBackend>(&input_scaler.transform(x), &device);
  let ys = to_tensor::<TrainBackend>(
    &y.mapv(|v| (v - target_mean) / target_scale)
      .insert_axis(Axis(1)),
    &device,
  );

  let mut sizes = Vec::with_capacity(config.hidden_layers.len() + 2);
  sizes.push(x.ncols());
  sizes.extend_from_slice(&config.hidden_layers);
  sizes.push(1);

  let mut rng = StdRng::seed_from_u64(config.seed);
  let mut linears: Vec<Linear<TrainBackend>> = sizes
    .windows(2)
    .map(|pair| glorot_linear(&mut rng, pair[0], pair[1], &device))
    .collect();
  let output = linears
    .pop()
    .ok_or_else(|| unavailable("网络没有输出层"))?;
  let mut network = Network {
    hidden: linears,
    output,
    activation: Relu::new(),
  };

  let mut optimizer = AdamConfig::new()
    .with_beta_1(ADAM_BETA1)
    .with_beta_2(ADAM_BETA2)
    .with_epsilon(ADAM_EPSILON)
    .init();

  let n = n_samples as f64;
  let mut loss = f64::INFINITY;
  let mut iterations = 0;

  for t in 1..=config.max_iter {
    iterations = t;

    let prediction = network.forward(xs.clone());
    let data_loss = (prediction - ys.clone())
      .powf_scalar(2.0)
      .mean()
      .div_scalar(2.0);
    let penalty = network
      .weight_penalty()
      .mul_scalar(config.alpha / (2.0 * n));
    let total = data_loss.clone() + penalty;

    let data_value: f64 = data_loss.into_scalar().elem();
    loss = total.clone().into_scalar().elem();

    if !loss.is_finite() {
      return Err(unavailable(format!("第 {} 次迭代损失发散", t)));
    }
    if t % LOG_EVERY == 0 {
      debug!("第 {} 次迭代，损失 {:.6e}", t, loss);
    }
    if data_value < config.tolerance {
      debug!("第 {} 次迭代误差 {:.3e} 低于阈值，提前结束", t, data_value);
      break;
    }

    let grads = GradientsParams::from_grads(total.backward(), &network);
    network = optimizer.step(config.learning_rate, network, grads);
  }

  let layers = network
    .layers()
    .map(DenseLayer::export)
    .collect::<Result<Vec<_>, _>>()?;

  info!(
    "回归模型训练完成: 隐藏层 {:?}, 迭代 {} 次, 损失 {:.3e}",
    config.hidden_layers, iterations, loss
  );

  Ok(MlpRegressor {
    layers,
    input_scaler,
    target_mean,
    target_scale,
    final_loss: loss,
    iterations,
  })
}

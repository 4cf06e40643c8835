// 该文件是 HemoScan （血色扫描） 项目的一部分。
// src/lib.rs - 库主文件
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

//! # HemoScan
//!
//! 根据下眼睑结膜照片估计血红蛋白（Hb）浓度，并提供一个简单的贫血风险问卷评分。
//!
//! 处理流程：
//!
//! 1. 输入源给出规范 RGB 顺序的帧（[`frame::RgbFrame`]）
//! 2. [`roi::RoiPolicy`] 按固定比例选出感兴趣区域
//! 3. [`feature::reduce`] 计算区域内各通道的均值
//! 4. [`model::HbStrategy`] 将均值颜色映射为 Hb 估计值（线性公式或小型 MLP 回归）
//!
//! ```
//! use hemoscan::frame::RgbFrame;
//!
//! let frame = RgbFrame::from_fn(64, 64, |_, _| [180, 140, 130]);
//! let estimate = hemoscan::predict(&frame).unwrap();
//! assert_eq!(estimate.hb, 12.4);
//! assert_eq!(estimate.rgb, [180, 140, 130]);
//! ```
//!
//! 仅供筛查演示使用，不是医疗诊断设备。

pub mod feature;
pub mod frame;
pub mod input;
pub mod model;
pub mod output;
pub mod risk;
pub mod roi;
pub mod task;

pub use model::{EstimateError, HbEstimate, HbEstimator, Model};

pub trait FromUrl {
  type Error;
  fn from_url(url: &url::Url) -> Result<Self, Self::Error>
  where
    Self: Sized;
}

pub trait FromUrlWithScheme: FromUrl {
  const SCHEME: &'static str;
}

/// URL 路径解码后的文件系统路径，例如 `image:///tmp/my%20eye.png` 对应 `/tmp/my eye.png`
pub(crate) fn url_file_path(
  url: &url::Url,
) -> Result<std::path::PathBuf, std::string::FromUtf8Error> {
  let path = urlencoding::decode(url.path())?;
  Ok(std::path::PathBuf::from(path.into_owned()))
}

/// 使用默认配置（中心裁剪 + 线性公式）估计一帧图像的血红蛋白
pub fn predict<F: frame::AsRgbFrame>(frame: &F) -> Result<HbEstimate, EstimateError> {
  HbEstimator::<F>::default().infer(frame)
}

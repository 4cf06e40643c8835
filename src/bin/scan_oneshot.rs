// 该文件是 HemoScan （血色扫描） 项目的一部分。
// src/bin/scan_oneshot.rs - 单张图像的血红蛋白估计
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

use anyhow::Result;
use clap::Parser;
use url::Url;

use hemoscan::{
  FromUrl,
  model::{HbEstimator, HbEstimatorBuilder},
  task::{OneShotTask, Task},
};
use tracing::info;

/// HemoScan 单张图像估计
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 估计模型，例如 hb://formula 或 hb://mlp?seed=42
  #[arg(long, value_name = "MODEL", default_value = "hb://formula")]
  pub model: Url,
  /// 输入来源，例如 image:///path/to/eye.jpg
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径，例如 image:///path/to/out.png 或 log://
  #[arg(long, value_name = "OUTPUT", default_value = "log://")]
  pub output: Url,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("估计模型: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let input = hemoscan::input::InputWrapper::from_url(&args.input)?;
  let model: HbEstimator = HbEstimatorBuilder::from_url(&args.model)?.build()?;
  let output = hemoscan::output::OutputWrapper::from_url(&args.output)?;

  let summary = OneShotTask.run_task(input.into_frames(), model, output)?;
  if let Some(hb) = summary.mean_hb() {
    println!("{:.1}", hb);
  }

  Ok(())
}

// 该文件是 HemoScan （血色扫描） 项目的一部分。
// src/bin/risk_check.rs - 贫血风险问卷评分
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

use hemoscan::risk::{Gender, MeatIntake, RiskAnswers};
use tracing::info;

/// HemoScan 贫血风险问卷
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 年龄
  #[arg(long, default_value_t = 25, value_parser = clap::value_parser!(u32).range(16..=80))]
  pub age: u32,
  /// 性别: male / female
  #[arg(long, default_value = "male")]
  pub gender: Gender,
  /// 日常疲劳程度
  #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(0..=10))]
  pub fatigue: u8,
  /// 肉类摄入: never / weekly / daily
  #[arg(long, default_value = "weekly")]
  pub meat: MeatIntake,
  /// 经常头晕
  #[arg(long)]
  pub dizzy: bool,
  /// 皮肤或指甲苍白
  #[arg(long)]
  pub pale_skin: bool,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();
  let answers = RiskAnswers {
    age: args.age,
    gender: args.gender,
    fatigue: args.fatigue,
    meat_intake: args.meat,
    dizzy: args.dizzy,
    pale_skin: args.pale_skin,
  };
  info!("问卷答案: {:?}", answers);

  let assessment = answers.assess()?;
  println!("{}: {}%", assessment.level, assessment.score);
  println!("{}", assessment.level.advice());

  Ok(())
}

// 该文件是 HemoScan （血色扫描） 项目的一部分。
// src/model/formula.rs - 线性公式估计
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

use crate::feature::ColorFeature;

const FORMULA_BASE: f64 = 8.5;
const FORMULA_R0: f64 = 140.0;
const FORMULA_KR: f64 = 0.08;
const FORMULA_G0: f64 = 130.0;
const FORMULA_KG: f64 = 0.07;

/// `hb = base + (r - r0) * kr + (g - g0) * kg`，蓝色通道不参与计算
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFormula {
  pub base: f64,
  pub r0: f64,
  pub kr: f64,
  pub g0: f64,
  pub kg: f64,
}

impl Default for LinearFormula {
  fn default() -> Self {
    Self {
      base: FORMULA_BASE,
      r0: FORMULA_R0,
      kr: FORMULA_KR,
      g0: FORMULA_G0,
      kg: FORMULA_KG,
    }
  }
}

impl LinearFormula {
  pub fn estimate(&self, feature: &ColorFeature) -> f64 {
    self.base + (feature.r - self.r0) * self.kr + (feature.g - self.g0) * self.kg
  }
}

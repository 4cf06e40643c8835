// 该文件是 HemoScan （血色扫描） 项目的一部分。
// src/risk.rs - 贫血风险问卷
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

//! 固定权重的问卷评分，与图像估计相互独立。

use std::{fmt, ops::RangeInclusive, str::FromStr};

use thiserror::Error;

pub const AGE_RANGE: RangeInclusive<u32> = 16..=80;
pub const FATIGUE_RANGE: RangeInclusive<u8> = 0..=10;

const AGE_THRESHOLD: u32 = 50;
const FATIGUE_THRESHOLD: u8 = 6;

const AGE_POINTS: u32 = 15;
const FEMALE_POINTS: u32 = 20;
const FATIGUE_POINTS: u32 = 25;
const NO_MEAT_POINTS: u32 = 30;
const DIZZY_POINTS: u32 = 20;
const PALE_SKIN_POINTS: u32 = 15;

const MEDIUM_RISK_SCORE: u32 = 30;
const HIGH_RISK_SCORE: u32 = 60;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RiskParseError {
  #[error("未知的性别: {0}")]
  UnknownGender(String),
  #[error("未知的肉类摄入频率: {0}")]
  UnknownMeatIntake(String),
  #[error("年龄超出范围 16-80: {0}")]
  AgeOutOfRange(u32),
  #[error("疲劳程度超出范围 0-10: {0}")]
  FatigueOutOfRange(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gender {
  #[default]
  Male,
  Female,
}

impl FromStr for Gender {
  type Err = RiskParseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "male" | "m" => Ok(Gender::Male),
      "female" | "f" => Ok(Gender::Female),
      _ => Err(RiskParseError::UnknownGender(s.to_string())),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeatIntake {
  Never,
  /// 每周一到两次
  #[default]
  Weekly,
  Daily,
}

impl FromStr for MeatIntake {
  type Err = RiskParseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "never" => Ok(MeatIntake::Never),
      "weekly" | "1-2x/week" => Ok(MeatIntake::Weekly),
      "daily" => Ok(MeatIntake::Daily),
      _ => Err(RiskParseError::UnknownMeatIntake(s.to_string())),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskAnswers {
  pub age: u32,
  pub gender: Gender,
  /// 日常疲劳程度 0-10
  pub fatigue: u8,
  pub meat_intake: MeatIntake,
  pub dizzy: bool,
  pub pale_skin: bool,
}

impl Default for RiskAnswers {
  fn default() -> Self {
    Self {
      age: 25,
      gender: Gender::default(),
      fatigue: 3,
      meat_intake: MeatIntake::default(),
      dizzy: false,
      pale_skin: false,
    }
  }
}

impl RiskAnswers {
  pub fn validate(&self) -> Result<(), RiskParseError> {
    if !AGE_RANGE.contains(&self.age) {
      return Err(RiskParseError::AgeOutOfRange(self.age));
    }
    if !FATIGUE_RANGE.contains(&self.fatigue) {
      return Err(RiskParseError::FatigueOutOfRange(self.fatigue));
    }
    Ok(())
  }

  pub fn score(&self) -> u32 {
    let mut score = 0;
    if self.age > AGE_THRESHOLD {
      score += AGE_POINTS;
    }
    if self.gender == Gender::Female {
      score += FEMALE_POINTS;
    }
    if self.fatigue > FATIGUE_THRESHOLD {
      score += FATIGUE_POINTS;
    }
    if self.meat_intake == MeatIntake::Never {
      score += NO_MEAT_POINTS;
    }
    if self.dizzy {
      score += DIZZY_POINTS;
    }
    if self.pale_skin {
      score += PALE_SKIN_POINTS;
    }
    score
  }

  pub fn assess(&self) -> Result<RiskAssessment, RiskParseError> {
    self.validate()?;
    let score = self.score();
    Ok(RiskAssessment {
      score,
      level: RiskLevel::from_score(score),
    })
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RiskLevel {
  Low,
  Medium,
  High,
}

impl RiskLevel {
  pub fn from_score(score: u32) -> Self {
    if score < MEDIUM_RISK_SCORE {
      RiskLevel::Low
    } else if score < HIGH_RISK_SCORE {
      RiskLevel::Medium
    } else {
      RiskLevel::High
    }
  }

  pub fn advice(&self) -> &'static str {
    match self {
      RiskLevel::Low => "风险较低，保持均衡饮食",
      RiskLevel::Medium => "中等风险，注意补充含铁食物",
      RiskLevel::High => "高风险，请尽快就医检查",
    }
  }
}

impl fmt::Display for RiskLevel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RiskLevel::Low => write!(f, "LOW RISK"),
      RiskLevel::Medium => write!(f, "MEDIUM RISK"),
      RiskLevel::High => write!(f, "HIGH RISK"),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskAssessment {
  pub score: u32,
  pub level: RiskLevel,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn every_answer_adds_its_points() {
    let answers = RiskAnswers {
      age: 55,
      gender: Gender::Female,
      fatigue: 7,
      meat_intake: MeatIntake::Never,
      dizzy: true,
      pale_skin: true,
    };
    let assessment = answers.assess().unwrap();
    assert_eq!(assessment.score, 125);
    assert_eq!(assessment.level, RiskLevel::High);
  }

  #[test]
  fn thresholds_are_strict() {
    let answers = RiskAnswers {
      age: 50,
      fatigue: 6,
      ..Default::default()
    };
    assert_eq!(answers.score(), 0);
    assert_eq!(answers.assess().unwrap().level, RiskLevel::Low);
  }

  #[test]
  fn levels_split_at_30_and_60() {
    assert_eq!(RiskLevel::from_score(29), RiskLevel::Low);
    assert_eq!(RiskLevel::from_score(30), RiskLevel::Medium);
    assert_eq!(RiskLevel::from_score(59), RiskLevel::Medium);
    assert_eq!(RiskLevel::from_score(60), RiskLevel::High);
  }

  #[test]
  fn no_meat_alone_is_medium() {
    let answers = RiskAnswers {
      meat_intake: MeatIntake::Never,
      ..Default::default()
    };
    let assessment = answers.assess().unwrap();
    assert_eq!(assessment.score, 30);
    assert_eq!(assessment.level, RiskLevel::Medium);
    assert_eq!(assessment.level.to_string(), "MEDIUM RISK");
  }

  #[test]
  fn out_of_range_answers_are_rejected() {
    let young = RiskAnswers {
      age: 12,
      ..Default::default()
    };
    assert_eq!(young.assess(), Err(RiskParseError::AgeOutOfRange(12)));

    let tired = RiskAnswers {
      fatigue: 11,
      ..Default::default()
    };
    assert_eq!(tired.assess(), Err(RiskParseError::FatigueOutOfRange(11)));
  }

  #[test]
  fn parses_answer_labels() {
    assert_eq!("Female".parse::<Gender>().unwrap(), Gender::Female);
    assert_eq!("1-2x/week".parse::<MeatIntake>().unwrap(), MeatIntake::Weekly);
    assert_eq!("DAILY".parse::<MeatIntake>().unwrap(), MeatIntake::Daily);
    assert!("sometimes".parse::<MeatIntake>().is_err());
  }
}

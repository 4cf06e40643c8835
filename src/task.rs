// 该文件是 HemoScan （血色扫描） 项目的一部分。
// src/task.rs - 任务
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

use std::{thread, time::Duration};
use tracing::{info, warn};

use crate::{
  model::{EstimateError, HbEstimate, Model},
  output::Render,
};

const DEFAULT_REPEAT_TIMES: usize = 1000;
const WARMUP_TIMES: usize = 2;
const FORCED_EXIT_DELAY: Duration = Duration::from_secs(30);

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<TaskSummary, Self::Error>;
}

/// 一次任务的统计
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TaskSummary {
  /// 从输入取到的帧数
  pub frames: usize,
  pub estimated: usize,
  /// 因图像无效而跳过的帧数
  pub rejected: usize,
  pub anemic: usize,
  hb_sum: f64,
}

impl TaskSummary {
  fn accept(&mut self, estimate: &HbEstimate) {
    self.estimated += 1;
    self.hb_sum += estimate.hb;
    if estimate.is_anemic() {
      self.anemic += 1;
    }
  }

  pub fn mean_hb(&self) -> Option<f64> {
    (self.estimated > 0).then(|| self.hb_sum / self.estimated as f64)
  }
}

pub struct OneShotTask;

impl<
  F,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = HbEstimate, Error = EstimateError>,
  O: Render<F, HbEstimate, Error = RE>,
> Task<I, M, O> for OneShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<TaskSummary, Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始估计...");
    let now = std::time::Instant::now();
    let result = model.infer(&frame)?;
    let elapsed = now.elapsed();
    info!("估计完成，耗时: {:.2?}，{}", elapsed, result);
    output.render_result(&frame, &result)?;
    info!("渲染完成，耗时: {:.2?}", now.elapsed());

    let mut summary = TaskSummary {
      frames: 1,
      ..Default::default()
    };
    summary.accept(&result);
    Ok(summary)
  }
}

/// 对同一帧重复估计，统计耗时并检查结果是否一致
#[derive(Debug)]
pub struct RepeatShotTask {
  repeat_times: usize,
}

impl Default for RepeatShotTask {
  fn default() -> Self {
    Self {
      repeat_times: DEFAULT_REPEAT_TIMES,
    }
  }
}

impl RepeatShotTask {
  pub fn with_repeat_times(mut self, repeat_times: usize) -> Self {
    self.repeat_times = repeat_times.max(1);
    self
  }
}

impl<
  F,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = HbEstimate, Error = EstimateError>,
  O: Render<F, HbEstimate, Error = RE>,
> Task<I, M, O> for RepeatShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<TaskSummary, Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始估计...");

    let mut times = Vec::with_capacity(self.repeat_times);
    let mut first: Option<HbEstimate> = None;
    for i in 0..self.repeat_times {
      let now = std::time::Instant::now();
      let result = model.infer(&frame)?;
      let elapsed = now.elapsed();
      info!("({})估计完成，耗时: {:.2?}", i, elapsed);
      times.push(elapsed);

      match &first {
        Some(expected) if expected.hb.to_bits() != result.hb.to_bits() || expected.rgb != result.rgb => {
          anyhow::bail!("第 {} 次估计结果不一致: {} / {}", i, expected, result);
        }
        Some(_) => {}
        None => first = Some(result),
      }
    }

    let skip = if times.len() > WARMUP_TIMES { WARMUP_TIMES } else { 0 };
    warn!(
      "平均估计时间: {:.2?}",
      times.iter().skip(skip).sum::<Duration>() / (times.len() - skip) as u32
    );

    let result = first.ok_or_else(|| anyhow::anyhow!("没有估计结果"))?;
    output.render_result(&frame, &result)?;

    let mut summary = TaskSummary {
      frames: 1,
      ..Default::default()
    };
    summary.accept(&result);
    Ok(summary)
  }
}

#[derive(Default, Debug)]
pub struct ContinuousTask {
  frame_number: Option<usize>,
  interrupt_handler: bool,
}

impl ContinuousTask {
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }

  /// 安装 Ctrl-C 处理器，在两帧之间停止。每个进程只能安装一次。
  pub fn with_interrupt_handler(mut self, enabled: bool) -> Self {
    self.interrupt_handler = enabled;
    self
  }
}

impl<
  F,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = HbEstimate, Error = EstimateError>,
  O: Render<F, HbEstimate, Error = RE>,
> Task<I, M, O> for ContinuousTask
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, model: M, output: O) -> Result<TaskSummary, Self::Error> {
    info!("开始任务...");
    let (tx, rx) = std::sync::mpsc::channel();

    if self.interrupt_handler {
      ctrlc::set_handler(move || {
        info!("收到中断信号，准备退出...");
        let _ = tx.send(());
        thread::spawn(|| {
          thread::sleep(FORCED_EXIT_DELAY);
          warn!("强制退出程序");
          std::process::exit(1);
        });
      })?;
    }

    let mut summary = TaskSummary::default();
    let mut now = std::time::Instant::now();
    for frame in input {
      summary.frames += 1;
      info!("处理第 {} 帧图像", summary.frames);
      match model.infer(&frame) {
        Ok(result) => {
          let elapsed_a = now.elapsed();
          output.render_result(&frame, &result)?;
          let elapsed_b = now.elapsed();
          info!(
            "估计完成，耗时: {:.2?} / {:.2?}，{}",
            elapsed_a, elapsed_b, result
          );
          summary.accept(&result);
        }
        Err(EstimateError::InvalidImage(reason)) => {
          warn!("第 {} 帧图像无效，跳过: {}", summary.frames, reason);
          summary.rejected += 1;
        }
        Err(e) => return Err(e.into()),
      }
      now = std::time::Instant::now();

      if self.frame_number.is_some_and(|n| summary.frames >= n) {
        info!("达到指定帧数 {}, 退出任务循环", summary.frames);
        break;
      }
      if rx.try_recv().is_ok() {
        warn!("中断信号接收，退出任务循环");
        break;
      }
    }

    match summary.mean_hb() {
      Some(mean) => info!(
        "任务完成: {} 帧, 估计 {} 帧, 跳过 {} 帧, 贫血 {} 帧, 平均 Hb {:.1} g/dL",
        summary.frames, summary.estimated, summary.rejected, summary.anemic, mean
      ),
      None => warn!("任务完成: {} 帧, 没有有效的估计结果", summary.frames),
    }
    Ok(summary)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    frame::RgbFrame,
    model::HbEstimator,
    output::{LogOutput, Render},
  };
  use std::{cell::RefCell, convert::Infallible};

  #[derive(Default)]
  struct Collect {
    results: RefCell<Vec<HbEstimate>>,
  }

  impl Render<RgbFrame, HbEstimate> for &Collect {
    type Error = Infallible;

    fn render_result(&self, _frame: &RgbFrame, result: &HbEstimate) -> Result<(), Self::Error> {
      self.results.borrow_mut().push(*result);
      Ok(())
    }
  }

  struct Unavailable;

  impl Model for Unavailable {
    type Input = RgbFrame;
    type Output = HbEstimate;
    type Error = EstimateError;

    fn infer(&self, _input: &RgbFrame) -> Result<HbEstimate, EstimateError> {
      Err(EstimateError::ModelUnavailable("测试".to_string()))
    }
  }

  fn uniform(size: u32, color: [u8; 3]) -> RgbFrame {
    RgbFrame::from_fn(size, size, |_, _| color)
  }

  #[test]
  fn one_shot_uses_first_frame() {
    let collect = Collect::default();
    let frames = vec![uniform(16, [180, 140, 130]), uniform(16, [220, 170, 160])];
    let summary = OneShotTask
      .run_task(frames.into_iter(), HbEstimator::<RgbFrame>::default(), &collect)
      .unwrap();
    assert_eq!(summary.frames, 1);
    assert_eq!(summary.mean_hb(), Some(12.4));
    assert_eq!(collect.results.borrow().len(), 1);
  }

  #[test]
  fn one_shot_without_frames_fails() {
    let frames: Vec<RgbFrame> = Vec::new();
    let result = OneShotTask.run_task(
      frames.into_iter(),
      HbEstimator::<RgbFrame>::default(),
      LogOutput,
    );
    assert!(result.is_err());
  }

  #[test]
  fn repeat_shot_renders_once() {
    let collect = Collect::default();
    let summary = RepeatShotTask::default()
      .with_repeat_times(5)
      .run_task(
        std::iter::once(uniform(20, [200, 150, 140])),
        HbEstimator::<RgbFrame>::default(),
        &collect,
      )
      .unwrap();
    assert_eq!(summary.estimated, 1);
    assert_eq!(collect.results.borrow().len(), 1);
  }

  #[test]
  fn continuous_skips_invalid_frames() {
    let collect = Collect::default();
    let frames = vec![
      uniform(16, [150, 120, 110]),
      uniform(1, [200, 150, 140]),
      uniform(16, [220, 170, 160]),
    ];
    let summary = ContinuousTask::default()
      .run_task(frames.into_iter(), HbEstimator::<RgbFrame>::default(), &collect)
      .unwrap();
    assert_eq!(summary.frames, 3);
    assert_eq!(summary.estimated, 2);
    assert_eq!(summary.rejected, 1);
    assert_eq!(summary.anemic, 1);
    assert_eq!(collect.results.borrow().len(), 2);
  }

  #[test]
  fn continuous_respects_frame_number() {
    let collect = Collect::default();
    let frames = (0..10).map(|_| uniform(16, [180, 140, 130]));
    let summary = ContinuousTask::default()
      .with_frame_number(Some(3))
      .run_task(frames, HbEstimator::<RgbFrame>::default(), &collect)
      .unwrap();
    assert_eq!(summary.frames, 3);
    assert_eq!(collect.results.borrow().len(), 3);
  }

  #[test]
  fn continuous_aborts_when_model_is_unavailable() {
    let collect = Collect::default();
    let frames = vec![uniform(16, [180, 140, 130]), uniform(16, [180, 140, 130])];
    let result = ContinuousTask::default().run_task(frames.into_iter(), Unavailable, &collect);
    assert!(result.is_err());
    assert!(collect.results.borrow().is_empty());
  }
}

// 该文件是 HemoScan （血色扫描） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{Datelike, Utc};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::AsRgbFrame,
  model::HbEstimate,
  output::{
    Render,
    draw::{Draw, DrawEstimateOnFrame, Record, ToRgbImage},
  },
  url_file_path,
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("路径无效: {0}")]
  InvalidPath(String),
  #[error("未知的筛选条件: {0}")]
  UnknownFilter(String),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 标注图像，或者保存原图；两者都附带 JSON 记录
pub enum DrawWrapper {
  Draw(Box<Draw>),
  Raw,
}

impl DrawWrapper {
  pub fn save_result<F: AsRgbFrame>(
    &self,
    path: &Path,
    frame: &F,
    result: &HbEstimate,
  ) -> Result<(), DirectoryRecordOutputError> {
    match self {
      DrawWrapper::Draw(draw) => {
        draw.draw_estimate(frame, result).save(path)?;
      }
      DrawWrapper::Raw => {
        frame.to_rgb_image().save(path)?;
      }
    };
    Record.record(result, path)?;

    Ok(())
  }

  pub fn with(record: bool) -> Self {
    if record {
      DrawWrapper::Raw
    } else {
      DrawWrapper::Draw(Box::default())
    }
  }
}

pub struct DirectoryRecordOutput {
  directory: PathBuf,
  draw: DrawWrapper,
  frame_counters: Arc<Mutex<u16>>,
  only_anemic: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch(
        uri.scheme().to_string(),
      ));
    }

    let record = uri.query_pairs().any(|(k, _)| k == "record");
    let only_anemic = match uri.query_pairs().find(|(k, _)| k == "only") {
      Some((_, v)) if v == "anemic" => true,
      Some((_, v)) => return Err(DirectoryRecordOutputError::UnknownFilter(v.to_string())),
      None => false,
    };

    let directory =
      url_file_path(uri).map_err(|e| DirectoryRecordOutputError::InvalidPath(e.to_string()))?;
    info!(
      "记录目录: {} (原图: {}, 仅贫血: {})",
      directory.display(),
      record,
      only_anemic
    );

    Ok(DirectoryRecordOutput {
      directory,
      draw: DrawWrapper::with(record),
      frame_counters: Arc::new(Mutex::new(0)),
      only_anemic,
    })
  }
}

impl DirectoryRecordOutput {
  fn frame_id(&self) -> u16 {
    let mut counter = self
      .frame_counters
      .lock()
      .unwrap_or_else(PoisonError::into_inner);
    let id = counter.wrapping_add(1);
    *counter = id;
    id
  }

  fn frame_path(&self) -> Result<PathBuf, DirectoryRecordOutputError> {
    let now = Utc::now();
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    std::fs::create_dir_all(&directory)?;

    Ok(directory.join(format!(
      "{}-{:04X}.png",
      now.format("%H-%M-%S"),
      self.frame_id()
    )))
  }
}

impl<Frame: AsRgbFrame> Render<Frame, HbEstimate> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &Frame, result: &HbEstimate) -> Result<(), Self::Error> {
    if self.only_anemic && !result.is_anemic() {
      debug!("结果正常，跳过记录: {}", result);
      return Ok(());
    }

    let path = self.frame_path()?;
    self.draw.save_result(&path, frame, result)?;
    info!("记录结果到: {}", path.display());
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{Model, frame::RgbFrame, model::HbEstimator};

  fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
      "hemoscan-directory-record-{}-{}",
      name,
      std::process::id()
    ))
  }

  fn files_with_extension(root: &Path, ext: &str) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
      for entry in std::fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
          pending.push(path);
        } else if path.extension().is_some_and(|e| e == ext) {
          found.push(path);
        }
      }
    }
    found.sort();
    found
  }

  fn render_two(url: &str) {
    let output = DirectoryRecordOutput::from_url(&url::Url::parse(url).unwrap()).unwrap();
    let estimator = HbEstimator::<RgbFrame>::default();
    let pale = RgbFrame::from_fn(32, 32, |_, _| [150, 120, 110]);
    let pink = RgbFrame::from_fn(32, 32, |_, _| [220, 170, 160]);
    for frame in [pale, pink] {
      let estimate = estimator.infer(&frame).unwrap();
      output.render_result(&frame, &estimate).unwrap();
    }
  }

  #[test]
  fn writes_image_and_json_per_frame() {
    let dir = temp_dir("all");
    render_two(&format!("folder://{}", dir.display()));

    let images = files_with_extension(&dir, "png");
    let records = files_with_extension(&dir, "json");
    assert_eq!(images.len(), 2);
    assert_eq!(records.len(), 2);
    for image in &images {
      assert!(image.with_extension("json").exists());
    }

    let first: serde_json::Value =
      serde_json::from_slice(&std::fs::read(&records[0]).unwrap()).unwrap();
    assert!(first["hb"].is_f64());

    std::fs::remove_dir_all(dir).unwrap();
  }

  #[test]
  fn only_anemic_skips_normal_results() {
    let dir = temp_dir("anemic");
    render_two(&format!("folder://{}?only=anemic&record", dir.display()));

    let records = files_with_extension(&dir, "json");
    assert_eq!(records.len(), 1);
    let value: serde_json::Value =
      serde_json::from_slice(&std::fs::read(&records[0]).unwrap()).unwrap();
    assert_eq!(value["status"], serde_json::json!("MILD ANEMIA"));

    std::fs::remove_dir_all(dir).unwrap();
  }

  #[test]
  fn record_mode_saves_the_raw_frame() {
    let dir = temp_dir("raw");
    let url = url::Url::parse(&format!("folder://{}?record", dir.display())).unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    assert!(matches!(output.draw, DrawWrapper::Raw));

    let frame = RgbFrame::from_fn(32, 32, |_, _| [180, 140, 130]);
    let estimate = HbEstimator::<RgbFrame>::default().infer(&frame).unwrap();
    output.render_result(&frame, &estimate).unwrap();

    let images = files_with_extension(&dir, "png");
    assert_eq!(images.len(), 1);
    let saved = image::open(&images[0]).unwrap().to_rgb8();
    assert_eq!(saved, frame.to_rgb_image());
    assert!(images[0].with_extension("json").exists());

    std::fs::remove_dir_all(dir).unwrap();
  }

  #[test]
  fn unknown_filter_is_rejected() {
    let url = url::Url::parse("folder:///tmp/records?only=everything").unwrap();
    assert!(matches!(
      DirectoryRecordOutput::from_url(&url),
      Err(DirectoryRecordOutputError::UnknownFilter(_))
    ));
  }
}

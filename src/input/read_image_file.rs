// 该文件是 HemoScan （血色扫描） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{AsRgbFrame, PixelOrder, RgbFrame},
  input::pixel_order,
  model::EstimateError,
  url_file_path,
};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("路径无效: {0}")]
  InvalidPath(String),
  #[error("通道顺序无效: {0}")]
  InvalidOrder(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] EstimateError),
}

/// 单张图像文件，只产出一帧
pub struct ImageFileInput {
  path: PathBuf,
  frame: Option<RgbFrame>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemeMismatch(url.scheme().to_string()));
    }

    let path = url_file_path(url).map_err(|e| ImageFileInputError::InvalidPath(e.to_string()))?;
    let order = pixel_order(url).map_err(ImageFileInputError::InvalidOrder)?;
    Self::open(path, order)
  }
}

impl ImageFileInput {
  pub fn open(path: impl AsRef<Path>, order: PixelOrder) -> Result<Self, ImageFileInputError> {
    let path = path.as_ref().to_path_buf();
    let bytes = std::fs::read(&path)?;
    let frame = RgbFrame::decode_with_order(&bytes, order)?;
    info!(
      "读取图像文件: {} ({}x{})",
      path.display(),
      frame.width(),
      frame.height()
    );

    Ok(ImageFileInput {
      path,
      frame: Some(frame),
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn into_frames(self) -> std::option::IntoIter<RgbFrame> {
    self.frame.into_iter()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{Rgb, RgbImage};

  fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("hemoscan-read-image-{}-{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
  }

  #[test]
  fn reads_a_single_frame() {
    let dir = temp_dir("single");
    let path = dir.join("eye lid.png");
    RgbImage::from_fn(8, 6, |_, _| Rgb([180, 140, 130]))
      .save(&path)
      .unwrap();

    let url = Url::parse(&format!("image://{}", dir.join("eye%20lid.png").display())).unwrap();
    let input = ImageFileInput::from_url(&url).unwrap();
    assert_eq!(input.path(), path.as_path());

    let frames: Vec<_> = input.into_frames().collect();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].width(), 8);
    assert_eq!(frames[0].height(), 6);
    assert_eq!(frames[0].pixel(3, 3), [180, 140, 130]);

    std::fs::remove_dir_all(dir).unwrap();
  }

  #[test]
  fn bgr_order_is_normalized() {
    let dir = temp_dir("bgr");
    let path = dir.join("bgr.png");
    RgbImage::from_fn(4, 4, |_, _| Rgb([130, 140, 180]))
      .save(&path)
      .unwrap();

    let url = Url::parse(&format!("image://{}?order=bgr", path.display())).unwrap();
    let frame = ImageFileInput::from_url(&url)
      .unwrap()
      .into_frames()
      .next()
      .unwrap();
    assert_eq!(frame.pixel(0, 0), [180, 140, 130]);

    std::fs::remove_dir_all(dir).unwrap();
  }

  #[test]
  fn missing_file_is_io_error() {
    let url = Url::parse("image:///definitely/not/here.png").unwrap();
    assert!(matches!(
      ImageFileInput::from_url(&url),
      Err(ImageFileInputError::IoError(_))
    ));
  }

  #[test]
  fn undecodable_file_is_image_error() {
    let dir = temp_dir("garbage");
    let path = dir.join("garbage.png");
    std::fs::write(&path, b"not a png").unwrap();

    let url = Url::parse(&format!("image://{}", path.display())).unwrap();
    assert!(matches!(
      ImageFileInput::from_url(&url),
      Err(ImageFileInputError::ImageError(EstimateError::InvalidImage(_)))
    ));

    std::fs::remove_dir_all(dir).unwrap();
  }
}

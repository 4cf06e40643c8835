// 该文件是 HemoScan （血色扫描） 项目的一部分。
// src/input/directory_input.rs - 目录批量输入
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
use tracing::{debug, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{PixelOrder, RgbFrame},
  input::pixel_order,
  url_file_path,
};

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

#[derive(Error, Debug)]
pub enum DirectoryInputError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("路径无效: {0}")]
  InvalidPath(String),
  #[error("通道顺序无效: {0}")]
  InvalidOrder(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 目录中的全部图像文件，按文件名排序逐个读取
pub struct DirectoryInput {
  files: Vec<PathBuf>,
  order: PixelOrder,
}

impl FromUrlWithScheme for DirectoryInput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryInput {
  type Error = DirectoryInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(DirectoryInputError::SchemeMismatch(url.scheme().to_string()));
    }

    let path = url_file_path(url).map_err(|e| DirectoryInputError::InvalidPath(e.to_string()))?;
    let order = pixel_order(url).map_err(DirectoryInputError::InvalidOrder)?;
    Self::open(path, order)
  }
}

fn is_image_file(path: &Path) -> bool {
  path.is_file()
    && path
      .extension()
      .and_then(|ext| ext.to_str())
      .map(|ext| {
        IMAGE_EXTENSIONS
          .iter()
          .any(|known| ext.eq_ignore_ascii_case(known))
      })
      .unwrap_or(false)
}

impl DirectoryInput {
  pub fn open(directory: impl AsRef<Path>, order: PixelOrder) -> Result<Self, DirectoryInputError> {
    let directory = directory.as_ref();
    let mut files = Vec::new();
    for entry in std::fs::read_dir(directory)? {
      let path = entry?.path();
      if is_image_file(&path) {
        files.push(path);
      } else {
        debug!("跳过非图像文件: {}", path.display());
      }
    }
    files.sort();

    if files.is_empty() {
      warn!("目录中没有图像文件: {}", directory.display());
    } else {
      info!("目录 {} 中共有 {} 个图像文件", directory.display(), files.len());
    }

    Ok(DirectoryInput { files, order })
  }

  pub fn files(&self) -> &[PathBuf] {
    &self.files
  }

  pub fn into_frames(self) -> DirectoryInputIter {
    DirectoryInputIter {
      files: self.files.into_iter(),
      order: self.order,
    }
  }
}

pub struct DirectoryInputIter {
  files: std::vec::IntoIter<PathBuf>,
  order: PixelOrder,
}

impl Iterator for DirectoryInputIter {
  type Item = RgbFrame;

  fn next(&mut self) -> Option<Self::Item> {
    for path in self.files.by_ref() {
      let frame = std::fs::read(&path)
        .map_err(|e| e.to_string())
        .and_then(|bytes| RgbFrame::decode_with_order(&bytes, self.order).map_err(|e| e.to_string()));
      match frame {
        Ok(frame) => {
          debug!("读取图像文件: {}", path.display());
          return Some(frame);
        }
        Err(e) => warn!("跳过无法读取的文件 {}: {}", path.display(), e),
      }
    }
    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::frame::AsRgbFrame;
  use image::{Rgb, RgbImage};

  fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
      "hemoscan-directory-input-{}-{}",
      name,
      std::process::id()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
  }

  fn save_uniform(path: &Path, color: [u8; 3]) {
    RgbImage::from_fn(4, 4, |_, _| Rgb(color)).save(path).unwrap();
  }

  #[test]
  fn frames_are_sorted_and_broken_files_skipped() {
    let dir = temp_dir("sorted");
    save_uniform(&dir.join("b.png"), [2, 2, 2]);
    save_uniform(&dir.join("a.PNG"), [1, 1, 1]);
    save_uniform(&dir.join("c.bmp"), [3, 3, 3]);
    std::fs::write(dir.join("broken.jpg"), b"not a jpeg").unwrap();
    std::fs::write(dir.join("notes.txt"), b"hello").unwrap();

    let url = Url::parse(&format!("folder://{}", dir.display())).unwrap();
    let input = DirectoryInput::from_url(&url).unwrap();
    assert_eq!(input.files().len(), 4);

    let colors: Vec<_> = input.into_frames().map(|f| f.pixel(0, 0)).collect();
    assert_eq!(colors, vec![[1, 1, 1], [2, 2, 2], [3, 3, 3]]);

    std::fs::remove_dir_all(dir).unwrap();
  }

  #[test]
  fn missing_directory_is_io_error() {
    let url = Url::parse("folder:///definitely/not/a/dir").unwrap();
    assert!(matches!(
      DirectoryInput::from_url(&url),
      Err(DirectoryInputError::IoError(_))
    ));
  }

  #[test]
  fn empty_directory_yields_nothing() {
    let dir = temp_dir("empty");
    let input = DirectoryInput::open(&dir, PixelOrder::Rgb).unwrap();
    assert_eq!(input.into_frames().count(), 0);
    std::fs::remove_dir_all(dir).unwrap();
  }
}

// 该文件是 Cookly 项目的一部分。
// src/upload.rs - 上传图像与临时文件
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

use std::{
  io::Write,
  path::{Path, PathBuf},
};

use image::{ImageFormat, RgbImage};
use serde::Deserialize;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

const SYNTHETIC_SIZE: u32 = 640;

#[derive(Error, Debug)]
pub enum UploadError {
  #[error("文件名为空")]
  EmptyFilename,
  #[error("不允许的文件类型: {0}")]
  ExtensionNotAllowed(String),
  #[error("文件过大: {size} 字节，上限 {max} 字节")]
  TooLarge { size: u64, max: u64 },
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
}

/// 上传策略：扩展名白名单、大小上限与临时目录
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadPolicy {
  pub allowed_extensions: Vec<String>,
  pub max_bytes: u64,
  /// 临时文件目录，缺省为系统临时目录
  pub dir: Option<PathBuf>,
}

impl Default for UploadPolicy {
  fn default() -> Self {
    UploadPolicy {
      allowed_extensions: ["png", "jpg", "jpeg", "gif"]
        .iter()
        .map(|s| s.to_string())
        .collect(),
      max_bytes: 16 * 1024 * 1024,
      dir: None,
    }
  }
}

impl UploadPolicy {
  fn extension(filename: &str) -> Option<String> {
    filename
      .rsplit_once('.')
      .map(|(_, ext)| ext.to_lowercase())
  }

  pub fn allowed_file(&self, filename: &str) -> bool {
    Self::extension(filename)
      .map(|ext| self.allowed_extensions.iter().any(|a| *a == ext))
      .unwrap_or(false)
  }

  pub fn validate(&self, filename: &str, size: u64) -> Result<(), UploadError> {
    if filename.is_empty() {
      return Err(UploadError::EmptyFilename);
    }
    if !self.allowed_file(filename) {
      return Err(UploadError::ExtensionNotAllowed(filename.to_string()));
    }
    if size > self.max_bytes {
      return Err(UploadError::TooLarge {
        size,
        max: self.max_bytes,
      });
    }
    Ok(())
  }

  /// 校验后写入临时文件，返回的 [`TempImage`] 释放时删除文件
  pub fn store(&self, filename: &str, bytes: &[u8]) -> Result<TempImage, UploadError> {
    self.validate(filename, bytes.len() as u64)?;
    let suffix = Self::extension(filename)
      .map(|ext| format!(".{}", ext))
      .unwrap_or_default();

    let mut image = TempImage::create(self.dir.as_deref(), &suffix)?;
    image.file.write_all(bytes)?;
    image.file.flush()?;
    Ok(image)
  }
}

/// 作用域内的临时图像文件，任何退出路径上都会被删除
pub struct TempImage {
  file: NamedTempFile,
}

impl TempImage {
  fn create(dir: Option<&Path>, suffix: &str) -> Result<Self, UploadError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("cookly-").suffix(suffix);
    let file = match dir {
      Some(dir) => {
        std::fs::create_dir_all(dir)?;
        builder.tempfile_in(dir)?
      }
      None => builder.tempfile()?,
    };
    debug!("创建临时文件: {}", file.path().display());
    Ok(TempImage { file })
  }

  /// 640x640 的纯黑测试图像
  pub fn synthetic(dir: Option<&Path>) -> Result<Self, UploadError> {
    let mut image = Self::create(dir, ".png")?;
    RgbImage::new(SYNTHETIC_SIZE, SYNTHETIC_SIZE).write_to(image.file.as_file_mut(), ImageFormat::Png)?;
    image.file.flush()?;
    Ok(image)
  }

  pub fn path(&self) -> &Path {
    self.file.path()
  }
}

impl Drop for TempImage {
  fn drop(&mut self) {
    debug!("删除临时文件: {}", self.file.path().display());
  }
}

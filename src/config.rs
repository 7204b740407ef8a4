// 该文件是 Cookly 项目的一部分。
// src/config.rs - 运行配置
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

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::{label::Vocabulary, normalize::Normalizer, upload::UploadPolicy};

pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.25;
pub const DEFAULT_MODEL_PATH: &str = "model/vegetable_detector.onnx";
pub const DEFAULT_CLASS_NAMES_PATH: &str = "model/class_names.json";

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("配置文件格式错误: {0}")]
  FormatError(#[from] serde_json::Error),
}

/// 检测与匹配配置，缺省字段使用默认值
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
  /// 模型权重文件
  pub model_path: PathBuf,
  /// 模型类别列表（JSON 字符串数组）
  pub class_names_path: PathBuf,
  pub confidence_threshold: f64,
  pub vocabulary: Vocabulary,
  pub normalizer: Normalizer,
  pub upload: UploadPolicy,
}

impl Default for Config {
  fn default() -> Self {
    Config {
      model_path: PathBuf::from(DEFAULT_MODEL_PATH),
      class_names_path: PathBuf::from(DEFAULT_CLASS_NAMES_PATH),
      confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
      vocabulary: Vocabulary::default(),
      normalizer: Normalizer::default(),
      upload: UploadPolicy::default(),
    }
  }
}

impl Config {
  pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
    info!("读取配置文件: {}", path.display());
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
  }
}

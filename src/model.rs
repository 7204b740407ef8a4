// 该文件是 Cookly 项目的一部分。
// src/model.rs - 检测模型
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

use std::fmt;

use image::RgbImage;
use thiserror::Error;

/// 推理设备
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
  Cpu,
  Cuda,
}

impl fmt::Display for Device {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Device::Cpu => f.write_str("cpu"),
      Device::Cuda => f.write_str("cuda"),
    }
  }
}

#[derive(Error, Debug)]
pub enum ModelError {
  #[error("模型文件不存在: {0}")]
  NotFound(String),
  #[error("模型加载错误: {0}")]
  LoadError(std::io::Error),
  #[error("不支持的模型格式: {0}")]
  Unsupported(String),
  #[error("模型输出形状错误: {0}")]
  BadOutputShape(String),
  #[cfg(feature = "model_yolo_onnx")]
  #[error("ONNX Runtime 错误: {0}")]
  OrtError(#[from] ort::Error),
}

impl From<std::io::Error> for ModelError {
  fn from(err: std::io::Error) -> Self {
    ModelError::LoadError(err)
  }
}

/// 检测模型
///
/// 推理需要独占访问，调用方负责串行化（见 [`crate::detector::Detector`]）。
pub trait Model: Send {
  /// 对一张图像推理，`threshold` 供后端做预过滤，调用方仍会按原始置信度复核。
  fn infer(&mut self, image: &RgbImage, threshold: f32) -> Result<DetectResult, ModelError>;

  fn device(&self) -> Device {
    Device::Cpu
  }
}

#[derive(Debug, Clone)]
pub struct DetectItem {
  pub class_id: u32,
  pub score: f32,
  pub bbox: [f32; 4], // [x_min, y_min, x_max, y_max]，原图像素坐标
}

#[derive(Debug, Clone, Default)]
pub struct DetectResult {
  pub items: Box<[DetectItem]>,
}

impl From<Vec<DetectItem>> for DetectResult {
  fn from(items: Vec<DetectItem>) -> Self {
    DetectResult {
      items: items.into_boxed_slice(),
    }
  }
}

/// 非极大值抑制（按类别）
pub fn nms(mut items: Vec<DetectItem>, iou_threshold: f32) -> Vec<DetectItem> {
  // 按置信度降序排序
  items.sort_by(|a, b| b.score.total_cmp(&a.score));

  let mut result = Vec::new();

  while !items.is_empty() {
    let best = items.remove(0);

    items.retain(|item| {
      if item.class_id != best.class_id {
        return true;
      }
      iou(&best, item) < iou_threshold
    });

    result.push(best);
  }

  result
}

/// 计算两个边界框的 IoU
pub fn iou(a: &DetectItem, b: &DetectItem) -> f32 {
  let x1 = a.bbox[0].max(b.bbox[0]);
  let y1 = a.bbox[1].max(b.bbox[1]);
  let x2 = a.bbox[2].min(b.bbox[2]);
  let y2 = a.bbox[3].min(b.bbox[3]);

  let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
  let area_a = (a.bbox[2] - a.bbox[0]) * (a.bbox[3] - a.bbox[1]);
  let area_b = (b.bbox[2] - b.bbox[0]) * (b.bbox[3] - b.bbox[1]);
  let union = area_a + area_b - intersection;

  if union > 0.0 {
    intersection / union
  } else {
    0.0
  }
}

#[cfg(feature = "model_yolo_onnx")]
mod yolo_onnx;
#[cfg(feature = "model_yolo_onnx")]
pub use self::yolo_onnx::{YoloOnnx, YoloOnnxBuilder};

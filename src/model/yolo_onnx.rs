// 该文件是 Cookly 项目的一部分。
// src/model/yolo_onnx.rs - ONNX YOLO 检测模型
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

use std::path::PathBuf;

use image::{RgbImage, imageops::FilterType};
use ort::{
  session::{Session, builder::GraphOptimizationLevel},
  value::Tensor,
};
use tracing::{debug, info};

use crate::model::{DetectItem, DetectResult, Device, Model, ModelError, nms};

const YOLO_INPUT_W: u32 = 640;
const YOLO_INPUT_H: u32 = 640;
const YOLO_BOX_DIMS: usize = 4;
const YOLO_NMS_THRESH: f32 = 0.45;

pub struct YoloOnnx {
  session: Session,
}

pub struct YoloOnnxBuilder {
  model_path: PathBuf,
  intra_threads: usize,
}

impl YoloOnnxBuilder {
  pub fn new(model_path: impl Into<PathBuf>) -> Self {
    YoloOnnxBuilder {
      model_path: model_path.into(),
      intra_threads: 4,
    }
  }

  pub fn intra_threads(mut self, threads: usize) -> Self {
    self.intra_threads = threads;
    self
  }

  pub fn build(self) -> Result<YoloOnnx, ModelError> {
    if !self.model_path.exists() {
      return Err(ModelError::NotFound(self.model_path.display().to_string()));
    }

    info!("加载模型文件: {}", self.model_path.display());
    let session = Session::builder()?
      .with_optimization_level(GraphOptimizationLevel::Level3)?
      .with_intra_threads(self.intra_threads)?
      .commit_from_file(&self.model_path)?;
    info!("模型加载完成");

    debug!("模型输入数量: {}", session.inputs.len());
    debug!("模型输出数量: {}", session.outputs.len());

    Ok(YoloOnnx { session })
  }
}

impl YoloOnnx {
  /// 缩放到模型输入尺寸，转换为 NCHW 并归一化到 [0, 1]
  fn preprocess(image: &RgbImage) -> Vec<f32> {
    let resized = image::imageops::resize(image, YOLO_INPUT_W, YOLO_INPUT_H, FilterType::Triangle);

    let plane = (YOLO_INPUT_W * YOLO_INPUT_H) as usize;
    let mut data = vec![0f32; 3 * plane];
    for (x, y, pixel) in resized.enumerate_pixels() {
      let idx = (y * YOLO_INPUT_W + x) as usize;
      for c in 0..3 {
        data[c * plane + idx] = pixel[c] as f32 / 255.0;
      }
    }
    data
  }
}

impl Model for YoloOnnx {
  fn infer(&mut self, image: &RgbImage, threshold: f32) -> Result<DetectResult, ModelError> {
    let (original_width, original_height) = image.dimensions();

    debug!("设置模型输入");
    let input = Tensor::from_array((
      [1usize, 3, YOLO_INPUT_H as usize, YOLO_INPUT_W as usize],
      Self::preprocess(image),
    ))?;

    debug!("执行模型推理");
    let outputs = self.session.run(ort::inputs![input])?;
    let (shape, raw) = outputs[0].try_extract_tensor::<f32>()?;

    // 输出格式: [batch, 4 + num_classes, anchors]
    if shape.len() != 3 || (shape[1] as usize) <= YOLO_BOX_DIMS {
      return Err(ModelError::BadOutputShape(format!("{:?}", &shape[..])));
    }
    let channels = shape[1] as usize;
    let anchors = shape[2] as usize;
    let num_classes = channels - YOLO_BOX_DIMS;
    debug!("输出: {} 个候选框, {} 个类别", anchors, num_classes);

    let scale_x = original_width as f32 / YOLO_INPUT_W as f32;
    let scale_y = original_height as f32 / YOLO_INPUT_H as f32;

    let mut items = Vec::new();
    for a in 0..anchors {
      let (score, class_id) = (0..num_classes)
        .map(|c| (raw[(YOLO_BOX_DIMS + c) * anchors + a], c as u32))
        .fold((f32::MIN, 0u32), |best, cur| if cur.0 > best.0 { cur } else { best });

      if score < threshold {
        continue;
      }

      let cx = raw[a];
      let cy = raw[anchors + a];
      let w = raw[2 * anchors + a];
      let h = raw[3 * anchors + a];

      items.push(DetectItem {
        class_id,
        score,
        bbox: [
          ((cx - w / 2.0) * scale_x).clamp(0.0, original_width as f32),
          ((cy - h / 2.0) * scale_y).clamp(0.0, original_height as f32),
          ((cx + w / 2.0) * scale_x).clamp(0.0, original_width as f32),
          ((cy + h / 2.0) * scale_y).clamp(0.0, original_height as f32),
        ],
      });
    }

    let items = nms(items, YOLO_NMS_THRESH);
    debug!("检测到 {} 个物体", items.len());

    Ok(items.into())
  }

  fn device(&self) -> Device {
    Device::Cpu
  }
}

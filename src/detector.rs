// 该文件是 Cookly 项目的一部分。
// src/detector.rs - 产品检测器
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
  any::Any,
  collections::{BTreeMap, btree_map},
  panic::{self, AssertUnwindSafe},
  path::{Path, PathBuf},
  sync::{Mutex, OnceLock},
  time::Instant,
};

use image::{ImageReader, RgbImage};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::{
  config::Config,
  label::{ClassNames, Vocabulary},
  matcher::round_to,
  model::{DetectResult, Device, Model, ModelError},
};

/// 小于该字节数的模型文件视为演示模型
pub const DEMO_MODEL_MAX_BYTES: u64 = 1024;

/// 单个检测框
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
  pub product: String,
  /// 保留 3 位小数
  pub confidence: f64,
  /// [x1, y1, x2, y2]
  pub bbox: [i32; 4],
  pub area: i64,
}

/// 同一产品在一张图上的汇总
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductStat {
  pub count: usize,
  pub max_confidence: f64,
  pub avg_confidence: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ProductStats(BTreeMap<String, ProductStat>);

impl ProductStats {
  pub fn from_detections(detections: &[Detection]) -> Self {
    let mut grouped: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for det in detections {
      grouped
        .entry(det.product.as_str())
        .or_default()
        .push(det.confidence);
    }

    let stats = grouped
      .into_iter()
      .map(|(product, confidences)| {
        let count = confidences.len();
        let max_confidence = confidences.iter().copied().fold(f64::MIN, f64::max);
        let avg_confidence = round_to(confidences.iter().sum::<f64>() / count as f64, 3);
        (
          product.to_string(),
          ProductStat {
            count,
            max_confidence,
            avg_confidence,
          },
        )
      })
      .collect();

    ProductStats(stats)
  }

  pub fn get(&self, product: &str) -> Option<&ProductStat> {
    self.0.get(product)
  }

  pub fn iter(&self) -> btree_map::Iter<'_, String, ProductStat> {
    self.0.iter()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

/// 迭代产品名，可直接传给 [`crate::matcher::match_products`]
impl<'a> IntoIterator for &'a ProductStats {
  type Item = &'a String;
  type IntoIter = btree_map::Keys<'a, String, ProductStat>;

  fn into_iter(self) -> Self::IntoIter {
    self.0.keys()
  }
}

/// 一次检测的结果
#[derive(Debug, Clone, PartialEq)]
pub enum DetectOutcome {
  Detected {
    stats: ProductStats,
    detections: Vec<Detection>,
  },
  /// 模型正常运行，但没有超过阈值的框
  NoDetections,
  ModelUnavailable(String),
  ProcessingFailure(String),
}

/// 模型状态
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelStatus {
  pub loaded: bool,
  pub message: String,
  pub class_count: usize,
  pub device: String,
  pub classes: Vec<String>,
  pub is_demo: bool,
}

pub type ModelLoader = Box<dyn Fn(&Path) -> Result<Box<dyn Model>, ModelError> + Send + Sync>;

/// 按文件扩展名选择后端
pub fn default_loader(path: &Path) -> Result<Box<dyn Model>, ModelError> {
  if !path.exists() {
    return Err(ModelError::NotFound(path.display().to_string()));
  }

  match path.extension().and_then(|ext| ext.to_str()) {
    #[cfg(feature = "model_yolo_onnx")]
    Some("onnx") => Ok(Box::new(crate::model::YoloOnnxBuilder::new(path).build()?)),
    _ => Err(ModelError::Unsupported(path.display().to_string())),
  }
}

struct LoadedModel {
  model: Mutex<Box<dyn Model>>,
  class_names: ClassNames,
  device: Device,
  artifact_size: u64,
}

impl LoadedModel {
  fn is_demo(&self) -> bool {
    self.artifact_size < DEMO_MODEL_MAX_BYTES
  }
}

/// 产品检测器
///
/// 模型在第一次使用（或 [`Detector::warm_up`]）时加载，只缓存加载成功的模型，
/// 失败后下一次调用会重新尝试。加载与推理都在互斥锁内串行执行。
pub struct Detector {
  model_path: PathBuf,
  class_names_path: PathBuf,
  vocabulary: Vocabulary,
  loader: ModelLoader,
  state: OnceLock<LoadedModel>,
  init: Mutex<()>,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
  if let Some(msg) = payload.downcast_ref::<&str>() {
    msg.to_string()
  } else if let Some(msg) = payload.downcast_ref::<String>() {
    msg.clone()
  } else {
    "未知错误".to_string()
  }
}

/// 按文件内容识别格式并解码，扩展名只在内容无法识别时使用
fn decode_image(path: &Path) -> Result<RgbImage, image::ImageError> {
  let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
  Ok(image.to_rgb8())
}

/// 按原始置信度过滤，并把类别编号翻译为产品名
pub fn collect_detections(
  result: &DetectResult,
  class_names: &ClassNames,
  threshold: f64,
) -> Vec<Detection> {
  result
    .items
    .iter()
    .filter(|item| item.score as f64 >= threshold)
    .map(|item| {
      let [x1, y1, x2, y2] = item.bbox.map(|v| v as i32);
      Detection {
        product: class_names.name(item.class_id),
        confidence: round_to(item.score as f64, 3),
        bbox: [x1, y1, x2, y2],
        area: (x2 as i64 - x1 as i64).saturating_mul(y2 as i64 - y1 as i64),
      }
    })
    .collect()
}

impl Detector {
  pub fn new(config: &Config) -> Self {
    Self::with_loader(config, Box::new(default_loader))
  }

  pub fn with_loader(config: &Config, loader: ModelLoader) -> Self {
    Detector {
      model_path: config.model_path.clone(),
      class_names_path: config.class_names_path.clone(),
      vocabulary: config.vocabulary.clone(),
      loader,
      state: OnceLock::new(),
      init: Mutex::new(()),
    }
  }

  fn load(&self) -> Result<LoadedModel, String> {
    info!("加载产品检测模型: {}", self.model_path.display());

    let model = match panic::catch_unwind(AssertUnwindSafe(|| (self.loader)(&self.model_path))) {
      Ok(Ok(model)) => model,
      Ok(Err(e)) => {
        error!("模型加载失败: {}", e);
        return Err(e.to_string());
      }
      Err(payload) => {
        let msg = panic_message(payload.as_ref());
        error!("模型加载失败: {}", msg);
        return Err(msg);
      }
    };

    let artifact_size = std::fs::metadata(&self.model_path)
      .map(|meta| meta.len())
      .unwrap_or(0);
    info!(
      "模型文件大小: {:.2} MB",
      artifact_size as f64 / (1024.0 * 1024.0)
    );
    if artifact_size < DEMO_MODEL_MAX_BYTES {
      warn!("检测到演示模型，实际检测不会生效");
    }

    let device = model.device();
    let class_names = ClassNames::load(&self.class_names_path, &self.vocabulary);
    info!("模型加载完成，类别数: {}，设备: {}", class_names.len(), device);

    Ok(LoadedModel {
      model: Mutex::new(model),
      class_names,
      device,
      artifact_size,
    })
  }

  fn loaded(&self) -> Result<&LoadedModel, String> {
    if let Some(loaded) = self.state.get() {
      return Ok(loaded);
    }

    let _guard = match self.init.lock() {
      Ok(guard) => guard,
      Err(poisoned) => poisoned.into_inner(),
    };
    // 等锁期间可能已被其他线程加载
    if let Some(loaded) = self.state.get() {
      return Ok(loaded);
    }
    let loaded = self.load()?;
    Ok(self.state.get_or_init(|| loaded))
  }

  /// 立即加载模型，返回是否加载成功
  pub fn warm_up(&self) -> bool {
    self.loaded().is_ok()
  }

  pub fn status(&self) -> ModelStatus {
    match self.loaded() {
      Ok(loaded) => ModelStatus {
        loaded: true,
        message: if loaded.is_demo() {
          "Демо-модель готова".to_string()
        } else {
          "Модель готова к работе".to_string()
        },
        class_count: loaded.class_names.len(),
        device: loaded.device.to_string(),
        classes: loaded.class_names.as_slice().to_vec(),
        is_demo: loaded.is_demo(),
      },
      Err(_) => ModelStatus {
        loaded: false,
        message: "Модель не загружена".to_string(),
        class_count: 0,
        device: "none".to_string(),
        classes: Vec::new(),
        is_demo: false,
      },
    }
  }

  /// 检测图像中的产品
  ///
  /// 不会返回错误也不会 panic，所有情况都体现在 [`DetectOutcome`] 中。
  pub fn detect(&self, image_path: &Path, threshold: f64) -> DetectOutcome {
    let loaded = match self.loaded() {
      Ok(loaded) => loaded,
      Err(reason) => return DetectOutcome::ModelUnavailable(reason),
    };
    if loaded.is_demo() {
      warn!("使用演示模型进行检测");
    }

    let image = match decode_image(image_path) {
      Ok(image) => image,
      Err(e) => {
        error!("图像解码失败 {}: {}", image_path.display(), e);
        return DetectOutcome::ProcessingFailure(e.to_string());
      }
    };

    let now = Instant::now();
    let result = {
      let mut model = match loaded.model.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
      };
      panic::catch_unwind(AssertUnwindSafe(|| model.infer(&image, threshold as f32)))
    };

    let result = match result {
      Ok(Ok(result)) => result,
      Ok(Err(e)) => {
        error!("检测失败: {}", e);
        return DetectOutcome::ProcessingFailure(e.to_string());
      }
      Err(payload) => {
        let msg = panic_message(payload.as_ref());
        error!("检测失败: {}", msg);
        return DetectOutcome::ProcessingFailure(msg);
      }
    };
    info!("推理完成，耗时: {:.2?}", now.elapsed());

    let detections = collect_detections(&result, &loaded.class_names, threshold);
    debug!("阈值 {} 以上的检测框: {}", threshold, detections.len());
    if detections.is_empty() {
      return DetectOutcome::NoDetections;
    }

    let stats = ProductStats::from_detections(&detections);
    info!("检测到 {} 种产品", stats.len());
    DetectOutcome::Detected { stats, detections }
  }
}

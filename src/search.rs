// 该文件是 Cookly 项目的一部分。
// src/search.rs - 拍照找菜谱
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

use std::path::Path;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
  detector::{DetectOutcome, Detection, Detector, ProductStats},
  matcher::{MatchResult, match_products},
  normalize::Normalizer,
  recipe::Recipe,
  upload::{TempImage, UploadError, UploadPolicy},
};

pub const NO_PRODUCTS_MESSAGE: &str = "На фото не найдены продукты";
pub const MODEL_UNAVAILABLE_MESSAGE: &str = "Модель не загружена";
/// 自检时使用的低阈值
pub const SELF_TEST_THRESHOLD: f64 = 0.1;
pub const TEST_PRODUCTS: [&str; 3] = ["морковь", "картофель", "лук"];

#[derive(Error, Debug)]
pub enum SearchError {
  #[error("无效输入: {0}")]
  InvalidInput(String),
  #[error("上传错误: {0}")]
  UploadError(#[from] UploadError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedProduct {
  pub name: String,
  pub count: usize,
  /// 平均置信度
  pub confidence: f64,
  pub max_confidence: f64,
}

/// 菜谱字段展开后附加匹配得分
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeMatch<'a> {
  #[serde(flatten)]
  pub recipe: &'a Recipe,
  pub match_score: f64,
  pub matched_products: Vec<String>,
}

impl<'a> From<MatchResult<'a>> for RecipeMatch<'a> {
  fn from(result: MatchResult<'a>) -> Self {
    RecipeMatch {
      recipe: result.recipe,
      match_score: result.match_percentage,
      matched_products: result.matched_products.into_iter().collect(),
    }
  }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse<'a> {
  pub success: bool,
  pub message: String,
  pub detected_products: Vec<DetectedProduct>,
  pub recipes: Vec<RecipeMatch<'a>>,
  pub total_products: usize,
  pub total_recipes: usize,
}

impl<'a> SearchResponse<'a> {
  fn empty(success: bool, message: impl Into<String>) -> Self {
    SearchResponse {
      success,
      message: message.into(),
      detected_products: Vec::new(),
      recipes: Vec::new(),
      total_products: 0,
      total_recipes: 0,
    }
  }
}

/// 只做检测时的结果，包含每个检测框
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectReport {
  pub success: bool,
  pub message: String,
  pub detected_products: Vec<DetectedProduct>,
  pub detections: Vec<Detection>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualSearchResponse<'a> {
  pub success: bool,
  pub message: String,
  pub products: Vec<String>,
  pub recipes: Vec<RecipeMatch<'a>>,
  pub total_recipes: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelfTestReport {
  pub success: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  pub model_working: bool,
  pub detections_count: usize,
  pub product_stats: ProductStats,
  pub class_count: usize,
  pub is_demo: bool,
}

/// 按置信度从高到低整理检测到的产品
pub fn detected_products(stats: &ProductStats) -> Vec<DetectedProduct> {
  let mut products: Vec<DetectedProduct> = stats
    .iter()
    .map(|(name, stat)| DetectedProduct {
      name: name.clone(),
      count: stat.count,
      confidence: stat.avg_confidence,
      max_confidence: stat.max_confidence,
    })
    .collect();
  products.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
  products
}

/// 检测 + 匹配
///
/// 语料由调用方提供只读快照，本结构不持有可变状态。
pub struct RecipeSearch<'a> {
  detector: &'a Detector,
  corpus: &'a [Recipe],
  normalizer: &'a Normalizer,
  threshold: f64,
}

impl<'a> RecipeSearch<'a> {
  pub fn new(
    detector: &'a Detector,
    corpus: &'a [Recipe],
    normalizer: &'a Normalizer,
    threshold: f64,
  ) -> Self {
    RecipeSearch {
      detector,
      corpus,
      normalizer,
      threshold,
    }
  }

  /// 对已落盘的图像检测产品并查找菜谱
  pub fn photo(&self, image_path: &Path) -> SearchResponse<'a> {
    let (stats, detections) = match self.detector.detect(image_path, self.threshold) {
      DetectOutcome::Detected { stats, detections } => (stats, detections),
      DetectOutcome::NoDetections => return SearchResponse::empty(true, NO_PRODUCTS_MESSAGE),
      DetectOutcome::ModelUnavailable(reason) => {
        warn!("模型不可用: {}", reason);
        return SearchResponse::empty(false, MODEL_UNAVAILABLE_MESSAGE);
      }
      DetectOutcome::ProcessingFailure(reason) => {
        return SearchResponse::empty(false, format!("Ошибка обработки: {}", reason));
      }
    };
    info!("检测框 {} 个，产品 {} 种", detections.len(), stats.len());

    let recipes: Vec<RecipeMatch<'a>> = match_products(&stats, self.corpus, self.normalizer)
      .into_iter()
      .map(RecipeMatch::from)
      .collect();
    let products = detected_products(&stats);

    let message = if recipes.is_empty() {
      format!(
        "Найдено {} продуктов, но подходящих рецептов нет",
        products.len()
      )
    } else {
      format!(
        "Найдено {} продуктов и {} подходящих рецептов",
        products.len(),
        recipes.len()
      )
    };

    SearchResponse {
      success: true,
      message,
      total_products: products.len(),
      total_recipes: recipes.len(),
      detected_products: products,
      recipes,
    }
  }

  /// 只检测不匹配
  pub fn detect(&self, image_path: &Path) -> DetectReport {
    let (success, message, stats, detections) =
      match self.detector.detect(image_path, self.threshold) {
        DetectOutcome::Detected { stats, detections } => (
          true,
          format!("Найдено {} продуктов", stats.len()),
          stats,
          detections,
        ),
        DetectOutcome::NoDetections => (
          true,
          NO_PRODUCTS_MESSAGE.to_string(),
          ProductStats::default(),
          Vec::new(),
        ),
        DetectOutcome::ModelUnavailable(reason) => {
          warn!("模型不可用: {}", reason);
          (
            false,
            MODEL_UNAVAILABLE_MESSAGE.to_string(),
            ProductStats::default(),
            Vec::new(),
          )
        }
        DetectOutcome::ProcessingFailure(reason) => (
          false,
          format!("Ошибка обработки: {}", reason),
          ProductStats::default(),
          Vec::new(),
        ),
      };

    DetectReport {
      success,
      message,
      detected_products: detected_products(&stats),
      detections,
    }
  }

  /// 处理上传：校验、写入临时文件、检测，临时文件在返回前删除
  pub fn upload(
    &self,
    policy: &UploadPolicy,
    filename: &str,
    bytes: &[u8],
  ) -> Result<SearchResponse<'a>, SearchError> {
    let image = policy.store(filename, bytes)?;
    Ok(self.photo(image.path()))
  }

  /// 不经过检测，直接按产品名查找菜谱
  pub fn by_products<S: AsRef<str>>(
    &self,
    products: &[S],
  ) -> Result<ManualSearchResponse<'a>, SearchError> {
    let products: Vec<String> = products
      .iter()
      .map(|p| p.as_ref().trim().to_string())
      .filter(|p| !p.is_empty())
      .collect();
    if products.is_empty() {
      return Err(SearchError::InvalidInput("产品列表为空".to_string()));
    }

    let recipes: Vec<RecipeMatch<'a>> = match_products(&products, self.corpus, self.normalizer)
      .into_iter()
      .map(RecipeMatch::from)
      .collect();
    let message = if recipes.is_empty() {
      "Подходящих рецептов нет".to_string()
    } else {
      format!("Найдено {} подходящих рецептов", recipes.len())
    };

    Ok(ManualSearchResponse {
      success: true,
      message,
      total_recipes: recipes.len(),
      products,
      recipes,
    })
  }

  pub fn test_search(&self) -> Result<ManualSearchResponse<'a>, SearchError> {
    self.by_products(&TEST_PRODUCTS)
  }

  /// 用合成的纯黑图像跑一遍检测器
  pub fn self_test(&self, dir: Option<&Path>) -> Result<SelfTestReport, SearchError> {
    let status = self.detector.status();
    if !status.loaded {
      return Ok(SelfTestReport {
        success: false,
        error: Some(MODEL_UNAVAILABLE_MESSAGE.to_string()),
        model_working: false,
        detections_count: 0,
        product_stats: ProductStats::default(),
        class_count: 0,
        is_demo: true,
      });
    }

    let image = TempImage::synthetic(dir)?;
    let outcome = self.detector.detect(image.path(), SELF_TEST_THRESHOLD);
    drop(image);

    let (model_working, detections_count, product_stats) = match outcome {
      DetectOutcome::Detected { stats, detections } => (true, detections.len(), stats),
      _ => (false, 0, ProductStats::default()),
    };

    Ok(SelfTestReport {
      success: true,
      error: None,
      model_working,
      detections_count,
      product_stats,
      class_count: status.class_count,
      is_demo: status.is_demo,
    })
  }
}

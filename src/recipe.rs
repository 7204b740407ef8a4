// 该文件是 Cookly 项目的一部分。
// src/recipe.rs - 菜谱语料
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

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum CorpusError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("菜谱文件格式错误: {0}")]
  FormatError(#[from] serde_json::Error),
}

fn default_ingredient_name() -> String {
  "Ингредиент".to_string()
}

fn default_ingredient_amount() -> String {
  "по вкусу".to_string()
}

/// 配料 (名称, 用量)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
  #[serde(default = "default_ingredient_name")]
  pub name: String,
  #[serde(default = "default_ingredient_amount")]
  pub amount: String,
}

impl Ingredient {
  pub fn new(name: impl Into<String>, amount: impl Into<String>) -> Self {
    Ingredient {
      name: name.into(),
      amount: amount.into(),
    }
  }
}

/// 菜谱
///
/// 除 `id`、`title`、`ingredients`、`created_at` 外的字段原样保留，输出时展开。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
  #[serde(default)]
  pub id: u64,
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub ingredients: Vec<Ingredient>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(flatten)]
  pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Recipe {
  pub fn new(id: u64, title: impl Into<String>, ingredients: Vec<Ingredient>) -> Self {
    Recipe {
      id,
      title: title.into(),
      ingredients,
      created_at: None,
      extra: serde_json::Map::new(),
    }
  }

  pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
    self.created_at = Some(created_at);
    self
  }
}

/// 按创建时间从新到旧排序（稳定排序，无时间的菜谱保持原顺序排在最后）
pub fn order_newest_first(recipes: &mut [Recipe]) {
  recipes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// 从 JSON 数组文件加载菜谱语料
pub fn load_corpus(path: &Path) -> Result<Vec<Recipe>, CorpusError> {
  let text = std::fs::read_to_string(path)?;
  let mut recipes: Vec<Recipe> = serde_json::from_str(&text)?;
  order_newest_first(&mut recipes);
  info!("从 {} 加载 {} 个菜谱", path.display(), recipes.len());
  Ok(recipes)
}

// 该文件是 Cookly 项目的一部分。
// src/label.rs - 模型类别到产品名称的翻译
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

use serde::Deserialize;
use tracing::{info, warn};

use crate::normalize::SynonymTable;

/// 英文模型类别 -> 俄文产品名
const ENGLISH_TO_RUSSIAN: &[(&str, &str)] = &[
  ("carrot", "морковь"),
  ("carrots", "морковь"),
  ("potato", "картофель"),
  ("potatoes", "картофель"),
  ("tomato", "помидор"),
  ("tomatoes", "помидоры"),
  ("cucumber", "огурец"),
  ("cucumbers", "огурцы"),
  ("onion", "лук"),
  ("onions", "лук"),
  ("pepper", "перец"),
  ("peppers", "перец"),
  ("bell pepper", "болгарский перец"),
  ("cabbage", "капуста"),
  ("broccoli", "брокколи"),
  ("cauliflower", "цветная капуста"),
  ("garlic", "чеснок"),
  ("ginger", "имбирь"),
  ("lettuce", "салат"),
  ("spinach", "шпинат"),
  ("zucchini", "кабачок"),
  ("eggplant", "баклажан"),
  ("eggplants", "баклажаны"),
  ("pumpkin", "тыква"),
  ("beet", "свекла"),
  ("apple", "яблоко"),
  ("apples", "яблоки"),
  ("banana", "банан"),
  ("bananas", "бананы"),
  ("orange", "апельсин"),
  ("oranges", "апельсины"),
  ("lemon", "лимон"),
  ("lemons", "лимоны"),
];

/// 类别文件缺失或格式不对时使用的演示类别
pub const DEMO_CLASSES: [&str; 7] = [
  "морковь",
  "картофель",
  "помидор",
  "огурец",
  "лук",
  "перец",
  "капуста",
];

/// 模型词表
///
/// 每种模型训练词表对应一个变体，换模型不影响下游匹配。
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vocabulary {
  Identity,
  #[default]
  EnglishToRussian,
  /// 自定义表，键不区分大小写
  Table(SynonymTable),
}

impl Vocabulary {
  /// 翻译单个原始类别（忽略大小写与首尾空白），未知类别原样返回
  pub fn translate(&self, raw: &str) -> String {
    let key = raw.trim().to_lowercase();
    let found = match self {
      Vocabulary::Identity => None,
      Vocabulary::EnglishToRussian => ENGLISH_TO_RUSSIAN
        .iter()
        .find(|(en, _)| *en == key)
        .map(|(_, ru)| (*ru).to_string()),
      Vocabulary::Table(table) => table.get(&key).map(str::to_string),
    };
    found.unwrap_or_else(|| raw.to_string())
  }

  pub fn translate_all<S: AsRef<str>>(&self, raw: &[S]) -> Vec<String> {
    raw.iter().map(|s| self.translate(s.as_ref())).collect()
  }
}

/// 已翻译的类别名称列表，按模型类别索引
#[derive(Debug, Clone, PartialEq)]
pub struct ClassNames {
  names: Vec<String>,
}

impl ClassNames {
  pub fn new(names: Vec<String>) -> Self {
    ClassNames { names }
  }

  pub fn demo() -> Self {
    ClassNames::new(DEMO_CLASSES.iter().map(|s| s.to_string()).collect())
  }

  /// 从 JSON 字符串数组文件加载并翻译；文件缺失或格式错误时退回演示类别
  pub fn load(path: &Path, vocabulary: &Vocabulary) -> Self {
    let text = match std::fs::read_to_string(path) {
      Ok(text) => text,
      Err(e) => {
        warn!("类别文件不可用 {}: {}，使用演示类别", path.display(), e);
        return ClassNames::demo();
      }
    };

    match serde_json::from_str::<Vec<String>>(&text) {
      Ok(raw) if !raw.is_empty() => {
        let names = vocabulary.translate_all(&raw);
        info!("加载 {} 个类别", names.len());
        ClassNames::new(names)
      }
      Ok(_) => {
        warn!("类别文件为空，使用演示类别");
        ClassNames::demo()
      }
      Err(e) => {
        warn!("类别文件格式错误: {}，使用演示类别", e);
        ClassNames::demo()
      }
    }
  }

  pub fn name(&self, class_id: u32) -> String {
    self
      .names
      .get(class_id as usize)
      .cloned()
      .unwrap_or_else(|| format!("class_{}", class_id))
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  pub fn as_slice(&self) -> &[String] {
    &self.names
  }
}

// 该文件是 Cookly 项目的一部分。
// src/normalize.rs - 产品名与配料名规范化
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

use std::{collections::HashMap, sync::LazyLock};

use regex::Regex;
use serde::Deserialize;

static LEADING_QUANTITY: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^\d+\s*").expect("有效的正则表达式"));
static QUANTITY_WITH_UNIT: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"\s*\d+\s*(гр?|шт|мл|кг|ст\.?\s*л\.?|ч\.?\s*л\.?)\b").expect("有效的正则表达式")
});
static PARENTHETICAL: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\([^)]*\)").expect("有效的正则表达式"));

const PRODUCT_SYNONYMS: &[(&str, &str)] = &[
  ("морковка", "морковь"),
  ("картошка", "картофель"),
  ("помидорка", "помидор"),
  ("помидорчик", "помидор"),
  ("огурчик", "огурец"),
  ("огурцы", "огурец"),
  ("луковица", "лук"),
  ("перчик", "перец"),
  ("капустка", "капуста"),
  ("яблочко", "яблоки"),
  ("бананчик", "банан"),
  ("апельсинчик", "апельсин"),
  ("лимончик", "лимон"),
];

const INGREDIENT_SYNONYMS: &[(&str, &str)] = &[
  ("морковка", "морковь"),
  ("картошка", "картофель"),
  ("помидор", "помидоры"),
  ("помидорка", "помидоры"),
  ("огурчик", "огурец"),
  ("огурцы", "огурец"),
  ("лук репчатый", "лук"),
  ("луковица", "лук"),
  ("перчик", "перец"),
  ("капустка", "капуста"),
  ("яблоко", "яблоки"),
  ("бананы", "банан"),
  ("апельсин", "апельсины"),
  ("лимон", "лимоны"),
];

const STOP_WORDS: &[&str] = &[
  "свежий",
  "свежая",
  "свежее",
  "свежие",
  "мелко",
  "крупно",
  "нарезанный",
  "очищенный",
  "по",
  "вкусу",
  "для",
];

/// 同义词表：完整名称 -> 规范名称
///
/// 键统一为去首尾空白的小写形式，与查询时的输入一致。
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "HashMap<String, String>")]
pub struct SynonymTable(HashMap<String, String>);

fn table_key(name: &str) -> String {
  name.trim().to_lowercase()
}

impl From<HashMap<String, String>> for SynonymTable {
  fn from(table: HashMap<String, String>) -> Self {
    table.into_iter().collect()
  }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for SynonymTable {
  fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
    SynonymTable(
      iter
        .into_iter()
        .map(|(k, v)| (table_key(k.as_ref()), v.into()))
        .collect(),
    )
  }
}

impl SynonymTable {
  fn from_pairs(pairs: &[(&str, &str)]) -> Self {
    pairs.iter().copied().collect()
  }

  pub fn insert(&mut self, from: impl AsRef<str>, to: impl Into<String>) {
    self.0.insert(table_key(from.as_ref()), to.into());
  }

  /// 按规范化后的键查找
  pub fn get(&self, name: &str) -> Option<&str> {
    self.0.get(&table_key(name)).map(String::as_str)
  }

  /// 查不到时返回原名
  pub fn apply(&self, name: String) -> String {
    match self.get(&name) {
      Some(canonical) => canonical.to_string(),
      None => name,
    }
  }
}

/// 停用词去除方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopWordMode {
  /// 子串删除，会误伤包含停用词的长词（如 "помидор" 中的 "по"）
  #[default]
  Substring,
  /// 仅删除完整的词
  WholeToken,
}

/// 名称规范化器
///
/// 纯函数，无内部可变状态；每次搜索都会对语料中的每个配料调用。
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Normalizer {
  pub product_synonyms: SynonymTable,
  pub ingredient_synonyms: SynonymTable,
  pub stop_words: Vec<String>,
  pub stop_word_mode: StopWordMode,
}

impl Default for Normalizer {
  fn default() -> Self {
    Normalizer {
      product_synonyms: SynonymTable::from_pairs(PRODUCT_SYNONYMS),
      ingredient_synonyms: SynonymTable::from_pairs(INGREDIENT_SYNONYMS),
      stop_words: STOP_WORDS.iter().map(|s| s.to_string()).collect(),
      stop_word_mode: StopWordMode::default(),
    }
  }
}

impl Normalizer {
  /// 规范化检测到的产品名
  pub fn normalize_product(&self, name: &str) -> String {
    self.product_synonyms.apply(name.trim().to_lowercase())
  }

  /// 规范化菜谱配料名：去数量、单位、括号注释和停用词，再查同义词表
  pub fn normalize_ingredient(&self, name: &str) -> String {
    let name = name.to_lowercase();
    let name = name.trim();
    let name = LEADING_QUANTITY.replace(name, "");
    let name = QUANTITY_WITH_UNIT.replace_all(&name, "");
    let name = PARENTHETICAL.replace_all(&name, "");

    let name = match self.stop_word_mode {
      StopWordMode::Substring => self.strip_stop_substrings(&name),
      StopWordMode::WholeToken => self.strip_stop_tokens(&name),
    };

    self.ingredient_synonyms.apply(name)
  }

  fn strip_stop_substrings(&self, name: &str) -> String {
    let mut name = name.to_string();
    for word in &self.stop_words {
      name = name.replace(word.as_str(), "").trim().to_string();
    }
    name
  }

  fn strip_stop_tokens(&self, name: &str) -> String {
    name
      .split_whitespace()
      .filter(|token| !self.stop_words.iter().any(|w| w == token))
      .collect::<Vec<_>>()
      .join(" ")
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn product_names_are_lowercased_and_mapped() {
    let n = Normalizer::default();
    assert_eq!(n.normalize_product("  Морковка "), "морковь");
    assert_eq!(n.normalize_product("Огурцы"), "огурец");
    assert_eq!(n.normalize_product("Carrot"), "carrot");
  }

  #[test]
  fn ingredient_quantities_units_and_notes_are_stripped() {
    let n = Normalizer::default();
    assert_eq!(n.normalize_ingredient("2 морковки"), "морковки");
    assert_eq!(n.normalize_ingredient("Морковь 200 гр"), "морковь");
    assert_eq!(n.normalize_ingredient("сахар 2 ст.л"), "сахар");
    assert_eq!(n.normalize_ingredient("молоко 500 мл"), "молоко");
    assert_eq!(n.normalize_ingredient("Морковка (тертая)"), "морковь");
    assert_eq!(n.normalize_ingredient("Лук репчатый"), "лук");
  }

  #[test]
  fn stop_words_are_removed_as_substrings() {
    let n = Normalizer::default();
    assert_eq!(n.normalize_ingredient("свежий укроп"), "укроп");
    assert_eq!(n.normalize_ingredient("соль по вкусу"), "соль");
    // 单词内部的 "по" 也会被删除
    assert_eq!(n.normalize_ingredient("помидоры"), "мидоры");
  }

  #[test]
  fn whole_token_mode_keeps_longer_words_intact() {
    let n = Normalizer {
      stop_word_mode: StopWordMode::WholeToken,
      ..Normalizer::default()
    };
    assert_eq!(n.normalize_ingredient("помидор"), "помидоры");
    assert_eq!(n.normalize_ingredient("соль по вкусу"), "соль");
  }

  #[test]
  fn normalize_ingredient_is_idempotent() {
    let n = Normalizer::default();
    for input in [
      "2 морковки (крупные)",
      "Морковь 200 гр",
      "картошка 3 шт",
      "мука 1 кг",
      "Лимон (сок)",
      "свежие огурцы",
      "соль по вкусу",
      "Яблоко",
      "масло сливочное 50 г",
    ] {
      let once = n.normalize_ingredient(input);
      assert_eq!(n.normalize_ingredient(&once), once, "input: {}", input);
    }
  }

  #[test]
  fn tables_are_injectable() {
    let mut n = Normalizer::default();
    n.ingredient_synonyms.insert("zanahoria", "морковь");
    assert_eq!(n.normalize_ingredient("Zanahoria"), "морковь");

    let n: Normalizer = serde_json::from_str(
      r#"{"product_synonyms": {"carrots": "carrot"}, "stop_words": ["fresh"]}"#,
    )
    .unwrap();
    assert_eq!(n.normalize_product("Carrots"), "carrot");
    assert_eq!(n.normalize_ingredient("fresh basil"), "basil");
  }

  #[test]
  fn table_keys_are_case_and_whitespace_insensitive() {
    let n: Normalizer = serde_json::from_str(
      r#"{
        "product_synonyms": {"Морковка": "морковь"},
        "ingredient_synonyms": {" Лук Репчатый ": "лук"}
      }"#,
    )
    .unwrap();
    assert_eq!(n.normalize_product("Морковка"), "морковь");
    assert_eq!(n.normalize_ingredient("лук репчатый"), "лук");

    let mut table = SynonymTable::default();
    table.insert("  Картошка", "картофель");
    assert_eq!(table.get("картошка"), Some("картофель"));
    assert_eq!(table.apply("КАРТОШКА ".to_string()), "картофель");
  }
}

// 该文件是 Cookly 项目的一部分。
// src/matcher.rs - 按检测到的产品匹配并排序菜谱
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

use std::collections::{BTreeSet, HashSet};

use tracing::debug;

use crate::{normalize::Normalizer, recipe::Recipe};

/// 最多返回的菜谱数
pub const MAX_RESULTS: usize = 12;

/// 短于等于该字符数的名称不参与子串匹配
const MIN_PARTIAL_LEN: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult<'a> {
  pub recipe: &'a Recipe,
  pub matches: usize,
  pub total_products: usize,
  pub match_percentage: f64,
  /// 命中的原始（未规范化）产品名
  pub matched_products: BTreeSet<String>,
}

/// 四舍五入到 `digits` 位小数，恰好一半时取偶
pub fn round_to(value: f64, digits: i32) -> f64 {
  let factor = 10f64.powi(digits);
  (value * factor).round_ties_even() / factor
}

/// 去重并保留首次出现的顺序
fn distinct_products<I, S>(products: I) -> Vec<String>
where
  I: IntoIterator<Item = S>,
  S: AsRef<str>,
{
  let mut seen = HashSet::new();
  products
    .into_iter()
    .map(|p| p.as_ref().to_string())
    .filter(|p| seen.insert(p.clone()))
    .collect()
}

fn is_hit(product: &str, ingredient: &str) -> bool {
  product == ingredient
    || (ingredient.contains(product) && product.chars().count() > MIN_PARTIAL_LEN)
    || (product.contains(ingredient) && ingredient.chars().count() > MIN_PARTIAL_LEN)
}

/// 按检测到的产品为菜谱打分并排序
///
/// `products` 可以是任意产品名集合，也可以是 [`crate::detector::ProductStats`]。
/// 菜谱按语料给出的顺序（新到旧）遍历，得分相同时保持该顺序。
pub fn match_products<'a, I, S>(
  products: I,
  corpus: &'a [Recipe],
  normalizer: &Normalizer,
) -> Vec<MatchResult<'a>>
where
  I: IntoIterator<Item = S>,
  S: AsRef<str>,
{
  let products = distinct_products(products);
  if products.is_empty() {
    return Vec::new();
  }

  let normalized: Vec<(&str, String)> = products
    .iter()
    .map(|p| (p.as_str(), normalizer.normalize_product(p)))
    .collect();
  let total_products = products.len();

  let mut results: Vec<MatchResult<'a>> = corpus
    .iter()
    .filter_map(|recipe| {
      let ingredients: Vec<String> = recipe
        .ingredients
        .iter()
        .map(|ing| normalizer.normalize_ingredient(&ing.name))
        .collect();

      let matched_products: BTreeSet<String> = normalized
        .iter()
        .filter(|(_, product)| ingredients.iter().any(|ing| is_hit(product, ing)))
        .map(|(raw, _)| raw.to_string())
        .collect();

      let matches = matched_products.len();
      if matches == 0 {
        return None;
      }

      Some(MatchResult {
        recipe,
        matches,
        total_products,
        match_percentage: round_to(matches as f64 / total_products as f64 * 100.0, 1),
        matched_products,
      })
    })
    .collect();

  results.sort_by(|a, b| {
    b.matches
      .cmp(&a.matches)
      .then_with(|| b.match_percentage.total_cmp(&a.match_percentage))
  });
  results.truncate(MAX_RESULTS);

  debug!(
    "{} 个产品在 {} 个菜谱中匹配到 {} 个",
    total_products,
    corpus.len(),
    results.len()
  );

  results
}

// 该文件是 Cookly 项目的一部分。
// src/bin/benchmark_match.rs - 菜谱匹配耗时测试
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

use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use cookly::{config::Config, matcher::match_products, recipe::load_corpus, search::TEST_PRODUCTS};

/// 重复运行菜谱匹配并统计平均耗时
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 配置文件（JSON），用于读取规范化设置
  #[arg(long, value_name = "FILE")]
  pub config: Option<PathBuf>,
  /// 菜谱语料（JSON 数组）
  #[arg(long, value_name = "FILE")]
  pub recipes: PathBuf,
  /// 重复次数
  #[arg(long, default_value = "1000", value_name = "COUNT")]
  pub repeat: usize,
  /// 产品名，缺省使用测试列表
  #[arg(value_name = "PRODUCT")]
  pub products: Vec<String>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();
  anyhow::ensure!(args.repeat > 2, "重复次数必须大于 2");

  let corpus = load_corpus(&args.recipes)?;
  let normalizer = match &args.config {
    Some(path) => Config::from_file(path)?.normalizer,
    None => Config::default().normalizer,
  };
  let products: Vec<String> = if args.products.is_empty() {
    TEST_PRODUCTS.iter().map(|p| p.to_string()).collect()
  } else {
    args.products
  };
  info!("产品: {:?}", products);

  let mut times = Vec::with_capacity(args.repeat);
  for i in 0..args.repeat {
    let now = std::time::Instant::now();
    let results = match_products(&products, &corpus, &normalizer);
    let elapsed = now.elapsed();
    info!("({})匹配到 {} 个菜谱，耗时: {:.2?}", i, results.len(), elapsed);
    times.push(elapsed);
  }

  warn!(
    "平均匹配时间: {:.2?}",
    times.iter().skip(2).sum::<Duration>() / (times.len() - 2) as u32
  );

  Ok(())
}

// 该文件是 Cookly 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::info;

use args::{Args, Command};
use cookly::{config::Config, detector::Detector, recipe::load_corpus, search::RecipeSearch};

fn print_json<T: Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

fn load_config(args: &Args) -> Result<Config> {
  let mut config = match &args.config {
    Some(path) => Config::from_file(path)
      .with_context(|| format!("无法读取配置文件 {}", path.display()))?,
    None => Config::default(),
  };
  if let Some(model) = &args.model {
    config.model_path = model.clone();
  }
  if let Some(class_names) = &args.class_names {
    config.class_names_path = class_names.clone();
  }
  if let Some(confidence) = args.confidence {
    config.confidence_threshold = confidence;
  }
  Ok(config)
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();
  let config = load_config(&args)?;

  info!("模型文件路径: {}", config.model_path.display());
  info!("置信度阈值: {}", config.confidence_threshold);

  let detector = Detector::new(&config);
  let threshold = config.confidence_threshold;

  match args.command {
    Command::Status => {
      detector.warm_up();
      print_json(&detector.status())?;
    }
    Command::Detect { image } => {
      let search = RecipeSearch::new(&detector, &[], &config.normalizer, threshold);
      let report = search.detect(&image);
      info!("检测到 {} 个对象", report.detections.len());
      print_json(&report)?;
      anyhow::ensure!(report.success, "检测失败: {}", report.message);
    }
    Command::PhotoSearch { image, recipes } => {
      let corpus = load_corpus(&recipes)?;
      let bytes =
        std::fs::read(&image).with_context(|| format!("无法读取图像 {}", image.display()))?;
      let filename = image
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

      let search = RecipeSearch::new(&detector, &corpus, &config.normalizer, threshold);
      let response = search.upload(&config.upload, &filename, &bytes)?;
      print_json(&response)?;
    }
    Command::Search { recipes, products } => {
      let corpus = load_corpus(&recipes)?;
      let search = RecipeSearch::new(&detector, &corpus, &config.normalizer, threshold);
      print_json(&search.by_products(&products)?)?;
    }
    Command::TestSearch { recipes } => {
      let corpus = load_corpus(&recipes)?;
      let search = RecipeSearch::new(&detector, &corpus, &config.normalizer, threshold);
      print_json(&search.test_search()?)?;
    }
    Command::SelfTest => {
      let search = RecipeSearch::new(&detector, &[], &config.normalizer, threshold);
      print_json(&search.self_test(config.upload.dir.as_deref())?)?;
    }
  }

  Ok(())
}

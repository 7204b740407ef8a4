// 该文件是 Cookly 项目的一部分。
// src/args.rs - 命令行参数
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

use clap::{Parser, Subcommand};

/// Cookly 拍照找菜谱
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 配置文件（JSON）
  #[arg(long, value_name = "FILE")]
  pub config: Option<PathBuf>,

  /// 模型文件路径，覆盖配置文件
  #[arg(long, value_name = "MODEL")]
  pub model: Option<PathBuf>,

  /// 类别列表文件路径，覆盖配置文件
  #[arg(long, value_name = "FILE")]
  pub class_names: Option<PathBuf>,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, value_name = "THRESHOLD")]
  pub confidence: Option<f64>,

  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// 查看模型状态
  Status,
  /// 只做产品检测
  Detect {
    #[arg(long, value_name = "IMAGE")]
    image: PathBuf,
  },
  /// 按照片查找菜谱
  PhotoSearch {
    #[arg(long, value_name = "IMAGE")]
    image: PathBuf,
    /// 菜谱语料（JSON 数组）
    #[arg(long, value_name = "FILE")]
    recipes: PathBuf,
  },
  /// 按产品名查找菜谱
  Search {
    #[arg(long, value_name = "FILE")]
    recipes: PathBuf,
    #[arg(value_name = "PRODUCT")]
    products: Vec<String>,
  },
  /// 用固定产品列表测试匹配
  TestSearch {
    #[arg(long, value_name = "FILE")]
    recipes: PathBuf,
  },
  /// 用合成图像检查模型能否运行
  SelfTest,
}

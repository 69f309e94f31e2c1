// 该文件是 Carlane 项目的一部分。
// src/bin/carlane_inspect.rs - 数据集检查工具
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

use std::{collections::BTreeMap, path::PathBuf};

use anyhow::Result;
use clap::Parser;
use url::Url;

use carlane::{
  CarlaneConfig, CarlaneDatasetBuilder, FromUrl, ImageDataset, TrainingConfig, dump::MaskDump,
};
use tracing::{error, info};

/// Carlane 数据集检查工具
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 数据集地址，例如 carlane:///data/carlane?subset=val
  #[arg(long, value_name = "DATASET")]
  pub dataset: Url,
  /// 打印训练配置（JSON）
  #[arg(long)]
  pub show_config: bool,
  /// 光栅化全部掩码以检查类别标签
  #[arg(long)]
  pub verify: bool,
  /// 掩码导出目录
  #[arg(long, value_name = "DIR")]
  pub dump: Option<PathBuf>,
  /// 最多检查的图像数量
  #[arg(long, value_name = "COUNT")]
  pub limit: Option<usize>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();
  info!("数据集地址: {}", args.dataset);

  let config = CarlaneConfig;
  if args.show_config {
    println!("{}", serde_json::to_string_pretty(&config.snapshot())?);
  }

  let now = std::time::Instant::now();
  let dataset = CarlaneDatasetBuilder::from_url(&args.dataset)?.build()?;
  info!("加载完成，耗时: {:.2?}", now.elapsed());
  config.check_catalog(dataset.catalog());

  let mut histogram: BTreeMap<&str, usize> = BTreeMap::new();
  let mut instances = 0usize;
  for record in dataset.records() {
    for kind in record.polygon_types() {
      *histogram.entry(kind).or_default() += 1;
    }
    instances += record.instance_count();
  }
  info!(
    "{} 子集: {} 张图像, {} 个实例",
    dataset.subset(),
    dataset.len(),
    instances
  );
  for (kind, count) in histogram.iter() {
    let id = dataset
      .catalog()
      .class_id(kind)
      .map(|id| id.to_string())
      .unwrap_or_else(|| "?".to_string());
    info!("  - {} (id {}): {}", kind, id, count);
  }

  if !args.verify && args.dump.is_none() {
    return Ok(());
  }

  let dump = args.dump.as_ref().map(MaskDump::new);
  let limit = args.limit.unwrap_or(usize::MAX);
  let mut failures = 0usize;
  for image_id in dataset.image_ids().into_iter().take(limit) {
    let (mask, class_ids) = match dataset.load_mask(image_id) {
      Ok(result) => result,
      Err(e) => {
        error!("掩码生成失败: {}", e);
        failures += 1;
        continue;
      }
    };
    if let Some(dump) = dump.as_ref() {
      dump.save(image_id, &mask, &class_ids, dataset.catalog())?;
    }
  }

  if failures > 0 {
    anyhow::bail!("{} 张图像的掩码生成失败", failures);
  }
  info!("掩码检查完成，耗时: {:.2?}", now.elapsed());
  Ok(())
}

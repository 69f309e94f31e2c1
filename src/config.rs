// 该文件是 Carlane 项目的一部分。
// src/config.rs - 训练超参数配置
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

use serde::Serialize;
use tracing::{info, warn};

use crate::catalog::ClassCatalog;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backbone {
  Resnet50,
  Resnet101,
}

/// 训练框架的配置接口，未覆盖的项使用框架默认值
pub trait TrainingConfig {
  fn name(&self) -> &str;

  fn backbone(&self) -> Backbone {
    Backbone::Resnet101
  }

  fn images_per_gpu(&self) -> u32 {
    2
  }

  fn gpu_count(&self) -> u32 {
    1
  }

  /// 类别数（含背景）
  fn num_classes(&self) -> u32 {
    1
  }

  fn steps_per_epoch(&self) -> u32 {
    1000
  }

  fn validation_steps(&self) -> u32 {
    50
  }

  /// 低于该置信度的检测结果被丢弃
  fn detection_min_confidence(&self) -> f32 {
    0.7
  }

  fn detection_nms_threshold(&self) -> f32 {
    0.3
  }

  /// RGB 均值
  fn mean_pixel(&self) -> [f32; 3] {
    [123.7, 116.8, 103.9]
  }

  fn batch_size(&self) -> u32 {
    self.images_per_gpu() * self.gpu_count()
  }

  fn snapshot(&self) -> ConfigSnapshot {
    ConfigSnapshot {
      name: self.name().to_string(),
      backbone: self.backbone(),
      images_per_gpu: self.images_per_gpu(),
      gpu_count: self.gpu_count(),
      batch_size: self.batch_size(),
      num_classes: self.num_classes(),
      steps_per_epoch: self.steps_per_epoch(),
      validation_steps: self.validation_steps(),
      detection_min_confidence: self.detection_min_confidence(),
      detection_nms_threshold: self.detection_nms_threshold(),
      mean_pixel: self.mean_pixel(),
    }
  }
}

/// 配置的扁平快照，用于日志与导出
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigSnapshot {
  pub name: String,
  pub backbone: Backbone,
  pub images_per_gpu: u32,
  pub gpu_count: u32,
  pub batch_size: u32,
  pub num_classes: u32,
  pub steps_per_epoch: u32,
  pub validation_steps: u32,
  pub detection_min_confidence: f32,
  pub detection_nms_threshold: f32,
  pub mean_pixel: [f32; 3],
}

/// Carlane 数据集的训练配置
#[derive(Debug, Clone, Copy, Default)]
pub struct CarlaneConfig;

impl TrainingConfig for CarlaneConfig {
  fn name(&self) -> &str {
    "carlane"
  }

  fn backbone(&self) -> Backbone {
    Backbone::Resnet50
  }

  // 12GB 显存可容纳两张图像
  fn images_per_gpu(&self) -> u32 {
    2
  }

  fn gpu_count(&self) -> u32 {
    2
  }

  // 背景 + 21 个车道类别
  fn num_classes(&self) -> u32 {
    1 + 21
  }

  fn steps_per_epoch(&self) -> u32 {
    400
  }

  fn detection_min_confidence(&self) -> f32 {
    0.7
  }

  fn detection_nms_threshold(&self) -> f32 {
    0.3
  }

  fn mean_pixel(&self) -> [f32; 3] {
    [115.5, 115.9, 116.2]
  }
}

impl CarlaneConfig {
  /// 检查类别数是否与类别目录一致，不一致时仅记录警告
  pub fn check_catalog(&self, catalog: &ClassCatalog) -> bool {
    let expected = self.num_classes() as usize;
    if catalog.num_classes() != expected {
      warn!(
        "类别数不一致: 配置为 {}, 类别目录为 {}（含背景）",
        expected,
        catalog.num_classes()
      );
      return false;
    }
    info!("类别数检查通过: {}", expected);
    true
  }
}

// 该文件是 Carlane 项目的一部分。
// src/annotation.rs - 清单与标注文件格式
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

use std::path::{Path, PathBuf};

use serde::{Deserialize, de::DeserializeOwned};
use tracing::debug;

use crate::{
  dataset::Subset,
  error::{DatasetError, DatasetResult},
};

pub const MANIFEST_FILE_NAME: &str = "train_val.json";
pub const ANNOTATION_EXTENSION: &str = "json";
pub const IMAGE_EXTENSION: &str = "jpg";

/// 数据集清单 `train_val.json`
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
  /// 训练集图像标识
  pub train: Vec<String>,
  /// 验证集图像标识
  pub val: Vec<String>,
  /// 类别列表: `[class_name, class_id]`
  pub classes: Vec<(String, u32)>,
}

impl Manifest {
  pub fn path(dataset_dir: &Path) -> PathBuf {
    dataset_dir.join(MANIFEST_FILE_NAME)
  }

  /// 读取 `<dataset_dir>/train_val.json`
  pub fn read(dataset_dir: &Path) -> DatasetResult<Self> {
    let manifest: Manifest = read_json(&Self::path(dataset_dir))?;
    debug!(
      "清单读取完成: train={}, val={}, classes={}",
      manifest.train.len(),
      manifest.val.len(),
      manifest.classes.len()
    );
    Ok(manifest)
  }

  pub fn subset(&self, subset: Subset) -> &[String] {
    match subset {
      Subset::Train => &self.train,
      Subset::Val => &self.val,
    }
  }
}

/// 单张图像的标注文件 `<image_id>.json`
#[derive(Debug, Clone, Deserialize)]
pub struct Annotation {
  pub datalist: Vec<AnnotationEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnnotationEntry {
  /// 多边形顶点
  pub arr: Vec<Point>,
  /// 类别名称
  #[serde(rename = "type")]
  pub kind: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Point {
  pub x: f64,
  pub y: f64,
}

impl Annotation {
  pub fn path(dataset_dir: &Path, image_id: &str) -> PathBuf {
    dataset_dir.join(format!("{image_id}.{ANNOTATION_EXTENSION}"))
  }

  pub fn read(dataset_dir: &Path, image_id: &str) -> DatasetResult<Self> {
    read_json(&Self::path(dataset_dir, image_id))
  }
}

pub fn image_path(dataset_dir: &Path, image_id: &str) -> PathBuf {
  dataset_dir.join(format!("{image_id}.{IMAGE_EXTENSION}"))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> DatasetResult<T> {
  let bytes = std::fs::read(path).map_err(|e| DatasetError::io(path, e))?;
  serde_json::from_slice(&bytes).map_err(|e| DatasetError::json(path, e))
}

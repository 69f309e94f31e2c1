// 该文件是 Carlane 项目的一部分。
// src/error.rs - 错误定义
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

use thiserror::Error;

pub type DatasetResult<T> = Result<T, DatasetError>;

#[derive(Error, Debug)]
pub enum DatasetError {
  #[error("I/O 错误 {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("JSON 解析错误 {path}: {source}")]
  Json {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
  #[error("图像读取错误 {path}: {source}")]
  Image {
    path: PathBuf,
    #[source]
    source: image::ImageError,
  },
  #[error("无效的数据子集: {0}（仅支持 train 或 val）")]
  InvalidSubset(String),
  #[error("未索引的图像: {0}")]
  UnknownImage(String),
  #[error("重复的图像标识: {0}")]
  DuplicateImage(String),
  #[error("图像 {image_id} 中存在未知类别: {label}")]
  UnknownClass { image_id: String, label: String },
  #[error("重复注册的类别: {tag}/{id} ({name})")]
  DuplicateClass {
    tag: String,
    id: u32,
    name: String,
  },
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("无效的数据集 URI: {0}")]
  InvalidUrl(String),
}

impl DatasetError {
  pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    DatasetError::Io {
      path: path.into(),
      source,
    }
  }

  pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
    DatasetError::Json {
      path: path.into(),
      source,
    }
  }

  pub(crate) fn image(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
    DatasetError::Image {
      path: path.into(),
      source,
    }
  }
}

// 该文件是 Carlane 项目的一部分。
// src/catalog.rs - 类别目录
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

use std::collections::HashMap;

use tracing::debug;

use crate::{
  CARLANE_SOURCE,
  annotation::Manifest,
  error::{DatasetError, DatasetResult},
};

pub const BACKGROUND_ID: u32 = 0;
pub const BACKGROUND_NAME: &str = "BG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassInfo {
  pub source: String,
  pub id: u32,
  pub name: String,
}

/// 类别目录
///
/// 背景类（id 0）始终位于首位，且不计入 [`ClassCatalog::len`]。
/// 构建完成后不再修改，训练集与验证集通过 `Arc<ClassCatalog>` 共享同一份目录。
#[derive(Debug, Clone)]
pub struct ClassCatalog {
  classes: Vec<ClassInfo>,
  class_map: HashMap<String, u32>,
}

impl Default for ClassCatalog {
  fn default() -> Self {
    Self::new()
  }
}

impl ClassCatalog {
  pub fn new() -> Self {
    Self {
      classes: vec![ClassInfo {
        source: String::new(),
        id: BACKGROUND_ID,
        name: BACKGROUND_NAME.to_string(),
      }],
      class_map: HashMap::new(),
    }
  }

  /// 从清单的 `classes` 列表构建目录，全部登记在 `carlane` 来源下
  pub fn from_manifest(manifest: &Manifest) -> DatasetResult<Self> {
    let mut catalog = Self::new();
    for (name, id) in manifest.classes.iter() {
      catalog.add_class(CARLANE_SOURCE, *id, name)?;
    }
    debug!("类别目录构建完成: {} 个类别", catalog.len());
    Ok(catalog)
  }

  /// 登记一个类别；同一来源下重复的 id 或名称视为调用方错误
  pub fn add_class(&mut self, source: &str, id: u32, name: &str) -> DatasetResult<()> {
    let duplicate = self
      .classes
      .iter()
      .any(|c| c.source == source && (c.id == id || c.name == name));
    if duplicate {
      return Err(DatasetError::DuplicateClass {
        tag: source.to_string(),
        id,
        name: name.to_string(),
      });
    }

    self.classes.push(ClassInfo {
      source: source.to_string(),
      id,
      name: name.to_string(),
    });
    if source == CARLANE_SOURCE {
      self.class_map.insert(name.to_string(), id);
    }
    Ok(())
  }

  pub fn class_id(&self, name: &str) -> Option<u32> {
    self.class_map.get(name).copied()
  }

  pub fn class_name(&self, id: u32) -> Option<&str> {
    self
      .classes
      .iter()
      .find(|c| c.id == id)
      .map(|c| c.name.as_str())
  }

  /// 已登记类别数（不含背景）
  pub fn len(&self) -> usize {
    self.classes.len() - 1
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// 模型输出层所需类别数（含背景）
  pub fn num_classes(&self) -> usize {
    self.classes.len()
  }

  /// 不含背景的类别
  pub fn iter(&self) -> impl Iterator<Item = &ClassInfo> {
    self.classes.iter().skip(1)
  }
}

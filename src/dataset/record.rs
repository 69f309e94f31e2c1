// 该文件是 Carlane 项目的一部分。
// src/dataset/record.rs - 图像记录
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

use crate::annotation::{Annotation, Point};

/// 图像像素坐标系下的多边形顶点序列
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
  points: Box<[Point]>,
}

impl Polygon {
  pub fn new(points: Vec<Point>) -> Self {
    Self {
      points: points.into_boxed_slice(),
    }
  }

  pub fn points(&self) -> &[Point] {
    &self.points
  }

  pub fn len(&self) -> usize {
    self.points.len()
  }

  pub fn is_empty(&self) -> bool {
    self.points.is_empty()
  }
}

/// 一个标注实例：多边形及其类别名称
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
  pub polygon: Polygon,
  pub kind: String,
}

/// 数据子集中的一张图像
///
/// 只保存多边形坐标，掩码在 [`crate::dataset::CarlaneDataset::load_mask`] 时按需生成。
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
  pub id: String,
  pub source: String,
  pub path: PathBuf,
  pub width: u32,
  pub height: u32,
  pub instances: Vec<Instance>,
}

impl ImageRecord {
  pub fn polygons(&self) -> impl ExactSizeIterator<Item = &Polygon> {
    self.instances.iter().map(|i| &i.polygon)
  }

  pub fn polygon_types(&self) -> impl ExactSizeIterator<Item = &str> {
    self.instances.iter().map(|i| i.kind.as_str())
  }

  pub fn instance_count(&self) -> usize {
    self.instances.len()
  }
}

impl From<Annotation> for Vec<Instance> {
  fn from(annotation: Annotation) -> Self {
    annotation
      .datalist
      .into_iter()
      .map(|entry| Instance {
        polygon: Polygon::new(entry.arr),
        kind: entry.kind,
      })
      .collect()
  }
}

// 该文件是 Carlane 项目的一部分。
// src/dataset.rs - 数据集索引
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

use std::{
  collections::HashMap,
  fmt,
  path::Path,
  str::FromStr,
  sync::Arc,
};

use image::ImageReader;
use tracing::{debug, info, warn};

use crate::{
  CARLANE_SOURCE,
  annotation::{self, Annotation, Manifest},
  catalog::ClassCatalog,
  error::{DatasetError, DatasetResult},
  mask::{MaskTensor, rasterize_instances},
};

mod builder;
mod record;

pub use self::builder::CarlaneDatasetBuilder;
pub use self::record::{ImageRecord, Instance, Polygon};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subset {
  Train,
  Val,
}

impl Subset {
  pub fn as_str(&self) -> &'static str {
    match self {
      Subset::Train => "train",
      Subset::Val => "val",
    }
  }
}

impl fmt::Display for Subset {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Subset {
  type Err = DatasetError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "train" => Ok(Subset::Train),
      "val" => Ok(Subset::Val),
      other => Err(DatasetError::InvalidSubset(other.to_string())),
    }
  }
}

/// 单张图像加载失败时的处理方式；清单本身读取失败始终终止加载
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
  /// 终止整个子集的加载
  #[default]
  Abort,
  /// 记录警告并跳过该图像
  Skip,
}

impl FromStr for FailurePolicy {
  type Err = DatasetError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "abort" => Ok(FailurePolicy::Abort),
      "skip" => Ok(FailurePolicy::Skip),
      other => Err(DatasetError::InvalidUrl(format!("未知的失败处理方式: {other}"))),
    }
  }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
  pub on_error: FailurePolicy,
}

/// 训练框架所需的数据集接口
pub trait ImageDataset {
  fn add_image(&mut self, record: ImageRecord) -> DatasetResult<()>;

  fn image_info(&self, image_id: &str) -> Option<&ImageRecord>;

  fn image_ids(&self) -> Vec<&str>;

  /// 生成实例掩码及对应的类别 id
  fn load_mask(&self, image_id: &str) -> DatasetResult<(MaskTensor, Box<[u32]>)>;

  /// 图像的引用路径，默认无
  fn image_reference(&self, image_id: &str) -> DatasetResult<Option<&Path>> {
    let record = self
      .image_info(image_id)
      .ok_or_else(|| DatasetError::UnknownImage(image_id.to_string()))?;
    Ok(default_image_reference(record))
  }
}

pub fn default_image_reference(_record: &ImageRecord) -> Option<&Path> {
  None
}

/// Carlane 数据集的一个子集（train 或 val）
#[derive(Debug, Clone)]
pub struct CarlaneDataset {
  subset: Subset,
  catalog: Arc<ClassCatalog>,
  image_info: Vec<ImageRecord>,
  index: HashMap<String, usize>,
}

impl CarlaneDataset {
  pub fn new(subset: Subset, catalog: Arc<ClassCatalog>) -> Self {
    Self {
      subset,
      catalog,
      image_info: Vec::new(),
      index: HashMap::new(),
    }
  }

  /// 读取清单、构建类别目录并加载指定子集
  pub fn load(dataset_dir: impl AsRef<Path>, subset: Subset) -> DatasetResult<Self> {
    let dataset_dir = dataset_dir.as_ref();
    let manifest = Manifest::read(dataset_dir)?;
    let catalog = Arc::new(ClassCatalog::from_manifest(&manifest)?);
    Self::load_from_manifest(dataset_dir, &manifest, subset, catalog, LoadOptions::default())
  }

  /// 使用已有的类别目录加载指定子集，train 与 val 可共享同一目录
  pub fn load_with_catalog(
    dataset_dir: impl AsRef<Path>,
    subset: Subset,
    catalog: Arc<ClassCatalog>,
    options: LoadOptions,
  ) -> DatasetResult<Self> {
    let dataset_dir = dataset_dir.as_ref();
    let manifest = Manifest::read(dataset_dir)?;
    Self::load_from_manifest(dataset_dir, &manifest, subset, catalog, options)
  }

  fn load_from_manifest(
    dataset_dir: &Path,
    manifest: &Manifest,
    subset: Subset,
    catalog: Arc<ClassCatalog>,
    options: LoadOptions,
  ) -> DatasetResult<Self> {
    let image_ids = manifest.subset(subset);
    info!(
      "开始加载 {} 子集: {} 张图像, 目录 {}",
      subset,
      image_ids.len(),
      dataset_dir.display()
    );

    let mut dataset = Self::new(subset, catalog);
    let mut skipped = 0usize;
    for image_id in image_ids {
      let record = match load_record(dataset_dir, image_id) {
        Ok(record) => record,
        Err(e) if options.on_error == FailurePolicy::Skip => {
          warn!("跳过图像 {}: {}", image_id, e);
          skipped += 1;
          continue;
        }
        Err(e) => return Err(e),
      };
      dataset.add_image(record)?;
    }

    info!(
      "{} 子集加载完成: {} 张图像, 跳过 {} 张",
      subset,
      dataset.len(),
      skipped
    );
    Ok(dataset)
  }

  pub fn subset(&self) -> Subset {
    self.subset
  }

  pub fn catalog(&self) -> &Arc<ClassCatalog> {
    &self.catalog
  }

  pub fn records(&self) -> &[ImageRecord] {
    &self.image_info
  }

  pub fn len(&self) -> usize {
    self.image_info.len()
  }

  pub fn is_empty(&self) -> bool {
    self.image_info.is_empty()
  }
}

impl ImageDataset for CarlaneDataset {
  fn add_image(&mut self, record: ImageRecord) -> DatasetResult<()> {
    if self.index.contains_key(&record.id) {
      return Err(DatasetError::DuplicateImage(record.id));
    }
    self.index.insert(record.id.clone(), self.image_info.len());
    self.image_info.push(record);
    Ok(())
  }

  fn image_info(&self, image_id: &str) -> Option<&ImageRecord> {
    self.index.get(image_id).map(|&i| &self.image_info[i])
  }

  fn image_ids(&self) -> Vec<&str> {
    self.image_info.iter().map(|r| r.id.as_str()).collect()
  }

  fn load_mask(&self, image_id: &str) -> DatasetResult<(MaskTensor, Box<[u32]>)> {
    let record = self
      .image_info(image_id)
      .ok_or_else(|| DatasetError::UnknownImage(image_id.to_string()))?;

    let class_ids = record
      .polygon_types()
      .map(|label| {
        self
          .catalog
          .class_id(label)
          .ok_or_else(|| DatasetError::UnknownClass {
            image_id: image_id.to_string(),
            label: label.to_string(),
          })
      })
      .collect::<DatasetResult<Box<[u32]>>>()?;

    let mask = rasterize_instances(record);
    debug!(
      "图像 {} 掩码生成完成: {:?}",
      image_id,
      mask.shape()
    );
    Ok((mask, class_ids))
  }

  fn image_reference(&self, image_id: &str) -> DatasetResult<Option<&Path>> {
    let record = self
      .image_info(image_id)
      .ok_or_else(|| DatasetError::UnknownImage(image_id.to_string()))?;
    if record.source == CARLANE_SOURCE {
      Ok(Some(record.path.as_path()))
    } else {
      Ok(default_image_reference(record))
    }
  }
}

/// 读取单张图像的标注与图像尺寸（只解析文件头，不解码像素）
fn load_record(dataset_dir: &Path, image_id: &str) -> DatasetResult<ImageRecord> {
  let annotation = Annotation::read(dataset_dir, image_id)?;
  let path = annotation::image_path(dataset_dir, image_id);
  let (width, height) = image_dimensions(&path)?;

  Ok(ImageRecord {
    id: image_id.to_string(),
    source: CARLANE_SOURCE.to_string(),
    path,
    width,
    height,
    instances: annotation.into(),
  })
}

fn image_dimensions(path: &Path) -> DatasetResult<(u32, u32)> {
  ImageReader::open(path)
    .map_err(|e| DatasetError::io(path, e))?
    .with_guessed_format()
    .map_err(|e| DatasetError::io(path, e))?
    .into_dimensions()
    .map_err(|e| DatasetError::image(path, e))
}

#[cfg(test)]
mod tests {
  use std::path::PathBuf;

  use super::*;
  use crate::annotation::Point;

  fn record(id: &str, source: &str, kinds: &[&str]) -> ImageRecord {
    ImageRecord {
      id: id.to_string(),
      source: source.to_string(),
      path: PathBuf::from(format!("/data/{id}.jpg")),
      width: 10,
      height: 10,
      instances: kinds
        .iter()
        .map(|kind| Instance {
          polygon: Polygon::new(vec![
            Point { x: 2.0, y: 2.0 },
            Point { x: 8.0, y: 2.0 },
            Point { x: 8.0, y: 6.0 },
            Point { x: 2.0, y: 6.0 },
          ]),
          kind: kind.to_string(),
        })
        .collect(),
    }
  }

  fn dataset() -> CarlaneDataset {
    let mut catalog = ClassCatalog::new();
    catalog.add_class(CARLANE_SOURCE, 1, "lane").unwrap();
    catalog.add_class(CARLANE_SOURCE, 2, "marker").unwrap();
    CarlaneDataset::new(Subset::Train, Arc::new(catalog))
  }

  #[test]
  fn subset_parsing() {
    assert_eq!("train".parse::<Subset>().unwrap(), Subset::Train);
    assert_eq!("val".parse::<Subset>().unwrap(), Subset::Val);
    assert!(matches!(
      "test".parse::<Subset>(),
      Err(DatasetError::InvalidSubset(s)) if s == "test"
    ));
  }

  #[test]
  fn load_mask_resolves_class_ids_in_order() {
    let mut dataset = dataset();
    dataset
      .add_image(record("img1", CARLANE_SOURCE, &["marker", "lane"]))
      .unwrap();

    let (mask, class_ids) = dataset.load_mask("img1").unwrap();
    assert_eq!(mask.shape(), [10, 10, 2]);
    assert_eq!(&*class_ids, &[2, 1]);
    assert_eq!(mask.area(0), 7 * 5);
    assert_eq!(mask.area(1), 7 * 5);
  }

  #[test]
  fn load_mask_is_deterministic() {
    let mut dataset = dataset();
    dataset
      .add_image(record("img1", CARLANE_SOURCE, &["lane", "marker", "lane"]))
      .unwrap();

    let first = dataset.load_mask("img1").unwrap();
    let second = dataset.load_mask("img1").unwrap();
    assert_eq!(first, second);
  }

  #[test]
  fn unknown_class_names_image_and_label() {
    let mut dataset = dataset();
    dataset
      .add_image(record("img7", CARLANE_SOURCE, &["lane", "crosswalk"]))
      .unwrap();

    match dataset.load_mask("img7").unwrap_err() {
      DatasetError::UnknownClass { image_id, label } => {
        assert_eq!(image_id, "img7");
        assert_eq!(label, "crosswalk");
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn unknown_image_is_lookup_error() {
    let dataset = dataset();
    assert!(matches!(
      dataset.load_mask("missing"),
      Err(DatasetError::UnknownImage(_))
    ));
    assert!(matches!(
      dataset.image_reference("missing"),
      Err(DatasetError::UnknownImage(_))
    ));
  }

  #[test]
  fn image_reference_delegates_for_foreign_sources() {
    let mut dataset = dataset();
    dataset.add_image(record("own", CARLANE_SOURCE, &[])).unwrap();
    dataset.add_image(record("other", "coco", &[])).unwrap();

    assert_eq!(
      dataset.image_reference("own").unwrap(),
      Some(Path::new("/data/own.jpg"))
    );
    let foreign = dataset.image_info("other").unwrap();
    assert_eq!(
      dataset.image_reference("other").unwrap(),
      default_image_reference(foreign)
    );
    assert_eq!(dataset.image_reference("other").unwrap(), None);
  }

  #[test]
  fn duplicate_image_id_is_rejected() {
    let mut dataset = dataset();
    dataset.add_image(record("img1", CARLANE_SOURCE, &[])).unwrap();
    assert!(matches!(
      dataset.add_image(record("img1", CARLANE_SOURCE, &["lane"])),
      Err(DatasetError::DuplicateImage(_))
    ));
    assert_eq!(dataset.image_ids(), vec!["img1"]);
  }

  #[test]
  fn image_without_polygons_yields_empty_mask() {
    let mut dataset = dataset();
    dataset.add_image(record("empty", CARLANE_SOURCE, &[])).unwrap();
    let (mask, class_ids) = dataset.load_mask("empty").unwrap();
    assert_eq!(mask.shape(), [10, 10, 0]);
    assert!(class_ids.is_empty());
  }
}

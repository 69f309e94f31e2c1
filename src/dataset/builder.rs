// 该文件是 Carlane 项目的一部分。
// src/dataset/builder.rs - 从 URI 构建数据集
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
  path::{Path, PathBuf},
  sync::Arc,
};

use tracing::{error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  annotation::Manifest,
  catalog::ClassCatalog,
  dataset::{CarlaneDataset, FailurePolicy, LoadOptions, Subset},
  error::{DatasetError, DatasetResult},
};

/// 数据集构建器
///
/// URI 形如 `carlane:///data/carlane?subset=val&on_error=skip`，
/// `subset` 默认为 `train`，`on_error` 默认为 `abort`。
#[derive(Debug, Clone)]
pub struct CarlaneDatasetBuilder {
  dataset_dir: PathBuf,
  subset: Subset,
  options: LoadOptions,
  catalog: Option<Arc<ClassCatalog>>,
}

impl FromUrlWithScheme for CarlaneDatasetBuilder {
  const SCHEME: &'static str = "carlane";
}

impl FromUrl for CarlaneDatasetBuilder {
  type Error = DatasetError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(DatasetError::SchemeMismatch(format!(
        "期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }

    let path = urlencoding::decode(url.path())
      .map_err(|e| DatasetError::InvalidUrl(format!("路径解码失败: {e}")))?;
    if path.is_empty() {
      return Err(DatasetError::InvalidUrl(format!("缺少数据集目录: {url}")));
    }

    let mut builder = Self::new(&*path);
    for (key, value) in url.query_pairs() {
      match &*key {
        "subset" => builder.subset = value.parse()?,
        "on_error" => builder.options.on_error = value.parse()?,
        other => {
          return Err(DatasetError::InvalidUrl(format!("未知的参数: {other}")));
        }
      }
    }
    Ok(builder)
  }
}

impl CarlaneDatasetBuilder {
  pub fn new(dataset_dir: impl AsRef<Path>) -> Self {
    Self {
      dataset_dir: dataset_dir.as_ref().to_path_buf(),
      subset: Subset::Train,
      options: LoadOptions::default(),
      catalog: None,
    }
  }

  pub fn with_subset(mut self, subset: Subset) -> Self {
    self.subset = subset;
    self
  }

  pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
    self.options.on_error = policy;
    self
  }

  /// 复用已有的类别目录，保证 train 与 val 的类别 id 一致
  pub fn with_catalog(mut self, catalog: Arc<ClassCatalog>) -> Self {
    self.catalog = Some(catalog);
    self
  }

  pub fn dataset_dir(&self) -> &Path {
    &self.dataset_dir
  }

  pub fn subset(&self) -> Subset {
    self.subset
  }

  pub fn build(self) -> DatasetResult<CarlaneDataset> {
    info!(
      "加载数据集: {} ({})",
      self.dataset_dir.display(),
      self.subset
    );
    let manifest = Manifest::read(&self.dataset_dir)?;
    let catalog = match self.catalog {
      Some(catalog) => catalog,
      None => Arc::new(ClassCatalog::from_manifest(&manifest)?),
    };
    CarlaneDataset::load_from_manifest(
      &self.dataset_dir,
      &manifest,
      self.subset,
      catalog,
      self.options,
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn url_selects_subset_and_policy() {
    let url = Url::parse("carlane:///data/car%20lane?subset=val&on_error=skip").unwrap();
    let builder = CarlaneDatasetBuilder::from_url(&url).unwrap();

    assert_eq!(builder.dataset_dir(), Path::new("/data/car lane"));
    assert_eq!(builder.subset(), Subset::Val);
    assert_eq!(builder.options.on_error, FailurePolicy::Skip);
  }

  #[test]
  fn url_defaults_to_train_and_abort() {
    let url = Url::parse("carlane:///data/carlane").unwrap();
    let builder = CarlaneDatasetBuilder::from_url(&url).unwrap();

    assert_eq!(builder.subset(), Subset::Train);
    assert_eq!(builder.options.on_error, FailurePolicy::Abort);
  }

  #[test]
  fn url_rejects_foreign_scheme_and_bad_subset() {
    let url = Url::parse("image:///data/carlane").unwrap();
    assert!(matches!(
      CarlaneDatasetBuilder::from_url(&url),
      Err(DatasetError::SchemeMismatch(_))
    ));

    let url = Url::parse("carlane:///data/carlane?subset=test").unwrap();
    assert!(matches!(
      CarlaneDatasetBuilder::from_url(&url),
      Err(DatasetError::InvalidSubset(_))
    ));
  }
}

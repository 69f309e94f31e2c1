// 该文件是 Carlane 项目的一部分。
// src/dump.rs - 实例掩码导出
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

use tracing::info;

use crate::{
  catalog::ClassCatalog,
  error::{DatasetError, DatasetResult},
  mask::MaskTensor,
};

/// 将实例掩码逐个保存为 PNG：`<dir>/<image_id>/<index>-<class_name>.png`
pub struct MaskDump {
  dir: PathBuf,
}

impl MaskDump {
  pub fn new(dir: impl AsRef<Path>) -> Self {
    Self {
      dir: dir.as_ref().to_path_buf(),
    }
  }

  pub fn save(
    &self,
    image_id: &str,
    mask: &MaskTensor,
    class_ids: &[u32],
    catalog: &ClassCatalog,
  ) -> DatasetResult<Vec<PathBuf>> {
    let directory = self.dir.join(image_id);
    std::fs::create_dir_all(&directory).map_err(|e| DatasetError::io(&directory, e))?;

    let mut paths = Vec::with_capacity(mask.count());
    for (i, class_id) in class_ids.iter().enumerate().take(mask.count()) {
      let name = catalog.class_name(*class_id).unwrap_or("unknown");
      let path = directory.join(format!("{:03}-{}.png", i, name));
      mask
        .to_gray_image(i)
        .save(&path)
        .map_err(|e| DatasetError::image(&path, e))?;
      paths.push(path);
    }

    info!("保存 {} 个实例掩码到目录: {}", paths.len(), directory.display());
    Ok(paths)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::CARLANE_SOURCE;

  #[test]
  fn writes_one_png_per_instance() {
    let dir = tempfile::tempdir().unwrap();
    let mut catalog = ClassCatalog::new();
    catalog.add_class(CARLANE_SOURCE, 4, "lane").unwrap();

    let mask = MaskTensor::with_shape(3, 3, 2);
    let paths = MaskDump::new(dir.path())
      .save("img1", &mask, &[4, 4], &catalog)
      .unwrap();

    assert_eq!(paths.len(), 2);
    assert!(paths[0].ends_with("img1/000-lane.png"));
    let saved = image::open(&paths[1]).unwrap().to_luma8();
    assert_eq!(saved.dimensions(), (3, 3));
  }
}

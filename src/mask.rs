// 该文件是 Carlane 项目的一部分。
// src/mask.rs - 多边形实例掩码光栅化
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

use image::{GrayImage, Luma};
use imageproc::{
  drawing::{draw_line_segment_mut, draw_polygon_mut},
  point::Point,
};

use crate::dataset::{ImageRecord, Polygon};

/// 单通道画布上的前景值
const FOREGROUND: Luma<u8> = Luma([1]);
/// 导出可视化图像时的前景灰度
const VISIBLE_FOREGROUND: u8 = 255;
// 限制坐标范围，避免扫描线插值时 i32 溢出
const COORD_LIMIT: f64 = (1 << 24) as f64;

/// 实例掩码张量，形状为 `[height, width, count]`，HWC 排布
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskTensor {
  height: usize,
  width: usize,
  count: usize,
  data: Box<[bool]>,
}

impl MaskTensor {
  pub fn with_shape(height: usize, width: usize, count: usize) -> Self {
    Self {
      height,
      width,
      count,
      data: vec![false; height * width * count].into_boxed_slice(),
    }
  }

  /// `[height, width, count]`
  pub fn shape(&self) -> [usize; 3] {
    [self.height, self.width, self.count]
  }

  pub fn height(&self) -> usize {
    self.height
  }

  pub fn width(&self) -> usize {
    self.width
  }

  pub fn count(&self) -> usize {
    self.count
  }

  fn index(&self, y: usize, x: usize, i: usize) -> usize {
    (y * self.width + x) * self.count + i
  }

  pub fn get(&self, y: usize, x: usize, i: usize) -> bool {
    assert!(y < self.height && x < self.width && i < self.count);
    self.data[self.index(y, x, i)]
  }

  /// 第 `i` 个实例的前景像素数
  pub fn area(&self, i: usize) -> usize {
    (0..self.height * self.width)
      .filter(|p| self.data[p * self.count + i])
      .count()
  }

  /// 将第 `i` 个实例转为 0/255 灰度图
  pub fn to_gray_image(&self, i: usize) -> GrayImage {
    GrayImage::from_fn(self.width as u32, self.height as u32, |x, y| {
      if self.get(y as usize, x as usize, i) {
        Luma([VISIBLE_FOREGROUND])
      } else {
        Luma([0])
      }
    })
  }

  pub fn as_slice(&self) -> &[bool] {
    &self.data
  }

  fn copy_channel(&mut self, i: usize, canvas: &GrayImage) {
    for (x, y, pixel) in canvas.enumerate_pixels() {
      if pixel[0] != 0 {
        let index = self.index(y as usize, x as usize, i);
        self.data[index] = true;
      }
    }
  }
}

/// 将多边形（含边界）填充到 `width x height` 的单通道画布上，前景值为 1
///
/// 坐标四舍五入到最近像素，超出画布的部分被裁剪。
pub fn rasterize_polygon(polygon: &Polygon, width: u32, height: u32) -> GrayImage {
  let mut canvas = GrayImage::new(width, height);
  draw_filled_polygon(&mut canvas, polygon);
  canvas
}

/// 依次光栅化记录中的全部多边形，第 `i` 个多边形写入第 `i` 个通道
pub fn rasterize_instances(record: &ImageRecord) -> MaskTensor {
  let polygons = record.polygons();
  let mut mask = MaskTensor::with_shape(
    record.height as usize,
    record.width as usize,
    polygons.len(),
  );
  for (i, polygon) in polygons.enumerate() {
    let canvas = rasterize_polygon(polygon, record.width, record.height);
    mask.copy_channel(i, &canvas);
  }
  mask
}

fn to_pixel(v: f64) -> i32 {
  v.round().clamp(-COORD_LIMIT, COORD_LIMIT) as i32
}

fn draw_filled_polygon(canvas: &mut GrayImage, polygon: &Polygon) {
  let mut points: Vec<Point<i32>> = polygon
    .points()
    .iter()
    .map(|p| Point::new(to_pixel(p.x), to_pixel(p.y)))
    .collect();
  points.dedup();
  // imageproc 要求首尾顶点不同
  while points.len() > 1 && points.first() == points.last() {
    points.pop();
  }

  match points.as_slice() {
    [] => {}
    [p] => {
      if p.x >= 0 && p.y >= 0 && (p.x as u32) < canvas.width() && (p.y as u32) < canvas.height() {
        canvas.put_pixel(p.x as u32, p.y as u32, FOREGROUND);
      }
    }
    [a, b] => draw_line_segment_mut(
      canvas,
      (a.x as f32, a.y as f32),
      (b.x as f32, b.y as f32),
      FOREGROUND,
    ),
    _ => draw_polygon_mut(canvas, &points, FOREGROUND),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::annotation::Point as Vertex;

  fn polygon(points: &[(f64, f64)]) -> Polygon {
    Polygon::new(points.iter().map(|&(x, y)| Vertex { x, y }).collect())
  }

  fn lit_pixels(canvas: &GrayImage) -> Vec<(u32, u32)> {
    canvas
      .enumerate_pixels()
      .filter(|(_, _, p)| p[0] != 0)
      .map(|(x, y, _)| (x, y))
      .collect()
  }

  #[test]
  fn rectangle_fills_inclusive_boundary() {
    let canvas = rasterize_polygon(
      &polygon(&[(2.0, 2.0), (8.0, 2.0), (8.0, 6.0), (2.0, 6.0)]),
      10,
      10,
    );

    for (x, y, pixel) in canvas.enumerate_pixels() {
      let inside = (2..=8).contains(&x) && (2..=6).contains(&y);
      assert_eq!(pixel[0], inside as u8, "pixel ({x}, {y})");
    }
  }

  #[test]
  fn closing_vertex_is_tolerated() {
    let open = rasterize_polygon(
      &polygon(&[(1.0, 1.0), (5.0, 1.0), (5.0, 4.0), (1.0, 4.0)]),
      8,
      8,
    );
    let closed = rasterize_polygon(
      &polygon(&[(1.0, 1.0), (5.0, 1.0), (5.0, 4.0), (1.0, 4.0), (1.0, 1.0)]),
      8,
      8,
    );
    assert_eq!(open, closed);
  }

  #[test]
  fn out_of_bounds_polygon_is_clipped() {
    let canvas = rasterize_polygon(
      &polygon(&[(-5.0, -5.0), (3.0, -5.0), (3.0, 2.0), (-5.0, 2.0)]),
      6,
      6,
    );
    let lit = lit_pixels(&canvas);
    assert_eq!(lit.len(), 4 * 3);
    assert!(lit.iter().all(|&(x, y)| x <= 3 && y <= 2));
  }

  #[test]
  fn degenerate_polygons() {
    assert!(lit_pixels(&rasterize_polygon(&polygon(&[]), 4, 4)).is_empty());
    assert_eq!(
      lit_pixels(&rasterize_polygon(&polygon(&[(2.2, 1.6)]), 4, 4)),
      vec![(2, 2)]
    );
    let line = lit_pixels(&rasterize_polygon(&polygon(&[(0.0, 1.0), (3.0, 1.0)]), 4, 4));
    assert_eq!(line, vec![(0, 1), (1, 1), (2, 1), (3, 1)]);
  }

  #[test]
  fn tensor_channels_follow_polygon_order() {
    let mut mask = MaskTensor::with_shape(4, 5, 2);
    let mut canvas = GrayImage::new(5, 4);
    canvas.put_pixel(4, 3, FOREGROUND);
    mask.copy_channel(1, &canvas);

    assert_eq!(mask.shape(), [4, 5, 2]);
    assert!(mask.get(3, 4, 1));
    assert!(!mask.get(3, 4, 0));
    assert_eq!(mask.area(0), 0);
    assert_eq!(mask.area(1), 1);
    assert_eq!(mask.to_gray_image(1).get_pixel(4, 3)[0], VISIBLE_FOREGROUND);
  }
}

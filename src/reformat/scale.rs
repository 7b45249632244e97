// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::image::*;
use crate::internal_utils::*;
use crate::*;

const MAX_SCALED_DIMENSION: u32 = 16384;

impl Image {
    /// Resamples all allocated planes to the given dimensions with a
    /// bilinear filter.
    pub fn scale(&mut self, width: u32, height: u32) -> GainMapResult<()> {
        if self.width == width && self.height == height {
            return Ok(());
        }
        if width == 0 || height == 0 {
            return Err(GainMapError::InvalidArgument);
        }
        if self.width > MAX_SCALED_DIMENSION
            || self.height > MAX_SCALED_DIMENSION
            || width > MAX_SCALED_DIMENSION
            || height > MAX_SCALED_DIMENSION
        {
            return Err(GainMapError::NotImplemented);
        }
        let mut src = self.shallow_clone();
        src.planes = std::mem::take(&mut self.planes);
        src.row_bytes = std::mem::take(&mut self.row_bytes);
        self.width = width;
        self.height = height;
        if src.has_plane(Plane::Y) {
            self.allocate_planes(Category::Color)?;
        }
        if src.has_plane(Plane::A) {
            self.allocate_planes(Category::Alpha)?;
        }
        for plane in ALL_PLANES {
            if !src.has_plane(plane) || !self.has_plane(plane) {
                continue;
            }
            self.scale_plane(&src, plane)?;
        }
        Ok(())
    }

    fn scale_plane(&mut self, src: &Image, plane: Plane) -> GainMapResult<()> {
        let src_width = src.width(plane);
        let src_height = src.height(plane);
        let dst_width = self.width(plane);
        let dst_height = self.height(plane);
        let max_channel_f = self.max_channel_f();
        let sample = |x: usize, y: usize| -> GainMapResult<f32> {
            Ok(if src.depth == 8 {
                src.row(plane, y as u32)?[x] as f32
            } else {
                src.row16(plane, y as u32)?[x] as f32
            })
        };
        for j in 0..dst_height {
            let fy = (j as f32 + 0.5) * src_height as f32 / dst_height as f32 - 0.5;
            let y0f = fy.floor();
            let wy = fy - y0f;
            let y0 = clamp_f32(y0f, 0.0, (src_height - 1) as f32) as usize;
            let y1 = std::cmp::min(y0 + 1, src_height - 1);
            for i in 0..dst_width {
                let fx = (i as f32 + 0.5) * src_width as f32 / dst_width as f32 - 0.5;
                let x0f = fx.floor();
                let wx = fx - x0f;
                let x0 = clamp_f32(x0f, 0.0, (src_width - 1) as f32) as usize;
                let x1 = std::cmp::min(x0 + 1, src_width - 1);
                let top = sample(x0, y0)? * (1.0 - wx) + sample(x1, y0)? * wx;
                let bottom = sample(x0, y1)? * (1.0 - wx) + sample(x1, y1)? * wx;
                let value = clamp_f32(top * (1.0 - wy) + bottom * wy + 0.5, 0.0, max_channel_f);
                if self.depth == 8 {
                    self.row_mut(plane, j as u32)?[i] = value as u8;
                } else {
                    self.row16_mut(plane, j as u32)?[i] = value as u16;
                }
            }
        }
        Ok(())
    }
}

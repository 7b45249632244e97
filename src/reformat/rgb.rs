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

use super::rgb_impl;

use crate::image;
use crate::internal_utils::*;
use crate::utils::pixels::*;
use crate::*;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Format {
    Rgb,
    #[default]
    Rgba,
    Argb,
    Bgr,
    Bgra,
    Abgr,
}

impl Format {
    pub(crate) fn offsets(&self) -> [usize; 4] {
        match self {
            Format::Rgb => [0, 1, 2, 0],
            Format::Rgba => [0, 1, 2, 3],
            Format::Argb => [1, 2, 3, 0],
            Format::Bgr => [2, 1, 0, 0],
            Format::Bgra => [2, 1, 0, 3],
            Format::Abgr => [3, 2, 1, 0],
        }
    }

    pub fn has_alpha(&self) -> bool {
        !matches!(self, Format::Rgb | Format::Bgr)
    }

    pub fn channel_count(&self) -> u32 {
        if self.has_alpha() {
            4
        } else {
            3
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum ChromaUpsampling {
    #[default]
    Automatic,
    Nearest,
    Bilinear,
}

impl ChromaUpsampling {
    pub(crate) fn is_nearest(&self) -> bool {
        matches!(self, Self::Nearest)
    }
}

/// Interleaved RGB(A) image. `depth` of 8/10/12/16 selects unorm samples;
/// `is_float` (with depth 16) selects IEEE 754 half-precision samples.
#[derive(Default)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub depth: u8,
    pub format: Format,
    pub chroma_upsampling: ChromaUpsampling,
    pub is_float: bool,
    pub pixels: Option<Pixels>,
    pub row_bytes: u32,
}

impl Image {
    pub fn max_channel(&self) -> u16 {
        ((1i32 << self.depth) - 1) as u16
    }

    pub fn max_channel_f(&self) -> f32 {
        self.max_channel() as f32
    }

    /// An unallocated RGBA image with the same dimensions and depth as the
    /// given YUV image.
    pub fn create_from_yuv(image: &image::Image) -> Self {
        Self {
            width: image.width,
            height: image.height,
            depth: image.depth,
            format: Format::Rgba,
            ..Default::default()
        }
    }

    pub fn row(&self, row: u32) -> GainMapResult<&[u8]> {
        self.pixels
            .as_ref()
            .ok_or(GainMapError::NoContent)?
            .slice(checked_mul!(row, self.row_bytes)?, self.row_bytes)
    }

    pub fn row_mut(&mut self, row: u32) -> GainMapResult<&mut [u8]> {
        self.pixels
            .as_mut()
            .ok_or(GainMapError::NoContent)?
            .slice_mut(checked_mul!(row, self.row_bytes)?, self.row_bytes)
    }

    pub fn row16(&self, row: u32) -> GainMapResult<&[u16]> {
        self.pixels
            .as_ref()
            .ok_or(GainMapError::NoContent)?
            .slice16(checked_mul!(row, self.row_bytes / 2)?, self.row_bytes / 2)
    }

    pub fn row16_mut(&mut self, row: u32) -> GainMapResult<&mut [u16]> {
        self.pixels
            .as_mut()
            .ok_or(GainMapError::NoContent)?
            .slice16_mut(checked_mul!(row, self.row_bytes / 2)?, self.row_bytes / 2)
    }

    pub fn allocate(&mut self) -> GainMapResult<()> {
        let row_bytes = checked_mul!(self.width, self.pixel_size())?;
        if self.channel_size() == 1 {
            let buffer_size: usize = usize_from_u32(checked_mul!(row_bytes, self.height)?)?;
            let mut buffer: Vec<u8> = create_vec_exact(buffer_size)?;
            buffer.resize(buffer_size, 0);
            self.pixels = Some(Pixels::Buffer(buffer));
        } else {
            let buffer_size: usize = usize_from_u32(checked_mul!(row_bytes / 2, self.height)?)?;
            let mut buffer: Vec<u16> = create_vec_exact(buffer_size)?;
            buffer.resize(buffer_size, 0);
            self.pixels = Some(Pixels::Buffer16(buffer));
        }
        self.row_bytes = row_bytes;
        Ok(())
    }

    pub(crate) fn depth_valid(&self) -> bool {
        match (self.is_float, self.depth) {
            (true, 16) => true, // IEEE 754 half-precision binary16
            (false, 8 | 10 | 12 | 16) => true,
            _ => false,
        }
    }

    pub fn has_alpha(&self) -> bool {
        self.format.has_alpha()
    }

    pub(crate) fn channel_size(&self) -> u32 {
        match self.depth {
            8 => 1,
            10 | 12 | 16 => 2,
            _ => 0,
        }
    }

    pub fn channel_count(&self) -> u32 {
        self.format.channel_count()
    }

    pub(crate) fn pixel_size(&self) -> u32 {
        self.channel_size() * self.channel_count()
    }

    /// Whether a pixel-for-pixel byte copy from `other` is meaningful.
    pub(crate) fn has_same_layout(&self, other: &Image) -> bool {
        self.format == other.format
            && self.depth == other.depth
            && self.is_float == other.is_float
            && self.width == other.width
            && self.height == other.height
    }

    /// Decodes the YUV image into this buffer. The buffer must have been
    /// allocated with matching dimensions beforehand.
    pub fn convert_from_yuv(&mut self, image: &image::Image) -> GainMapResult<()> {
        if !image.has_plane(image::Plane::Y) || !image.depth_valid() || !self.depth_valid() {
            return Err(GainMapError::ReformatFailed);
        }
        rgb_impl::yuv_to_rgb(image, self)
    }

    /// Encodes this buffer into the YUV image, allocating its planes.
    pub fn convert_to_yuv(&self, image: &mut image::Image) -> GainMapResult<()> {
        if !self.depth_valid() || self.is_float {
            return Err(GainMapError::NotImplemented);
        }
        if !image.depth_valid() {
            return Err(GainMapError::ReformatFailed);
        }
        rgb_impl::rgb_to_yuv(self, image)
    }
}

/// Per-buffer pixel access description: channel offsets and value scaling,
/// resolved once instead of per pixel.
pub(crate) struct RgbColorSpaceInfo {
    channel_count: usize,
    offsets: [usize; 4],
    max_channel_f: f32,
    has_alpha: bool,
    is_float: bool,
    depth: u8,
}

impl RgbColorSpaceInfo {
    pub(crate) fn create_from(rgb: &Image) -> GainMapResult<Self> {
        if !rgb.depth_valid() {
            return Err(GainMapError::ReformatFailed);
        }
        Ok(Self {
            channel_count: rgb.channel_count() as usize,
            offsets: rgb.format.offsets(),
            max_channel_f: rgb.max_channel_f(),
            has_alpha: rgb.has_alpha(),
            is_float: rgb.is_float,
            depth: rgb.depth,
        })
    }
}

impl Image {
    /// Reads the pixel at (x, y) as RGBA floats. Unorm samples are scaled to
    /// [0, 1]; half-float samples are read as is. Alpha is 1 for formats
    /// without an alpha channel.
    pub(crate) fn get_rgba(
        &self,
        info: &RgbColorSpaceInfo,
        x: u32,
        y: u32,
    ) -> GainMapResult<[f32; 4]> {
        let pixel = x as usize * info.channel_count;
        let mut rgba = [0.0, 0.0, 0.0, 1.0];
        if info.depth == 8 {
            let row = self.row(y)?;
            for c in 0..3 {
                rgba[c] = row[pixel + info.offsets[c]] as f32 / info.max_channel_f;
            }
            if info.has_alpha {
                rgba[3] = row[pixel + info.offsets[3]] as f32 / info.max_channel_f;
            }
        } else if info.is_float {
            let row = self.row16(y)?;
            for c in 0..3 {
                rgba[c] = half_to_f32(row[pixel + info.offsets[c]]);
            }
            if info.has_alpha {
                rgba[3] = half_to_f32(row[pixel + info.offsets[3]]);
            }
        } else {
            let row = self.row16(y)?;
            for c in 0..3 {
                rgba[c] = row[pixel + info.offsets[c]] as f32 / info.max_channel_f;
            }
            if info.has_alpha {
                rgba[3] = row[pixel + info.offsets[3]] as f32 / info.max_channel_f;
            }
        }
        Ok(rgba)
    }

    /// Writes an RGBA float pixel at (x, y), scaling and rounding unorm
    /// samples. Alpha is dropped for formats without an alpha channel.
    pub(crate) fn set_rgba(
        &mut self,
        info: &RgbColorSpaceInfo,
        x: u32,
        y: u32,
        rgba: &[f32; 4],
    ) -> GainMapResult<()> {
        let pixel = x as usize * info.channel_count;
        let channels = if info.has_alpha { 4 } else { 3 };
        if info.depth == 8 {
            let max_channel_f = info.max_channel_f;
            let offsets = info.offsets;
            let row = self.row_mut(y)?;
            for c in 0..channels {
                row[pixel + offsets[c]] =
                    (0.5 + clamp_f32(rgba[c], 0.0, 1.0) * max_channel_f) as u8;
            }
        } else if info.is_float {
            let offsets = info.offsets;
            let row = self.row16_mut(y)?;
            for c in 0..channels {
                row[pixel + offsets[c]] = f32_to_half(rgba[c]);
            }
        } else {
            let max_channel_f = info.max_channel_f;
            let offsets = info.offsets;
            let row = self.row16_mut(y)?;
            for c in 0..channels {
                row[pixel + offsets[c]] =
                    (0.5 + clamp_f32(rgba[c], 0.0, 1.0) * max_channel_f) as u16;
            }
        }
        Ok(())
    }
}

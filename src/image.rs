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

use crate::internal_utils::*;
use crate::utils::pixels::*;
use crate::*;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Plane {
    Y = 0,
    U = 1,
    V = 2,
    A = 3,
}

impl Plane {
    pub(crate) fn as_usize(&self) -> usize {
        match self {
            Plane::Y => 0,
            Plane::U => 1,
            Plane::V => 2,
            Plane::A => 3,
        }
    }
}

pub const MAX_PLANE_COUNT: usize = 4;
pub const YUV_PLANES: [Plane; 3] = [Plane::Y, Plane::U, Plane::V];
pub const A_PLANE: [Plane; 1] = [Plane::A];
pub const ALL_PLANES: [Plane; MAX_PLANE_COUNT] = [Plane::Y, Plane::U, Plane::V, Plane::A];

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
// VideoFullRangeFlag as specified in ISO/IEC 23091-2/ITU-T H.273.
pub enum YuvRange {
    Limited = 0,
    #[default]
    Full = 1,
}

/// Planar YUV(A) image with CICP color description.
#[derive(Default)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub depth: u8,

    pub yuv_format: PixelFormat,
    pub yuv_range: YuvRange,

    pub alpha_present: bool,

    pub row_bytes: [u32; MAX_PLANE_COUNT],
    pub planes: [Option<Pixels>; MAX_PLANE_COUNT],

    pub color_primaries: ColorPrimaries,
    pub transfer_characteristics: TransferCharacteristics,
    pub matrix_coefficients: MatrixCoefficients,

    pub clli: Option<ContentLightLevelInformation>,

    pub icc: Vec<u8>,
}

pub struct PlaneData {
    pub width: u32,
    pub height: u32,
    pub row_bytes: u32,
    pub pixel_size: u32,
}

impl Image {
    pub(crate) fn shallow_clone(&self) -> Self {
        Self {
            width: self.width,
            height: self.height,
            depth: self.depth,
            yuv_format: self.yuv_format,
            yuv_range: self.yuv_range,
            alpha_present: self.alpha_present,
            color_primaries: self.color_primaries,
            transfer_characteristics: self.transfer_characteristics,
            matrix_coefficients: self.matrix_coefficients,
            clli: self.clli,
            icc: self.icc.clone(),
            ..Default::default()
        }
    }

    pub(crate) fn is_supported_depth(depth: u8) -> bool {
        matches!(depth, 8 | 10 | 12 | 16)
    }

    pub(crate) fn depth_valid(&self) -> bool {
        Self::is_supported_depth(self.depth)
    }

    pub fn max_channel(&self) -> u16 {
        if !self.depth_valid() {
            0
        } else {
            ((1i32 << self.depth) - 1) as u16
        }
    }

    pub(crate) fn max_channel_f(&self) -> f32 {
        self.max_channel() as f32
    }

    pub fn has_plane(&self, plane: Plane) -> bool {
        let plane_index = plane.as_usize();
        match &self.planes[plane_index] {
            Some(pixels) => self.row_bytes[plane_index] != 0 && pixels.has_data(),
            None => false,
        }
    }

    pub fn has_alpha(&self) -> bool {
        self.has_plane(Plane::A)
    }

    pub fn width(&self, plane: Plane) -> usize {
        match plane {
            Plane::Y | Plane::A => self.width as usize,
            Plane::U | Plane::V => match self.yuv_format {
                PixelFormat::Yuv444 => self.width as usize,
                PixelFormat::Yuv420 | PixelFormat::Yuv422 => (self.width as usize).div_ceil(2),
                PixelFormat::Yuv400 => 0,
            },
        }
    }

    pub fn height(&self, plane: Plane) -> usize {
        match plane {
            Plane::Y | Plane::A => self.height as usize,
            Plane::U | Plane::V => match self.yuv_format {
                PixelFormat::Yuv444 | PixelFormat::Yuv422 => self.height as usize,
                PixelFormat::Yuv420 => (self.height as usize).div_ceil(2),
                PixelFormat::Yuv400 => 0,
            },
        }
    }

    pub fn plane_data(&self, plane: Plane) -> Option<PlaneData> {
        if !self.has_plane(plane) {
            return None;
        }
        Some(PlaneData {
            width: self.width(plane) as u32,
            height: self.height(plane) as u32,
            row_bytes: self.row_bytes[plane.as_usize()],
            pixel_size: if self.depth == 8 { 1 } else { 2 },
        })
    }

    pub fn row(&self, plane: Plane, row: u32) -> GainMapResult<&[u8]> {
        let row_bytes = self.row_bytes[plane.as_usize()];
        self.planes[plane.as_usize()]
            .as_ref()
            .ok_or(GainMapError::NoContent)?
            .slice(checked_mul!(row, row_bytes)?, row_bytes)
    }

    pub fn row_mut(&mut self, plane: Plane, row: u32) -> GainMapResult<&mut [u8]> {
        let row_bytes = self.row_bytes[plane.as_usize()];
        self.planes[plane.as_usize()]
            .as_mut()
            .ok_or(GainMapError::NoContent)?
            .slice_mut(checked_mul!(row, row_bytes)?, row_bytes)
    }

    pub fn row16(&self, plane: Plane, row: u32) -> GainMapResult<&[u16]> {
        let row_bytes = self.row_bytes[plane.as_usize()] / 2;
        self.planes[plane.as_usize()]
            .as_ref()
            .ok_or(GainMapError::NoContent)?
            .slice16(checked_mul!(row, row_bytes)?, row_bytes)
    }

    pub fn row16_mut(&mut self, plane: Plane, row: u32) -> GainMapResult<&mut [u16]> {
        let row_bytes = self.row_bytes[plane.as_usize()] / 2;
        self.planes[plane.as_usize()]
            .as_mut()
            .ok_or(GainMapError::NoContent)?
            .slice16_mut(checked_mul!(row, row_bytes)?, row_bytes)
    }

    pub(crate) fn allocate_planes_with_default_values(
        &mut self,
        category: Category,
        default_values: [u16; 4],
    ) -> GainMapResult<()> {
        if !self.depth_valid() {
            return Err(GainMapError::UnsupportedDepth);
        }
        let pixel_size: usize = if self.depth == 8 { 1 } else { 2 };
        for plane in category.planes() {
            let plane = *plane;
            let plane_index = plane.as_usize();
            let width = self.width(plane);
            let plane_size = checked_mul!(width, self.height(plane))?;
            self.planes[plane_index] = Some(if self.depth == 8 {
                Pixels::Buffer(Vec::new())
            } else {
                Pixels::Buffer16(Vec::new())
            });
            self.planes[plane_index]
                .as_mut()
                .unwrap()
                .resize(plane_size, default_values[plane_index])?;
            self.row_bytes[plane_index] = u32_from_usize(checked_mul!(width, pixel_size)?)?;
        }
        Ok(())
    }

    pub fn allocate_planes(&mut self, category: Category) -> GainMapResult<()> {
        self.allocate_planes_with_default_values(category, [0, 0, 0, self.max_channel()])
    }

    pub(crate) fn free_planes(&mut self, planes: &[Plane]) {
        for plane in planes {
            let plane = plane.as_usize();
            self.planes[plane] = None;
            self.row_bytes[plane] = 0;
        }
    }

    pub(crate) fn copy_planes_from(&mut self, src: &Image, planes: &[Plane]) {
        for plane in planes {
            let plane = plane.as_usize();
            (self.planes[plane], self.row_bytes[plane]) = match &src.planes[plane] {
                Some(src_plane) => (Some(src_plane.clone()), src.row_bytes[plane]),
                None => (None, 0),
            }
        }
    }
}

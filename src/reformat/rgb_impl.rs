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

use super::coeffs::*;
use super::rgb;
use super::rgb::*;

use crate::image;
use crate::image::Plane;
use crate::internal_utils::*;
use crate::*;

#[derive(Clone, Copy, PartialEq)]
enum Mode {
    YuvCoefficients(f32, f32, f32),
    Identity,
}

struct YuvColorSpaceInfo {
    depth: u8,
    max_channel: u16,
    bias_y: f32,
    bias_uv: f32,
    range_y: f32,
    range_uv: f32,
    format: PixelFormat,
    mode: Mode,
}

impl YuvColorSpaceInfo {
    fn create_from(image: &image::Image) -> GainMapResult<Self> {
        if !image.depth_valid() {
            return Err(GainMapError::ReformatFailed);
        }
        match image.matrix_coefficients {
            MatrixCoefficients::Ycgco
            | MatrixCoefficients::Bt2020Cl
            | MatrixCoefficients::Smpte2085
            | MatrixCoefficients::ChromaDerivedCl
            | MatrixCoefficients::Ictcp => return Err(GainMapError::NotImplemented),
            _ => {}
        }
        if image.matrix_coefficients == MatrixCoefficients::Identity
            && !matches!(image.yuv_format, PixelFormat::Yuv444 | PixelFormat::Yuv400)
        {
            return Err(GainMapError::NotImplemented);
        }
        let full_range = image.yuv_range == image::YuvRange::Full;
        let max_channel = image.max_channel();
        let mode = match image.matrix_coefficients {
            MatrixCoefficients::Identity => Mode::Identity,
            _ => {
                let coeffs =
                    calculate_yuv_coefficients(image.color_primaries, image.matrix_coefficients);
                Mode::YuvCoefficients(coeffs[0], coeffs[1], coeffs[2])
            }
        };
        let bias_y = if full_range { 0.0 } else { (16 << (image.depth - 8)) as f32 };
        let range_y =
            (if full_range { max_channel as u32 } else { 219 << (image.depth - 8) }) as f32;
        let (bias_uv, range_uv) = match mode {
            // Identity stores G/B/R unchanged, with luma scaling for all
            // three samples.
            Mode::Identity => (bias_y, range_y),
            Mode::YuvCoefficients(..) => (
                (1u32 << (image.depth - 1)) as f32,
                (if full_range { max_channel as u32 } else { 224 << (image.depth - 8) }) as f32,
            ),
        };
        Ok(Self {
            depth: image.depth,
            max_channel,
            bias_y,
            bias_uv,
            range_y,
            range_uv,
            format: image.yuv_format,
            mode,
        })
    }
}

fn unorm_lookup_tables(info: &YuvColorSpaceInfo) -> (Vec<f32>, Vec<f32>) {
    let count = (1usize) << info.depth;
    let mut table_y = Vec::with_capacity(count);
    let mut table_uv = Vec::with_capacity(count);
    for cp in 0..count {
        table_y.push((cp as f32 - info.bias_y) / info.range_y);
        table_uv.push((cp as f32 - info.bias_uv) / info.range_uv);
    }
    (table_y, table_uv)
}

fn clamped_pixel(image: &image::Image, plane: Plane, x: usize, y: usize) -> GainMapResult<u16> {
    Ok(if image.depth == 8 {
        image.row(plane, y as u32)?[x] as u16
    } else {
        std::cmp::min(image.row16(plane, y as u32)?[x], image.max_channel())
    })
}

fn compute_rgb(y: f32, cb: f32, cr: f32, has_color: bool, mode: Mode) -> (f32, f32, f32) {
    let (r, g, b) = if has_color {
        match mode {
            Mode::Identity => (cr, y, cb),
            Mode::YuvCoefficients(kr, kg, kb) => {
                let r = y + (2.0 * (1.0 - kr)) * cr;
                let b = y + (2.0 * (1.0 - kb)) * cb;
                let g = y - ((2.0 * ((kr * (1.0 - kr) * cr) + (kb * (1.0 - kb) * cb))) / kg);
                (r, g, b)
            }
        }
    } else {
        (y, y, y)
    };
    (
        clamp_f32(r, 0.0, 1.0),
        clamp_f32(g, 0.0, 1.0),
        clamp_f32(b, 0.0, 1.0),
    )
}

pub(crate) fn yuv_to_rgb(image: &image::Image, rgb: &mut rgb::Image) -> GainMapResult<()> {
    if image.width != rgb.width || image.height != rgb.height {
        return Err(GainMapError::ReformatFailed);
    }
    let yuv = YuvColorSpaceInfo::create_from(image)?;
    let info = RgbColorSpaceInfo::create_from(rgb)?;
    let (table_y, table_uv) = unorm_lookup_tables(&yuv);
    let has_color = image.has_plane(Plane::U)
        && image.has_plane(Plane::V)
        && !image.yuv_format.is_monochrome();
    let has_alpha = image.has_alpha();
    let chroma_shift_x = image.yuv_format.chroma_shift_x();
    let chroma_shift_y = image.yuv_format.chroma_shift_y();
    let bilinear = !rgb.chroma_upsampling.is_nearest()
        && matches!(yuv.format, PixelFormat::Yuv420 | PixelFormat::Yuv422);
    let uv_width = image.width(Plane::U) as i32;
    let uv_height = image.height(Plane::U) as i32;
    for j in 0..image.height as usize {
        let uv_j = j >> chroma_shift_y;
        for i in 0..image.width as usize {
            let y = table_y[clamped_pixel(image, Plane::Y, i, j)? as usize];
            let mut cb = 0.0;
            let mut cr = 0.0;
            if has_color {
                let uv_i = i >> chroma_shift_x;
                if !bilinear {
                    cb = table_uv[clamped_pixel(image, Plane::U, uv_i, uv_j)? as usize];
                    cr = table_uv[clamped_pixel(image, Plane::V, uv_i, uv_j)? as usize];
                } else {
                    // 9/3/3/1 filter towards the diagonally adjacent chroma
                    // sample. Out of bounds neighbors are clamped to the edge.
                    let dx: i32 = if i % 2 != 0 { 1 } else { -1 };
                    let dy: i32 = match yuv.format {
                        PixelFormat::Yuv420 => {
                            if j % 2 != 0 {
                                1
                            } else {
                                -1
                            }
                        }
                        _ => 0,
                    };
                    let sample = |plane: Plane, x: i32, y: i32| -> GainMapResult<f32> {
                        let x = x.clamp(0, uv_width - 1) as usize;
                        let y = y.clamp(0, uv_height - 1) as usize;
                        Ok(table_uv[clamped_pixel(image, plane, x, y)? as usize])
                    };
                    let (x0, y0) = (uv_i as i32, uv_j as i32);
                    cb = sample(Plane::U, x0, y0)? * (9.0 / 16.0)
                        + sample(Plane::U, x0 + dx, y0)? * (3.0 / 16.0)
                        + sample(Plane::U, x0, y0 + dy)? * (3.0 / 16.0)
                        + sample(Plane::U, x0 + dx, y0 + dy)? * (1.0 / 16.0);
                    cr = sample(Plane::V, x0, y0)? * (9.0 / 16.0)
                        + sample(Plane::V, x0 + dx, y0)? * (3.0 / 16.0)
                        + sample(Plane::V, x0, y0 + dy)? * (3.0 / 16.0)
                        + sample(Plane::V, x0 + dx, y0 + dy)? * (1.0 / 16.0);
                }
            }
            let (r, g, b) = compute_rgb(y, cb, cr, has_color, yuv.mode);
            let a = if has_alpha {
                clamp_f32(
                    clamped_pixel(image, Plane::A, i, j)? as f32 / yuv.max_channel as f32,
                    0.0,
                    1.0,
                )
            } else {
                1.0
            };
            rgb.set_rgba(&info, i as u32, j as u32, &[r, g, b, a])?;
        }
    }
    Ok(())
}

pub(crate) fn rgb_to_yuv(rgb: &rgb::Image, image: &mut image::Image) -> GainMapResult<()> {
    if image.width != rgb.width || image.height != rgb.height {
        return Err(GainMapError::ReformatFailed);
    }
    let yuv = YuvColorSpaceInfo::create_from(image)?;
    let info = RgbColorSpaceInfo::create_from(rgb)?;
    image.allocate_planes(Category::Color)?;
    let write_alpha = rgb.has_alpha();
    if write_alpha {
        image.allocate_planes(Category::Alpha)?;
    }
    let monochrome = image.yuv_format.is_monochrome();
    let uv_width = image.width(Plane::U);
    let uv_height = image.height(Plane::U);
    let mut sum_u = vec![0.0f32; uv_width * uv_height];
    let mut sum_v = vec![0.0f32; uv_width * uv_height];
    let mut count_uv = vec![0u32; uv_width * uv_height];
    let chroma_shift_x = image.yuv_format.chroma_shift_x();
    let chroma_shift_y = image.yuv_format.chroma_shift_y();
    let max_channel_f = yuv.max_channel as f32;
    for j in 0..image.height as usize {
        for i in 0..image.width as usize {
            let rgba = rgb.get_rgba(&info, i as u32, j as u32)?;
            let (y, u, v) = match yuv.mode {
                Mode::Identity => (rgba[1], rgba[2], rgba[0]),
                Mode::YuvCoefficients(kr, _kg, kb) => {
                    let y = kr * rgba[0] + (1.0 - kr - kb) * rgba[1] + kb * rgba[2];
                    let u = (rgba[2] - y) / (2.0 * (1.0 - kb));
                    let v = (rgba[0] - y) / (2.0 * (1.0 - kr));
                    (y, u, v)
                }
            };
            let unorm_y = clamp_f32(y * yuv.range_y + yuv.bias_y + 0.5, 0.0, max_channel_f);
            if image.depth == 8 {
                image.row_mut(Plane::Y, j as u32)?[i] = unorm_y as u8;
            } else {
                image.row16_mut(Plane::Y, j as u32)?[i] = unorm_y as u16;
            }
            if !monochrome {
                let uv_index = (j >> chroma_shift_y) * uv_width + (i >> chroma_shift_x);
                sum_u[uv_index] += u;
                sum_v[uv_index] += v;
                count_uv[uv_index] += 1;
            }
            if write_alpha {
                let unorm_a = clamp_f32(rgba[3] * max_channel_f + 0.5, 0.0, max_channel_f);
                if image.depth == 8 {
                    image.row_mut(Plane::A, j as u32)?[i] = unorm_a as u8;
                } else {
                    image.row16_mut(Plane::A, j as u32)?[i] = unorm_a as u16;
                }
            }
        }
    }
    if !monochrome {
        for uv_j in 0..uv_height {
            for uv_i in 0..uv_width {
                let uv_index = uv_j * uv_width + uv_i;
                // Chroma cells average every RGB pixel they cover.
                let scale = 1.0 / std::cmp::max(count_uv[uv_index], 1) as f32;
                for (plane, sums) in [(Plane::U, &sum_u), (Plane::V, &sum_v)] {
                    let unorm = clamp_f32(
                        sums[uv_index] * scale * yuv.range_uv + yuv.bias_uv + 0.5,
                        0.0,
                        max_channel_f,
                    );
                    if image.depth == 8 {
                        image.row_mut(plane, uv_j as u32)?[uv_i] = unorm as u8;
                    } else {
                        image.row16_mut(plane, uv_j as u32)?[uv_i] = unorm as u16;
                    }
                }
            }
        }
    }
    Ok(())
}

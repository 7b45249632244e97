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

use crate::color::*;
use crate::diagnostics::Diagnostics;
use crate::image;
use crate::image::ALL_PLANES;
use crate::internal_utils::*;
use crate::reformat::rgb;
use crate::reformat::rgb::RgbColorSpaceInfo;
use crate::utils::pixels::Pixels;
use crate::utils::*;
use crate::*;

const K_EPSILON: f32 = 1e-10;

/// Per-channel gain map metadata as defined in ISO 21496-1. All rational
/// values are stored raw: equality and validation never reduce fractions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GainMapMetadata {
    pub min: [Fraction; 3],
    pub max: [Fraction; 3],
    pub gamma: [UFraction; 3],
    pub base_offset: [Fraction; 3],
    pub alternate_offset: [Fraction; 3],
    pub base_hdr_headroom: UFraction,
    pub alternate_hdr_headroom: UFraction,
    pub use_base_color_space: bool,
}

impl GainMapMetadata {
    /// Values written before encoding a gain map.
    pub(crate) fn set_encoding_defaults(&mut self) {
        for i in 0..3 {
            self.min[i] = Fraction(1, 1);
            self.max[i] = Fraction(1, 1);
            self.base_offset[i] = Fraction(1, 64);
            self.alternate_offset[i] = Fraction(1, 64);
            self.gamma[i] = UFraction(1, 1);
        }
        self.base_hdr_headroom = UFraction(0, 1);
        self.alternate_hdr_headroom = UFraction(1, 1);
        self.use_base_color_space = true;
    }

    pub fn is_valid(&self, diag: &mut Diagnostics) -> GainMapResult<()> {
        diag.clear();
        for i in 0..3 {
            if self.min[i].1 == 0
                || self.max[i].1 == 0
                || self.gamma[i].1 == 0
                || self.base_offset[i].1 == 0
                || self.alternate_offset[i].1 == 0
            {
                diag.set_error("Per-channel denominator is 0 in gain map metadata".into());
                return Err(GainMapError::InvalidArgument);
            }
            // Compare the exact rationals: max >= min must hold. The cross
            // products fit in i64 (i32 * u32 at most).
            if (self.max[i].0 as i64) * (self.min[i].1 as i64)
                < (self.min[i].0 as i64) * (self.max[i].1 as i64)
            {
                diag.set_error(
                    "Per-channel max is less than per-channel min in gain map metadata".into(),
                );
                return Err(GainMapError::InvalidArgument);
            }
            if self.gamma[i].0 == 0 {
                diag.set_error("Per-channel gamma is 0 in gain map metadata".into());
                return Err(GainMapError::InvalidArgument);
            }
        }
        if self.base_hdr_headroom.1 == 0 || self.alternate_hdr_headroom.1 == 0 {
            diag.set_error("Headroom denominator is 0 in gain map metadata".into());
            return Err(GainMapError::InvalidArgument);
        }
        Ok(())
    }
}

/// A gain map image together with its metadata and the properties of the
/// alternate rendition it encodes.
#[derive(Default)]
pub struct GainMap {
    pub image: image::Image,
    pub metadata: GainMapMetadata,

    pub alt_icc: Vec<u8>,
    pub alt_color_primaries: ColorPrimaries,
    pub alt_transfer_characteristics: TransferCharacteristics,
    pub alt_matrix_coefficients: MatrixCoefficients,
    pub alt_yuv_range: image::YuvRange,

    pub alt_plane_count: u8,
    pub alt_plane_depth: u8,

    pub alt_clli: ContentLightLevelInformation,
}

impl GainMap {
    /// Structural equality of the alternate rendition descriptors.
    pub fn has_same_alt_properties(&self, other: &GainMap) -> bool {
        self.alt_icc == other.alt_icc
            && self.alt_color_primaries == other.alt_color_primaries
            && self.alt_transfer_characteristics == other.alt_transfer_characteristics
            && self.alt_matrix_coefficients == other.alt_matrix_coefficients
            && self.alt_yuv_range == other.alt_yuv_range
            && self.alt_plane_count == other.alt_plane_count
            && self.alt_plane_depth == other.alt_plane_depth
            && self.alt_clli == other.alt_clli
    }
}

// The metadata stores rationals that were validated to have a non-zero
// denominator; keep the conversion total anyway for inputs that skipped
// validation.
fn fraction_to_float(f: Fraction) -> f32 {
    if f.1 == 0 {
        0.0
    } else {
        f.0 as f32 / f.1 as f32
    }
}

fn ufraction_to_float(f: UFraction) -> f32 {
    if f.1 == 0 {
        0.0
    } else {
        f.0 as f32 / f.1 as f32
    }
}

// Returns a weight in [-1.0, 1.0] that represents how much the gain map
// should be applied at the given display headroom.
fn gain_map_weight(hdr_headroom: f32, metadata: &GainMapMetadata) -> f32 {
    let base_hdr_headroom = ufraction_to_float(metadata.base_hdr_headroom);
    let alternate_hdr_headroom = ufraction_to_float(metadata.alternate_hdr_headroom);
    if base_hdr_headroom == alternate_hdr_headroom {
        // Do not apply the gain map if the HDR headroom is the same.
        // This case is not handled in the specification and does not make
        // practical sense.
        return 0.0;
    }
    let w = clamp_f32(
        (hdr_headroom - base_hdr_headroom) / (alternate_hdr_headroom - base_hdr_headroom),
        0.0,
        1.0,
    );
    if alternate_hdr_headroom < base_hdr_headroom {
        -w
    } else {
        w
    }
}

// Linear interpolation between 'a' and 'b' ('a' if w == 0.0, 'b' if w == 1.0).
fn lerp(a: f32, b: f32, w: f32) -> f32 {
    (1.0 - w) * a + w * b
}

// ---------------------------------------------------------------------------
// Robust range estimation.

const BUCKET_SIZE: f32 = 0.01; // Size of one histogram bucket. Empirical value.
const MAX_OUTLIERS_RATIO: f32 = 0.001; // 0.1%
const MAX_NUM_BUCKETS: usize = 10000;

// Index of the histogram bucket for a given value; values outside of the
// range are counted in the first/last buckets.
fn value_to_bucket_idx(v: f32, bucket_min: f32, bucket_max: f32, num_buckets: usize) -> usize {
    let v = clamp_f32(v, bucket_min, bucket_max);
    std::cmp::min(
        ((v - bucket_min) / (bucket_max - bucket_min) * num_buckets as f32).round() as usize,
        num_buckets - 1,
    )
}

// Lower end of the value range belonging to the given histogram bucket.
fn bucket_idx_to_value(idx: usize, bucket_min: f32, bucket_max: f32, num_buckets: usize) -> f32 {
    idx as f32 * (bucket_max - bucket_min) / num_buckets as f32 + bucket_min
}

/// Approximate minimum and maximum of the buffer, discarding up to 0.1% of
/// the samples on each side. A single extreme sample would otherwise stretch
/// the range that the gain map values are quantized over.
pub fn find_min_max_without_outliers(
    gain_map_f: &[f32],
    diag: &mut Diagnostics,
) -> GainMapResult<(f32, f32)> {
    diag.clear();
    if gain_map_f.is_empty() {
        diag.set_error("empty buffer".into());
        return Err(GainMapError::InvalidArgument);
    }
    let max_outliers_on_each_side =
        (gain_map_f.len() as f32 * MAX_OUTLIERS_RATIO / 2.0).round() as usize;

    let mut min = gain_map_f[0];
    let mut max = gain_map_f[0];
    for v in &gain_map_f[1..] {
        min = min.min(*v);
        max = max.max(*v);
    }

    let mut range_min = min;
    let mut range_max = max;
    if (max - min) <= BUCKET_SIZE * 2.0 || max_outliers_on_each_side == 0 {
        return Ok((range_min, range_max));
    }

    let num_buckets =
        std::cmp::min(((max - min) / BUCKET_SIZE).ceil() as usize, MAX_NUM_BUCKETS);
    let mut histogram: Vec<u32> = create_vec_exact(num_buckets)?;
    histogram.resize(num_buckets, 0);
    for v in gain_map_f {
        histogram[value_to_bucket_idx(*v, min, max, num_buckets)] += 1;
    }

    let mut left_outliers: usize = 0;
    for i in 0..num_buckets {
        left_outliers += histogram[i] as usize;
        if left_outliers > max_outliers_on_each_side {
            break;
        }
        if histogram[i] == 0 {
            // +1 to get the higher end of the bucket.
            range_min = bucket_idx_to_value(i + 1, min, max, num_buckets);
        }
    }

    let mut right_outliers: usize = 0;
    for i in (0..num_buckets).rev() {
        right_outliers += histogram[i] as usize;
        if right_outliers > max_outliers_on_each_side {
            break;
        }
        if histogram[i] == 0 {
            range_max = bucket_idx_to_value(i, min, max, num_buckets);
        }
    }

    Ok((range_min, range_max))
}

// ---------------------------------------------------------------------------
// Color space choice for gain map math.

// Decides which of the two sets of primaries gain map math happens in when
// creating a gain map. The other rendition is converted to the chosen space
// before computing the ratio between the two images. Conversion into a
// smaller space produces negative channel values, which must be offset
// before log2() and degrade partial application, so the larger space wins.
fn choose_color_space_for_gain_map_math(
    base_color_primaries: ColorPrimaries,
    alt_color_primaries: ColorPrimaries,
) -> GainMapResult<ColorPrimaries> {
    if base_color_primaries == alt_color_primaries {
        return Ok(base_color_primaries);
    }
    let base_to_alt = compute_rgb_to_rgb_matrix(base_color_primaries, alt_color_primaries)
        .ok_or(GainMapError::NotImplemented)?;
    let alt_to_base = compute_rgb_to_rgb_matrix(alt_color_primaries, base_color_primaries)
        .ok_or(GainMapError::NotImplemented)?;

    // Convert pure red, green and blue in turn and record the most negative
    // channel seen in each target space.
    let mut base_colorspace_channel_min = 0.0f32;
    let mut alt_colorspace_channel_min = 0.0f32;
    for c in 0..3 {
        let mut rgba = [0.0f32; 4];
        rgba[c] = 1.0;
        linear_rgb_convert_color_space(&mut rgba, &alt_to_base);
        for v in &rgba[0..3] {
            base_colorspace_channel_min = base_colorspace_channel_min.min(*v);
        }
        let mut rgba = [0.0f32; 4];
        rgba[c] = 1.0;
        linear_rgb_convert_color_space(&mut rgba, &base_to_alt);
        for v in &rgba[0..3] {
            alt_colorspace_channel_min = alt_colorspace_channel_min.min(*v);
        }
    }
    // The space with the largest min value is (more or less) the largest
    // color space. Ties go to the base.
    Ok(if alt_colorspace_channel_min <= base_colorspace_channel_min {
        base_color_primaries
    } else {
        alt_color_primaries
    })
}

// ---------------------------------------------------------------------------
// Applying a gain map.

impl GainMap {
    /// Tone maps `base_image` to the given HDR headroom by applying this
    /// gain map, writing the result into `tone_mapped_image` (allocated
    /// here, with the base dimensions and the caller-chosen format/depth).
    ///
    /// Returns the content light level information of the tone mapped image,
    /// or `None` when the gain map was not applied (weight 0 fast paths).
    #[allow(clippy::too_many_arguments)]
    pub fn apply_to_rgb(
        &self,
        base_image: &rgb::Image,
        base_color_primaries: ColorPrimaries,
        base_transfer_characteristics: TransferCharacteristics,
        hdr_headroom: f32,
        output_color_primaries: ColorPrimaries,
        output_transfer_characteristics: TransferCharacteristics,
        tone_mapped_image: &mut rgb::Image,
        diag: &mut Diagnostics,
    ) -> GainMapResult<Option<ContentLightLevelInformation>> {
        diag.clear();

        if hdr_headroom < 0.0 {
            diag.set_error(format!("hdrHeadroom should be >= 0, got {hdr_headroom}"));
            return Err(GainMapError::InvalidArgument);
        }
        if base_image.pixels.is_none() || base_image.width == 0 || base_image.height == 0 {
            diag.set_error("empty base image".into());
            return Err(GainMapError::InvalidArgument);
        }
        self.metadata.is_valid(diag)?;

        let width = base_image.width;
        let height = base_image.height;

        let use_base_color_space = self.metadata.use_base_color_space;
        let math_primaries = if use_base_color_space
            || self.alt_color_primaries == ColorPrimaries::Unspecified
        {
            base_color_primaries
        } else {
            self.alt_color_primaries
        };
        let needs_input_conversion = base_color_primaries != math_primaries;
        let needs_output_conversion = math_primaries != output_color_primaries;

        tone_mapped_image.width = width;
        tone_mapped_image.height = height;
        tone_mapped_image.allocate()?;

        let weight = gain_map_weight(hdr_headroom, &self.metadata);

        // Early exit if the gain map does not need to be applied and the
        // pixel format is the same.
        if weight == 0.0
            && output_transfer_characteristics == base_transfer_characteristics
            && output_color_primaries == base_color_primaries
            && tone_mapped_image.has_same_layout(base_image)
        {
            debug_assert_eq!(base_image.row_bytes, tone_mapped_image.row_bytes);
            // Copy the base image.
            match (&base_image.pixels, &mut tone_mapped_image.pixels) {
                (Some(Pixels::Buffer(src)), Some(Pixels::Buffer(dst)))
                    if src.len() == dst.len() =>
                {
                    dst.copy_from_slice(src)
                }
                (Some(Pixels::Buffer16(src)), Some(Pixels::Buffer16(dst)))
                    if src.len() == dst.len() =>
                {
                    dst.copy_from_slice(src)
                }
                _ => return Err(GainMapError::ReformatFailed),
            }
            return Ok(None);
        }

        let base_rgb_info = match RgbColorSpaceInfo::create_from(base_image) {
            Ok(info) => info,
            Err(_) => {
                diag.set_error("Unsupported RGB color space".into());
                return Err(GainMapError::NotImplemented);
            }
        };
        let tone_mapped_rgb_info = match RgbColorSpaceInfo::create_from(tone_mapped_image) {
            Ok(info) => info,
            Err(_) => {
                diag.set_error("Unsupported RGB color space".into());
                return Err(GainMapError::NotImplemented);
            }
        };

        let gamma_to_linear = base_transfer_characteristics.gamma_to_linear_function();
        let linear_to_gamma = output_transfer_characteristics.linear_to_gamma_function();

        // Early exit if the gain map does not need to be applied: only
        // convert from one RGB format to another.
        if weight == 0.0 {
            let primaries_differ = base_color_primaries != output_color_primaries;
            let conversion_coeffs = if primaries_differ {
                match compute_rgb_to_rgb_matrix(base_color_primaries, output_color_primaries) {
                    Some(coeffs) => Some(coeffs),
                    None => {
                        diag.set_error("Unsupported RGB color space conversion".into());
                        return Err(GainMapError::NotImplemented);
                    }
                }
            } else {
                None
            };
            for j in 0..height {
                for i in 0..width {
                    let mut rgba = base_image.get_rgba(&base_rgb_info, i, j)?;
                    if output_transfer_characteristics != base_transfer_characteristics
                        || primaries_differ
                    {
                        for v in &mut rgba[0..3] {
                            *v = gamma_to_linear(*v);
                        }
                        if let Some(coeffs) = &conversion_coeffs {
                            linear_rgb_convert_color_space(&mut rgba, coeffs);
                        }
                        for v in &mut rgba[0..3] {
                            *v = clamp_f32(linear_to_gamma(*v), 0.0, 1.0);
                        }
                    }
                    tone_mapped_image.set_rgba(&tone_mapped_rgb_info, i, j, &rgba)?;
                }
            }
            return Ok(None);
        }

        let input_conversion_coeffs = if needs_input_conversion {
            match compute_rgb_to_rgb_matrix(base_color_primaries, math_primaries) {
                Some(coeffs) => Some(coeffs),
                None => {
                    diag.set_error("Unsupported RGB color space conversion".into());
                    return Err(GainMapError::NotImplemented);
                }
            }
        } else {
            None
        };
        let output_conversion_coeffs = if needs_output_conversion {
            match compute_rgb_to_rgb_matrix(math_primaries, output_color_primaries) {
                Some(coeffs) => Some(coeffs),
                None => {
                    diag.set_error("Unsupported RGB color space conversion".into());
                    return Err(GainMapError::NotImplemented);
                }
            }
        } else {
            None
        };

        // Bring the gain map image to the base image size if necessary.
        let rescaled_gain_map = if self.image.width != width || self.image.height != height {
            let mut rescaled = self.image.shallow_clone();
            rescaled.copy_planes_from(&self.image, &ALL_PLANES);
            rescaled.scale(width, height)?;
            Some(rescaled)
        } else {
            None
        };
        let gain_map_image = rescaled_gain_map.as_ref().unwrap_or(&self.image);

        let mut rgb_gain_map = rgb::Image::create_from_yuv(gain_map_image);
        rgb_gain_map.allocate()?;
        rgb_gain_map.convert_from_yuv(gain_map_image)?;

        let gain_map_rgb_info = match RgbColorSpaceInfo::create_from(&rgb_gain_map) {
            Ok(info) => info,
            Err(_) => {
                diag.set_error("Unsupported RGB color space".into());
                return Err(GainMapError::NotImplemented);
            }
        };

        let mut rgb_max_linear: f32 = 0.0; // Max tone mapped value across R, G and B.
        let mut rgb_sum_linear: f32 = 0.0; // Sum of max(r, g, b) over mapped pixels.

        // The metadata contains the encoding gamma; decoding uses 1/gamma.
        let mut gamma_inv = [0.0f32; 3];
        let mut gain_map_min = [0.0f32; 3];
        let mut gain_map_max = [0.0f32; 3];
        let mut base_offset = [0.0f32; 3];
        let mut alternate_offset = [0.0f32; 3];
        for c in 0..3 {
            gamma_inv[c] = 1.0 / ufraction_to_float(self.metadata.gamma[c]);
            gain_map_min[c] = fraction_to_float(self.metadata.min[c]);
            gain_map_max[c] = fraction_to_float(self.metadata.max[c]);
            base_offset[c] = fraction_to_float(self.metadata.base_offset[c]);
            alternate_offset[c] = fraction_to_float(self.metadata.alternate_offset[c]);
        }

        for j in 0..height {
            for i in 0..width {
                let mut base_rgba = base_image.get_rgba(&base_rgb_info, i, j)?;
                let gain_map_rgba = rgb_gain_map.get_rgba(&gain_map_rgb_info, i, j)?;

                for v in &mut base_rgba[0..3] {
                    *v = gamma_to_linear(*v);
                }
                if let Some(coeffs) = &input_conversion_coeffs {
                    linear_rgb_convert_color_space(&mut base_rgba, coeffs);
                }

                let mut tone_mapped_rgba = [0.0f32; 4];
                let mut pixel_rgb_max_linear: f32 = 0.0; // max(r, g, b) for this pixel
                for c in 0..3 {
                    let base_linear = base_rgba[c];
                    let gain_map_value = gain_map_rgba[c];

                    // Undo gamma and the affine transform; the result is in
                    // log2 space.
                    let gain_map_log2 = lerp(
                        gain_map_min[c],
                        gain_map_max[c],
                        gain_map_value.powf(gamma_inv[c]),
                    );
                    let tone_mapped_linear = (base_linear + base_offset[c])
                        * (gain_map_log2 * weight).exp2()
                        - alternate_offset[c];

                    rgb_max_linear = rgb_max_linear.max(tone_mapped_linear);
                    pixel_rgb_max_linear = pixel_rgb_max_linear.max(tone_mapped_linear);
                    tone_mapped_rgba[c] = tone_mapped_linear;
                }

                if let Some(coeffs) = &output_conversion_coeffs {
                    linear_rgb_convert_color_space(&mut tone_mapped_rgba, coeffs);
                }
                for v in &mut tone_mapped_rgba[0..3] {
                    *v = clamp_f32(linear_to_gamma(*v), 0.0, 1.0);
                }

                tone_mapped_rgba[3] = base_rgba[3]; // Alpha is unaffected by tone mapping.
                rgb_sum_linear += pixel_rgb_max_linear;
                tone_mapped_image.set_rgba(&tone_mapped_rgb_info, i, j, &tone_mapped_rgba)?;
            }
        }

        // For exact CLLI value definitions, see ISO/IEC 23008-2 section
        // D.3.35. Converts extended SDR (1.0 is SDR white) to nits.
        let rgb_average_linear = rgb_sum_linear / (width as f32 * height as f32);
        Ok(Some(ContentLightLevelInformation {
            max_cll: clamp_f32((rgb_max_linear * SDR_WHITE_NITS).round(), 0.0, u16::MAX as f32)
                as u16,
            max_pall: clamp_f32(
                (rgb_average_linear * SDR_WHITE_NITS).round(),
                0.0,
                u16::MAX as f32,
            ) as u16,
        }))
    }

    /// Decodes `base_image` to RGB and applies the gain map. Inputs carrying
    /// an ICC profile are not supported.
    pub fn apply(
        &self,
        base_image: &image::Image,
        hdr_headroom: f32,
        output_color_primaries: ColorPrimaries,
        output_transfer_characteristics: TransferCharacteristics,
        tone_mapped_image: &mut rgb::Image,
        diag: &mut Diagnostics,
    ) -> GainMapResult<Option<ContentLightLevelInformation>> {
        diag.clear();

        if !base_image.icc.is_empty() || !self.alt_icc.is_empty() {
            diag.set_error("Tone mapping for images with ICC profiles is not supported".into());
            return Err(GainMapError::NotImplemented);
        }

        let mut base_image_rgb = rgb::Image::create_from_yuv(base_image);
        base_image_rgb.allocate()?;
        base_image_rgb.convert_from_yuv(base_image)?;

        self.apply_to_rgb(
            &base_image_rgb,
            base_image.color_primaries,
            base_image.transfer_characteristics,
            hdr_headroom,
            output_color_primaries,
            output_transfer_characteristics,
            tone_mapped_image,
            diag,
        )
    }
}

// ---------------------------------------------------------------------------
// Creating a gain map.

impl GainMap {
    /// Computes this gain map so that applying it to `base_image` recovers
    /// `alt_image`. `self.image` must be set up with the desired dimensions,
    /// depth and YUV format beforehand (`Yuv400` selects a single-channel
    /// gain map). The headrooms label the renditions and are stored in the
    /// metadata.
    #[allow(clippy::too_many_arguments)]
    pub fn compute_from_rgb(
        &mut self,
        base_image: &rgb::Image,
        base_color_primaries: ColorPrimaries,
        base_transfer_characteristics: TransferCharacteristics,
        alt_image: &rgb::Image,
        alt_color_primaries: ColorPrimaries,
        alt_transfer_characteristics: TransferCharacteristics,
        base_hdr_headroom: f64,
        alternate_hdr_headroom: f64,
        diag: &mut Diagnostics,
    ) -> GainMapResult<()> {
        diag.clear();

        if base_image.pixels.is_none() || alt_image.pixels.is_none() {
            diag.set_error("empty input image".into());
            return Err(GainMapError::InvalidArgument);
        }
        if base_image.width != alt_image.width || base_image.height != alt_image.height {
            diag.set_error("Both images should have the same dimensions".into());
            return Err(GainMapError::InvalidArgument);
        }
        if self.image.width == 0 || self.image.height == 0 || self.image.depth == 0 {
            diag.set_error(
                "The gain map image should have the desired width, height and depth set".into(),
            );
            return Err(GainMapError::InvalidArgument);
        }

        let result = self.compute_from_rgb_impl(
            base_image,
            base_color_primaries,
            base_transfer_characteristics,
            alt_image,
            alt_color_primaries,
            alt_transfer_characteristics,
            base_hdr_headroom,
            alternate_hdr_headroom,
            diag,
        );
        if result.is_err() {
            self.image.free_planes(&ALL_PLANES);
        }
        result
    }

    #[allow(clippy::too_many_arguments)]
    fn compute_from_rgb_impl(
        &mut self,
        base_image: &rgb::Image,
        base_color_primaries: ColorPrimaries,
        base_transfer_characteristics: TransferCharacteristics,
        alt_image: &rgb::Image,
        alt_color_primaries: ColorPrimaries,
        alt_transfer_characteristics: TransferCharacteristics,
        base_hdr_headroom: f64,
        alternate_hdr_headroom: f64,
        diag: &mut Diagnostics,
    ) -> GainMapResult<()> {
        let color_spaces_differ = base_color_primaries != alt_color_primaries;
        let math_primaries =
            choose_color_space_for_gain_map_math(base_color_primaries, alt_color_primaries)?;
        let width = base_image.width;
        let height = base_image.height;

        let base_rgb_info = match RgbColorSpaceInfo::create_from(base_image) {
            Ok(info) => info,
            Err(_) => {
                diag.set_error("Unsupported RGB color space".into());
                return Err(GainMapError::NotImplemented);
            }
        };
        let alt_rgb_info = match RgbColorSpaceInfo::create_from(alt_image) {
            Ok(info) => info,
            Err(_) => {
                diag.set_error("Unsupported RGB color space".into());
                return Err(GainMapError::NotImplemented);
            }
        };

        let single_channel = self.image.yuv_format.is_monochrome();
        let num_gain_map_channels = if single_channel { 1 } else { 3 };

        // Temporary buffers for the gain map as floating point values, one
        // per channel.
        let pixel_count = usize_from_u32(checked_mul!(width, height)?)?;
        let mut gain_map_f: Vec<Vec<f32>> = Vec::new();
        for _ in 0..num_gain_map_channels {
            let mut buffer: Vec<f32> = create_vec_exact(pixel_count)?;
            buffer.resize(pixel_count, 0.0);
            gain_map_f.push(buffer);
        }

        self.metadata.set_encoding_defaults();
        self.metadata.use_base_color_space = math_primaries == base_color_primaries;
        let use_base_color_space = self.metadata.use_base_color_space;

        let base_gamma_to_linear = base_transfer_characteristics.gamma_to_linear_function();
        let alt_gamma_to_linear = alt_transfer_characteristics.gamma_to_linear_function();
        let y_coeffs = compute_y_coeffs(math_primaries);

        let rgb_conversion_coeffs = if color_spaces_differ {
            let (src, dst) = if use_base_color_space {
                (alt_color_primaries, base_color_primaries)
            } else {
                (base_color_primaries, alt_color_primaries)
            };
            match compute_rgb_to_rgb_matrix(src, dst) {
                Some(coeffs) => Some(coeffs),
                None => {
                    diag.set_error("Unsupported RGB color space conversion".into());
                    return Err(GainMapError::NotImplemented);
                }
            }
        } else {
            None
        };

        let mut base_offset = [0.0f32; 3];
        let mut alternate_offset = [0.0f32; 3];
        for c in 0..3 {
            base_offset[c] = fraction_to_float(self.metadata.base_offset[c]);
            alternate_offset[c] = fraction_to_float(self.metadata.alternate_offset[c]);
        }

        // Converting from one color space to the other may yield negative
        // values; widen the offsets so that the log2 input stays positive
        // (the choice of math primaries mostly avoids this already).
        if let Some(coeffs) = &rgb_conversion_coeffs {
            let (other_image, other_info, other_gamma_to_linear) = if use_base_color_space {
                (alt_image, &alt_rgb_info, alt_gamma_to_linear)
            } else {
                (base_image, &base_rgb_info, base_gamma_to_linear)
            };
            let mut channel_min = [0.0f32; 3];
            for j in 0..height {
                for i in 0..width {
                    let mut rgba = other_image.get_rgba(other_info, i, j)?;
                    for v in &mut rgba[0..3] {
                        *v = other_gamma_to_linear(*v);
                    }
                    linear_rgb_convert_color_space(&mut rgba, coeffs);
                    for c in 0..3 {
                        channel_min[c] = channel_min[c].min(rgba[c]);
                    }
                }
            }
            // Large offsets cause artefacts when partially applying the gain
            // map, so the offset is capped; some gain map values will get
            // clamped instead.
            const MAX_OFFSET: f32 = 0.1;
            for c in 0..3 {
                if channel_min[c] < -K_EPSILON {
                    if use_base_color_space {
                        alternate_offset[c] =
                            (alternate_offset[c] - channel_min[c]).min(MAX_OFFSET);
                    } else {
                        base_offset[c] = (base_offset[c] - channel_min[c]).min(MAX_OFFSET);
                    }
                }
            }
        }

        // Compute the raw per-channel log2 ratios.
        for j in 0..height {
            for i in 0..width {
                let mut base_rgba = base_image.get_rgba(&base_rgb_info, i, j)?;
                let mut alt_rgba = alt_image.get_rgba(&alt_rgb_info, i, j)?;
                for c in 0..3 {
                    base_rgba[c] = base_gamma_to_linear(base_rgba[c]);
                    alt_rgba[c] = alt_gamma_to_linear(alt_rgba[c]);
                }
                if let Some(coeffs) = &rgb_conversion_coeffs {
                    if use_base_color_space {
                        linear_rgb_convert_color_space(&mut alt_rgba, coeffs);
                    } else {
                        linear_rgb_convert_color_space(&mut base_rgba, coeffs);
                    }
                }
                for c in 0..num_gain_map_channels {
                    let (base, alt) = if single_channel {
                        // Gray gain map: ratio of lumas in the math space.
                        (
                            y_coeffs[0] * base_rgba[0]
                                + y_coeffs[1] * base_rgba[1]
                                + y_coeffs[2] * base_rgba[2],
                            y_coeffs[0] * alt_rgba[0]
                                + y_coeffs[1] * alt_rgba[1]
                                + y_coeffs[2] * alt_rgba[2],
                        )
                    } else {
                        (base_rgba[c], alt_rgba[c])
                    };
                    let ratio = (alt + alternate_offset[c]) / (base + base_offset[c]);
                    gain_map_f[c][(j * width + i) as usize] = ratio.max(K_EPSILON).log2();
                }
            }
        }

        // Label the renditions in the metadata.
        self.metadata.base_hdr_headroom = match UFraction::from_f64(base_hdr_headroom) {
            Ok(f) => f,
            Err(_) => {
                diag.set_error(format!("unrepresentable base headroom {base_hdr_headroom}"));
                return Err(GainMapError::InvalidArgument);
            }
        };
        self.metadata.alternate_hdr_headroom = match UFraction::from_f64(alternate_hdr_headroom) {
            Ok(f) => f,
            Err(_) => {
                diag.set_error(format!(
                    "unrepresentable alternate headroom {alternate_hdr_headroom}"
                ));
                return Err(GainMapError::InvalidArgument);
            }
        };

        // The gain map stores the log-ratio of the HDR representation to the
        // SDR representation: flip the sign when the alternate image is the
        // darker one.
        if alternate_hdr_headroom < base_hdr_headroom {
            for buffer in &mut gain_map_f {
                for v in buffer.iter_mut() {
                    *v *= -1.0;
                }
            }
        }

        // Approximate per-channel min/max, discarding outliers.
        let mut gain_map_min_log2 = [0.0f32; 3];
        let mut gain_map_max_log2 = [0.0f32; 3];
        for c in 0..num_gain_map_channels {
            (gain_map_min_log2[c], gain_map_max_log2[c]) =
                find_min_max_without_outliers(&gain_map_f[c], diag)?;
        }

        // Serialize min/max and offsets as rationals.
        for c in 0..3 {
            let source = if single_channel { 0 } else { c };
            let values = [
                (gain_map_min_log2[source] as f64, &mut self.metadata.min[c]),
                (gain_map_max_log2[source] as f64, &mut self.metadata.max[c]),
                (alternate_offset[c] as f64, &mut self.metadata.alternate_offset[c]),
                (base_offset[c] as f64, &mut self.metadata.base_offset[c]),
            ];
            for (value, fraction) in values {
                *fraction = match Fraction::from_f64(value) {
                    Ok(f) => f,
                    Err(_) => {
                        diag.set_error(format!("unrepresentable gain map value {value}"));
                        return Err(GainMapError::InvalidArgument);
                    }
                };
            }
        }

        // Scale the gain map values so that [min, max] maps to [0, 1].
        for c in 0..num_gain_map_channels {
            let min_log2 = gain_map_min_log2[c];
            let range = (gain_map_max_log2[c] - min_log2).max(0.0);
            if range == 0.0 {
                // The values are multiplied by zero when tone mapping, but
                // they still have to be in [0, 1].
                gain_map_f[c].fill(0.0);
            } else {
                let map_gamma = ufraction_to_float(self.metadata.gamma[c]);
                for v in gain_map_f[c].iter_mut() {
                    let clamped = clamp_f32(*v, min_log2, gain_map_max_log2[c]);
                    *v = clamp_f32(((clamped - min_log2) / range).powf(map_gamma), 0.0, 1.0);
                }
            }
        }

        // Convert the gain map to YUV, at full resolution first; scaling the
        // source images instead performs worse.
        let requested_width = self.image.width;
        let requested_height = self.image.height;
        self.image.width = width;
        self.image.height = height;
        self.image.free_planes(&ALL_PLANES); // In case planes were already allocated.

        let mut gain_map_rgb = rgb::Image::create_from_yuv(&self.image);
        gain_map_rgb.allocate()?;
        let gain_map_rgb_info = match RgbColorSpaceInfo::create_from(&gain_map_rgb) {
            Ok(info) => info,
            Err(_) => {
                diag.set_error("Unsupported RGB color space".into());
                return Err(GainMapError::NotImplemented);
            }
        };
        for j in 0..height {
            for i in 0..width {
                let offset = (j * width + i) as usize;
                let r = gain_map_f[0][offset];
                let g = if single_channel { r } else { gain_map_f[1][offset] };
                let b = if single_channel { r } else { gain_map_f[2][offset] };
                gain_map_rgb.set_rgba(&gain_map_rgb_info, i, j, &[r, g, b, 1.0])?;
            }
        }
        gain_map_rgb.convert_to_yuv(&mut self.image)?;

        // Scale down the gain map if requested.
        if requested_width != self.image.width || requested_height != self.image.height {
            self.image.scale(requested_width, requested_height)?;
        }
        Ok(())
    }

    /// Decodes both renditions to RGB, computes the gain map and copies the
    /// alternate rendition's descriptors. Inputs carrying an ICC profile are
    /// not supported.
    pub fn compute(
        &mut self,
        base_image: &image::Image,
        alt_image: &image::Image,
        base_hdr_headroom: f64,
        alternate_hdr_headroom: f64,
        diag: &mut Diagnostics,
    ) -> GainMapResult<()> {
        diag.clear();

        if !base_image.icc.is_empty() || !alt_image.icc.is_empty() {
            diag.set_error(
                "Computing gain maps for images with ICC profiles is not supported".into(),
            );
            return Err(GainMapError::NotImplemented);
        }
        if base_image.width != alt_image.width || base_image.height != alt_image.height {
            diag.set_error(format!(
                "Image dimensions don't match, got {}x{} and {}x{}",
                base_image.width, base_image.height, alt_image.width, alt_image.height
            ));
            return Err(GainMapError::InvalidArgument);
        }

        let mut base_image_rgb = rgb::Image::create_from_yuv(base_image);
        base_image_rgb.allocate()?;
        base_image_rgb.convert_from_yuv(base_image)?;
        let mut alt_image_rgb = rgb::Image::create_from_yuv(alt_image);
        alt_image_rgb.allocate()?;
        alt_image_rgb.convert_from_yuv(alt_image)?;

        self.compute_from_rgb(
            &base_image_rgb,
            base_image.color_primaries,
            base_image.transfer_characteristics,
            &alt_image_rgb,
            alt_image.color_primaries,
            alt_image.transfer_characteristics,
            base_hdr_headroom,
            alternate_hdr_headroom,
            diag,
        )?;

        self.alt_icc = alt_image.icc.clone();
        self.alt_color_primaries = alt_image.color_primaries;
        self.alt_transfer_characteristics = alt_image.transfer_characteristics;
        self.alt_matrix_coefficients = alt_image.matrix_coefficients;
        self.alt_yuv_range = alt_image.yuv_range;
        self.alt_plane_depth = alt_image.depth;
        self.alt_plane_count = if alt_image.yuv_format.is_monochrome() { 1 } else { 3 };
        self.alt_clli = alt_image.clli.unwrap_or_default();
        Ok(())
    }
}

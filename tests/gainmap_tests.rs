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

use gainmap::diagnostics::Diagnostics;
use gainmap::gainmap::*;
use gainmap::image;
use gainmap::image::{Plane, YuvRange};
use gainmap::reformat::rgb;
use gainmap::utils::*;
use gainmap::{
    Category, ColorPrimaries, ContentLightLevelInformation, GainMapError, MatrixCoefficients,
    PixelFormat, TransferCharacteristics,
};

// All tests use Format::Rgba so channel offsets are the identity.

fn make_rgb(width: u32, height: u32, depth: u8) -> rgb::Image {
    let mut image = rgb::Image {
        width,
        height,
        depth,
        format: rgb::Format::Rgba,
        ..Default::default()
    };
    image.allocate().expect("rgb allocation");
    image
}

fn set_pixel(image: &mut rgb::Image, x: u32, y: u32, rgba: [f32; 4]) {
    let max_channel_f = image.max_channel_f();
    let channel_count = image.channel_count() as usize;
    let offset = x as usize * channel_count;
    if image.depth == 8 {
        let row = image.row_mut(y).unwrap();
        for c in 0..channel_count {
            row[offset + c] = (rgba[c] * max_channel_f + 0.5) as u8;
        }
    } else {
        let row = image.row16_mut(y).unwrap();
        for c in 0..channel_count {
            row[offset + c] = (rgba[c] * max_channel_f + 0.5) as u16;
        }
    }
}

fn get_pixel(image: &rgb::Image, x: u32, y: u32) -> [f32; 4] {
    let max_channel_f = image.max_channel_f();
    let channel_count = image.channel_count() as usize;
    let offset = x as usize * channel_count;
    let mut rgba = [0.0f32; 4];
    if image.depth == 8 {
        let row = image.row(y).unwrap();
        for c in 0..channel_count {
            rgba[c] = row[offset + c] as f32 / max_channel_f;
        }
    } else {
        let row = image.row16(y).unwrap();
        for c in 0..channel_count {
            rgba[c] = row[offset + c] as f32 / max_channel_f;
        }
    }
    rgba
}

fn fill_rgb(image: &mut rgb::Image, rgba: [f32; 4]) {
    for y in 0..image.height {
        for x in 0..image.width {
            set_pixel(image, x, y, rgba);
        }
    }
}

// Gain map whose metadata is hand-written for applying; `gain_value` is the
// normalized (already encoded) sample stored in a monochrome map.
fn manual_gain_map(width: u32, height: u32, gain_value: u8) -> GainMap {
    let mut gain_map = GainMap {
        image: image::Image {
            width,
            height,
            depth: 8,
            yuv_format: PixelFormat::Yuv400,
            ..Default::default()
        },
        ..Default::default()
    };
    gain_map.image.allocate_planes(Category::Color).unwrap();
    for y in 0..height {
        gain_map.image.row_mut(Plane::Y, y).unwrap().fill(gain_value);
    }
    let metadata = &mut gain_map.metadata;
    for c in 0..3 {
        metadata.min[c] = Fraction(0, 1);
        metadata.max[c] = Fraction(0, 1);
        metadata.gamma[c] = UFraction(1, 1);
        metadata.base_offset[c] = Fraction(0, 1);
        metadata.alternate_offset[c] = Fraction(0, 1);
    }
    metadata.base_hdr_headroom = UFraction(0, 1);
    metadata.alternate_hdr_headroom = UFraction(1, 1);
    metadata.use_base_color_space = true;
    gain_map
}

fn assert_pixel_near(actual: [f32; 4], expected: [f32; 3], epsilon: f32) {
    for c in 0..3 {
        assert!(
            (actual[c] - expected[c]).abs() <= epsilon,
            "channel {c}: {actual:?} vs {expected:?}"
        );
    }
}

#[test]
fn weight_zero_fast_path_returns_base_bytes() {
    let mut diag = Diagnostics::default();
    let mut base = make_rgb(3, 3, 8);
    for y in 0..3 {
        for x in 0..3 {
            set_pixel(&mut base, x, y, [0.1 * (x + 1) as f32, 0.2, 0.3 * (y + 1) as f32, 1.0]);
        }
    }
    // Base and alternate headrooms are 0 and 1; a display headroom of 0
    // means the gain map is not applied at all.
    let gain_map = manual_gain_map(3, 3, 128);
    let mut tone_mapped = rgb::Image {
        format: rgb::Format::Rgba,
        depth: 8,
        ..Default::default()
    };
    let clli = gain_map
        .apply_to_rgb(
            &base,
            ColorPrimaries::Srgb,
            TransferCharacteristics::Srgb,
            /*hdr_headroom=*/ 0.0,
            ColorPrimaries::Srgb,
            TransferCharacteristics::Srgb,
            &mut tone_mapped,
            &mut diag,
        )
        .unwrap();
    assert!(clli.is_none());
    for y in 0..3 {
        assert_eq!(base.row(y).unwrap(), tone_mapped.row(y).unwrap());
    }
}

#[test]
fn weight_zero_with_transfer_conversion() {
    let mut diag = Diagnostics::default();
    let mut base = make_rgb(2, 2, 16);
    fill_rgb(&mut base, [0.5, 0.5, 0.5, 1.0]);
    let gain_map = manual_gain_map(2, 2, 128);
    let mut tone_mapped = rgb::Image {
        format: rgb::Format::Rgba,
        depth: 16,
        ..Default::default()
    };
    let clli = gain_map
        .apply_to_rgb(
            &base,
            ColorPrimaries::Srgb,
            TransferCharacteristics::Srgb,
            0.0,
            ColorPrimaries::Srgb,
            TransferCharacteristics::Linear,
            &mut tone_mapped,
            &mut diag,
        )
        .unwrap();
    assert!(clli.is_none());
    // sRGB 0.5 decodes to 0.2140 linear.
    assert_pixel_near(get_pixel(&tone_mapped, 1, 1), [0.21404; 3], 2e-3);
}

#[test]
fn negative_headroom_is_rejected() {
    let mut diag = Diagnostics::default();
    let base = make_rgb(2, 2, 8);
    let gain_map = manual_gain_map(2, 2, 0);
    let mut tone_mapped = rgb::Image::default();
    assert_eq!(
        gain_map.apply_to_rgb(
            &base,
            ColorPrimaries::Srgb,
            TransferCharacteristics::Srgb,
            -1.0,
            ColorPrimaries::Srgb,
            TransferCharacteristics::Srgb,
            &mut tone_mapped,
            &mut diag,
        ),
        Err(GainMapError::InvalidArgument)
    );
    assert!(diag.has_error());
}

#[test]
fn unallocated_base_is_rejected() {
    let mut diag = Diagnostics::default();
    let base = rgb::Image {
        width: 2,
        height: 2,
        depth: 8,
        ..Default::default()
    }; // pixels never allocated
    let gain_map = manual_gain_map(2, 2, 0);
    let mut tone_mapped = rgb::Image::default();
    assert_eq!(
        gain_map.apply_to_rgb(
            &base,
            ColorPrimaries::Srgb,
            TransferCharacteristics::Srgb,
            1.0,
            ColorPrimaries::Srgb,
            TransferCharacteristics::Srgb,
            &mut tone_mapped,
            &mut diag,
        ),
        Err(GainMapError::InvalidArgument)
    );
}

#[test]
fn invalid_metadata_is_rejected() {
    let mut diag = Diagnostics::default();
    let base = make_rgb(2, 2, 8);
    let mut gain_map = manual_gain_map(2, 2, 0);
    gain_map.metadata.min[1] = Fraction(1, 1);
    gain_map.metadata.max[1] = Fraction(0, 1); // max < min
    let mut tone_mapped = rgb::Image::default();
    assert_eq!(
        gain_map.apply_to_rgb(
            &base,
            ColorPrimaries::Srgb,
            TransferCharacteristics::Srgb,
            1.0,
            ColorPrimaries::Srgb,
            TransferCharacteristics::Srgb,
            &mut tone_mapped,
            &mut diag,
        ),
        Err(GainMapError::InvalidArgument)
    );
}

#[test]
fn icc_profiles_are_rejected() {
    let mut diag = Diagnostics::default();
    let mut base = image::Image {
        width: 2,
        height: 2,
        depth: 8,
        yuv_format: PixelFormat::Yuv444,
        icc: vec![0u8; 4],
        ..Default::default()
    };
    base.allocate_planes(Category::Color).unwrap();
    let gain_map = manual_gain_map(2, 2, 0);
    let mut tone_mapped = rgb::Image::default();
    assert_eq!(
        gain_map.apply(
            &base,
            1.0,
            ColorPrimaries::Srgb,
            TransferCharacteristics::Srgb,
            &mut tone_mapped,
            &mut diag,
        ),
        Err(GainMapError::NotImplemented)
    );
    assert!(diag.has_error());

    // Same for computing.
    let mut alt = image::Image {
        width: 2,
        height: 2,
        depth: 8,
        yuv_format: PixelFormat::Yuv444,
        ..Default::default()
    };
    alt.allocate_planes(Category::Color).unwrap();
    let mut gain_map = manual_gain_map(2, 2, 0);
    assert_eq!(
        gain_map.compute(&base, &alt, 0.0, 1.0, &mut diag),
        Err(GainMapError::NotImplemented)
    );
}

#[test]
fn constant_gray_is_preserved() {
    let mut diag = Diagnostics::default();
    let mut base = make_rgb(2, 2, 8);
    fill_rgb(&mut base, [0.5, 0.5, 0.5, 1.0]);
    let mut alt = make_rgb(2, 2, 8);
    fill_rgb(&mut alt, [0.5, 0.5, 0.5, 1.0]);

    let mut gain_map = GainMap {
        image: image::Image {
            width: 2,
            height: 2,
            depth: 8,
            yuv_format: PixelFormat::Yuv444,
            ..Default::default()
        },
        ..Default::default()
    };
    gain_map
        .compute_from_rgb(
            &base,
            ColorPrimaries::Srgb,
            TransferCharacteristics::Linear,
            &alt,
            ColorPrimaries::Srgb,
            TransferCharacteristics::Linear,
            0.0,
            1.0,
            &mut diag,
        )
        .unwrap();

    for hdr_headroom in [0.0, 0.3, 1.0, 2.5] {
        let mut tone_mapped = rgb::Image {
            format: rgb::Format::Rgba,
            depth: 8,
            ..Default::default()
        };
        gain_map
            .apply_to_rgb(
                &base,
                ColorPrimaries::Srgb,
                TransferCharacteristics::Linear,
                hdr_headroom,
                ColorPrimaries::Srgb,
                TransferCharacteristics::Linear,
                &mut tone_mapped,
                &mut diag,
            )
            .unwrap();
        assert_pixel_near(get_pixel(&tone_mapped, 0, 0), [0.5; 3], 2.0 / 255.0);
    }
}

#[test]
fn pure_doubling_recovers_alternate() {
    let mut diag = Diagnostics::default();
    let mut base = make_rgb(2, 2, 8);
    fill_rgb(&mut base, [64.0 / 255.0, 64.0 / 255.0, 64.0 / 255.0, 1.0]);
    let mut alt = make_rgb(2, 2, 8);
    fill_rgb(&mut alt, [128.0 / 255.0, 128.0 / 255.0, 128.0 / 255.0, 1.0]);

    let mut gain_map = GainMap {
        image: image::Image {
            width: 2,
            height: 2,
            depth: 8,
            yuv_format: PixelFormat::Yuv444,
            ..Default::default()
        },
        ..Default::default()
    };
    gain_map
        .compute_from_rgb(
            &base,
            ColorPrimaries::Srgb,
            TransferCharacteristics::Linear,
            &alt,
            ColorPrimaries::Srgb,
            TransferCharacteristics::Linear,
            0.0,
            1.0,
            &mut diag,
        )
        .unwrap();

    // The stored range is the log2 ratio with the default 1/64 offsets
    // folded in; the content is constant so min == max.
    let expected_log2 =
        ((128.0f64 / 255.0 + 1.0 / 64.0) / (64.0f64 / 255.0 + 1.0 / 64.0)).log2();
    let written_value = gain_map.metadata.min[0].as_f64().unwrap();
    assert!((written_value - expected_log2).abs() < 1e-4);
    assert_eq!(gain_map.metadata.min[0], gain_map.metadata.max[0]);

    let mut tone_mapped = rgb::Image {
        format: rgb::Format::Rgba,
        depth: 8,
        ..Default::default()
    };
    let clli = gain_map
        .apply_to_rgb(
            &base,
            ColorPrimaries::Srgb,
            TransferCharacteristics::Linear,
            /*hdr_headroom=*/ 1.0,
            ColorPrimaries::Srgb,
            TransferCharacteristics::Linear,
            &mut tone_mapped,
            &mut diag,
        )
        .unwrap();
    assert!(clli.is_some());
    assert_pixel_near(get_pixel(&tone_mapped, 1, 0), [128.0 / 255.0; 3], 2.0 / 255.0);
}

#[test]
fn headroom_interpolation_halves_the_log_gain() {
    let mut diag = Diagnostics::default();
    let mut base = make_rgb(1, 1, 16);
    fill_rgb(&mut base, [0.25, 0.25, 0.25, 1.0]);

    // Monochrome gain map sample of 128/255, decoded through min 0, max 2:
    // log2 gain = lerp(0, 2, 128/255).
    let mut gain_map = manual_gain_map(1, 1, 128);
    for c in 0..3 {
        gain_map.metadata.max[c] = Fraction(2, 1);
    }
    gain_map.metadata.base_hdr_headroom = UFraction(0, 1);
    gain_map.metadata.alternate_hdr_headroom = UFraction(4, 1);

    let mut tone_mapped = rgb::Image {
        format: rgb::Format::Rgba,
        depth: 16,
        ..Default::default()
    };
    gain_map
        .apply_to_rgb(
            &base,
            ColorPrimaries::Srgb,
            TransferCharacteristics::Linear,
            /*hdr_headroom=*/ 2.0,
            ColorPrimaries::Srgb,
            TransferCharacteristics::Linear,
            &mut tone_mapped,
            &mut diag,
        )
        .unwrap();

    // weight = (2 - 0) / (4 - 0) = 0.5.
    let gain_log2 = 2.0f32 * (128.0 / 255.0);
    let expected = 0.25 * (gain_log2 * 0.5).exp2();
    assert_pixel_near(get_pixel(&tone_mapped, 0, 0), [expected; 3], 1e-3);
}

#[test]
fn clli_reports_sdr_white_as_203_nits() {
    let mut diag = Diagnostics::default();
    let mut base = make_rgb(1, 1, 8);
    fill_rgb(&mut base, [1.0, 1.0, 1.0, 1.0]);
    // Identity gain (min = max = 0): the tone mapped value stays 1.0.
    let gain_map = manual_gain_map(1, 1, 37);
    let mut tone_mapped = rgb::Image {
        format: rgb::Format::Rgba,
        depth: 8,
        ..Default::default()
    };
    let clli = gain_map
        .apply_to_rgb(
            &base,
            ColorPrimaries::Srgb,
            TransferCharacteristics::Linear,
            1.0,
            ColorPrimaries::Srgb,
            TransferCharacteristics::Linear,
            &mut tone_mapped,
            &mut diag,
        )
        .unwrap()
        .expect("clli");
    assert_eq!(clli.max_cll, 203);
    assert_eq!(clli.max_pall, 203);
}

#[test]
fn gain_map_is_rescaled_to_base_dimensions() {
    let mut diag = Diagnostics::default();
    let mut base = make_rgb(4, 4, 8);
    fill_rgb(&mut base, [0.25, 0.25, 0.25, 1.0]);
    // 2x2 gain map; constant log2 gain of 1 (min = max = 1).
    let mut gain_map = manual_gain_map(2, 2, 200);
    for c in 0..3 {
        gain_map.metadata.min[c] = Fraction(1, 1);
        gain_map.metadata.max[c] = Fraction(1, 1);
    }
    let mut tone_mapped = rgb::Image {
        format: rgb::Format::Rgba,
        depth: 8,
        ..Default::default()
    };
    gain_map
        .apply_to_rgb(
            &base,
            ColorPrimaries::Srgb,
            TransferCharacteristics::Linear,
            1.0,
            ColorPrimaries::Srgb,
            TransferCharacteristics::Linear,
            &mut tone_mapped,
            &mut diag,
        )
        .unwrap();
    assert_eq!(tone_mapped.width, 4);
    assert_eq!(tone_mapped.height, 4);
    assert_pixel_near(get_pixel(&tone_mapped, 3, 3), [0.5; 3], 2.0 / 255.0);
}

#[test]
fn compute_downscales_to_requested_dimensions() {
    let mut diag = Diagnostics::default();
    let mut base = make_rgb(4, 4, 8);
    fill_rgb(&mut base, [0.25, 0.25, 0.25, 1.0]);
    let mut alt = make_rgb(4, 4, 8);
    fill_rgb(&mut alt, [0.5, 0.5, 0.5, 1.0]);
    let mut gain_map = GainMap {
        image: image::Image {
            width: 2,
            height: 2,
            depth: 8,
            yuv_format: PixelFormat::Yuv444,
            ..Default::default()
        },
        ..Default::default()
    };
    gain_map
        .compute_from_rgb(
            &base,
            ColorPrimaries::Srgb,
            TransferCharacteristics::Linear,
            &alt,
            ColorPrimaries::Srgb,
            TransferCharacteristics::Linear,
            0.0,
            1.0,
            &mut diag,
        )
        .unwrap();
    assert_eq!(gain_map.image.width, 2);
    assert_eq!(gain_map.image.height, 2);

    // Applying the downscaled map on the full resolution base recovers the
    // alternate image (the content is flat, so scaling is lossless).
    let mut tone_mapped = rgb::Image {
        format: rgb::Format::Rgba,
        depth: 8,
        ..Default::default()
    };
    gain_map
        .apply_to_rgb(
            &base,
            ColorPrimaries::Srgb,
            TransferCharacteristics::Linear,
            1.0,
            ColorPrimaries::Srgb,
            TransferCharacteristics::Linear,
            &mut tone_mapped,
            &mut diag,
        )
        .unwrap();
    assert_pixel_near(get_pixel(&tone_mapped, 0, 3), [0.5; 3], 2.0 / 255.0);
}

#[test]
fn single_channel_gain_map_replicates_metadata() {
    let mut diag = Diagnostics::default();
    let mut base = make_rgb(2, 2, 8);
    fill_rgb(&mut base, [0.25, 0.25, 0.25, 1.0]);
    let mut alt = make_rgb(2, 2, 8);
    fill_rgb(&mut alt, [0.5, 0.5, 0.5, 1.0]);
    let mut gain_map = GainMap {
        image: image::Image {
            width: 2,
            height: 2,
            depth: 8,
            yuv_format: PixelFormat::Yuv400,
            ..Default::default()
        },
        ..Default::default()
    };
    gain_map
        .compute_from_rgb(
            &base,
            ColorPrimaries::Srgb,
            TransferCharacteristics::Linear,
            &alt,
            ColorPrimaries::Srgb,
            TransferCharacteristics::Linear,
            0.0,
            1.0,
            &mut diag,
        )
        .unwrap();
    // Channels 1 and 2 are written from channel 0.
    assert_eq!(gain_map.metadata.min[0], gain_map.metadata.min[1]);
    assert_eq!(gain_map.metadata.min[0], gain_map.metadata.min[2]);
    assert_eq!(gain_map.metadata.max[0], gain_map.metadata.max[1]);
    assert_eq!(gain_map.metadata.max[0], gain_map.metadata.max[2]);
    assert!(gain_map.image.has_plane(Plane::Y));
    assert!(!gain_map.image.has_plane(Plane::U));

    let mut tone_mapped = rgb::Image {
        format: rgb::Format::Rgba,
        depth: 8,
        ..Default::default()
    };
    gain_map
        .apply_to_rgb(
            &base,
            ColorPrimaries::Srgb,
            TransferCharacteristics::Linear,
            1.0,
            ColorPrimaries::Srgb,
            TransferCharacteristics::Linear,
            &mut tone_mapped,
            &mut diag,
        )
        .unwrap();
    assert_pixel_near(get_pixel(&tone_mapped, 1, 1), [0.5; 3], 2.0 / 255.0);
}

#[test]
fn darkening_map_stores_flipped_sign() {
    let mut diag = Diagnostics::default();
    // The alternate rendition is darker and labeled with a smaller headroom:
    // the stored values are the negated log ratios, i.e. positive.
    let mut base = make_rgb(2, 2, 8);
    fill_rgb(&mut base, [0.5, 0.5, 0.5, 1.0]);
    let mut alt = make_rgb(2, 2, 8);
    fill_rgb(&mut alt, [0.25, 0.25, 0.25, 1.0]);
    let mut gain_map = GainMap {
        image: image::Image {
            width: 2,
            height: 2,
            depth: 8,
            yuv_format: PixelFormat::Yuv444,
            ..Default::default()
        },
        ..Default::default()
    };
    gain_map
        .compute_from_rgb(
            &base,
            ColorPrimaries::Srgb,
            TransferCharacteristics::Linear,
            &alt,
            ColorPrimaries::Srgb,
            TransferCharacteristics::Linear,
            /*base_hdr_headroom=*/ 1.0,
            /*alternate_hdr_headroom=*/ 0.0,
            &mut diag,
        )
        .unwrap();
    let min = gain_map.metadata.min[0];
    assert!(min.0 > 0, "expected positive log ratio, got {min:?}");

    // Tone mapping to headroom 0 applies the full (negated) gain and
    // recovers the darker alternate image.
    let mut tone_mapped = rgb::Image {
        format: rgb::Format::Rgba,
        depth: 8,
        ..Default::default()
    };
    gain_map
        .apply_to_rgb(
            &base,
            ColorPrimaries::Srgb,
            TransferCharacteristics::Linear,
            /*hdr_headroom=*/ 0.0,
            ColorPrimaries::Srgb,
            TransferCharacteristics::Linear,
            &mut tone_mapped,
            &mut diag,
        )
        .unwrap();
    assert_pixel_near(get_pixel(&tone_mapped, 0, 0), [0.25; 3], 2.0 / 255.0);
}

#[test]
fn gradient_round_trip() {
    let mut diag = Diagnostics::default();
    let width = 8;
    let height = 8;
    let mut base = make_rgb(width, height, 8);
    let mut alt = make_rgb(width, height, 8);
    for y in 0..height {
        for x in 0..width {
            let v = (y * width + x) as f32 / (width * height) as f32 * 0.5;
            set_pixel(&mut base, x, y, [v, v, v, 1.0]);
            set_pixel(&mut alt, x, y, [2.0 * v, 2.0 * v, 2.0 * v, 1.0]);
        }
    }
    let mut gain_map = GainMap {
        image: image::Image {
            width,
            height,
            depth: 8,
            yuv_format: PixelFormat::Yuv444,
            ..Default::default()
        },
        ..Default::default()
    };
    gain_map
        .compute_from_rgb(
            &base,
            ColorPrimaries::Srgb,
            TransferCharacteristics::Linear,
            &alt,
            ColorPrimaries::Srgb,
            TransferCharacteristics::Linear,
            0.0,
            1.0,
            &mut diag,
        )
        .unwrap();
    let mut tone_mapped = rgb::Image {
        format: rgb::Format::Rgba,
        depth: 8,
        ..Default::default()
    };
    gain_map
        .apply_to_rgb(
            &base,
            ColorPrimaries::Srgb,
            TransferCharacteristics::Linear,
            1.0,
            ColorPrimaries::Srgb,
            TransferCharacteristics::Linear,
            &mut tone_mapped,
            &mut diag,
        )
        .unwrap();
    for y in 0..height {
        for x in 0..width {
            let expected = get_pixel(&alt, x, y);
            let actual = get_pixel(&tone_mapped, x, y);
            assert_pixel_near(actual, [expected[0], expected[1], expected[2]], 0.02);
        }
    }
}

#[test]
fn compute_copies_alternate_descriptors() {
    let mut diag = Diagnostics::default();
    let mut base = image::Image {
        width: 2,
        height: 2,
        depth: 8,
        yuv_format: PixelFormat::Yuv444,
        transfer_characteristics: TransferCharacteristics::Linear,
        ..Default::default()
    };
    base.allocate_planes(Category::Color).unwrap();
    for y in 0..2 {
        base.row_mut(Plane::Y, y).unwrap().fill(64);
        base.row_mut(Plane::U, y).unwrap().fill(128);
        base.row_mut(Plane::V, y).unwrap().fill(128);
    }
    let mut alt = image::Image {
        width: 2,
        height: 2,
        depth: 10,
        yuv_format: PixelFormat::Yuv444,
        yuv_range: YuvRange::Full,
        color_primaries: ColorPrimaries::Bt2020,
        transfer_characteristics: TransferCharacteristics::Linear,
        matrix_coefficients: MatrixCoefficients::Bt2020Ncl,
        clli: Some(ContentLightLevelInformation { max_cll: 1000, max_pall: 400 }),
        ..Default::default()
    };
    alt.allocate_planes(Category::Color).unwrap();
    for y in 0..2 {
        alt.row16_mut(Plane::Y, y).unwrap().fill(512);
        alt.row16_mut(Plane::U, y).unwrap().fill(512);
        alt.row16_mut(Plane::V, y).unwrap().fill(512);
    }
    let mut gain_map = GainMap {
        image: image::Image {
            width: 2,
            height: 2,
            depth: 8,
            yuv_format: PixelFormat::Yuv444,
            ..Default::default()
        },
        ..Default::default()
    };
    gain_map.compute(&base, &alt, 0.0, 2.0, &mut diag).unwrap();
    assert_eq!(gain_map.alt_color_primaries, ColorPrimaries::Bt2020);
    assert_eq!(
        gain_map.alt_transfer_characteristics,
        TransferCharacteristics::Linear
    );
    assert_eq!(gain_map.alt_matrix_coefficients, MatrixCoefficients::Bt2020Ncl);
    assert_eq!(gain_map.alt_plane_depth, 10);
    assert_eq!(gain_map.alt_plane_count, 3);
    assert_eq!(
        gain_map.alt_clli,
        ContentLightLevelInformation { max_cll: 1000, max_pall: 400 }
    );
    assert_eq!(gain_map.metadata.base_hdr_headroom, UFraction(0, 1));
    assert_eq!(gain_map.metadata.alternate_hdr_headroom, UFraction(2, 1));
}

#[test]
fn dimension_mismatch_is_rejected() {
    let mut diag = Diagnostics::default();
    let base = make_rgb(2, 2, 8);
    let alt = make_rgb(4, 4, 8);
    let mut gain_map = GainMap {
        image: image::Image {
            width: 2,
            height: 2,
            depth: 8,
            ..Default::default()
        },
        ..Default::default()
    };
    assert_eq!(
        gain_map.compute_from_rgb(
            &base,
            ColorPrimaries::Srgb,
            TransferCharacteristics::Srgb,
            &alt,
            ColorPrimaries::Srgb,
            TransferCharacteristics::Srgb,
            0.0,
            1.0,
            &mut diag,
        ),
        Err(GainMapError::InvalidArgument)
    );
    assert!(diag.has_error());
}

#[test]
fn metadata_equality_across_clones() {
    let mut metadata = GainMapMetadata::default();
    metadata.min[0] = Fraction(-5, 3);
    metadata.max[0] = Fraction(7, 2);
    metadata.gamma[1] = UFraction(3, 4);
    let a = metadata.clone();
    let b = a.clone();
    // Reflexive, symmetric, transitive.
    assert_eq!(metadata, metadata);
    assert_eq!(metadata, a);
    assert_eq!(a, metadata);
    assert_eq!(a, b);
    assert_eq!(metadata, b);
}

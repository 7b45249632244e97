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

use crate::*;

/// 3x3 matrix over linear RGB. Double precision is kept all the way through
/// the pixel loop; only the multiplied pixel values are single precision.
pub type Matrix3x3 = [[f64; 3]; 3];

/// Pure transfer function mapping a single channel value.
pub type TransferFunction = fn(f32) -> f32;

// CIE xy chromaticities: red, green, blue, white point.
struct Chromaticities {
    red: [f64; 2],
    green: [f64; 2],
    blue: [f64; 2],
    white: [f64; 2],
}

const D65: [f64; 2] = [0.3127, 0.3290];
const WHITE_C: [f64; 2] = [0.310, 0.316];

impl ColorPrimaries {
    // Values as specified in ISO/IEC 23091-2/ITU-T H.273. Unknown and
    // unspecified primaries are treated as sRGB.
    fn chromaticities(&self) -> Chromaticities {
        let (red, green, blue, white) = match self {
            ColorPrimaries::Bt470m => {
                ([0.67, 0.33], [0.21, 0.71], [0.14, 0.08], WHITE_C)
            }
            ColorPrimaries::Bt470bg => ([0.64, 0.33], [0.29, 0.60], [0.15, 0.06], D65),
            ColorPrimaries::Bt601 | ColorPrimaries::Smpte240 => {
                ([0.630, 0.340], [0.310, 0.595], [0.155, 0.070], D65)
            }
            ColorPrimaries::GenericFilm => {
                ([0.681, 0.319], [0.243, 0.692], [0.145, 0.049], WHITE_C)
            }
            ColorPrimaries::Bt2020 => ([0.708, 0.292], [0.170, 0.797], [0.131, 0.046], D65),
            ColorPrimaries::Xyz => ([1.0, 0.0], [0.0, 1.0], [0.0, 0.0], [1.0 / 3.0, 1.0 / 3.0]),
            ColorPrimaries::Smpte431 => {
                ([0.680, 0.320], [0.265, 0.690], [0.150, 0.060], [0.314, 0.351])
            }
            ColorPrimaries::Smpte432 => ([0.680, 0.320], [0.265, 0.690], [0.150, 0.060], D65),
            ColorPrimaries::Ebu3213 => ([0.630, 0.340], [0.295, 0.605], [0.155, 0.077], D65),
            _ => ([0.64, 0.33], [0.30, 0.60], [0.15, 0.06], D65),
        };
        Chromaticities { red, green, blue, white }
    }
}

fn determinant(m: &Matrix3x3) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

fn invert(m: &Matrix3x3) -> Option<Matrix3x3> {
    let det = determinant(m);
    if det.abs() < 1e-12 {
        return None;
    }
    let inv_det = 1.0 / det;
    let mut out = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            // Adjugate: cofactor of (j, i).
            let a = m[(j + 1) % 3][(i + 1) % 3];
            let b = m[(j + 1) % 3][(i + 2) % 3];
            let c = m[(j + 2) % 3][(i + 1) % 3];
            let d = m[(j + 2) % 3][(i + 2) % 3];
            out[i][j] = (a * d - b * c) * inv_det;
        }
    }
    Some(out)
}

fn multiply(a: &Matrix3x3, b: &Matrix3x3) -> Matrix3x3 {
    let mut out = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            for (k, b_row) in b.iter().enumerate() {
                out[i][j] += a[i][k] * b_row[j];
            }
        }
    }
    out
}

fn multiply_vector(m: &Matrix3x3, v: &[f64; 3]) -> [f64; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

fn white_point_xyz(white: &[f64; 2]) -> Option<[f64; 3]> {
    if white[1] == 0.0 {
        return None;
    }
    Some([white[0] / white[1], 1.0, (1.0 - white[0] - white[1]) / white[1]])
}

// RGB to XYZ using the space's own white point.
fn rgb_to_xyz_matrix(primaries: ColorPrimaries) -> Option<Matrix3x3> {
    let c = primaries.chromaticities();
    if c.red[1] == 0.0 || c.green[1] == 0.0 || c.blue[1] == 0.0 {
        return None;
    }
    let xyz_of = |xy: &[f64; 2]| [xy[0] / xy[1], 1.0, (1.0 - xy[0] - xy[1]) / xy[1]];
    let r = xyz_of(&c.red);
    let g = xyz_of(&c.green);
    let b = xyz_of(&c.blue);
    let unscaled: Matrix3x3 = [
        [r[0], g[0], b[0]],
        [r[1], g[1], b[1]],
        [r[2], g[2], b[2]],
    ];
    let white = white_point_xyz(&c.white)?;
    let scale = multiply_vector(&invert(&unscaled)?, &white);
    Some([
        [unscaled[0][0] * scale[0], unscaled[0][1] * scale[1], unscaled[0][2] * scale[2]],
        [unscaled[1][0] * scale[0], unscaled[1][1] * scale[1], unscaled[1][2] * scale[2]],
        [unscaled[2][0] * scale[0], unscaled[2][1] * scale[1], unscaled[2][2] * scale[2]],
    ])
}

// Bradford chromatic adaptation.
const BRADFORD: Matrix3x3 = [
    [0.8951, 0.2664, -0.1614],
    [-0.7502, 1.7135, 0.0367],
    [0.0389, -0.0685, 1.0296],
];

const D50_XYZ: [f64; 3] = [0.96422, 1.0, 0.82521];

fn adaptation_to_d50(white: &[f64; 2]) -> Option<Matrix3x3> {
    let src = multiply_vector(&BRADFORD, &white_point_xyz(white)?);
    let dst = multiply_vector(&BRADFORD, &D50_XYZ);
    if src.iter().any(|v| *v == 0.0) {
        return None;
    }
    let gain: Matrix3x3 = [
        [dst[0] / src[0], 0.0, 0.0],
        [0.0, dst[1] / src[1], 0.0],
        [0.0, 0.0, dst[2] / src[2]],
    ];
    Some(multiply(&invert(&BRADFORD)?, &multiply(&gain, &BRADFORD)))
}

fn rgb_to_xyz_d50_matrix(primaries: ColorPrimaries) -> Option<Matrix3x3> {
    let to_xyz = rgb_to_xyz_matrix(primaries)?;
    let adapt = adaptation_to_d50(&primaries.chromaticities().white)?;
    Some(multiply(&adapt, &to_xyz))
}

/// Linear RGB conversion matrix between two sets of primaries, through
/// Bradford-adapted XYZ D50. `None` when either set cannot be represented.
pub fn compute_rgb_to_rgb_matrix(src: ColorPrimaries, dst: ColorPrimaries) -> Option<Matrix3x3> {
    let src_to_xyz = rgb_to_xyz_d50_matrix(src)?;
    let xyz_to_dst = invert(&rgb_to_xyz_d50_matrix(dst)?)?;
    Some(multiply(&xyz_to_dst, &src_to_xyz))
}

/// Relative luminance contributions of R, G and B for the given primaries
/// (the Y row of the RGB to XYZ matrix; sums to 1).
pub fn compute_y_coeffs(primaries: ColorPrimaries) -> [f32; 3] {
    // Every representable set of primaries yields a matrix; XYZ pass-through
    // luminance is the Y component itself.
    match rgb_to_xyz_matrix(primaries) {
        Some(m) => [m[1][0] as f32, m[1][1] as f32, m[1][2] as f32],
        None => [0.0, 1.0, 0.0],
    }
}

/// Multiplies the RGB channels of an RGBA pixel by the matrix, in place.
/// Alpha is untouched.
pub fn linear_rgb_convert_color_space(rgba: &mut [f32; 4], coeffs: &Matrix3x3) {
    let rgb = [rgba[0] as f64, rgba[1] as f64, rgba[2] as f64];
    let converted = multiply_vector(coeffs, &rgb);
    rgba[0] = converted[0] as f32;
    rgba[1] = converted[1] as f32;
    rgba[2] = converted[2] as f32;
}

// ---------------------------------------------------------------------------
// Transfer characteristics.
//
// Linear values are in "extended SDR" range where 1.0 is SDR white. The HDR
// curves (PQ, HLG) are scaled accordingly: PQ 1.0 maps to 10000 nits which is
// 10000/203 in extended SDR, HLG 1.0 to 1000 nits. All functions accept out
// of range input and degrade to a defined value instead of NaN.

pub(crate) const SDR_WHITE_NITS: f32 = 203.0;

// BT.709/601/2020 OETF constants.
const BT709_ALPHA: f32 = 1.09929682680944;
const BT709_BETA: f32 = 0.018053968510807;

fn bt709_to_linear(gamma: f32) -> f32 {
    if gamma < 4.5 * BT709_BETA {
        gamma / 4.5
    } else {
        ((gamma + (BT709_ALPHA - 1.0)) / BT709_ALPHA).powf(1.0 / 0.45)
    }
}

fn bt709_to_gamma(linear: f32) -> f32 {
    if linear < BT709_BETA {
        linear * 4.5
    } else {
        BT709_ALPHA * linear.powf(0.45) - (BT709_ALPHA - 1.0)
    }
}

fn srgb_to_linear(gamma: f32) -> f32 {
    if gamma <= 0.04045 {
        gamma / 12.92
    } else {
        ((gamma + 0.055) / 1.055).powf(2.4)
    }
}

fn srgb_to_gamma(linear: f32) -> f32 {
    if linear <= 0.0031308 {
        linear * 12.92
    } else {
        1.055 * linear.powf(1.0 / 2.4) - 0.055
    }
}

fn gamma22_to_linear(gamma: f32) -> f32 {
    gamma.max(0.0).powf(2.2)
}

fn gamma22_to_gamma(linear: f32) -> f32 {
    linear.max(0.0).powf(1.0 / 2.2)
}

fn gamma28_to_linear(gamma: f32) -> f32 {
    gamma.max(0.0).powf(2.8)
}

fn gamma28_to_gamma(linear: f32) -> f32 {
    linear.max(0.0).powf(1.0 / 2.8)
}

const SMPTE240_ALPHA: f32 = 1.111572195921731;
const SMPTE240_BETA: f32 = 0.022821585529445;

fn smpte240_to_linear(gamma: f32) -> f32 {
    if gamma < 4.0 * SMPTE240_BETA {
        gamma / 4.0
    } else {
        ((gamma + (SMPTE240_ALPHA - 1.0)) / SMPTE240_ALPHA).powf(1.0 / 0.45)
    }
}

fn smpte240_to_gamma(linear: f32) -> f32 {
    if linear < SMPTE240_BETA {
        linear * 4.0
    } else {
        SMPTE240_ALPHA * linear.powf(0.45) - (SMPTE240_ALPHA - 1.0)
    }
}

fn linear_identity(value: f32) -> f32 {
    value
}

fn log100_to_linear(gamma: f32) -> f32 {
    // The smallest representable value is 0.01 (100:1 range).
    if gamma <= 0.0 {
        0.01
    } else {
        10.0f32.powf(2.0 * (gamma - 1.0))
    }
}

fn log100_to_gamma(linear: f32) -> f32 {
    if linear < 0.01 {
        0.0
    } else {
        1.0 + linear.log10() / 2.0
    }
}

const LOG100_SQRT10_MIN: f32 = 0.00316227766; // sqrt(10) / 1000

fn log100_sqrt10_to_linear(gamma: f32) -> f32 {
    if gamma <= 0.0 {
        LOG100_SQRT10_MIN
    } else {
        10.0f32.powf(2.5 * (gamma - 1.0))
    }
}

fn log100_sqrt10_to_gamma(linear: f32) -> f32 {
    if linear < LOG100_SQRT10_MIN {
        0.0
    } else {
        1.0 + linear.log10() / 2.5
    }
}

// IEC 61966-2-4: BT.709 curve mirrored around zero for extended gamut.
fn iec61966_to_linear(gamma: f32) -> f32 {
    if gamma < -4.5 * BT709_BETA {
        -(((-gamma + (BT709_ALPHA - 1.0)) / BT709_ALPHA).powf(1.0 / 0.45))
    } else if gamma < 4.5 * BT709_BETA {
        gamma / 4.5
    } else {
        ((gamma + (BT709_ALPHA - 1.0)) / BT709_ALPHA).powf(1.0 / 0.45)
    }
}

fn iec61966_to_gamma(linear: f32) -> f32 {
    if linear < -BT709_BETA {
        -(BT709_ALPHA * (-linear).powf(0.45) - (BT709_ALPHA - 1.0))
    } else if linear < BT709_BETA {
        linear * 4.5
    } else {
        BT709_ALPHA * linear.powf(0.45) - (BT709_ALPHA - 1.0)
    }
}

// BT.1361 extended color gamut system. The negative lobe covers linear
// values down to -0.25, where both the code value and the linear value
// bottom out at -0.25.
fn bt1361_to_linear(gamma: f32) -> f32 {
    if gamma < -0.25 {
        -0.25
    } else if gamma < 4.5 * -0.0045 {
        ((gamma * -4.0 + (BT709_ALPHA - 1.0)) / BT709_ALPHA).powf(1.0 / 0.45) / -4.0
    } else if gamma < 4.5 * BT709_BETA {
        gamma / 4.5
    } else {
        ((gamma + (BT709_ALPHA - 1.0)) / BT709_ALPHA).powf(1.0 / 0.45)
    }
}

fn bt1361_to_gamma(linear: f32) -> f32 {
    if linear < -0.25 {
        -0.25
    } else if linear < -0.0045 {
        -(BT709_ALPHA * (-4.0 * linear).powf(0.45) - (BT709_ALPHA - 1.0)) / 4.0
    } else if linear < BT709_BETA {
        linear * 4.5
    } else {
        BT709_ALPHA * linear.powf(0.45) - (BT709_ALPHA - 1.0)
    }
}

fn smpte428_to_linear(gamma: f32) -> f32 {
    gamma.max(0.0).powf(2.6) * 52.37 / 48.0
}

fn smpte428_to_gamma(linear: f32) -> f32 {
    (48.0 * linear.max(0.0) / 52.37).powf(1.0 / 2.6)
}

// BT.2100 PQ, normalized so that 1.0 linear is SDR white (203 nits).
const PQ_M1: f32 = 2610.0 / 16384.0;
const PQ_M2: f32 = 2523.0 / 4096.0 * 128.0;
const PQ_C1: f32 = 3424.0 / 4096.0;
const PQ_C2: f32 = 2413.0 / 4096.0 * 32.0;
const PQ_C3: f32 = 2392.0 / 4096.0 * 32.0;
const PQ_MAX_NITS: f32 = 10000.0;

fn pq_to_linear(gamma: f32) -> f32 {
    if gamma <= 0.0 {
        return 0.0;
    }
    let p = gamma.min(1.0).powf(1.0 / PQ_M2);
    let num = (p - PQ_C1).max(0.0);
    let den = PQ_C2 - PQ_C3 * p;
    (num / den).powf(1.0 / PQ_M1) * PQ_MAX_NITS / SDR_WHITE_NITS
}

fn pq_to_gamma(linear: f32) -> f32 {
    if linear <= 0.0 {
        return 0.0;
    }
    let y = (linear * SDR_WHITE_NITS / PQ_MAX_NITS).min(1.0);
    let p = y.powf(PQ_M1);
    ((PQ_C1 + PQ_C2 * p) / (1.0 + PQ_C3 * p)).powf(PQ_M2)
}

// BT.2100 HLG with the reference OOTF (gamma 1.2, 1000 nit nominal peak).
const HLG_A: f32 = 0.17883277;
const HLG_B: f32 = 0.28466892; // 1 - 4a
const HLG_C: f32 = 0.55991073; // 0.5 - a * ln(4a)
const HLG_PEAK_NITS: f32 = 1000.0;

fn hlg_to_linear(gamma: f32) -> f32 {
    if gamma <= 0.0 {
        return 0.0;
    }
    let gamma = gamma.min(1.0);
    let scene = if gamma <= 0.5 {
        gamma * gamma / 3.0
    } else {
        (((gamma - HLG_C) / HLG_A).exp() + HLG_B) / 12.0
    };
    scene.powf(1.2) * HLG_PEAK_NITS / SDR_WHITE_NITS
}

fn hlg_to_gamma(linear: f32) -> f32 {
    if linear <= 0.0 {
        return 0.0;
    }
    let scene = (linear * SDR_WHITE_NITS / HLG_PEAK_NITS).min(1.0).powf(1.0 / 1.2);
    if scene <= 1.0 / 12.0 {
        (3.0 * scene).sqrt()
    } else {
        HLG_A * (12.0 * scene - HLG_B).ln() + HLG_C
    }
}

impl TransferCharacteristics {
    /// Decoding function: gamma-encoded channel value to linear light.
    pub fn gamma_to_linear_function(&self) -> TransferFunction {
        match self {
            TransferCharacteristics::Bt709
            | TransferCharacteristics::Bt601
            | TransferCharacteristics::Bt2020_10bit
            | TransferCharacteristics::Bt2020_12bit => bt709_to_linear,
            TransferCharacteristics::Bt470m => gamma22_to_linear,
            TransferCharacteristics::Bt470bg => gamma28_to_linear,
            TransferCharacteristics::Smpte240 => smpte240_to_linear,
            TransferCharacteristics::Linear => linear_identity,
            TransferCharacteristics::Log100 => log100_to_linear,
            TransferCharacteristics::Log100Sqrt10 => log100_sqrt10_to_linear,
            TransferCharacteristics::Iec61966 => iec61966_to_linear,
            TransferCharacteristics::Bt1361 => bt1361_to_linear,
            TransferCharacteristics::Smpte428 => smpte428_to_linear,
            TransferCharacteristics::Pq => pq_to_linear,
            TransferCharacteristics::Hlg => hlg_to_linear,
            // Unknown, unspecified and sRGB.
            _ => srgb_to_linear,
        }
    }

    /// Encoding function: linear light to gamma-encoded channel value.
    pub fn linear_to_gamma_function(&self) -> TransferFunction {
        match self {
            TransferCharacteristics::Bt709
            | TransferCharacteristics::Bt601
            | TransferCharacteristics::Bt2020_10bit
            | TransferCharacteristics::Bt2020_12bit => bt709_to_gamma,
            TransferCharacteristics::Bt470m => gamma22_to_gamma,
            TransferCharacteristics::Bt470bg => gamma28_to_gamma,
            TransferCharacteristics::Smpte240 => smpte240_to_gamma,
            TransferCharacteristics::Linear => linear_identity,
            TransferCharacteristics::Log100 => log100_to_gamma,
            TransferCharacteristics::Log100Sqrt10 => log100_sqrt10_to_gamma,
            TransferCharacteristics::Iec61966 => iec61966_to_gamma,
            TransferCharacteristics::Bt1361 => bt1361_to_gamma,
            TransferCharacteristics::Smpte428 => smpte428_to_gamma,
            TransferCharacteristics::Pq => pq_to_gamma,
            TransferCharacteristics::Hlg => hlg_to_gamma,
            _ => srgb_to_gamma,
        }
    }
}

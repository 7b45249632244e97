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

use crate::color::compute_y_coeffs;
use crate::*;

fn calculate_yuv_coefficients_from_cicp(
    color_primaries: ColorPrimaries,
    matrix_coefficients: MatrixCoefficients,
) -> Option<[f32; 3]> {
    let expand_coeffs = |y, v| Some([y, 1.0 - y - v, v]);
    match matrix_coefficients {
        MatrixCoefficients::ChromaDerivedNcl => Some(compute_y_coeffs(color_primaries)),
        MatrixCoefficients::Bt709 => expand_coeffs(0.2126f32, 0.0722),
        MatrixCoefficients::Fcc => expand_coeffs(0.30, 0.11),
        MatrixCoefficients::Bt470bg | MatrixCoefficients::Bt601 => expand_coeffs(0.299, 0.114),
        MatrixCoefficients::Smpte240 => expand_coeffs(0.212, 0.087),
        MatrixCoefficients::Bt2020Ncl => expand_coeffs(0.2627, 0.0593),
        _ => None,
    }
}

pub(crate) fn calculate_yuv_coefficients(
    color_primaries: ColorPrimaries,
    matrix_coefficients: MatrixCoefficients,
) -> [f32; 3] {
    // Return known coefficients or fall back to BT.601.
    calculate_yuv_coefficients_from_cicp(color_primaries, matrix_coefficients).unwrap_or(
        calculate_yuv_coefficients_from_cicp(color_primaries, MatrixCoefficients::Bt601).unwrap(),
    )
}

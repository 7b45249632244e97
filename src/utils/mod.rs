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

pub mod pixels;

// Gain map metadata fields can be negative, hence Fraction and UFraction.
// The denominator is always unsigned. A denominator of 0 makes the fraction
// invalid; fractions are stored raw and never reduced.

/// Signed rational value: numerator / denominator.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[repr(C)]
pub struct Fraction(pub i32, pub u32);

/// Unsigned rational value: numerator / denominator.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[repr(C)]
pub struct UFraction(pub u32, pub u32);

// Best rational approximation of a non-negative double, with both numerator
// and denominator bounded by `max_numerator`. Walks the continued fraction
// convergents of `value` and stops before either bound is exceeded.
fn best_rational(value: f64, max_numerator: u64) -> Option<(u64, u64)> {
    if !value.is_finite() || value < 0.0 || value > max_numerator as f64 {
        return None;
    }
    let max_denominator =
        if value <= 1.0 { max_numerator } else { (max_numerator as f64 / value) as u64 };
    // Convergents h(-2)/k(-2) = 0/1 and h(-1)/k(-1) = 1/0.
    let (mut prev_n, mut prev_d) = (0u64, 1u64);
    let (mut n, mut d) = (1u64, 0u64);
    let mut x = value;
    loop {
        let integer_part = x.floor();
        let a = integer_part as u64;
        let next_n = a.checked_mul(n).and_then(|v| v.checked_add(prev_n));
        let next_d = a.checked_mul(d).and_then(|v| v.checked_add(prev_d));
        match (next_n, next_d) {
            (Some(next_n), Some(next_d))
                if next_n <= max_numerator && next_d <= max_denominator =>
            {
                (prev_n, prev_d) = (n, d);
                (n, d) = (next_n, next_d);
            }
            _ => break,
        }
        let fractional_part = x - integer_part;
        if fractional_part < 1e-12 {
            break;
        }
        x = 1.0 / fractional_part;
        if x >= u64::MAX as f64 {
            break;
        }
    }
    if d == 0 {
        return None;
    }
    Some((n, d))
}

impl Fraction {
    pub fn is_valid(&self) -> GainMapResult<()> {
        match self.1 {
            0 => Err(GainMapError::InvalidArgument),
            _ => Ok(()),
        }
    }

    pub fn as_f64(&self) -> GainMapResult<f64> {
        self.is_valid()?;
        Ok(self.0 as f64 / self.1 as f64)
    }

    /// Closest representable fraction, numerator magnitude and denominator
    /// both bounded by `i32::MAX`.
    pub fn from_f64(value: f64) -> GainMapResult<Fraction> {
        let (n, d) =
            best_rational(value.abs(), i32::MAX as u64).ok_or(GainMapError::InvalidArgument)?;
        let n = n as i32;
        Ok(Fraction(if value < 0.0 { -n } else { n }, d as u32))
    }
}

impl UFraction {
    pub fn is_valid(&self) -> GainMapResult<()> {
        match self.1 {
            0 => Err(GainMapError::InvalidArgument),
            _ => Ok(()),
        }
    }

    pub fn as_f64(&self) -> GainMapResult<f64> {
        self.is_valid()?;
        Ok(self.0 as f64 / self.1 as f64)
    }

    /// Closest representable fraction. Negative values are rejected.
    pub fn from_f64(value: f64) -> GainMapResult<UFraction> {
        let (n, d) =
            best_rational(value, u32::MAX as u64).ok_or(GainMapError::InvalidArgument)?;
        Ok(UFraction(n as u32, d as u32))
    }
}

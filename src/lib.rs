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

#![deny(unsafe_code)]

pub mod color;
pub mod diagnostics;
pub mod gainmap;
pub mod image;
pub mod reformat;
pub mod utils;

mod internal_utils;

use num_derive::FromPrimitive;
use num_traits::cast::FromPrimitive;

#[derive(Debug, Default, PartialEq, Copy, Clone)]
pub enum PixelFormat {
    #[default]
    Yuv444,
    Yuv422,
    Yuv420,
    // Single Y plane, no chroma. Selects a single-channel (luminance only)
    // gain map when set on the gain map image before computing.
    Yuv400,
}

impl PixelFormat {
    pub fn plane_count(&self) -> usize {
        match self {
            PixelFormat::Yuv400 => 1,
            PixelFormat::Yuv420 | PixelFormat::Yuv422 | PixelFormat::Yuv444 => 3,
        }
    }

    pub fn is_monochrome(&self) -> bool {
        *self == PixelFormat::Yuv400
    }

    pub(crate) fn chroma_shift_x(&self) -> u32 {
        match self {
            PixelFormat::Yuv422 | PixelFormat::Yuv420 => 1,
            _ => 0,
        }
    }

    pub(crate) fn chroma_shift_y(&self) -> u32 {
        match self {
            PixelFormat::Yuv420 => 1,
            _ => 0,
        }
    }
}

macro_rules! impl_from_primitive {
    ($from:ty, $from_func: ident, $to: ident, $default: ident) => {
        impl From<$from> for $to {
            fn from(value: $from) -> Self {
                $to::$from_func(value).unwrap_or($to::$default)
            }
        }
    };
}

#[repr(C)]
#[derive(Debug, Default, PartialEq, Copy, Clone, FromPrimitive)]
pub enum ColorPrimaries {
    Unknown = 0,
    Srgb = 1,
    #[default]
    Unspecified = 2,
    Bt470m = 4,
    Bt470bg = 5,
    Bt601 = 6,
    Smpte240 = 7,
    GenericFilm = 8,
    Bt2020 = 9,
    Xyz = 10,
    Smpte431 = 11,
    Smpte432 = 12,
    Ebu3213 = 22,
}

impl_from_primitive!(u16, from_u16, ColorPrimaries, Unspecified);

#[allow(non_upper_case_globals)]
impl ColorPrimaries {
    pub const Bt709: Self = Self::Srgb;
    pub const Iec61966_2_4: Self = Self::Srgb;
    pub const Bt2100: Self = Self::Bt2020;
    pub const Dci_p3: Self = Self::Smpte432;
}

#[repr(C)]
#[derive(Debug, Default, PartialEq, Copy, Clone, FromPrimitive)]
pub enum TransferCharacteristics {
    Unknown = 0,
    Bt709 = 1,
    #[default]
    Unspecified = 2,
    Bt470m = 4,  // 2.2 gamma
    Bt470bg = 5, // 2.8 gamma
    Bt601 = 6,
    Smpte240 = 7,
    Linear = 8,
    Log100 = 9,
    Log100Sqrt10 = 10,
    Iec61966 = 11,
    Bt1361 = 12,
    Srgb = 13,
    Bt2020_10bit = 14,
    Bt2020_12bit = 15,
    Pq = 16, // Perceptual Quantizer (HDR); BT.2100 PQ
    Smpte428 = 17,
    Hlg = 18, // Hybrid Log-Gamma (HDR); ARIB STD-B67; BT.2100 HLG
}

impl_from_primitive!(u16, from_u16, TransferCharacteristics, Unspecified);

#[allow(non_upper_case_globals)]
impl TransferCharacteristics {
    pub const Smpte2084: Self = Self::Pq;
}

#[repr(C)]
#[derive(Debug, Default, PartialEq, Copy, Clone, FromPrimitive)]
pub enum MatrixCoefficients {
    Identity = 0,
    Bt709 = 1,
    #[default]
    Unspecified = 2,
    Fcc = 4,
    Bt470bg = 5,
    Bt601 = 6,
    Smpte240 = 7,
    Ycgco = 8,
    Bt2020Ncl = 9,
    Bt2020Cl = 10,
    Smpte2085 = 11,
    ChromaDerivedNcl = 12,
    ChromaDerivedCl = 13,
    Ictcp = 14,
}

impl_from_primitive!(u16, from_u16, MatrixCoefficients, Unspecified);

/// Content light level information as defined in ISO/IEC 23008-2 section
/// D.3.35: maximum content light level and maximum picture average light
/// level, both in nits.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ContentLightLevelInformation {
    pub max_cll: u16,
    pub max_pall: u16,
}

/// Plane categories used when allocating or freeing image planes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Category {
    Color,
    Alpha,
}

impl Category {
    pub(crate) fn planes(&self) -> &[image::Plane] {
        match self {
            Category::Color => &image::YUV_PLANES,
            Category::Alpha => &image::A_PLANE,
        }
    }
}

#[derive(Debug, Default, PartialEq, Clone)]
pub enum GainMapError {
    #[default]
    UnknownError,
    InvalidArgument,
    NotImplemented,
    OutOfMemory,
    ReformatFailed,
    UnsupportedDepth,
    NoContent,
}

pub type GainMapResult<T> = Result<T, GainMapError>;

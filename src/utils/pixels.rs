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
use crate::*;

/// Backing storage for image samples.
#[derive(Clone, Debug)]
pub enum Pixels {
    // Used for 8-bit images.
    Buffer(Vec<u8>),
    // Used for 10-bit, 12-bit and 16-bit images.
    Buffer16(Vec<u16>),
}

impl Pixels {
    pub fn size(&self) -> usize {
        match self {
            Pixels::Buffer(buffer) => buffer.len(),
            Pixels::Buffer16(buffer) => buffer.len(),
        }
    }

    pub(crate) fn has_data(&self) -> bool {
        match self {
            Pixels::Buffer(buffer) => !buffer.is_empty(),
            Pixels::Buffer16(buffer) => !buffer.is_empty(),
        }
    }

    pub(crate) fn resize(&mut self, size: usize, default: u16) -> GainMapResult<()> {
        match self {
            Pixels::Buffer(buffer) => {
                if buffer.capacity() < size && buffer.try_reserve_exact(size).is_err() {
                    return Err(GainMapError::OutOfMemory);
                }
                buffer.resize(size, default as u8);
            }
            Pixels::Buffer16(buffer) => {
                if buffer.capacity() < size && buffer.try_reserve_exact(size).is_err() {
                    return Err(GainMapError::OutOfMemory);
                }
                buffer.resize(size, default);
            }
        }
        Ok(())
    }

    pub fn slice(&self, offset: u32, size: u32) -> GainMapResult<&[u8]> {
        let offset = usize_from_u32(offset)?;
        let size = usize_from_u32(size)?;
        match self {
            Pixels::Buffer(buffer) => {
                let end = checked_add_usize(offset, size)?;
                buffer.get(offset..end).ok_or(GainMapError::NoContent)
            }
            Pixels::Buffer16(_) => Err(GainMapError::NoContent),
        }
    }

    pub fn slice_mut(&mut self, offset: u32, size: u32) -> GainMapResult<&mut [u8]> {
        let offset = usize_from_u32(offset)?;
        let size = usize_from_u32(size)?;
        match self {
            Pixels::Buffer(buffer) => {
                let end = checked_add_usize(offset, size)?;
                buffer.get_mut(offset..end).ok_or(GainMapError::NoContent)
            }
            Pixels::Buffer16(_) => Err(GainMapError::NoContent),
        }
    }

    pub fn slice16(&self, offset: u32, size: u32) -> GainMapResult<&[u16]> {
        let offset = usize_from_u32(offset)?;
        let size = usize_from_u32(size)?;
        match self {
            Pixels::Buffer(_) => Err(GainMapError::NoContent),
            Pixels::Buffer16(buffer) => {
                let end = checked_add_usize(offset, size)?;
                buffer.get(offset..end).ok_or(GainMapError::NoContent)
            }
        }
    }

    pub fn slice16_mut(&mut self, offset: u32, size: u32) -> GainMapResult<&mut [u16]> {
        let offset = usize_from_u32(offset)?;
        let size = usize_from_u32(size)?;
        match self {
            Pixels::Buffer(_) => Err(GainMapError::NoContent),
            Pixels::Buffer16(buffer) => {
                let end = checked_add_usize(offset, size)?;
                buffer.get_mut(offset..end).ok_or(GainMapError::NoContent)
            }
        }
    }
}

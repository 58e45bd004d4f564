// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2026 framemap contributors

use thiserror::Error;

/// Opaque handle value, wide enough to carry a pointer, a GPU memory object
/// or a file descriptor.
pub type HandleValue = isize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    U8, I32, I64, F32,
}

impl DataType {
    pub fn size(&self) -> usize {
        match self {
            DataType::U8 => 1,
            DataType::I32 | DataType::F32 => 4,
            DataType::I64 => 8,
        }
    }
}

/// Memory domain a tensor or context belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryType {
    Cpu,
    /// Buffer allocated and owned by the pipeline host runtime.
    HostBuffer,
    Vaapi,
    Dma,
    OpenCl,
    Usm,
    OpenVino,
    /// OpenCV-style matrix header over CPU memory.
    Mat,
    D3D11,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Video, Audio, Tensors,
}

const fn fourcc(a: u8, b: u8, c: u8, d: u8) -> u32 {
    (a as u32) | ((b as u32) << 8) | ((c as u32) << 16) | ((d as u32) << 24)
}

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    BGR  = fourcc(b'B', b'G', b'R', b' '),
    RGB  = fourcc(b'R', b'G', b'B', b' '),
    BGRX = fourcc(b'B', b'G', b'R', b'X'),
    RGBX = fourcc(b'R', b'G', b'B', b'X'),
    BGRP = fourcc(b'B', b'G', b'R', b'P'),
    RGBP = fourcc(b'R', b'G', b'B', b'P'),
    NV12 = fourcc(b'N', b'V', b'1', b'2'),
    I420 = fourcc(b'I', b'4', b'2', b'0'),
}

impl ImageFormat {
    /// Number of planes the format carries when stored as one tensor per plane.
    pub fn num_planes(&self) -> usize {
        match self {
            ImageFormat::BGR | ImageFormat::RGB | ImageFormat::BGRX | ImageFormat::RGBX => 1,
            ImageFormat::NV12 => 2,
            ImageFormat::BGRP | ImageFormat::RGBP | ImageFormat::I420 => 3,
        }
    }

    /// Interleaved channels per pixel for packed formats, 1 for planar ones.
    pub fn channels(&self) -> usize {
        match self {
            ImageFormat::BGR | ImageFormat::RGB => 3,
            ImageFormat::BGRX | ImageFormat::RGBX => 4,
            _ => 1,
        }
    }
}

/// Dimension order of an image tensor, inferred from its shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageLayout {
    Any, HW, CHW, HWC, NCHW, NHWC,
}

impl ImageLayout {
    /// Channel dimensions are assumed to hold at most 4 elements, spatial ones more.
    pub fn from_shape(shape: &[usize]) -> ImageLayout {
        match shape.len() {
            2 => ImageLayout::HW,
            3 => {
                if shape[0] > 4 && shape[1] > 4 && shape[2] <= 4 {
                    ImageLayout::HWC
                } else if shape[0] <= 4 && shape[1] > 4 && shape[2] > 4 {
                    ImageLayout::CHW
                } else {
                    ImageLayout::Any
                }
            }
            4 => {
                if shape[1] > 4 && shape[2] > 4 && shape[3] <= 4 {
                    ImageLayout::NHWC
                } else if shape[1] <= 4 && shape[2] > 4 && shape[3] > 4 {
                    ImageLayout::NCHW
                } else {
                    ImageLayout::Any
                }
            }
            _ => ImageLayout::Any,
        }
    }

    pub fn w_position(&self) -> Option<usize> {
        match self {
            ImageLayout::HW | ImageLayout::HWC => Some(1),
            ImageLayout::CHW | ImageLayout::NHWC => Some(2),
            ImageLayout::NCHW => Some(3),
            ImageLayout::Any => None,
        }
    }
    pub fn h_position(&self) -> Option<usize> {
        match self {
            ImageLayout::HW | ImageLayout::HWC => Some(0),
            ImageLayout::CHW | ImageLayout::NHWC => Some(1),
            ImageLayout::NCHW => Some(2),
            ImageLayout::Any => None,
        }
    }
    pub fn c_position(&self) -> Option<usize> {
        match self {
            ImageLayout::CHW => Some(0),
            ImageLayout::HWC => Some(2),
            ImageLayout::NCHW => Some(1),
            ImageLayout::NHWC => Some(3),
            ImageLayout::HW | ImageLayout::Any => None,
        }
    }
    pub fn n_position(&self) -> Option<usize> {
        match self {
            ImageLayout::NCHW | ImageLayout::NHWC => Some(0),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read, Write, ReadWrite,
}

/// Closed registry of handle keys. The string names are the integration
/// contract with external components and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKey {
    Data,
    ClMem,
    DmaFd,
    DrmModifier,
    VaSurfacePtr,
    Offset,
    OffsetX,
    OffsetY,
    PlaneIndex,
    VaDisplay,
    ClContext,
    ClQueue,
    ZeDevice,
    ZeContext,
    SyclQueue,
}

impl HandleKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandleKey::Data => "data",
            HandleKey::ClMem => "cl_mem",
            HandleKey::DmaFd => "dma_fd",
            HandleKey::DrmModifier => "drm_modifier",
            HandleKey::VaSurfacePtr => "va_surface_ptr",
            HandleKey::Offset => "offset",
            HandleKey::OffsetX => "offset_x",
            HandleKey::OffsetY => "offset_y",
            HandleKey::PlaneIndex => "plane_index",
            HandleKey::VaDisplay => "va_display",
            HandleKey::ClContext => "cl_context",
            HandleKey::ClQueue => "cl_queue",
            HandleKey::ZeDevice => "ze_device",
            HandleKey::ZeContext => "ze_context",
            HandleKey::SyclQueue => "sycl_queue",
        }
    }

    pub fn parse(s: &str) -> Option<HandleKey> {
        Some(match s {
            "data" => HandleKey::Data,
            "cl_mem" => HandleKey::ClMem,
            "dma_fd" => HandleKey::DmaFd,
            "drm_modifier" => HandleKey::DrmModifier,
            "va_surface_ptr" => HandleKey::VaSurfacePtr,
            "offset" => HandleKey::Offset,
            "offset_x" => HandleKey::OffsetX,
            "offset_y" => HandleKey::OffsetY,
            "plane_index" => HandleKey::PlaneIndex,
            "va_display" => HandleKey::VaDisplay,
            "cl_context" => HandleKey::ClContext,
            "cl_queue" => HandleKey::ClQueue,
            "ze_device" => HandleKey::ZeDevice,
            "ze_context" => HandleKey::ZeContext,
            "sycl_queue" => HandleKey::SyclQueue,
            _ => return None,
        })
    }
}

#[derive(Error, Debug)]
pub enum MemoryMapError {
    #[error("No conversion path from {from:?} to {to:?} memory")]
    UnsupportedConversion { from: MemoryType, to: MemoryType },
    #[error("Handle not found: {0:?}")]
    HandleNotFound(HandleKey),
    #[error("Direct data access not supported for {0:?} memory")]
    DirectAccessUnsupported(MemoryType),
    #[error("Device operation failed: {call} returned {code}")]
    DeviceOperationFailed { call: &'static str, code: i64 },
    #[error("Unsupported data type {dtype:?} for {target}")]
    UnsupportedDataType { dtype: DataType, target: &'static str },
    #[error("Allocation failed: {0}")]
    AllocationFailed(String),
    #[error("Invalid frame info: {0}")]
    InvalidFrameInfo(String),
    #[error("Invalid tensor slice: {0}")]
    InvalidSlice(String),
    #[error("Timed out waiting for a pool entry")]
    PoolWaitTimeout,
    #[error("Element not found: {0:?}")]
    ElementNotFound(String),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_key_names_round_trip() {
        let keys = [
            HandleKey::Data, HandleKey::ClMem, HandleKey::DmaFd, HandleKey::DrmModifier,
            HandleKey::VaSurfacePtr, HandleKey::Offset, HandleKey::OffsetX, HandleKey::OffsetY,
            HandleKey::PlaneIndex, HandleKey::VaDisplay, HandleKey::ClContext, HandleKey::ClQueue,
            HandleKey::ZeDevice, HandleKey::ZeContext, HandleKey::SyclQueue,
        ];
        for key in keys {
            assert_eq!(HandleKey::parse(key.as_str()), Some(key));
        }
        assert_eq!(HandleKey::parse("no_such_key"), None);
    }

    #[test]
    fn image_format_fourcc() {
        assert_eq!(ImageFormat::NV12 as u32, u32::from_le_bytes(*b"NV12"));
        assert_eq!(ImageFormat::I420 as u32, u32::from_le_bytes(*b"I420"));
        assert_eq!(ImageFormat::BGRX as u32, u32::from_le_bytes(*b"BGRX"));
    }

    #[test]
    fn layout_inference() {
        assert_eq!(ImageLayout::from_shape(&[480, 640]), ImageLayout::HW);
        assert_eq!(ImageLayout::from_shape(&[480, 640, 3]), ImageLayout::HWC);
        assert_eq!(ImageLayout::from_shape(&[3, 480, 640]), ImageLayout::CHW);
        assert_eq!(ImageLayout::from_shape(&[1, 3, 480, 640]), ImageLayout::NCHW);
        assert_eq!(ImageLayout::from_shape(&[1, 480, 640, 3]), ImageLayout::NHWC);
        assert_eq!(ImageLayout::from_shape(&[2, 2, 2]), ImageLayout::Any);
    }
}

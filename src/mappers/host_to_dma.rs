// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2026 framemap contributors

use super::{check_source, MemoryMapper};
use crate::context::ContextPtr;
use crate::tensor::{CpuTensor, DmaTensor, ImageInfo, TensorInterface, TensorPtr};
use crate::types::*;
use std::sync::Arc;

/// Effective byte offset of a possibly cropped host-buffer tensor:
/// the buffer-level offset plus the pixel-space crop folded in through the
/// plane's strides.
fn effective_offset(src: &TensorPtr) -> usize {
    let image = ImageInfo::new(src.info());
    let offset = src.handle_or(HandleKey::Offset, 0) as usize;
    let offset_x = src.handle_or(HandleKey::OffsetX, 0) as usize;
    let offset_y = src.handle_or(HandleKey::OffsetY, 0) as usize;
    offset
        + offset_y * image.row_stride().unwrap_or(0)
        + offset_x * image.pixel_stride().unwrap_or(0)
}

/// Imports the dma fd of a buffer owned by the pipeline host runtime. The
/// runtime keeps ownership of the fd for the buffer's lifetime, which the
/// parent reference extends over the mapped tensor's.
pub struct HostBufferToDma {
    output_context: ContextPtr,
}

impl HostBufferToDma {
    pub fn new(output_context: ContextPtr) -> Self {
        Self { output_context }
    }
}

impl MemoryMapper for HostBufferToDma {
    fn input_type(&self) -> MemoryType {
        MemoryType::HostBuffer
    }
    fn output_type(&self) -> MemoryType {
        MemoryType::Dma
    }

    fn map_tensor(&self, src: &TensorPtr, _mode: AccessMode) -> Result<TensorPtr, MemoryMapError> {
        check_source(src, MemoryType::HostBuffer, MemoryType::Dma)?;
        let fd = src.handle(HandleKey::DmaFd)? as i32;
        let modifier = src.handle_or(HandleKey::DrmModifier, 0) as u64;
        let tensor = DmaTensor::new(src.info().clone(), fd, modifier, effective_offset(src), false)
            .with_context(self.output_context.clone())
            .with_parent(src.clone());
        Ok(Arc::new(tensor.into()))
    }
}

/// View of a host-buffer's CPU mapping, crop offsets applied.
pub struct HostBufferToCpu;

impl HostBufferToCpu {
    pub fn new() -> Self {
        Self
    }
}

impl MemoryMapper for HostBufferToCpu {
    fn input_type(&self) -> MemoryType {
        MemoryType::HostBuffer
    }
    fn output_type(&self) -> MemoryType {
        MemoryType::Cpu
    }

    fn map_tensor(&self, src: &TensorPtr, _mode: AccessMode) -> Result<TensorPtr, MemoryMapError> {
        check_source(src, MemoryType::HostBuffer, MemoryType::Cpu)?;
        let data = src.data()?;
        let view = unsafe {
            CpuTensor::view(
                data.add(effective_offset(src)),
                src.info().clone(),
                Some(src.clone()),
                None,
            )
        };
        Ok(Arc::new(view.into()))
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2026 framemap contributors

use super::{TensorInfo, TensorInterface, TensorPtr};
use crate::context::ContextPtr;
use crate::types::*;

/// Tensor backed by a buffer the pipeline host runtime allocated and owns.
/// May expose a mapped CPU pointer, a dma fd, or both. Cropped sub-region
/// views carry `offset`/`offset_x`/`offset_y`, which downstream mappers fold
/// into the effective byte offset.
pub struct HostBufferTensor {
    info: TensorInfo,
    data_ptr: Option<*mut u8>,
    fd: Option<i32>,
    modifier: u64,
    offset: usize,
    offset_x: usize,
    offset_y: usize,
    context: Option<ContextPtr>,
    parent: Option<TensorPtr>,
}

unsafe impl Send for HostBufferTensor {}
unsafe impl Sync for HostBufferTensor {}

impl HostBufferTensor {
    /// The host runtime keeps ownership of both the mapping and the fd; this
    /// tensor only references them.
    pub fn new(info: TensorInfo, data_ptr: Option<*mut u8>, fd: Option<i32>) -> Self {
        Self {
            info,
            data_ptr,
            fd,
            modifier: 0,
            offset: 0,
            offset_x: 0,
            offset_y: 0,
            context: None,
            parent: None,
        }
    }

    pub fn with_modifier(mut self, modifier: u64) -> Self {
        self.modifier = modifier;
        self
    }

    /// Byte offset of this tensor inside the buffer plus the pixel-space
    /// offsets of a cropped view.
    pub fn with_offsets(mut self, offset: usize, offset_x: usize, offset_y: usize) -> Self {
        self.offset = offset;
        self.offset_x = offset_x;
        self.offset_y = offset_y;
        self
    }

    pub fn with_context(mut self, context: ContextPtr) -> Self {
        self.context = Some(context);
        self
    }
}

impl TensorInterface for HostBufferTensor {
    fn memory_type(&self) -> MemoryType {
        MemoryType::HostBuffer
    }
    fn info(&self) -> &TensorInfo {
        &self.info
    }
    fn context(&self) -> Option<&ContextPtr> {
        self.context.as_ref()
    }
    fn data(&self) -> Result<*mut u8, MemoryMapError> {
        self.data_ptr.ok_or(MemoryMapError::DirectAccessUnsupported(MemoryType::HostBuffer))
    }
    fn handle(&self, key: HandleKey) -> Result<HandleValue, MemoryMapError> {
        match key {
            HandleKey::Data => self.data_ptr
                .map(|p| p as HandleValue)
                .ok_or(MemoryMapError::HandleNotFound(key)),
            HandleKey::DmaFd => self.fd
                .map(|fd| fd as HandleValue)
                .ok_or(MemoryMapError::HandleNotFound(key)),
            HandleKey::DrmModifier => Ok(self.modifier as HandleValue),
            HandleKey::Offset => Ok(self.offset as HandleValue),
            HandleKey::OffsetX => Ok(self.offset_x as HandleValue),
            HandleKey::OffsetY => Ok(self.offset_y as HandleValue),
            _ => Err(MemoryMapError::HandleNotFound(key)),
        }
    }
    fn parent(&self) -> Option<&TensorPtr> {
        self.parent.as_ref()
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2026 framemap contributors

use super::{TensorInfo, TensorInterface, TensorPtr};
use crate::context::ContextPtr;
use crate::types::*;

/// One plane of a VAAPI surface. The surface itself is owned by whoever
/// allocated it (decoder, surface pool), not by the tensor.
pub struct VaapiTensor {
    info: TensorInfo,
    surface: u32,
    plane_index: usize,
    context: Option<ContextPtr>,
    parent: Option<TensorPtr>,
}

impl VaapiTensor {
    pub fn new(info: TensorInfo, surface: u32, plane_index: usize, context: ContextPtr) -> Self {
        Self { info, surface, plane_index, context: Some(context), parent: None }
    }

    pub fn surface(&self) -> u32 {
        self.surface
    }

    pub fn plane_index(&self) -> usize {
        self.plane_index
    }
}

impl TensorInterface for VaapiTensor {
    fn memory_type(&self) -> MemoryType {
        MemoryType::Vaapi
    }
    fn info(&self) -> &TensorInfo {
        &self.info
    }
    fn context(&self) -> Option<&ContextPtr> {
        self.context.as_ref()
    }
    fn data(&self) -> Result<*mut u8, MemoryMapError> {
        Err(MemoryMapError::DirectAccessUnsupported(MemoryType::Vaapi))
    }
    fn handle(&self, key: HandleKey) -> Result<HandleValue, MemoryMapError> {
        match key {
            HandleKey::VaSurfacePtr => Ok(self.surface as HandleValue),
            HandleKey::PlaneIndex => Ok(self.plane_index as HandleValue),
            _ => Err(MemoryMapError::HandleNotFound(key)),
        }
    }
    fn parent(&self) -> Option<&TensorPtr> {
        self.parent.as_ref()
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2026 framemap contributors

use super::{TensorInfo, TensorInterface, TensorPtr};
use crate::context::{ContextPtr, ZeDriver};
use crate::types::*;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsmKind {
    Host, Device, Shared,
}

/// Unified-shared-memory tensor (Level-Zero / SYCL allocation). USM pointers
/// are addressable from the host on shared-memory devices, so data() succeeds
/// for every kind.
pub struct UsmTensor {
    info: TensorInfo,
    ptr: *mut u8,
    kind: UsmKind,
    context: Option<ContextPtr>,
    parent: Option<TensorPtr>,
    // Set when the allocation is owned and must be freed through the driver.
    free: Option<Arc<dyn ZeDriver>>,
}

unsafe impl Send for UsmTensor {}
unsafe impl Sync for UsmTensor {}

impl UsmTensor {
    /// Wraps an externally owned allocation.
    pub fn borrowed(info: TensorInfo, ptr: *mut u8, kind: UsmKind, context: ContextPtr) -> Self {
        Self { info, ptr, kind, context: Some(context), parent: None, free: None }
    }

    /// Wraps an allocation owned by this tensor; freed through `driver` on drop.
    pub fn owned(
        info: TensorInfo,
        ptr: *mut u8,
        kind: UsmKind,
        context: ContextPtr,
        driver: Arc<dyn ZeDriver>,
    ) -> Self {
        Self { info, ptr, kind, context: Some(context), parent: None, free: Some(driver) }
    }

    pub fn with_parent(mut self, parent: TensorPtr) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn kind(&self) -> UsmKind {
        self.kind
    }
}

impl TensorInterface for UsmTensor {
    fn memory_type(&self) -> MemoryType {
        MemoryType::Usm
    }
    fn info(&self) -> &TensorInfo {
        &self.info
    }
    fn context(&self) -> Option<&ContextPtr> {
        self.context.as_ref()
    }
    fn data(&self) -> Result<*mut u8, MemoryMapError> {
        Ok(self.ptr)
    }
    fn handle(&self, key: HandleKey) -> Result<HandleValue, MemoryMapError> {
        match key {
            HandleKey::Data => Ok(self.ptr as HandleValue),
            _ => Err(MemoryMapError::HandleNotFound(key)),
        }
    }
    fn parent(&self) -> Option<&TensorPtr> {
        self.parent.as_ref()
    }
}

impl Drop for UsmTensor {
    fn drop(&mut self) {
        if let Some(driver) = &self.free {
            if let Err(code) = driver.free(self.ptr) {
                log::error!("zeMemFree({:p}) failed: {code}", self.ptr);
            }
        }
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2026 framemap contributors

use super::{TensorInfo, TensorInterface, TensorPtr};
use crate::context::{ClDriver, ContextPtr};
use crate::types::*;
use std::sync::Arc;

/// Tensor backed by an OpenCL memory object (`cl_mem`). Not directly
/// addressable; map to CPU or DMA first.
pub struct OpenClTensor {
    info: TensorInfo,
    mem: HandleValue,
    context: Option<ContextPtr>,
    parent: Option<TensorPtr>,
    // Set when this tensor owns the cl_mem and must release it on drop.
    release: Option<Arc<dyn ClDriver>>,
}

unsafe impl Send for OpenClTensor {}
unsafe impl Sync for OpenClTensor {}

impl OpenClTensor {
    /// Wraps an externally owned cl_mem.
    pub fn borrowed(info: TensorInfo, mem: HandleValue, context: ContextPtr) -> Self {
        Self { info, mem, context: Some(context), parent: None, release: None }
    }

    /// Wraps a cl_mem owned by this tensor; released through `driver` on drop.
    pub fn owned(info: TensorInfo, mem: HandleValue, context: ContextPtr, driver: Arc<dyn ClDriver>) -> Self {
        Self { info, mem, context: Some(context), parent: None, release: Some(driver) }
    }

    pub fn with_parent(mut self, parent: TensorPtr) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn mem(&self) -> HandleValue {
        self.mem
    }
}

impl TensorInterface for OpenClTensor {
    fn memory_type(&self) -> MemoryType {
        MemoryType::OpenCl
    }
    fn info(&self) -> &TensorInfo {
        &self.info
    }
    fn context(&self) -> Option<&ContextPtr> {
        self.context.as_ref()
    }
    fn data(&self) -> Result<*mut u8, MemoryMapError> {
        Err(MemoryMapError::DirectAccessUnsupported(MemoryType::OpenCl))
    }
    fn handle(&self, key: HandleKey) -> Result<HandleValue, MemoryMapError> {
        match key {
            HandleKey::ClMem => Ok(self.mem),
            _ => Err(MemoryMapError::HandleNotFound(key)),
        }
    }
    fn parent(&self) -> Option<&TensorPtr> {
        self.parent.as_ref()
    }
}

impl Drop for OpenClTensor {
    fn drop(&mut self) {
        if let Some(driver) = &self.release {
            if let Err(code) = driver.release_mem(self.mem) {
                log::error!("clReleaseMemObject({:#x}) failed: {code}", self.mem);
            }
        }
    }
}

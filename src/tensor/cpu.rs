// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2026 framemap contributors

use super::{RequestSync, TensorInfo, TensorInterface, TensorPtr};
use crate::context::ContextPtr;
use crate::types::*;
use std::sync::Arc;

/// System-memory tensor. Either owns its allocation or is a view into memory
/// kept alive by a parent tensor.
pub struct CpuTensor {
    info: TensorInfo,
    ptr: *mut u8,
    owned: Option<Box<[u8]>>,
    context: Option<ContextPtr>,
    parent: Option<TensorPtr>,
    // When set, data() blocks until the producing request completed.
    ready: Option<Arc<dyn RequestSync>>,
}

// Immutable after construction; writers follow the single-writer handoff
// contract, same as every other tensor in the crate.
unsafe impl Send for CpuTensor {}
unsafe impl Sync for CpuTensor {}

impl CpuTensor {
    /// Allocates a zero-initialized tensor.
    pub fn alloc(info: TensorInfo) -> Result<Self, MemoryMapError> {
        let nbytes = info.nbytes();
        let mut data = Vec::new();
        data.try_reserve_exact(nbytes)
            .map_err(|e| MemoryMapError::AllocationFailed(format!("{nbytes} bytes: {e}")))?;
        data.resize(nbytes, 0);
        let mut owned = data.into_boxed_slice();
        let ptr = owned.as_mut_ptr();
        Ok(Self { info, ptr, owned: Some(owned), context: None, parent: None, ready: None })
    }

    /// Takes ownership of an existing allocation.
    pub fn from_vec(data: Vec<u8>, info: TensorInfo) -> Result<Self, MemoryMapError> {
        if data.len() < info.nbytes() {
            return Err(MemoryMapError::AllocationFailed(format!(
                "backing buffer holds {} bytes, tensor needs {}", data.len(), info.nbytes())));
        }
        let mut owned = data.into_boxed_slice();
        let ptr = owned.as_mut_ptr();
        Ok(Self { info, ptr, owned: Some(owned), context: None, parent: None, ready: None })
    }

    /// View over externally owned memory. The caller guarantees `ptr` stays
    /// valid for the lifetime of the view; passing the owning tensor as
    /// `parent` is how mappers uphold that.
    pub unsafe fn view(
        ptr: *mut u8,
        info: TensorInfo,
        parent: Option<TensorPtr>,
        context: Option<ContextPtr>,
    ) -> Self {
        Self { info, ptr, owned: None, context, parent, ready: None }
    }

    pub fn with_context(mut self, context: ContextPtr) -> Self {
        self.context = Some(context);
        self
    }

    /// Attaches a completion hook: data() will block on it before returning
    /// the pointer. Used for mapped views of asynchronously produced output.
    pub fn with_ready(mut self, ready: Arc<dyn RequestSync>) -> Self {
        self.ready = Some(ready);
        self
    }

    pub fn bytes(&self) -> &[u8] {
        if let Some(ready) = &self.ready {
            ready.wait();
        }
        unsafe { std::slice::from_raw_parts(self.ptr, self.info.nbytes()) }
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        if let Some(ready) = &self.ready {
            ready.wait();
        }
        unsafe { std::slice::from_raw_parts_mut(self.ptr, self.info.nbytes()) }
    }

    pub fn is_view(&self) -> bool {
        self.owned.is_none()
    }
}

impl TensorInterface for CpuTensor {
    fn memory_type(&self) -> MemoryType {
        MemoryType::Cpu
    }
    fn info(&self) -> &TensorInfo {
        &self.info
    }
    fn context(&self) -> Option<&ContextPtr> {
        self.context.as_ref()
    }
    fn data(&self) -> Result<*mut u8, MemoryMapError> {
        if let Some(ready) = &self.ready {
            ready.wait();
        }
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

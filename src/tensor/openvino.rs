// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2026 framemap contributors

use super::{TensorInfo, TensorInterface, TensorPtr};
use crate::context::ContextPtr;
use crate::types::*;
use std::sync::Arc;

/// Completion hook of an asynchronously produced tensor, typically an
/// in-flight inference request. `wait()` blocks the calling thread until the
/// producer signalled completion; there is no cancellation. Callers that need
/// non-blocking behavior poll `is_ready()` before touching the data path.
pub trait RequestSync: Send + Sync {
    fn wait(&self);
    fn is_ready(&self) -> bool;
}

/// Inference-output tensor owned by an OpenVINO request. `data()` is the
/// blocking-on-read contract: it returns only after the request completed, so
/// a reader never observes partially written output.
pub struct OpenVinoTensor {
    info: TensorInfo,
    // Host pointer of the underlying tensor; None for device-resident remote
    // tensors, which are not directly addressable.
    host_ptr: Option<*mut u8>,
    request: Arc<dyn RequestSync>,
    context: Option<ContextPtr>,
    parent: Option<TensorPtr>,
}

unsafe impl Send for OpenVinoTensor {}
unsafe impl Sync for OpenVinoTensor {}

impl OpenVinoTensor {
    pub fn new(
        info: TensorInfo,
        host_ptr: Option<*mut u8>,
        request: Arc<dyn RequestSync>,
        context: Option<ContextPtr>,
    ) -> Self {
        Self { info, host_ptr, request, context, parent: None }
    }

    pub fn request(&self) -> &Arc<dyn RequestSync> {
        &self.request
    }

    pub fn host_ptr(&self) -> Option<*mut u8> {
        self.host_ptr
    }
}

impl TensorInterface for OpenVinoTensor {
    fn memory_type(&self) -> MemoryType {
        MemoryType::OpenVino
    }
    fn info(&self) -> &TensorInfo {
        &self.info
    }
    fn context(&self) -> Option<&ContextPtr> {
        self.context.as_ref()
    }
    fn data(&self) -> Result<*mut u8, MemoryMapError> {
        match self.host_ptr {
            Some(ptr) => {
                self.request.wait();
                Ok(ptr)
            }
            None => Err(MemoryMapError::DirectAccessUnsupported(MemoryType::OpenVino)),
        }
    }
    fn handle(&self, key: HandleKey) -> Result<HandleValue, MemoryMapError> {
        match (key, self.host_ptr) {
            (HandleKey::Data, Some(ptr)) => Ok(ptr as HandleValue),
            _ => Err(MemoryMapError::HandleNotFound(key)),
        }
    }
    fn parent(&self) -> Option<&TensorPtr> {
        self.parent.as_ref()
    }
}

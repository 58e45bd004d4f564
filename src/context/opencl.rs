// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2026 framemap contributors

use super::{pair_of, Context, ContextPtr, MapperCache};
use crate::mappers::{IdentityMapper, MapperPtr, OpenClToDma};
use crate::tensor::{OpenClTensor, TensorInfo};
use crate::types::*;
use std::sync::Arc;

/// Native OpenCL entry points the core needs. The `opencl` feature provides
/// the real implementation; tests substitute fakes.
pub trait ClDriver: Send + Sync {
    fn context_handle(&self) -> HandleValue;
    fn queue_handle(&self) -> HandleValue;

    /// clCreateBuffer; error carries the raw cl_int status.
    fn create_buffer(&self, size: usize) -> Result<HandleValue, i64>;

    /// clReleaseMemObject.
    fn release_mem(&self, mem: HandleValue) -> Result<(), i64>;

    /// Queries the memory object's external-memory handle (dma fd).
    fn mem_to_dma_fd(&self, mem: HandleValue) -> Result<i32, i64>;
}

/// OpenCL device association: platform context plus command queue.
pub struct OpenClContext {
    driver: Arc<dyn ClDriver>,
    mappers: MapperCache,
}

impl OpenClContext {
    pub fn new(driver: Arc<dyn ClDriver>) -> Arc<Self> {
        Arc::new(Self { driver, mappers: MapperCache::new() })
    }

    pub fn driver(&self) -> &Arc<dyn ClDriver> {
        &self.driver
    }

    /// Allocates a device buffer sized for `info`; the tensor releases it on
    /// drop.
    pub fn alloc_tensor(ctx: &Arc<Self>, info: TensorInfo) -> Result<OpenClTensor, MemoryMapError> {
        let mem = ctx.driver.create_buffer(info.nbytes()).map_err(|code| {
            MemoryMapError::DeviceOperationFailed { call: "clCreateBuffer", code }
        })?;
        let context: ContextPtr = ctx.clone();
        Ok(OpenClTensor::owned(info, mem, context, ctx.driver.clone()))
    }
}

impl Context for OpenClContext {
    fn memory_type(&self) -> MemoryType {
        MemoryType::OpenCl
    }

    fn handle(&self, key: HandleKey) -> Result<HandleValue, MemoryMapError> {
        match key {
            HandleKey::ClContext => Ok(self.driver.context_handle()),
            HandleKey::ClQueue => Ok(self.driver.queue_handle()),
            _ => Err(MemoryMapError::HandleNotFound(key)),
        }
    }

    fn get_mapper(&self, input: Option<&ContextPtr>, output: &ContextPtr) -> Option<MapperPtr> {
        let pair = pair_of(input, output);
        if let Some(mapper) = self.mappers.lookup(pair) {
            return Some(mapper);
        }
        let built: MapperPtr = match pair {
            (MemoryType::OpenCl, MemoryType::OpenCl) => Arc::new(IdentityMapper::new(MemoryType::OpenCl)),
            (MemoryType::OpenCl, MemoryType::Dma) => {
                Arc::new(OpenClToDma::new(self.driver.clone(), output.clone()))
            }
            _ => return None,
        };
        log::debug!("opencl context: created {:?} -> {:?} mapper", pair.0, pair.1);
        Some(self.mappers.attach(pair, built))
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2026 framemap contributors

use super::{check_source, MemoryMapper};
use crate::context::{ClDriver, ContextPtr};
use crate::tensor::{DmaTensor, TensorInterface, TensorPtr};
use crate::types::*;
use std::sync::Arc;

/// 1:1 handle translation: queries the OpenCL memory object's external
/// dma-buf handle. No plane or stride rework is needed; the cl_mem keeps
/// owning the fd, the DMA tensor only references it.
pub struct OpenClToDma {
    driver: Arc<dyn ClDriver>,
    output_context: ContextPtr,
}

impl OpenClToDma {
    pub fn new(driver: Arc<dyn ClDriver>, output_context: ContextPtr) -> Self {
        Self { driver, output_context }
    }
}

impl MemoryMapper for OpenClToDma {
    fn input_type(&self) -> MemoryType {
        MemoryType::OpenCl
    }
    fn output_type(&self) -> MemoryType {
        MemoryType::Dma
    }

    fn map_tensor(&self, src: &TensorPtr, _mode: AccessMode) -> Result<TensorPtr, MemoryMapError> {
        check_source(src, MemoryType::OpenCl, MemoryType::Dma)?;
        let mem = src.handle(HandleKey::ClMem)?;
        let fd = self.driver.mem_to_dma_fd(mem).map_err(|code| {
            MemoryMapError::DeviceOperationFailed { call: "clGetMemObjectInfo", code }
        })?;
        let tensor = DmaTensor::new(src.info().clone(), fd, 0, 0, false)
            .with_context(self.output_context.clone())
            .with_parent(src.clone());
        Ok(Arc::new(tensor.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Context, DmaContext, OpenClContext};
    use crate::tensor::{Tensor, TensorInfo};

    struct FakeClDriver;

    impl ClDriver for FakeClDriver {
        fn context_handle(&self) -> HandleValue { 0xc1 }
        fn queue_handle(&self) -> HandleValue { 0xc2 }
        fn create_buffer(&self, _size: usize) -> Result<HandleValue, i64> { Ok(0xbeef) }
        fn release_mem(&self, _mem: HandleValue) -> Result<(), i64> { Ok(()) }
        fn mem_to_dma_fd(&self, mem: HandleValue) -> Result<i32, i64> {
            if mem == 0xbeef { Ok(33) } else { Err(-38) } // CL_INVALID_MEM_OBJECT
        }
    }

    #[test]
    fn translates_mem_handle_to_fd() {
        let cl = OpenClContext::new(Arc::new(FakeClDriver));
        let cl_ctx: ContextPtr = cl.clone();
        let dma_ctx: ContextPtr = DmaContext::new();

        let tensor: TensorPtr = Arc::new(Tensor::from(
            OpenClContext::alloc_tensor(&cl, TensorInfo::new(vec![16, 16], DataType::U8)).unwrap(),
        ));
        let mapper = cl.get_mapper(Some(&cl_ctx), &dma_ctx).unwrap();
        let mapped = mapper.map_tensor(&tensor, AccessMode::Read).unwrap();

        assert_eq!(mapped.memory_type(), MemoryType::Dma);
        assert_eq!(mapped.handle(HandleKey::DmaFd).unwrap(), 33);
        assert_eq!(mapped.info(), tensor.info());
        // the cl_mem keeps the fd: the mapped tensor must not close it
        match &*mapped {
            Tensor::Dma(d) => assert!(!d.takes_ownership()),
            _ => unreachable!(),
        }
    }

    #[test]
    fn propagates_driver_failure() {
        let cl = OpenClContext::new(Arc::new(FakeClDriver));
        let cl_ctx: ContextPtr = cl.clone();
        let dma_ctx: ContextPtr = DmaContext::new();
        // borrowed cl_mem with a handle the fake driver rejects
        let tensor: TensorPtr = Arc::new(Tensor::from(crate::tensor::OpenClTensor::borrowed(
            TensorInfo::new(vec![4], DataType::U8),
            0xdead,
            cl_ctx.clone(),
        )));
        let mapper = cl.get_mapper(Some(&cl_ctx), &dma_ctx).unwrap();
        assert!(matches!(
            mapper.map_tensor(&tensor, AccessMode::Read),
            Err(MemoryMapError::DeviceOperationFailed { call: "clGetMemObjectInfo", code: -38 })
        ));
    }
}

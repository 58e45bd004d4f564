// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2026 framemap contributors

use super::{check_source, MemoryMapper};
use crate::context::{ContextPtr, ZeDriver};
use crate::tensor::{TensorInfo, TensorInterface, TensorPtr, UsmKind, UsmTensor};
use crate::types::*;
use std::sync::Arc;

/// Imports a dma buffer into the Level-Zero driver as a USM device
/// allocation. The import spans the whole buffer; a plane's byte offset is
/// applied to the returned base pointer. The allocation is freed through the
/// driver when the mapped tensor drops; the source fd stays with its owner.
pub struct DmaToUsm {
    driver: Arc<dyn ZeDriver>,
    output_context: ContextPtr,
}

impl DmaToUsm {
    pub fn new(driver: Arc<dyn ZeDriver>, output_context: ContextPtr) -> Self {
        Self { driver, output_context }
    }
}

impl MemoryMapper for DmaToUsm {
    fn input_type(&self) -> MemoryType {
        MemoryType::Dma
    }
    fn output_type(&self) -> MemoryType {
        MemoryType::Usm
    }

    fn map_tensor(&self, src: &TensorPtr, _mode: AccessMode) -> Result<TensorPtr, MemoryMapError> {
        check_source(src, MemoryType::Dma, MemoryType::Usm)?;
        let fd = src.handle(HandleKey::DmaFd)? as i32;
        let offset = src.handle_or(HandleKey::Offset, 0) as usize;
        let size = offset + src.info().nbytes();
        let base = self.driver.import_dma(fd, size).map_err(|code| {
            MemoryMapError::DeviceOperationFailed { call: "zeMemAllocDevice", code }
        })?;
        // The driver must be given back the allocation base, not the plane
        // pointer: the owning tensor covers the whole import and the plane
        // view keeps it alive through the parent chain.
        let base_tensor: TensorPtr = Arc::new(
            UsmTensor::owned(
                TensorInfo::new(vec![size], DataType::U8),
                base,
                UsmKind::Device,
                self.output_context.clone(),
                self.driver.clone(),
            )
            .with_parent(src.clone())
            .into(),
        );
        let ptr = unsafe { base.add(offset) };
        let view = UsmTensor::borrowed(src.info().clone(), ptr, UsmKind::Device, self.output_context.clone())
            .with_parent(base_tensor);
        Ok(Arc::new(view.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Context, DmaContext, LevelZeroContext};
    use crate::tensor::{DmaTensor, Tensor};
    use parking_lot::Mutex;

    struct FakeZeDriver {
        // imported base pointers not yet freed
        live: Mutex<Vec<usize>>,
    }

    impl FakeZeDriver {
        fn new() -> Self {
            Self { live: Mutex::new(Vec::new()) }
        }
    }

    impl ZeDriver for FakeZeDriver {
        fn device_handle(&self) -> HandleValue { 1 }
        fn context_handle(&self) -> HandleValue { 2 }
        fn alloc_device(&self, _size: usize) -> Result<*mut u8, i64> {
            Err(0x70000002) // ZE_RESULT_ERROR_OUT_OF_DEVICE_MEMORY
        }
        fn import_dma(&self, fd: i32, _size: usize) -> Result<*mut u8, i64> {
            if fd < 0 {
                return Err(0x70000004);
            }
            let base = 0x4000_0000usize + (fd as usize) * 0x1000;
            self.live.lock().push(base);
            Ok(base as *mut u8)
        }
        fn free(&self, ptr: *mut u8) -> Result<(), i64> {
            let mut live = self.live.lock();
            // the freed pointer is the imported base, not the offset view
            let pos = live.iter().position(|&p| p == ptr as usize);
            match pos {
                Some(i) => { live.remove(i); Ok(()) }
                None => Err(0x70000001),
            }
        }
    }

    #[test]
    fn import_applies_plane_offset_and_frees_base() {
        let driver = Arc::new(FakeZeDriver::new());
        let lz = LevelZeroContext::new(driver.clone());
        let dma_ctx: ContextPtr = DmaContext::new();
        let usm_ctx: ContextPtr = lz.clone();
        let mapper = lz.get_mapper(Some(&dma_ctx), &usm_ctx).unwrap();

        let src: TensorPtr = Arc::new(Tensor::from(
            DmaTensor::new(TensorInfo::new(vec![240, 640], DataType::U8), 5, 0, 0x200, false),
        ));
        let mapped = mapper.map_tensor(&src, AccessMode::ReadWrite).unwrap();
        let base = 0x4000_0000usize + 5 * 0x1000;
        assert_eq!(mapped.data().unwrap() as usize, base + 0x200);
        assert_eq!(mapped.memory_type(), MemoryType::Usm);
        assert_eq!(driver.live.lock().len(), 1);

        drop(mapped);
        assert!(driver.live.lock().is_empty());
    }
}

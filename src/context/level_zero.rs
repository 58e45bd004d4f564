// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2026 framemap contributors

use super::{pair_of, Context, ContextPtr, MapperCache};
use crate::mappers::{DmaToUsm, IdentityMapper, MapperPtr};
use crate::tensor::{TensorInfo, UsmKind, UsmTensor};
use crate::types::*;
use std::sync::Arc;

/// Native Level-Zero entry points the core needs. The `level-zero` feature
/// provides the real implementation; tests substitute fakes.
pub trait ZeDriver: Send + Sync {
    fn device_handle(&self) -> HandleValue;
    fn context_handle(&self) -> HandleValue;

    /// zeMemAllocDevice; error carries the raw ze_result status.
    fn alloc_device(&self, size: usize) -> Result<*mut u8, i64>;

    /// Imports a dma fd as a USM device allocation. Does not take ownership
    /// of the fd.
    fn import_dma(&self, fd: i32, size: usize) -> Result<*mut u8, i64>;

    /// zeMemFree.
    fn free(&self, ptr: *mut u8) -> Result<(), i64>;
}

/// Level-Zero device/context pair; the USM memory domain.
pub struct LevelZeroContext {
    driver: Arc<dyn ZeDriver>,
    mappers: MapperCache,
}

impl LevelZeroContext {
    pub fn new(driver: Arc<dyn ZeDriver>) -> Arc<Self> {
        Arc::new(Self { driver, mappers: MapperCache::new() })
    }

    pub fn driver(&self) -> &Arc<dyn ZeDriver> {
        &self.driver
    }

    /// Allocates USM device memory sized for `info`; the tensor frees it on
    /// drop.
    pub fn alloc_device_tensor(ctx: &Arc<Self>, info: TensorInfo) -> Result<UsmTensor, MemoryMapError> {
        let ptr = ctx.driver.alloc_device(info.nbytes()).map_err(|code| {
            MemoryMapError::DeviceOperationFailed { call: "zeMemAllocDevice", code }
        })?;
        let context: ContextPtr = ctx.clone();
        Ok(UsmTensor::owned(info, ptr, UsmKind::Device, context, ctx.driver.clone()))
    }
}

impl Context for LevelZeroContext {
    fn memory_type(&self) -> MemoryType {
        MemoryType::Usm
    }

    fn handle(&self, key: HandleKey) -> Result<HandleValue, MemoryMapError> {
        match key {
            HandleKey::ZeDevice => Ok(self.driver.device_handle()),
            HandleKey::ZeContext => Ok(self.driver.context_handle()),
            _ => Err(MemoryMapError::HandleNotFound(key)),
        }
    }

    fn get_mapper(&self, input: Option<&ContextPtr>, output: &ContextPtr) -> Option<MapperPtr> {
        let pair = pair_of(input, output);
        if let Some(mapper) = self.mappers.lookup(pair) {
            return Some(mapper);
        }
        let built: MapperPtr = match pair {
            (MemoryType::Usm, MemoryType::Usm) => Arc::new(IdentityMapper::new(MemoryType::Usm)),
            (MemoryType::Dma, MemoryType::Usm) => {
                Arc::new(DmaToUsm::new(self.driver.clone(), output.clone()))
            }
            _ => return None,
        };
        log::debug!("level-zero context: created {:?} -> {:?} mapper", pair.0, pair.1);
        Some(self.mappers.attach(pair, built))
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// SYCL queue bound to a Level-Zero backend. Contains the Level-Zero context
/// and delegates mapper resolution to it instead of re-implementing it.
pub struct SyclContext {
    level_zero: Arc<LevelZeroContext>,
    queue: HandleValue,
}

impl SyclContext {
    pub fn new(level_zero: Arc<LevelZeroContext>, queue: HandleValue) -> Arc<Self> {
        Arc::new(Self { level_zero, queue })
    }

    pub fn level_zero(&self) -> &Arc<LevelZeroContext> {
        &self.level_zero
    }
}

impl Context for SyclContext {
    fn memory_type(&self) -> MemoryType {
        MemoryType::Usm
    }

    fn handle(&self, key: HandleKey) -> Result<HandleValue, MemoryMapError> {
        match key {
            HandleKey::SyclQueue => Ok(self.queue),
            // Device and platform handles come from the contained context.
            _ => self.level_zero.handle(key),
        }
    }

    fn get_mapper(&self, input: Option<&ContextPtr>, output: &ContextPtr) -> Option<MapperPtr> {
        self.level_zero.get_mapper(input, output)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullZe;
    impl ZeDriver for NullZe {
        fn device_handle(&self) -> HandleValue { 0x10 }
        fn context_handle(&self) -> HandleValue { 0x20 }
        fn alloc_device(&self, _size: usize) -> Result<*mut u8, i64> { Err(-1) }
        fn import_dma(&self, _fd: i32, _size: usize) -> Result<*mut u8, i64> { Err(-1) }
        fn free(&self, _ptr: *mut u8) -> Result<(), i64> { Ok(()) }
    }

    #[test]
    fn device_alloc_failure_carries_status() {
        let lz = LevelZeroContext::new(Arc::new(NullZe));
        let info = TensorInfo::new(vec![8, 8], crate::types::DataType::U8);
        assert!(matches!(
            LevelZeroContext::alloc_device_tensor(&lz, info),
            Err(MemoryMapError::DeviceOperationFailed { call: "zeMemAllocDevice", code: -1 })
        ));
    }

    #[test]
    fn sycl_delegates_to_contained_level_zero() {
        let lz = LevelZeroContext::new(Arc::new(NullZe));
        let sycl = SyclContext::new(lz.clone(), 0x30);
        assert_eq!(sycl.handle(HandleKey::SyclQueue).unwrap(), 0x30);
        assert_eq!(sycl.handle(HandleKey::ZeDevice).unwrap(), 0x10);
        assert_eq!(sycl.handle(HandleKey::ZeContext).unwrap(), 0x20);

        // Mapper resolution goes through the contained context's cache:
        // both resolve to the identical instance.
        let lz_ctx: ContextPtr = lz.clone();
        let sycl_ctx: ContextPtr = sycl.clone();
        let via_sycl = sycl.get_mapper(Some(&lz_ctx), &lz_ctx).unwrap();
        let via_lz = lz.get_mapper(Some(&sycl_ctx), &lz_ctx).unwrap();
        assert!(Arc::ptr_eq(&via_sycl, &via_lz));
    }
}

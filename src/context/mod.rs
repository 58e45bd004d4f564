// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2026 framemap contributors

mod vaapi; pub use vaapi::*;
mod opencl; pub use opencl::*;
mod level_zero; pub use level_zero::*;
mod openvino; pub use openvino::*;

use crate::mappers::*;
use crate::types::*;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// A memory domain / device association. Owns capability handles and a cache
/// of the mappers constructed for conversions it participates in.
pub trait Context: Send + Sync + 'static {
    fn memory_type(&self) -> MemoryType;

    /// Capability handle by key (device, platform context, queue, display).
    fn handle(&self, key: HandleKey) -> Result<HandleValue, MemoryMapError>;

    /// Returns the mapper for the (input, output) domain pair, constructing
    /// and memoizing it on first use. `None` input stands for plain CPU
    /// memory. Returns `None` when this context knows no path for the pair;
    /// the caller then fails fast with an unsupported-conversion error.
    fn get_mapper(&self, input: Option<&ContextPtr>, output: &ContextPtr) -> Option<MapperPtr>;

    fn as_any(&self) -> &dyn std::any::Any;
}

pub type ContextPtr = Arc<dyn Context>;

pub(crate) fn pair_of(input: Option<&ContextPtr>, output: &ContextPtr) -> (MemoryType, MemoryType) {
    (input.map_or(MemoryType::Cpu, |c| c.memory_type()), output.memory_type())
}

/// Memoized mapper storage: at most one mapper instance per domain pair per
/// context lifetime. Lock-protected so a racing first lookup cannot produce
/// two instances; contexts are still meant to be set up before steady-state
/// multi-threaded processing starts.
pub struct MapperCache {
    cache: Mutex<HashMap<(MemoryType, MemoryType), MapperPtr>>,
}

impl MapperCache {
    pub fn new() -> Self {
        Self { cache: Mutex::new(HashMap::new()) }
    }

    pub fn lookup(&self, pair: (MemoryType, MemoryType)) -> Option<MapperPtr> {
        self.cache.lock().get(&pair).cloned()
    }

    /// Memoizes `mapper` for `pair` and returns the cached instance; if a
    /// racing caller attached first, theirs wins.
    pub fn attach(&self, pair: (MemoryType, MemoryType), mapper: MapperPtr) -> MapperPtr {
        self.cache.lock().entry(pair).or_insert(mapper).clone()
    }
}

impl Default for MapperCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Plain system memory. Also the output side of every *-to-CPU mapping.
pub struct CpuContext {
    mappers: MapperCache,
}

impl CpuContext {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { mappers: MapperCache::new() })
    }
}

impl Context for CpuContext {
    fn memory_type(&self) -> MemoryType {
        MemoryType::Cpu
    }

    fn handle(&self, key: HandleKey) -> Result<HandleValue, MemoryMapError> {
        Err(MemoryMapError::HandleNotFound(key))
    }

    fn get_mapper(&self, input: Option<&ContextPtr>, output: &ContextPtr) -> Option<MapperPtr> {
        let pair = pair_of(input, output);
        if let Some(mapper) = self.mappers.lookup(pair) {
            return Some(mapper);
        }
        let built: MapperPtr = match pair {
            (MemoryType::Cpu, MemoryType::Cpu) => Arc::new(IdentityMapper::new(MemoryType::Cpu)),
            (MemoryType::Cpu, MemoryType::Mat) => Arc::new(CpuToMat::new()),
            (MemoryType::Usm, MemoryType::Cpu) => Arc::new(UsmToCpu::new()),
            (MemoryType::OpenVino, MemoryType::Cpu) => Arc::new(OpenVinoToCpu::new()),
            (MemoryType::HostBuffer, MemoryType::Cpu) => Arc::new(HostBufferToCpu::new()),
            _ => return None,
        };
        log::debug!("cpu context: created {:?} -> {:?} mapper", pair.0, pair.1);
        Some(self.mappers.attach(pair, built))
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// OpenCV execution context: matrix views over CPU memory.
pub struct MatContext {
    mappers: MapperCache,
}

impl MatContext {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { mappers: MapperCache::new() })
    }
}

impl Context for MatContext {
    fn memory_type(&self) -> MemoryType {
        MemoryType::Mat
    }

    fn handle(&self, key: HandleKey) -> Result<HandleValue, MemoryMapError> {
        Err(MemoryMapError::HandleNotFound(key))
    }

    fn get_mapper(&self, input: Option<&ContextPtr>, output: &ContextPtr) -> Option<MapperPtr> {
        let pair = pair_of(input, output);
        if let Some(mapper) = self.mappers.lookup(pair) {
            return Some(mapper);
        }
        let built: MapperPtr = match pair {
            (MemoryType::Mat, MemoryType::Mat) => Arc::new(IdentityMapper::new(MemoryType::Mat)),
            (MemoryType::Cpu, MemoryType::Mat) => Arc::new(CpuToMat::new()),
            _ => return None,
        };
        Some(self.mappers.attach(pair, built))
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// DMA-BUF domain. Carries no device state of its own; mappers into DMA pull
/// what they need from the source context.
pub struct DmaContext {
    mappers: MapperCache,
}

impl DmaContext {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { mappers: MapperCache::new() })
    }
}

impl Context for DmaContext {
    fn memory_type(&self) -> MemoryType {
        MemoryType::Dma
    }

    fn handle(&self, key: HandleKey) -> Result<HandleValue, MemoryMapError> {
        Err(MemoryMapError::HandleNotFound(key))
    }

    fn get_mapper(&self, input: Option<&ContextPtr>, output: &ContextPtr) -> Option<MapperPtr> {
        let pair = pair_of(input, output);
        if let Some(mapper) = self.mappers.lookup(pair) {
            return Some(mapper);
        }
        let built: MapperPtr = match pair {
            (MemoryType::Dma, MemoryType::Dma) => Arc::new(IdentityMapper::new(MemoryType::Dma)),
            (MemoryType::Vaapi, MemoryType::Dma) => {
                let driver = input?.as_any().downcast_ref::<VaapiContext>()?.driver().clone();
                Arc::new(VaapiToDma::new(driver, output.clone()))
            }
            (MemoryType::OpenCl, MemoryType::Dma) => {
                let driver = input?.as_any().downcast_ref::<OpenClContext>()?.driver().clone();
                Arc::new(OpenClToDma::new(driver, output.clone()))
            }
            (MemoryType::HostBuffer, MemoryType::Dma) => Arc::new(HostBufferToDma::new(output.clone())),
            _ => return None,
        };
        log::debug!("dma context: created {:?} -> {:?} mapper", pair.0, pair.1);
        Some(self.mappers.attach(pair, built))
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// The pipeline host runtime's buffer domain.
pub struct HostBufferContext {
    mappers: MapperCache,
}

impl HostBufferContext {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { mappers: MapperCache::new() })
    }
}

impl Context for HostBufferContext {
    fn memory_type(&self) -> MemoryType {
        MemoryType::HostBuffer
    }

    fn handle(&self, key: HandleKey) -> Result<HandleValue, MemoryMapError> {
        Err(MemoryMapError::HandleNotFound(key))
    }

    fn get_mapper(&self, input: Option<&ContextPtr>, output: &ContextPtr) -> Option<MapperPtr> {
        let pair = pair_of(input, output);
        if let Some(mapper) = self.mappers.lookup(pair) {
            return Some(mapper);
        }
        let built: MapperPtr = match pair {
            (MemoryType::HostBuffer, MemoryType::Dma) => Arc::new(HostBufferToDma::new(output.clone())),
            (MemoryType::HostBuffer, MemoryType::Cpu) => Arc::new(HostBufferToCpu::new()),
            _ => return None,
        };
        Some(self.mappers.attach(pair, built))
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapper_memoization_returns_identical_instance() {
        let cpu = CpuContext::new();
        let cpu_ctx: ContextPtr = cpu.clone();
        let first = cpu.get_mapper(None, &cpu_ctx).unwrap();
        let second = cpu.get_mapper(None, &cpu_ctx).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn unknown_pair_fails_closed() {
        let cpu = CpuContext::new();
        let cpu_ctx: ContextPtr = cpu.clone();
        // DMA -> CPU has no implemented path on either side.
        let dma: ContextPtr = DmaContext::new();
        assert!(cpu.get_mapper(Some(&dma), &cpu_ctx).is_none());
        assert!(dma.get_mapper(Some(&dma), &cpu_ctx).is_none());
    }

    #[test]
    fn mat_context_resolves_cpu_views() {
        use crate::tensor::{CpuTensor, MapTo, TensorInfo, TensorInterface, TensorPtr};
        let mat_ctx: ContextPtr = MatContext::new();
        let tensor: TensorPtr = Arc::new(
            CpuTensor::alloc(TensorInfo::new(vec![16, 16, 3], DataType::U8)).unwrap().into(),
        );
        let mapped = tensor.map_to(&mat_ctx, AccessMode::Read).unwrap();
        assert_eq!(mapped.memory_type(), MemoryType::Mat);
        assert_eq!(mapped.data().unwrap(), tensor.data().unwrap());
    }

    #[test]
    fn cache_attach_keeps_first_instance() {
        let cache = MapperCache::new();
        let pair = (MemoryType::Cpu, MemoryType::Mat);
        let a: MapperPtr = Arc::new(CpuToMat::new());
        let b: MapperPtr = Arc::new(CpuToMat::new());
        let won = cache.attach(pair, a.clone());
        assert!(Arc::ptr_eq(&won, &a));
        let still_a = cache.attach(pair, b);
        assert!(Arc::ptr_eq(&still_a, &a));
        assert!(Arc::ptr_eq(&cache.lookup(pair).unwrap(), &a));
    }
}

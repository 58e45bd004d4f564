// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2026 framemap contributors

mod vaapi_to_dma; pub use vaapi_to_dma::*;
mod opencl_to_dma; pub use opencl_to_dma::*;
mod host_to_dma; pub use host_to_dma::*;
mod dma_to_usm; pub use dma_to_usm::*;
mod usm_to_cpu; pub use usm_to_cpu::*;
mod openvino_to_cpu; pub use openvino_to_cpu::*;
mod cpu_to_mat; pub use cpu_to_mat::*;

use crate::frame::{Frame, FramePtr};
use crate::tensor::{TensorInterface, TensorPtr};
use crate::types::*;
use std::sync::Arc;

/// Converts tensors and frames from one memory domain into another. A mapper
/// is bound to its (input, output) domain pair at construction and performs
/// exactly one hop; multi-hop conversions are composed explicitly with
/// `MapperChain`. Every produced tensor/frame holds the source as parent so
/// the source memory outlives all mapped views.
pub trait MemoryMapper: Send + Sync {
    fn input_type(&self) -> MemoryType;
    fn output_type(&self) -> MemoryType;

    fn map_tensor(&self, src: &TensorPtr, mode: AccessMode) -> Result<TensorPtr, MemoryMapError>;

    /// Maps each constituent tensor and reassembles a frame carrying the
    /// source's media tags, sync hook and a parent reference.
    fn map_frame(&self, src: &FramePtr, mode: AccessMode) -> Result<FramePtr, MemoryMapError> {
        let mut tensors = Vec::with_capacity(src.num_tensors());
        for tensor in src.tensors() {
            tensors.push(self.map_tensor(tensor, mode)?);
        }
        Ok(Arc::new(Frame::mapped(src, tensors)))
    }
}

pub type MapperPtr = Arc<dyn MemoryMapper>;

/// Rejects tensors from the wrong source domain. A mismatch is a contract
/// violation by the caller, not a recoverable condition.
pub(crate) fn check_source(src: &TensorPtr, expected: MemoryType, to: MemoryType) -> Result<(), MemoryMapError> {
    if src.memory_type() != expected {
        return Err(MemoryMapError::UnsupportedConversion { from: src.memory_type(), to });
    }
    Ok(())
}

/// Same-domain passthrough: mapping is the identity and shares the source.
pub struct IdentityMapper {
    memory_type: MemoryType,
}

impl IdentityMapper {
    pub fn new(memory_type: MemoryType) -> Self {
        Self { memory_type }
    }
}

impl MemoryMapper for IdentityMapper {
    fn input_type(&self) -> MemoryType {
        self.memory_type
    }
    fn output_type(&self) -> MemoryType {
        self.memory_type
    }
    fn map_tensor(&self, src: &TensorPtr, _mode: AccessMode) -> Result<TensorPtr, MemoryMapError> {
        check_source(src, self.memory_type, self.memory_type)?;
        Ok(src.clone())
    }
    fn map_frame(&self, src: &FramePtr, _mode: AccessMode) -> Result<FramePtr, MemoryMapError> {
        Ok(src.clone())
    }
}

/// Explicit multi-hop composition: applies each mapper in order. The chain
/// itself never searches for a path; callers pick the hops.
pub struct MapperChain {
    chain: Vec<MapperPtr>,
}

impl MapperChain {
    pub fn new(chain: Vec<MapperPtr>) -> Self {
        assert!(!chain.is_empty(), "mapper chain must contain at least one mapper");
        Self { chain }
    }
}

impl MemoryMapper for MapperChain {
    fn input_type(&self) -> MemoryType {
        self.chain[0].input_type()
    }
    fn output_type(&self) -> MemoryType {
        self.chain[self.chain.len() - 1].output_type()
    }
    fn map_tensor(&self, src: &TensorPtr, mode: AccessMode) -> Result<TensorPtr, MemoryMapError> {
        let mut current = src.clone();
        for mapper in &self.chain {
            current = mapper.map_tensor(&current, mode)?;
        }
        Ok(current)
    }
    fn map_frame(&self, src: &FramePtr, mode: AccessMode) -> Result<FramePtr, MemoryMapError> {
        let mut current = src.clone();
        for mapper in &self.chain {
            current = mapper.map_frame(&current, mode)?;
        }
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::{CpuTensor, TensorInfo};

    #[test]
    fn identity_returns_same_tensor() {
        let t: TensorPtr = Arc::new(
            CpuTensor::alloc(TensorInfo::new(vec![4], DataType::U8)).unwrap().into(),
        );
        let mapper = IdentityMapper::new(MemoryType::Cpu);
        let mapped = mapper.map_tensor(&t, AccessMode::ReadWrite).unwrap();
        assert!(Arc::ptr_eq(&t, &mapped));
    }

    #[test]
    fn identity_rejects_wrong_domain() {
        let t: TensorPtr = Arc::new(
            CpuTensor::alloc(TensorInfo::new(vec![4], DataType::U8)).unwrap().into(),
        );
        let mapper = IdentityMapper::new(MemoryType::Dma);
        assert!(matches!(
            mapper.map_tensor(&t, AccessMode::Read),
            Err(MemoryMapError::UnsupportedConversion { from: MemoryType::Cpu, to: MemoryType::Dma })
        ));
    }
}

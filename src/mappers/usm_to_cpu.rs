// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2026 framemap contributors

use super::{check_source, MemoryMapper};
use crate::tensor::{CpuTensor, TensorInterface, TensorPtr};
use crate::types::*;
use std::sync::Arc;

/// Zero-cost reinterpretation of a unified-shared-memory pointer as CPU
/// memory: USM allocations live in an address space the host can dereference,
/// so no copy and no device call is needed.
pub struct UsmToCpu;

impl UsmToCpu {
    pub fn new() -> Self {
        Self
    }
}

impl MemoryMapper for UsmToCpu {
    fn input_type(&self) -> MemoryType {
        MemoryType::Usm
    }
    fn output_type(&self) -> MemoryType {
        MemoryType::Cpu
    }

    fn map_tensor(&self, src: &TensorPtr, _mode: AccessMode) -> Result<TensorPtr, MemoryMapError> {
        check_source(src, MemoryType::Usm, MemoryType::Cpu)?;
        let ptr = src.data()?;
        let view = unsafe { CpuTensor::view(ptr, src.info().clone(), Some(src.clone()), None) };
        Ok(Arc::new(view.into()))
    }
}

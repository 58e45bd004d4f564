// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2026 framemap contributors

use super::{check_source, MemoryMapper};
use crate::tensor::{MatDepth, MatHeader, MatTensor, TensorInterface, TensorPtr};
use crate::types::*;
use std::sync::Arc;

/// Reinterprets a strided CPU tensor as an OpenCV-style matrix header without
/// copying. Channel-last layouts drop the trailing channel dimension and fold
/// it into the element type; planar layouts become single-channel matrices.
pub struct CpuToMat;

impl CpuToMat {
    pub fn new() -> Self {
        Self
    }
}

impl MemoryMapper for CpuToMat {
    fn input_type(&self) -> MemoryType {
        MemoryType::Cpu
    }
    fn output_type(&self) -> MemoryType {
        MemoryType::Mat
    }

    fn map_tensor(&self, src: &TensorPtr, _mode: AccessMode) -> Result<TensorPtr, MemoryMapError> {
        check_source(src, MemoryType::Cpu, MemoryType::Mat)?;
        let info = src.info().squeeze();
        let depth = MatDepth::from_data_type(info.dtype)?;
        let layout = ImageLayout::from_shape(&info.shape);

        let header = match layout.c_position() {
            // Channel-last: fold the channel dimension into the element type.
            Some(c) if c == info.shape.len() - 1 => {
                let channels = info.shape[c];
                if info.stride[c] != info.itemsize() {
                    return Err(MemoryMapError::InvalidFrameInfo(format!(
                        "channel-last tensor must have packed channels, stride {} != itemsize {}",
                        info.stride[c], info.itemsize())));
                }
                MatHeader {
                    dims: info.shape[..c].to_vec(),
                    steps: info.stride[..c].to_vec(),
                    depth,
                    channels,
                }
            }
            // Planar and plain layouts map dimension-for-dimension.
            _ => MatHeader {
                dims: info.shape.clone(),
                steps: info.stride.clone(),
                depth,
                channels: 1,
            },
        };

        let data = src.data()?;
        let tensor = MatTensor::new(info, header, data, Some(src.clone()));
        Ok(Arc::new(tensor.into()))
    }
}

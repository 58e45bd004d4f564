// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2026 framemap contributors

use super::{TensorInfo, TensorInterface, TensorPtr};
use crate::context::ContextPtr;
use crate::types::*;

/// OpenCV-compatible element depth. There is no 64-bit integer Mat type;
/// conversion of I64 tensors is rejected at mapping time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatDepth {
    Cv8U, Cv32S, Cv32F,
}

impl MatDepth {
    pub fn from_data_type(dtype: DataType) -> Result<MatDepth, MemoryMapError> {
        match dtype {
            DataType::U8 => Ok(MatDepth::Cv8U),
            DataType::I32 => Ok(MatDepth::Cv32S),
            DataType::F32 => Ok(MatDepth::Cv32F),
            DataType::I64 => Err(MemoryMapError::UnsupportedDataType { dtype, target: "mat" }),
        }
    }
}

/// Matrix header describing the same bytes as the source tensor: dimension
/// sizes, byte steps and a depth+channels element type. For channel-last
/// images the channel dimension is folded into `channels`.
#[derive(Debug, Clone)]
pub struct MatHeader {
    pub dims: Vec<usize>,
    pub steps: Vec<usize>,
    pub depth: MatDepth,
    pub channels: usize,
}

/// Zero-copy matrix view over CPU memory.
pub struct MatTensor {
    info: TensorInfo,
    header: MatHeader,
    data: *mut u8,
    context: Option<ContextPtr>,
    parent: Option<TensorPtr>,
}

unsafe impl Send for MatTensor {}
unsafe impl Sync for MatTensor {}

impl MatTensor {
    pub fn new(
        info: TensorInfo,
        header: MatHeader,
        data: *mut u8,
        parent: Option<TensorPtr>,
    ) -> Self {
        Self { info, header, data, context: None, parent }
    }

    pub fn header(&self) -> &MatHeader {
        &self.header
    }
}

impl TensorInterface for MatTensor {
    fn memory_type(&self) -> MemoryType {
        MemoryType::Mat
    }
    fn info(&self) -> &TensorInfo {
        &self.info
    }
    fn context(&self) -> Option<&ContextPtr> {
        self.context.as_ref()
    }
    fn data(&self) -> Result<*mut u8, MemoryMapError> {
        Ok(self.data)
    }
    fn handle(&self, key: HandleKey) -> Result<HandleValue, MemoryMapError> {
        match key {
            HandleKey::Data => Ok(self.data as HandleValue),
            _ => Err(MemoryMapError::HandleNotFound(key)),
        }
    }
    fn parent(&self) -> Option<&TensorPtr> {
        self.parent.as_ref()
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2026 framemap contributors

mod info; pub use info::*;
mod cpu; pub use cpu::*;
mod host; pub use host::*;
mod vaapi; pub use vaapi::*;
mod dma; pub use dma::*;
mod opencl; pub use opencl::*;
mod usm; pub use usm::*;
mod openvino; pub use openvino::*;
mod mat; pub use mat::*;

use crate::context::ContextPtr;
use crate::frame::FramePtr;
use crate::types::*;
use std::sync::Arc;

/// Capability set shared by all memory domains. A tensor is one contiguous,
/// typed, strided region in a single domain, addressed through opaque handles.
#[enum_dispatch::enum_dispatch(Tensor)]
pub trait TensorInterface {
    fn memory_type(&self) -> MemoryType;
    fn info(&self) -> &TensorInfo;
    fn context(&self) -> Option<&ContextPtr>;

    /// Process-addressable pointer to the tensor data. Fails for domains
    /// whose memory is not directly addressable (use a mapper first).
    fn data(&self) -> Result<*mut u8, MemoryMapError>;

    /// Domain-specific handle by key, `HandleNotFound` if absent.
    fn handle(&self, key: HandleKey) -> Result<HandleValue, MemoryMapError>;

    /// The tensor this one was mapped or sliced from, if any. Holding the
    /// parent keeps the source memory alive as long as this view exists.
    fn parent(&self) -> Option<&TensorPtr>;
}

#[enum_dispatch::enum_dispatch]
pub enum Tensor {
    Cpu(CpuTensor),
    HostBuffer(HostBufferTensor),
    Vaapi(VaapiTensor),
    Dma(DmaTensor),
    OpenCl(OpenClTensor),
    Usm(UsmTensor),
    OpenVino(OpenVinoTensor),
    Mat(MatTensor),
}

pub type TensorPtr = Arc<Tensor>;

impl Tensor {
    /// Domain-specific handle by key, never fails.
    pub fn handle_or(&self, key: HandleKey, default: HandleValue) -> HandleValue {
        self.handle(key).unwrap_or(default)
    }

    /// The domain's primary handle: what a caller gets without naming a key.
    pub fn primary_handle(&self) -> Result<HandleValue, MemoryMapError> {
        let key = match self.memory_type() {
            MemoryType::Dma => HandleKey::DmaFd,
            MemoryType::Vaapi => HandleKey::VaSurfacePtr,
            MemoryType::OpenCl => HandleKey::ClMem,
            _ => HandleKey::Data,
        };
        self.handle(key)
    }
}

/// Resolves a mapper between the source's context and `output`, trying the
/// output context first, then the source's own context.
pub(crate) fn resolve_mapper(
    input: Option<&ContextPtr>,
    output: &ContextPtr,
    from: MemoryType,
) -> Result<crate::mappers::MapperPtr, MemoryMapError> {
    if let Some(mapper) = output.get_mapper(input, output) {
        return Ok(mapper);
    }
    if let Some(input) = input {
        if let Some(mapper) = input.get_mapper(Some(input), output) {
            return Ok(mapper);
        }
    }
    Err(MemoryMapError::UnsupportedConversion { from, to: output.memory_type() })
}

/// Conversion entry point on shared tensors and frames.
pub trait MapTo: Sized {
    fn map_to(&self, output: &ContextPtr, mode: AccessMode) -> Result<Self, MemoryMapError>;
}

impl MapTo for TensorPtr {
    fn map_to(&self, output: &ContextPtr, mode: AccessMode) -> Result<TensorPtr, MemoryMapError> {
        if let Some(input) = self.context() {
            if Arc::ptr_eq(input, output) {
                return Ok(self.clone());
            }
        }
        let mapper = resolve_mapper(self.context(), output, self.memory_type())?;
        mapper.map_tensor(self, mode)
    }
}

impl MapTo for FramePtr {
    fn map_to(&self, output: &ContextPtr, mode: AccessMode) -> Result<FramePtr, MemoryMapError> {
        let input = self.tensors().first().and_then(|t| t.context());
        if let Some(input) = input {
            if Arc::ptr_eq(input, output) {
                return Ok(self.clone());
            }
        }
        let mapper = resolve_mapper(input, output, self.memory_type())?;
        mapper.map_frame(self, mode)
    }
}

/// A view into `src` selected by per-dimension `(offset, size)` pairs.
/// `size == 0` keeps the dimension's full extent (its offset must be 0).
/// The view shares the backing memory at the computed byte offset and holds
/// `src` as parent. The source must be directly addressable.
pub fn get_tensor_slice(src: &TensorPtr, slice: &[(usize, usize)]) -> Result<TensorPtr, MemoryMapError> {
    let info = src.info();
    if slice.len() != info.shape.len() {
        return Err(MemoryMapError::InvalidSlice(format!(
            "{} slice dimensions for a {}-dimensional tensor", slice.len(), info.shape.len())));
    }

    let mut shape = Vec::with_capacity(slice.len());
    let mut byte_offset = 0usize;
    for (i, &(offset, size)) in slice.iter().enumerate() {
        if size == 0 {
            if offset != 0 {
                return Err(MemoryMapError::InvalidSlice(format!(
                    "dimension {i}: offset {offset} with full-extent size")));
            }
            shape.push(info.shape[i]);
            continue;
        }
        if offset + size > info.shape[i] {
            return Err(MemoryMapError::InvalidSlice(format!(
                "dimension {i}: {offset}+{size} exceeds extent {}", info.shape[i])));
        }
        byte_offset += offset * info.stride[i];
        shape.push(size);
    }

    let data = src.data()?;
    let view_info = TensorInfo::with_strides(shape, info.stride.clone(), info.dtype);
    let view = unsafe {
        CpuTensor::view(data.add(byte_offset), view_info, Some(src.clone()), src.context().cloned())
    };
    Ok(Arc::new(view.into()))
}

/// Drops leading size-1 dimensions, returning a view over the same memory.
pub fn squeeze_tensor(src: &TensorPtr) -> Result<TensorPtr, MemoryMapError> {
    let data = src.data()?;
    let view_info = src.info().squeeze();
    let view = unsafe { CpuTensor::view(data, view_info, Some(src.clone()), src.context().cloned()) };
    Ok(Arc::new(view.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_offset_arithmetic() {
        let info = TensorInfo::new(vec![1, 3, 480, 640], DataType::U8);
        let stride = info.stride.clone();
        let src: TensorPtr = Arc::new(CpuTensor::alloc(info).unwrap().into());
        let base = src.data().unwrap() as usize;

        let sliced = get_tensor_slice(&src, &[(0, 0), (0, 0), (100, 200), (50, 300)]).unwrap();
        assert_eq!(sliced.info().shape, vec![1, 3, 200, 300]);
        assert_eq!(sliced.info().stride, stride);
        let expected = base + 100 * stride[2] + 50 * stride[3];
        assert_eq!(sliced.data().unwrap() as usize, expected);
        assert!(sliced.parent().is_some());
    }

    #[test]
    fn slice_validates_extents() {
        let src: TensorPtr = Arc::new(CpuTensor::alloc(TensorInfo::new(vec![4, 4], DataType::U8)).unwrap().into());
        assert!(matches!(
            get_tensor_slice(&src, &[(0, 0), (2, 3)]),
            Err(MemoryMapError::InvalidSlice(_))
        ));
        assert!(matches!(
            get_tensor_slice(&src, &[(0, 0)]),
            Err(MemoryMapError::InvalidSlice(_))
        ));
    }

    #[test]
    fn squeeze_view_keeps_pointer() {
        let src: TensorPtr = Arc::new(CpuTensor::alloc(TensorInfo::new(vec![1, 1, 8, 8], DataType::U8)).unwrap().into());
        let squeezed = squeeze_tensor(&src).unwrap();
        assert_eq!(squeezed.info().shape, vec![8, 8]);
        assert_eq!(squeezed.data().unwrap(), src.data().unwrap());
    }

    #[test]
    fn handle_or_defaults() {
        let t: TensorPtr = Arc::new(CpuTensor::alloc(TensorInfo::new(vec![4], DataType::U8)).unwrap().into());
        assert!(t.handle(HandleKey::DmaFd).is_err());
        assert_eq!(t.handle_or(HandleKey::DmaFd, -1), -1);
        assert_eq!(t.handle_or(HandleKey::Data, 0), t.data().unwrap() as HandleValue);
        assert_eq!(t.primary_handle().unwrap(), t.handle(HandleKey::Data).unwrap());
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2026 framemap contributors

use super::{check_source, MemoryMapper};
use crate::context::{ContextPtr, VaDriver};
use crate::frame::{Frame, FramePtr};
use crate::tensor::{DmaTensor, TensorInfo, TensorInterface, TensorPtr};
use crate::types::*;
use std::sync::Arc;

/// Exports VAAPI surfaces as DRM-PRIME dma buffers.
///
/// A multi-plane surface may export several planes into one DMA object, so
/// consecutive plane tensors can carry the same fd. Ownership is assigned by
/// the last-seen-fd rule: a tensor takes ownership only when its fd differs
/// from the immediately preceding plane's fd, so each distinct fd is closed
/// exactly once when the plane tensors are destroyed.
pub struct VaapiToDma {
    driver: Arc<dyn VaDriver>,
    output_context: ContextPtr,
}

impl VaapiToDma {
    pub fn new(driver: Arc<dyn VaDriver>, output_context: ContextPtr) -> Self {
        Self { driver, output_context }
    }

    fn export(&self, surface: u32, mode: AccessMode) -> Result<crate::context::DrmPrimeDescriptor, MemoryMapError> {
        // Pending writes into the surface must land before anyone reads the
        // exported buffer.
        if mode != AccessMode::Write {
            self.driver.sync_surface(surface).map_err(|code| {
                MemoryMapError::DeviceOperationFailed { call: "vaSyncSurface", code }
            })?;
        }
        self.driver.export_surface(surface).map_err(|code| {
            MemoryMapError::DeviceOperationFailed { call: "vaExportSurfaceHandle", code }
        })
    }
}

/// Exported planes keep their shape; the row stride comes from the driver's
/// pitch, which may include allocation padding.
fn plane_info_with_pitch(info: &TensorInfo, pitch: usize) -> TensorInfo {
    let mut stride = info.stride.clone();
    if pitch != 0 {
        if let Some(h) = ImageLayout::from_shape(&info.shape).h_position() {
            stride[h] = pitch;
        }
    }
    TensorInfo::with_strides(info.shape.clone(), stride, info.dtype)
}

impl MemoryMapper for VaapiToDma {
    fn input_type(&self) -> MemoryType {
        MemoryType::Vaapi
    }
    fn output_type(&self) -> MemoryType {
        MemoryType::Dma
    }

    fn map_tensor(&self, src: &TensorPtr, mode: AccessMode) -> Result<TensorPtr, MemoryMapError> {
        check_source(src, MemoryType::Vaapi, MemoryType::Dma)?;
        let surface = src.handle(HandleKey::VaSurfacePtr)? as u32;
        let plane = src.handle_or(HandleKey::PlaneIndex, 0) as usize;
        let desc = self.export(surface, mode)?;
        let (layer, object) = desc.layer(plane)?;
        // A standalone export references its fd alone, so the tensor owns it.
        let tensor = DmaTensor::new(
            plane_info_with_pitch(src.info(), layer.pitch),
            object.fd,
            object.modifier,
            layer.offset,
            true,
        )
        .with_context(self.output_context.clone())
        .with_parent(src.clone());
        Ok(Arc::new(tensor.into()))
    }

    fn map_frame(&self, src: &FramePtr, mode: AccessMode) -> Result<FramePtr, MemoryMapError> {
        let first = src.tensor(0)?;
        check_source(first, MemoryType::Vaapi, MemoryType::Dma)?;
        let surface = first.handle(HandleKey::VaSurfacePtr)? as u32;
        let desc = self.export(surface, mode)?;

        let mut tensors = Vec::with_capacity(src.num_tensors());
        let mut last_fd: Option<i32> = None;
        for (index, tensor) in src.tensors().iter().enumerate() {
            check_source(tensor, MemoryType::Vaapi, MemoryType::Dma)?;
            let plane = tensor.handle_or(HandleKey::PlaneIndex, index as HandleValue) as usize;
            let (layer, object) = desc.layer(plane)?;
            let take_ownership = last_fd != Some(object.fd);
            last_fd = Some(object.fd);
            let mapped = DmaTensor::new(
                plane_info_with_pitch(tensor.info(), layer.pitch),
                object.fd,
                object.modifier,
                layer.offset,
                take_ownership,
            )
            .with_context(self.output_context.clone())
            .with_parent(tensor.clone());
            tensors.push(Arc::new(mapped.into()) as TensorPtr);
        }
        Ok(Arc::new(Frame::mapped(src, tensors)))
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2026 framemap contributors

use crate::tensor::{RequestSync, TensorInfo, TensorInterface, TensorPtr};
use crate::types::*;
use std::sync::Arc;

/// Ordered collection of tensors forming one media unit: the planes of an
/// image, a tensor batch, a set of inference outputs. Insertion order is
/// plane order. Immutable once handed downstream.
pub struct Frame {
    media_type: MediaType,
    format: Option<ImageFormat>,
    tensors: Vec<TensorPtr>,
    parent: Option<FramePtr>,
    sync: Option<Arc<dyn RequestSync>>,
}

pub type FramePtr = Arc<Frame>;

impl Frame {
    pub fn new(media_type: MediaType, format: Option<ImageFormat>, tensors: Vec<TensorPtr>) -> Self {
        Self { media_type, format, tensors, parent: None, sync: None }
    }

    /// Frame produced by a mapper: carries the source's media tags and sync
    /// hook, and keeps the source alive through the parent reference.
    pub fn mapped(src: &FramePtr, tensors: Vec<TensorPtr>) -> Self {
        Self {
            media_type: src.media_type,
            format: src.format,
            tensors,
            parent: Some(src.clone()),
            sync: src.sync.clone(),
        }
    }

    pub fn with_sync(mut self, sync: Arc<dyn RequestSync>) -> Self {
        self.sync = Some(sync);
        self
    }

    pub fn with_parent(mut self, parent: FramePtr) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    pub fn format(&self) -> Option<ImageFormat> {
        self.format
    }

    pub fn tensors(&self) -> &[TensorPtr] {
        &self.tensors
    }

    pub fn num_tensors(&self) -> usize {
        self.tensors.len()
    }

    pub fn tensor(&self, index: usize) -> Result<&TensorPtr, MemoryMapError> {
        self.tensors.get(index).ok_or_else(|| MemoryMapError::InvalidFrameInfo(format!(
            "tensor index {index} out of range ({} tensors)", self.tensors.len())))
    }

    /// Memory domain of the frame, taken from its first tensor.
    pub fn memory_type(&self) -> MemoryType {
        self.tensors.first().map_or(MemoryType::Cpu, |t| t.memory_type())
    }

    pub fn parent(&self) -> Option<&FramePtr> {
        self.parent.as_ref()
    }

    pub fn sync(&self) -> Option<&Arc<dyn RequestSync>> {
        self.sync.as_ref()
    }

    /// Blocks until the producing request completed, if the frame carries a
    /// synchronization hook.
    pub fn wait(&self) {
        if let Some(sync) = &self.sync {
            sync.wait();
        }
    }
}

/// Negotiated description of the frames a pipeline stage produces or accepts:
/// one TensorInfo per plane/tensor slot, plus media tags.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameInfo {
    pub tensors: Vec<TensorInfo>,
    pub media_type: MediaType,
    pub format: Option<ImageFormat>,
}

impl FrameInfo {
    pub fn new(tensors: Vec<TensorInfo>, media_type: MediaType, format: Option<ImageFormat>) -> Self {
        Self { tensors, media_type, format }
    }

    /// Checks plane count and per-plane shapes against the declared format.
    pub fn validate(&self) -> Result<(), MemoryMapError> {
        let Some(format) = self.format else {
            return Ok(());
        };
        let err = |msg: String| Err(MemoryMapError::InvalidFrameInfo(msg));

        match format {
            ImageFormat::BGR | ImageFormat::RGB | ImageFormat::BGRX | ImageFormat::RGBX => {
                let [plane] = self.tensors.as_slice() else {
                    return err(format!("{format:?} requires 1 plane, got {}", self.tensors.len()));
                };
                let channels = plane_channels(plane);
                if channels != format.channels() {
                    return err(format!("{format:?} requires {} channels, got {channels}", format.channels()));
                }
            }
            ImageFormat::NV12 => {
                let [y, uv] = self.tensors.as_slice() else {
                    return err(format!("NV12 requires 2 planes, got {}", self.tensors.len()));
                };
                let (yh, yw) = plane_height_width(y)?;
                let (ch, cw) = plane_height_width(uv)?;
                if ch != yh.div_ceil(2) || cw != yw {
                    return err(format!(
                        "NV12 chroma plane must be {}x{} bytes, got {ch}x{cw}", yh.div_ceil(2), yw));
                }
            }
            ImageFormat::I420 => {
                let [y, u, v] = self.tensors.as_slice() else {
                    return err(format!("I420 requires 3 planes, got {}", self.tensors.len()));
                };
                let (yh, yw) = plane_height_width(y)?;
                for plane in [u, v] {
                    let (ch, cw) = plane_height_width(plane)?;
                    if ch != yh.div_ceil(2) || cw != yw.div_ceil(2) {
                        return err(format!(
                            "I420 chroma plane must be {}x{}, got {ch}x{cw}",
                            yh.div_ceil(2), yw.div_ceil(2)));
                    }
                }
            }
            ImageFormat::BGRP | ImageFormat::RGBP => {
                // Either three single-channel planes or one CHW tensor.
                match self.tensors.as_slice() {
                    [chw] => {
                        if ImageLayout::from_shape(&chw.shape) != ImageLayout::CHW || chw.shape[0] != 3 {
                            return err(format!("{format:?} single-tensor form must be 3xHxW"));
                        }
                    }
                    [a, b, c] => {
                        if a.shape != b.shape || b.shape != c.shape {
                            return err(format!("{format:?} planes must agree in shape"));
                        }
                    }
                    other => {
                        return err(format!("{format:?} requires 1 or 3 planes, got {}", other.len()));
                    }
                }
            }
        }
        Ok(())
    }
}

fn plane_channels(info: &TensorInfo) -> usize {
    ImageLayout::from_shape(&info.shape).c_position().map_or(1, |p| info.shape[p])
}

fn plane_height_width(info: &TensorInfo) -> Result<(usize, usize), MemoryMapError> {
    let layout = ImageLayout::from_shape(&info.shape);
    match (layout.h_position(), layout.w_position()) {
        (Some(h), Some(w)) => Ok((info.shape[h], info.shape[w])),
        _ => Err(MemoryMapError::InvalidFrameInfo(format!(
            "plane shape {:?} has no height/width axes", info.shape))),
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2026 framemap contributors

use super::{pair_of, Context, ContextPtr, MapperCache};
use crate::mappers::{IdentityMapper, MapperPtr, VaapiToDma};
use crate::types::*;
use std::sync::Arc;

/// One DRM object of an exported surface: the dma fd, its total size and the
/// DRM format modifier.
#[derive(Debug, Clone)]
pub struct DrmPrimeObject {
    pub fd: i32,
    pub size: usize,
    pub modifier: u64,
}

/// One image layer (plane) of an exported surface, pointing into an object.
#[derive(Debug, Clone)]
pub struct DrmPrimeLayer {
    pub object_index: usize,
    pub offset: usize,
    pub pitch: usize,
}

/// Result of a DRM-PRIME surface export. Several layers may reference the
/// same object when the driver packs planes into one DMA buffer.
#[derive(Debug, Clone)]
pub struct DrmPrimeDescriptor {
    pub objects: Vec<DrmPrimeObject>,
    pub layers: Vec<DrmPrimeLayer>,
}

impl DrmPrimeDescriptor {
    /// Plane lookup; a missing layer or object means the driver returned a
    /// descriptor inconsistent with the frame layout.
    pub fn layer(&self, index: usize) -> Result<(&DrmPrimeLayer, &DrmPrimeObject), MemoryMapError> {
        self.layers
            .get(index)
            .and_then(|layer| self.objects.get(layer.object_index).map(|object| (layer, object)))
            .ok_or(MemoryMapError::DeviceOperationFailed { call: "vaExportSurfaceHandle", code: -1 })
    }
}

/// Native VAAPI entry points the core needs. The `vaapi` feature provides the
/// libva-backed implementation; tests substitute fakes.
pub trait VaDriver: Send + Sync {
    /// VADisplay handle.
    fn display(&self) -> HandleValue;

    /// DRM-PRIME 2 export of a surface; error carries the raw VAStatus.
    fn export_surface(&self, surface: u32) -> Result<DrmPrimeDescriptor, i64>;

    /// Blocks until all pending operations on the surface finished.
    fn sync_surface(&self, surface: u32) -> Result<(), i64>;
}

/// VAAPI display/device association.
pub struct VaapiContext {
    driver: Arc<dyn VaDriver>,
    mappers: MapperCache,
}

impl VaapiContext {
    pub fn new(driver: Arc<dyn VaDriver>) -> Arc<Self> {
        Arc::new(Self { driver, mappers: MapperCache::new() })
    }

    pub fn driver(&self) -> &Arc<dyn VaDriver> {
        &self.driver
    }
}

impl Context for VaapiContext {
    fn memory_type(&self) -> MemoryType {
        MemoryType::Vaapi
    }

    fn handle(&self, key: HandleKey) -> Result<HandleValue, MemoryMapError> {
        match key {
            HandleKey::VaDisplay => Ok(self.driver.display()),
            _ => Err(MemoryMapError::HandleNotFound(key)),
        }
    }

    fn get_mapper(&self, input: Option<&ContextPtr>, output: &ContextPtr) -> Option<MapperPtr> {
        let pair = pair_of(input, output);
        if let Some(mapper) = self.mappers.lookup(pair) {
            return Some(mapper);
        }
        let built: MapperPtr = match pair {
            (MemoryType::Vaapi, MemoryType::Vaapi) => Arc::new(IdentityMapper::new(MemoryType::Vaapi)),
            (MemoryType::Vaapi, MemoryType::Dma) => {
                Arc::new(VaapiToDma::new(self.driver.clone(), output.clone()))
            }
            _ => return None,
        };
        log::debug!("vaapi context: created {:?} -> {:?} mapper", pair.0, pair.1);
        Some(self.mappers.attach(pair, built))
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

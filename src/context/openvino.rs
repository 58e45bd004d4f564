// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2026 framemap contributors

use super::{pair_of, Context, ContextPtr, MapperCache};
use crate::mappers::{IdentityMapper, MapperPtr, OpenVinoToCpu};
use crate::types::*;
use std::sync::Arc;

/// OpenVINO remote context. The handle is the opaque remote-context object
/// the inference backend created; tensor data flows out through the
/// OpenVino -> Cpu mapper's wait-on-read path.
pub struct OpenVinoContext {
    remote_context: HandleValue,
    mappers: MapperCache,
}

impl OpenVinoContext {
    pub fn new(remote_context: HandleValue) -> Arc<Self> {
        Arc::new(Self { remote_context, mappers: MapperCache::new() })
    }

    pub fn remote_context(&self) -> HandleValue {
        self.remote_context
    }
}

impl Context for OpenVinoContext {
    fn memory_type(&self) -> MemoryType {
        MemoryType::OpenVino
    }

    fn handle(&self, key: HandleKey) -> Result<HandleValue, MemoryMapError> {
        // The remote context is not part of the cross-component handle
        // registry; the inference backend reaches it via remote_context().
        Err(MemoryMapError::HandleNotFound(key))
    }

    fn get_mapper(&self, input: Option<&ContextPtr>, output: &ContextPtr) -> Option<MapperPtr> {
        let pair = pair_of(input, output);
        if let Some(mapper) = self.mappers.lookup(pair) {
            return Some(mapper);
        }
        let built: MapperPtr = match pair {
            (MemoryType::OpenVino, MemoryType::OpenVino) => {
                Arc::new(IdentityMapper::new(MemoryType::OpenVino))
            }
            (MemoryType::OpenVino, MemoryType::Cpu) => Arc::new(OpenVinoToCpu::new()),
            _ => return None,
        };
        log::debug!("openvino context: created {:?} -> {:?} mapper", pair.0, pair.1);
        Some(self.mappers.attach(pair, built))
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2026 framemap contributors

use super::{check_source, MemoryMapper};
use crate::tensor::{CpuTensor, Tensor, TensorInterface, TensorPtr};
use crate::types::*;
use std::sync::Arc;

/// CPU view of an inference-output tensor. The mapping itself never blocks;
/// the produced tensor's data() does, until the request completed. A reader
/// therefore cannot observe partially written inference output.
pub struct OpenVinoToCpu;

impl OpenVinoToCpu {
    pub fn new() -> Self {
        Self
    }
}

impl MemoryMapper for OpenVinoToCpu {
    fn input_type(&self) -> MemoryType {
        MemoryType::OpenVino
    }
    fn output_type(&self) -> MemoryType {
        MemoryType::Cpu
    }

    fn map_tensor(&self, src: &TensorPtr, _mode: AccessMode) -> Result<TensorPtr, MemoryMapError> {
        check_source(src, MemoryType::OpenVino, MemoryType::Cpu)?;
        let Tensor::OpenVino(ov) = &**src else {
            return Err(MemoryMapError::UnsupportedConversion {
                from: src.memory_type(),
                to: MemoryType::Cpu,
            });
        };
        // Device-resident remote tensors have no host pointer to view.
        let ptr = ov.host_ptr().ok_or(MemoryMapError::DirectAccessUnsupported(MemoryType::OpenVino))?;
        let view = unsafe { CpuTensor::view(ptr, ov.info().clone(), Some(src.clone()), None) }
            .with_ready(ov.request().clone());
        Ok(Arc::new(view.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::{OpenVinoTensor, RequestSync, TensorInfo};
    use parking_lot::{Condvar, Mutex};
    use std::time::Duration;

    /// Inference request double with controllable completion.
    struct FakeRequest {
        done: Mutex<bool>,
        signal: Condvar,
    }

    impl FakeRequest {
        fn new() -> Arc<Self> {
            Arc::new(Self { done: Mutex::new(false), signal: Condvar::new() })
        }
        fn complete(&self) {
            let mut done = self.done.lock();
            *done = true;
            self.signal.notify_all();
        }
    }

    impl RequestSync for FakeRequest {
        fn wait(&self) {
            let mut done = self.done.lock();
            while !*done {
                self.signal.wait(&mut done);
            }
        }
        fn is_ready(&self) -> bool {
            *self.done.lock()
        }
    }

    fn output_tensor(request: &Arc<FakeRequest>, backing: &mut [u8]) -> TensorPtr {
        let sync: Arc<dyn RequestSync> = request.clone();
        Arc::new(Tensor::from(OpenVinoTensor::new(
            TensorInfo::new(vec![backing.len()], DataType::U8),
            Some(backing.as_mut_ptr()),
            sync,
            None,
        )))
    }

    #[test]
    fn data_blocks_until_request_completes() {
        let request = FakeRequest::new();
        let mut backing = vec![0u8; 16];
        let src = output_tensor(&request, &mut backing);
        let mapped = OpenVinoToCpu::new().map_tensor(&src, AccessMode::Read).unwrap();
        assert!(!request.is_ready());

        let reader = {
            let mapped = mapped.clone();
            std::thread::spawn(move || {
                // blocks until complete() below
                mapped.data().unwrap() as usize
            })
        };
        // Give the reader a chance to reach the wait; it must not finish.
        std::thread::sleep(Duration::from_millis(50));
        assert!(!reader.is_finished());

        request.complete();
        let ptr = reader.join().unwrap();
        assert_eq!(ptr, backing.as_mut_ptr() as usize);
    }

    #[test]
    fn ready_requests_do_not_block() {
        let request = FakeRequest::new();
        request.complete();
        let mut backing = vec![3u8; 8];
        let src = output_tensor(&request, &mut backing);
        let mapped = OpenVinoToCpu::new().map_tensor(&src, AccessMode::Read).unwrap();
        assert_eq!(mapped.data().unwrap(), backing.as_mut_ptr());
        assert!(mapped.parent().is_some());
    }

    #[test]
    fn remote_tensor_without_host_pointer_is_rejected() {
        let request = FakeRequest::new();
        let sync: Arc<dyn RequestSync> = request.clone();
        let src: TensorPtr = Arc::new(Tensor::from(OpenVinoTensor::new(
            TensorInfo::new(vec![8], DataType::F32),
            None,
            sync,
            None,
        )));
        assert!(matches!(
            OpenVinoToCpu::new().map_tensor(&src, AccessMode::Read),
            Err(MemoryMapError::DirectAccessUnsupported(MemoryType::OpenVino))
        ));
    }
}

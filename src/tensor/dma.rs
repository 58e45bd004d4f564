// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2026 framemap contributors

use super::{TensorInfo, TensorInterface, TensorPtr};
use crate::context::ContextPtr;
use crate::types::*;

/// DMA-BUF backed tensor: a file descriptor referencing kernel memory shared
/// across devices, plus the DRM format modifier and the byte offset of this
/// plane inside the buffer.
///
/// Several plane tensors exported from one surface may reference the same fd.
/// Exactly one of them carries `take_ownership` and closes the fd on drop.
pub struct DmaTensor {
    info: TensorInfo,
    fd: i32,
    modifier: u64,
    offset: usize,
    take_ownership: bool,
    context: Option<ContextPtr>,
    parent: Option<TensorPtr>,
}

impl DmaTensor {
    pub fn new(
        info: TensorInfo,
        fd: i32,
        modifier: u64,
        offset: usize,
        take_ownership: bool,
    ) -> Self {
        Self { info, fd, modifier, offset, take_ownership, context: None, parent: None }
    }

    pub fn with_context(mut self, context: ContextPtr) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_parent(mut self, parent: TensorPtr) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn fd(&self) -> i32 {
        self.fd
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn takes_ownership(&self) -> bool {
        self.take_ownership
    }

    /// Duplicates the descriptor for callers that need an independently owned
    /// fd (e.g. device import APIs that close what they are given).
    pub fn dup(&self) -> Result<i32, MemoryMapError> {
        let fd = unsafe { libc::dup(self.fd) };
        if fd < 0 {
            return Err(MemoryMapError::DeviceOperationFailed {
                call: "dup",
                code: std::io::Error::last_os_error().raw_os_error().unwrap_or(-1) as i64,
            });
        }
        Ok(fd)
    }
}

impl TensorInterface for DmaTensor {
    fn memory_type(&self) -> MemoryType {
        MemoryType::Dma
    }
    fn info(&self) -> &TensorInfo {
        &self.info
    }
    fn context(&self) -> Option<&ContextPtr> {
        self.context.as_ref()
    }
    fn data(&self) -> Result<*mut u8, MemoryMapError> {
        Err(MemoryMapError::DirectAccessUnsupported(MemoryType::Dma))
    }
    fn handle(&self, key: HandleKey) -> Result<HandleValue, MemoryMapError> {
        match key {
            HandleKey::DmaFd => Ok(self.fd as HandleValue),
            HandleKey::DrmModifier => Ok(self.modifier as HandleValue),
            HandleKey::Offset => Ok(self.offset as HandleValue),
            _ => Err(MemoryMapError::HandleNotFound(key)),
        }
    }
    fn parent(&self) -> Option<&TensorPtr> {
        self.parent.as_ref()
    }
}

impl Drop for DmaTensor {
    fn drop(&mut self) {
        if self.take_ownership && self.fd >= 0 {
            // Must not panic out of a destructor; report and continue.
            if unsafe { libc::close(self.fd) } != 0 {
                log::error!("closing dma fd {} failed: {}", self.fd, std::io::Error::last_os_error());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fd_is_open(fd: i32) -> bool {
        unsafe { libc::fcntl(fd, libc::F_GETFD) != -1 }
    }

    #[test]
    fn owning_tensor_closes_fd_once() {
        let fd = unsafe { libc::dup(0) };
        assert!(fd >= 0);
        let info = TensorInfo::new(vec![4, 4], DataType::U8);
        {
            let _owner = DmaTensor::new(info.clone(), fd, 0, 0, true);
            let _alias = DmaTensor::new(info.clone(), fd, 0, 16, false);
            assert!(fd_is_open(fd));
            // alias drops first, fd must survive it
            drop(_alias);
            assert!(fd_is_open(fd));
        }
        assert!(!fd_is_open(fd));
    }

    #[test]
    fn non_owning_tensor_leaves_fd_open() {
        let fd = unsafe { libc::dup(0) };
        assert!(fd >= 0);
        {
            let _t = DmaTensor::new(TensorInfo::new(vec![4], DataType::U8), fd, 0, 0, false);
        }
        assert!(fd_is_open(fd));
        unsafe { libc::close(fd) };
    }

    #[test]
    fn dma_handles() {
        let t = DmaTensor::new(TensorInfo::new(vec![4], DataType::U8), -1, 42, 128, false);
        assert_eq!(t.handle(HandleKey::DrmModifier).unwrap(), 42);
        assert_eq!(t.handle(HandleKey::Offset).unwrap(), 128);
        assert!(t.data().is_err());
        assert!(t.handle(HandleKey::ClMem).is_err());
    }
}

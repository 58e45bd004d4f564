// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2026 framemap contributors

use crate::context::ZeDriver;
use crate::types::HandleValue;
use std::ffi::c_void;

pub const ZE_RESULT_SUCCESS: i32 = 0;
const ZE_STRUCTURE_TYPE_DEVICE_MEM_ALLOC_DESC: u32 = 0xb;
const ZE_STRUCTURE_TYPE_EXTERNAL_MEMORY_IMPORT_FD: u32 = 0x0010_0003;
const ZE_EXTERNAL_MEMORY_TYPE_FLAG_DMA_BUF: u32 = 1 << 1;

#[repr(C)]
struct ZeDeviceMemAllocDesc {
    stype: u32,
    p_next: *const c_void,
    flags: u32,
    ordinal: u32,
}

#[repr(C)]
struct ZeExternalMemoryImportFd {
    stype: u32,
    p_next: *const c_void,
    flags: u32,
    fd: i32,
}

unsafe extern "C" {
    fn zeMemAllocDevice(
        context: *mut c_void,
        device_desc: *const ZeDeviceMemAllocDesc,
        size: usize,
        alignment: usize,
        device: *mut c_void,
        pptr: *mut *mut c_void,
    ) -> i32;
    fn zeMemFree(context: *mut c_void, ptr: *mut c_void) -> i32;
}

/// Level-Zero-backed driver for a device/context pair the application created.
pub struct NativeZeDriver {
    device: *mut c_void,
    context: *mut c_void,
}

unsafe impl Send for NativeZeDriver {}
unsafe impl Sync for NativeZeDriver {}

impl NativeZeDriver {
    /// Both handles stay owned by the caller and must outlive the driver.
    pub unsafe fn new(device: *mut c_void, context: *mut c_void) -> Self {
        Self { device, context }
    }

    fn alloc(&self, size: usize, import: Option<&ZeExternalMemoryImportFd>) -> Result<*mut u8, i64> {
        let desc = ZeDeviceMemAllocDesc {
            stype: ZE_STRUCTURE_TYPE_DEVICE_MEM_ALLOC_DESC,
            p_next: import.map_or(std::ptr::null(), |i| i as *const _ as *const c_void),
            flags: 0,
            ordinal: 0,
        };
        let mut ptr: *mut c_void = std::ptr::null_mut();
        let status = unsafe { zeMemAllocDevice(self.context, &desc, size, 4096, self.device, &mut ptr) };
        if status != ZE_RESULT_SUCCESS || ptr.is_null() {
            return Err(status as i64);
        }
        Ok(ptr as *mut u8)
    }
}

impl ZeDriver for NativeZeDriver {
    fn device_handle(&self) -> HandleValue {
        self.device as HandleValue
    }

    fn context_handle(&self) -> HandleValue {
        self.context as HandleValue
    }

    fn alloc_device(&self, size: usize) -> Result<*mut u8, i64> {
        self.alloc(size, None)
    }

    fn import_dma(&self, fd: i32, size: usize) -> Result<*mut u8, i64> {
        let import = ZeExternalMemoryImportFd {
            stype: ZE_STRUCTURE_TYPE_EXTERNAL_MEMORY_IMPORT_FD,
            p_next: std::ptr::null(),
            flags: ZE_EXTERNAL_MEMORY_TYPE_FLAG_DMA_BUF,
            fd,
        };
        self.alloc(size, Some(&import))
    }

    fn free(&self, ptr: *mut u8) -> Result<(), i64> {
        let status = unsafe { zeMemFree(self.context, ptr as *mut c_void) };
        if status != ZE_RESULT_SUCCESS {
            return Err(status as i64);
        }
        Ok(())
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2026 framemap contributors

use crate::context::ClDriver;
use crate::types::HandleValue;
use std::ffi::c_void;

pub const CL_SUCCESS: i32 = 0;
const CL_MEM_READ_WRITE: u64 = 1 << 0;
// cl_intel_mem_alloc_buffer_location / external memory introspection
const CL_MEM_ALLOCATION_HANDLE_INTEL: u32 = 0x10050;

unsafe extern "C" {
    fn clCreateBuffer(
        context: *mut c_void,
        flags: u64,
        size: usize,
        host_ptr: *mut c_void,
        errcode_ret: *mut i32,
    ) -> *mut c_void;
    fn clReleaseMemObject(memobj: *mut c_void) -> i32;
    fn clGetMemObjectInfo(
        memobj: *mut c_void,
        param_name: u32,
        param_value_size: usize,
        param_value: *mut c_void,
        param_value_size_ret: *mut usize,
    ) -> i32;
}

/// OpenCL-backed driver for a context/queue pair the application created.
pub struct NativeClDriver {
    context: *mut c_void,
    queue: *mut c_void,
}

unsafe impl Send for NativeClDriver {}
unsafe impl Sync for NativeClDriver {}

impl NativeClDriver {
    /// Both handles stay owned by the caller and must outlive the driver.
    pub unsafe fn new(context: *mut c_void, queue: *mut c_void) -> Self {
        Self { context, queue }
    }
}

impl ClDriver for NativeClDriver {
    fn context_handle(&self) -> HandleValue {
        self.context as HandleValue
    }

    fn queue_handle(&self) -> HandleValue {
        self.queue as HandleValue
    }

    fn create_buffer(&self, size: usize) -> Result<HandleValue, i64> {
        let mut status = CL_SUCCESS;
        let mem = unsafe {
            clCreateBuffer(self.context, CL_MEM_READ_WRITE, size, std::ptr::null_mut(), &mut status)
        };
        if status != CL_SUCCESS || mem.is_null() {
            return Err(status as i64);
        }
        Ok(mem as HandleValue)
    }

    fn release_mem(&self, mem: HandleValue) -> Result<(), i64> {
        let status = unsafe { clReleaseMemObject(mem as *mut c_void) };
        if status != CL_SUCCESS {
            return Err(status as i64);
        }
        Ok(())
    }

    fn mem_to_dma_fd(&self, mem: HandleValue) -> Result<i32, i64> {
        let mut fd: u64 = 0;
        let status = unsafe {
            clGetMemObjectInfo(
                mem as *mut c_void,
                CL_MEM_ALLOCATION_HANDLE_INTEL,
                std::mem::size_of::<u64>(),
                &mut fd as *mut u64 as *mut c_void,
                std::ptr::null_mut(),
            )
        };
        if status != CL_SUCCESS {
            return Err(status as i64);
        }
        Ok(fd as i32)
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2026 framemap contributors

use crate::context::{DrmPrimeDescriptor, DrmPrimeLayer, DrmPrimeObject, VaDriver};
use crate::types::HandleValue;
use std::ffi::c_void;

pub const VA_STATUS_SUCCESS: i32 = 0;
const VA_SURFACE_ATTRIB_MEM_TYPE_DRM_PRIME_2: u32 = 0x4000_0000;
const VA_EXPORT_SURFACE_READ_WRITE: u32 = 0x0003;
const VA_EXPORT_SURFACE_SEPARATE_LAYERS: u32 = 0x0004;

#[repr(C)]
#[derive(Clone, Copy)]
struct VADRMPRIMEObject {
    fd: i32,
    size: u32,
    drm_format_modifier: u64,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct VADRMPRIMELayer {
    drm_format: u32,
    num_planes: u32,
    object_index: [u32; 4],
    offset: [u32; 4],
    pitch: [u32; 4],
}

#[repr(C)]
struct VADRMPRIMESurfaceDescriptor {
    fourcc: u32,
    width: u32,
    height: u32,
    num_objects: u32,
    objects: [VADRMPRIMEObject; 4],
    num_layers: u32,
    layers: [VADRMPRIMELayer; 4],
}

unsafe extern "C" {
    fn vaExportSurfaceHandle(
        dpy: *mut c_void,
        surface_id: u32,
        mem_type: u32,
        flags: u32,
        descriptor: *mut c_void,
    ) -> i32;
    fn vaSyncSurface(dpy: *mut c_void, render_target: u32) -> i32;
}

/// libva-backed driver for a VADisplay the application opened.
pub struct NativeVaDriver {
    display: *mut c_void,
}

unsafe impl Send for NativeVaDriver {}
unsafe impl Sync for NativeVaDriver {}

impl NativeVaDriver {
    /// The display stays owned by the caller and must outlive the driver.
    pub unsafe fn new(display: *mut c_void) -> Self {
        Self { display }
    }
}

impl VaDriver for NativeVaDriver {
    fn display(&self) -> HandleValue {
        self.display as HandleValue
    }

    fn export_surface(&self, surface: u32) -> Result<DrmPrimeDescriptor, i64> {
        let mut desc = unsafe { std::mem::zeroed::<VADRMPRIMESurfaceDescriptor>() };
        let status = unsafe {
            vaExportSurfaceHandle(
                self.display,
                surface,
                VA_SURFACE_ATTRIB_MEM_TYPE_DRM_PRIME_2,
                VA_EXPORT_SURFACE_READ_WRITE | VA_EXPORT_SURFACE_SEPARATE_LAYERS,
                &mut desc as *mut _ as *mut c_void,
            )
        };
        if status != VA_STATUS_SUCCESS {
            return Err(status as i64);
        }

        let objects = desc.objects[..desc.num_objects as usize]
            .iter()
            .map(|o| DrmPrimeObject { fd: o.fd, size: o.size as usize, modifier: o.drm_format_modifier })
            .collect();
        // With separate layers each layer carries exactly one plane.
        let layers = desc.layers[..desc.num_layers as usize]
            .iter()
            .map(|l| DrmPrimeLayer {
                object_index: l.object_index[0] as usize,
                offset: l.offset[0] as usize,
                pitch: l.pitch[0] as usize,
            })
            .collect();
        Ok(DrmPrimeDescriptor { objects, layers })
    }

    fn sync_surface(&self, surface: u32) -> Result<(), i64> {
        let status = unsafe { vaSyncSurface(self.display, surface) };
        if status != VA_STATUS_SUCCESS {
            return Err(status as i64);
        }
        Ok(())
    }
}

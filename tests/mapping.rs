// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2026 framemap contributors

use framemap::*;
use parking_lot::Mutex;
use std::sync::Arc;

struct FakeVaDriver {
    fd: i32,
}

impl FakeVaDriver {
    fn new() -> Self {
        let fd = unsafe { libc::dup(0) };
        assert!(fd >= 0);
        Self { fd }
    }
}

impl VaDriver for FakeVaDriver {
    fn display(&self) -> HandleValue {
        0xd15
    }
    fn export_surface(&self, _surface: u32) -> Result<DrmPrimeDescriptor, i64> {
        Ok(DrmPrimeDescriptor {
            objects: vec![DrmPrimeObject { fd: self.fd, size: 0x30000, modifier: 0 }],
            layers: vec![
                DrmPrimeLayer { object_index: 0, offset: 0, pitch: 640 },
                DrmPrimeLayer { object_index: 0, offset: 0x20000, pitch: 640 },
            ],
        })
    }
    fn sync_surface(&self, _surface: u32) -> Result<(), i64> {
        Ok(())
    }
}

struct FakeZeDriver {
    imports: Mutex<usize>,
}

impl ZeDriver for FakeZeDriver {
    fn device_handle(&self) -> HandleValue { 0x1 }
    fn context_handle(&self) -> HandleValue { 0x2 }
    fn alloc_device(&self, _size: usize) -> Result<*mut u8, i64> {
        Err(-1)
    }
    fn import_dma(&self, _fd: i32, _size: usize) -> Result<*mut u8, i64> {
        *self.imports.lock() += 1;
        Ok(0x5000_0000usize as *mut u8)
    }
    fn free(&self, _ptr: *mut u8) -> Result<(), i64> {
        Ok(())
    }
}

fn nv12_surface_frame(context: &ContextPtr) -> FramePtr {
    let tensors = vec![
        Arc::new(Tensor::from(VaapiTensor::new(
            TensorInfo::new(vec![480, 640], DataType::U8), 11, 0, context.clone(),
        ))) as TensorPtr,
        Arc::new(Tensor::from(VaapiTensor::new(
            TensorInfo::new(vec![240, 640], DataType::U8), 11, 1, context.clone(),
        ))) as TensorPtr,
    ];
    Arc::new(Frame::new(MediaType::Video, Some(ImageFormat::NV12), tensors))
}

#[test]
fn two_hop_chain_vaapi_to_usm() {
    let va_driver = Arc::new(FakeVaDriver::new());
    let ze_driver = Arc::new(FakeZeDriver { imports: Mutex::new(0) });
    let vaapi = VaapiContext::new(va_driver);
    let level_zero = LevelZeroContext::new(ze_driver.clone());
    let vaapi_ctx: ContextPtr = vaapi.clone();
    let dma_ctx: ContextPtr = DmaContext::new();
    let usm_ctx: ContextPtr = level_zero.clone();

    // One hop per mapper; the two hops are composed explicitly.
    let to_dma = vaapi.get_mapper(Some(&vaapi_ctx), &dma_ctx).expect("vaapi->dma");
    let to_usm = level_zero.get_mapper(Some(&dma_ctx), &usm_ctx).expect("dma->usm");
    let chain = MapperChain::new(vec![to_dma, to_usm]);
    assert_eq!(chain.input_type(), MemoryType::Vaapi);
    assert_eq!(chain.output_type(), MemoryType::Usm);

    let frame = nv12_surface_frame(&vaapi_ctx);
    let mapped = chain.map_frame(&frame, AccessMode::Read).unwrap();
    assert_eq!(mapped.memory_type(), MemoryType::Usm);
    assert_eq!(mapped.num_tensors(), 2);
    assert_eq!(*ze_driver.imports.lock(), 2);

    // chroma plane sits at its layer offset inside the imported allocation
    let uv = mapped.tensor(1).unwrap();
    assert_eq!(uv.data().unwrap() as usize, 0x5000_0000 + 0x20000);

    // parent chain reaches back to the vaapi source
    let mut depth = 0;
    let mut cursor = uv.clone();
    while let Some(parent) = cursor.parent().cloned() {
        cursor = parent;
        depth += 1;
    }
    assert!(depth >= 2);
    assert_eq!(cursor.memory_type(), MemoryType::Vaapi);
}

#[test]
fn map_to_resolves_and_fails_closed() {
    let cpu_ctx: ContextPtr = CpuContext::new();
    let tensor: TensorPtr = Arc::new(
        CpuTensor::alloc(TensorInfo::new(vec![32, 32, 3], DataType::U8)).unwrap().into(),
    );

    // resolution through the output context
    let mapped = tensor.map_to(&cpu_ctx, AccessMode::Read).unwrap();
    assert_eq!(mapped.memory_type(), MemoryType::Cpu);

    // no path: cpu tensor into a vaapi context
    struct NoopVa;
    impl VaDriver for NoopVa {
        fn display(&self) -> HandleValue { 0 }
        fn export_surface(&self, _s: u32) -> Result<DrmPrimeDescriptor, i64> { Err(-1) }
        fn sync_surface(&self, _s: u32) -> Result<(), i64> { Ok(()) }
    }
    let vaapi_ctx: ContextPtr = VaapiContext::new(Arc::new(NoopVa));
    assert!(vaapi_ctx.get_mapper(None, &vaapi_ctx).is_none());
    assert!(matches!(
        tensor.map_to(&vaapi_ctx, AccessMode::Read),
        Err(MemoryMapError::UnsupportedConversion { from: MemoryType::Cpu, to: MemoryType::Vaapi })
    ));
}

#[test]
fn frame_map_to_cpu_view_of_host_buffer() {
    let mut backing = vec![9u8; 64 * 64];
    let host_ctx: ContextPtr = HostBufferContext::new();
    let cpu_ctx: ContextPtr = CpuContext::new();

    let tensor: TensorPtr = Arc::new(Tensor::from(
        HostBufferTensor::new(
            TensorInfo::new(vec![64, 64], DataType::U8),
            Some(backing.as_mut_ptr()),
            None,
        )
        .with_context(host_ctx.clone()),
    ));
    let frame: FramePtr = Arc::new(Frame::new(MediaType::Video, None, vec![tensor]));

    let mapped = frame.map_to(&cpu_ctx, AccessMode::Read).unwrap();
    assert_eq!(mapped.memory_type(), MemoryType::Cpu);
    assert_eq!(mapped.tensor(0).unwrap().data().unwrap(), backing.as_mut_ptr());
    assert!(mapped.parent().is_some());
}

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2026 framemap contributors

use crate::frame::{Frame, FrameInfo, FramePtr};
use crate::tensor::{CpuTensor, TensorInfo, TensorInterface, TensorPtr};
use crate::types::*;
use std::collections::HashMap;
use std::sync::Arc;

/// Common contract of all pipeline stages.
pub trait Element: Send {
    fn name(&self) -> &'static str;
}

/// Produces frames. Output FrameInfo is negotiated before data flows.
pub trait Source: Element {
    fn set_output_info(&mut self, info: FrameInfo) -> Result<(), MemoryMapError>;
    fn get_output_info(&self) -> Option<&FrameInfo>;
    /// `None` signals end of stream.
    fn read(&mut self) -> Result<Option<FramePtr>, MemoryMapError>;
}

/// Consumes frames, produces frames. Errors are fatal to the frame being
/// processed and propagate to the caller; the core never retries.
pub trait Transform: Element {
    fn set_input_info(&mut self, info: FrameInfo) -> Result<(), MemoryMapError>;
    fn get_input_info(&self) -> Option<&FrameInfo>;
    fn set_output_info(&mut self, info: FrameInfo) -> Result<(), MemoryMapError>;
    fn get_output_info(&self) -> Option<&FrameInfo>;
    fn process(&mut self, src: FramePtr) -> Result<FramePtr, MemoryMapError>;
}

/// Consumes frames.
pub trait Sink: Element {
    fn set_input_info(&mut self, info: FrameInfo) -> Result<(), MemoryMapError>;
    fn get_input_info(&self) -> Option<&FrameInfo>;
    fn write(&mut self, frame: FramePtr) -> Result<(), MemoryMapError>;
}

pub enum ElementBox {
    Source(Box<dyn Source>),
    Transform(Box<dyn Transform>),
    Sink(Box<dyn Sink>),
}

pub type ElementFactory = fn(&HashMap<String, String>) -> Result<ElementBox, MemoryMapError>;

/// Explicit element registry populated at startup. Replaces dynamic library
/// loading: every available element is a (name, factory) row in this table,
/// and the catalog's lifetime bounds theirs.
pub struct ElementCatalog {
    factories: HashMap<&'static str, ElementFactory>,
}

impl ElementCatalog {
    pub fn new() -> Self {
        Self { factories: HashMap::new() }
    }

    /// The elements this crate ships.
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        catalog.register("raw_video_source", RawVideoSource::create);
        catalog.register("tensor_normalize", NormalizeTransform::create);
        catalog.register("null_sink", NullSink::create);
        catalog
    }

    pub fn register(&mut self, name: &'static str, factory: ElementFactory) {
        self.factories.insert(name, factory);
    }

    pub fn create(&self, name: &str, params: &HashMap<String, String>) -> Result<ElementBox, MemoryMapError> {
        let factory = self.factories.get(name).ok_or_else(|| MemoryMapError::ElementNotFound(name.to_string()))?;
        factory(params)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.factories.keys().copied()
    }
}

impl Default for ElementCatalog {
    fn default() -> Self {
        Self::with_builtins()
    }
}

fn parse_param(params: &HashMap<String, String>, key: &str, default: usize) -> Result<usize, MemoryMapError> {
    match params.get(key) {
        None => Ok(default),
        Some(v) => v.parse().map_err(|_| {
            MemoryMapError::InvalidParameter(format!("{key}: {v:?} is not a number"))
        }),
    }
}

/// Generates NV12 frames in CPU memory with a ramp fill. Parameters:
/// `width`, `height`, `count`.
pub struct RawVideoSource {
    info: FrameInfo,
    remaining: usize,
    produced: usize,
}

impl RawVideoSource {
    fn create(params: &HashMap<String, String>) -> Result<ElementBox, MemoryMapError> {
        let width = parse_param(params, "width", 640)?;
        let height = parse_param(params, "height", 480)?;
        let count = parse_param(params, "count", 10)?;
        let info = FrameInfo::new(
            vec![
                TensorInfo::new(vec![height, width], DataType::U8),
                TensorInfo::new(vec![height.div_ceil(2), width], DataType::U8),
            ],
            MediaType::Video,
            Some(ImageFormat::NV12),
        );
        info.validate()?;
        Ok(ElementBox::Source(Box::new(Self { info, remaining: count, produced: 0 })))
    }
}

impl Element for RawVideoSource {
    fn name(&self) -> &'static str {
        "raw_video_source"
    }
}

impl Source for RawVideoSource {
    fn set_output_info(&mut self, info: FrameInfo) -> Result<(), MemoryMapError> {
        info.validate()?;
        self.info = info;
        Ok(())
    }

    fn get_output_info(&self) -> Option<&FrameInfo> {
        Some(&self.info)
    }

    fn read(&mut self) -> Result<Option<FramePtr>, MemoryMapError> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        let seed = self.produced as u8;
        self.produced += 1;

        let mut tensors: Vec<TensorPtr> = Vec::with_capacity(self.info.tensors.len());
        for plane_info in &self.info.tensors {
            let mut tensor = CpuTensor::alloc(plane_info.clone())?;
            for (i, byte) in tensor.bytes_mut().iter_mut().enumerate() {
                *byte = seed.wrapping_add(i as u8);
            }
            tensors.push(Arc::new(tensor.into()));
        }
        Ok(Some(Arc::new(Frame::new(self.info.media_type, self.info.format, tensors))))
    }
}

/// Scales u8 tensors into f32 in [0, 1]. The canonical pre-processing step in
/// front of an inference backend.
pub struct NormalizeTransform {
    scale: f32,
    input_info: Option<FrameInfo>,
    output_info: Option<FrameInfo>,
}

impl NormalizeTransform {
    fn create(params: &HashMap<String, String>) -> Result<ElementBox, MemoryMapError> {
        let scale = match params.get("scale") {
            None => 1.0 / 255.0,
            Some(v) => v.parse().map_err(|_| {
                MemoryMapError::InvalidParameter(format!("scale: {v:?} is not a number"))
            })?,
        };
        Ok(ElementBox::Transform(Box::new(Self { scale, input_info: None, output_info: None })))
    }

    fn derive_output(info: &FrameInfo) -> Result<FrameInfo, MemoryMapError> {
        for tensor in &info.tensors {
            if tensor.dtype != DataType::U8 {
                return Err(MemoryMapError::UnsupportedDataType {
                    dtype: tensor.dtype,
                    target: "tensor_normalize",
                });
            }
            if !tensor.is_contiguous() {
                return Err(MemoryMapError::InvalidFrameInfo(
                    "tensor_normalize requires contiguous input planes".into(),
                ));
            }
        }
        Ok(FrameInfo::new(
            info.tensors.iter()
                .map(|t| TensorInfo::new(t.shape.clone(), DataType::F32))
                .collect(),
            MediaType::Tensors,
            None,
        ))
    }
}

impl Element for NormalizeTransform {
    fn name(&self) -> &'static str {
        "tensor_normalize"
    }
}

impl Transform for NormalizeTransform {
    fn set_input_info(&mut self, info: FrameInfo) -> Result<(), MemoryMapError> {
        info.validate()?;
        self.output_info = Some(Self::derive_output(&info)?);
        self.input_info = Some(info);
        Ok(())
    }

    fn get_input_info(&self) -> Option<&FrameInfo> {
        self.input_info.as_ref()
    }

    fn set_output_info(&mut self, info: FrameInfo) -> Result<(), MemoryMapError> {
        match &self.output_info {
            Some(derived) if *derived != info => Err(MemoryMapError::InvalidFrameInfo(
                "tensor_normalize output info is derived from its input".into(),
            )),
            _ => {
                self.output_info = Some(info);
                Ok(())
            }
        }
    }

    fn get_output_info(&self) -> Option<&FrameInfo> {
        self.output_info.as_ref()
    }

    fn process(&mut self, src: FramePtr) -> Result<FramePtr, MemoryMapError> {
        let mut outputs: Vec<TensorPtr> = Vec::with_capacity(src.num_tensors());
        for tensor in src.tensors() {
            let info = tensor.info();
            if info.dtype != DataType::U8 {
                return Err(MemoryMapError::UnsupportedDataType {
                    dtype: info.dtype,
                    target: "tensor_normalize",
                });
            }
            if !info.is_contiguous() {
                return Err(MemoryMapError::InvalidFrameInfo(
                    "tensor_normalize requires contiguous input planes".into(),
                ));
            }
            let count = info.size();
            let input = tensor.data()?;
            let mut out = CpuTensor::alloc(TensorInfo::new(info.shape.clone(), DataType::F32))?;
            {
                let out_bytes = out.bytes_mut();
                for i in 0..count {
                    let value = unsafe { *input.add(i) } as f32 * self.scale;
                    out_bytes[i * 4..i * 4 + 4].copy_from_slice(&value.to_ne_bytes());
                }
            }
            outputs.push(Arc::new(out.into()));
        }
        Ok(Arc::new(Frame::new(MediaType::Tensors, None, outputs).with_parent(src)))
    }
}

/// Swallows frames and keeps counters; the tail stage of test pipelines.
pub struct NullSink {
    input_info: Option<FrameInfo>,
    frames: usize,
    tensors: usize,
}

impl NullSink {
    fn create(_params: &HashMap<String, String>) -> Result<ElementBox, MemoryMapError> {
        Ok(ElementBox::Sink(Box::new(Self { input_info: None, frames: 0, tensors: 0 })))
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn tensors(&self) -> usize {
        self.tensors
    }
}

impl Element for NullSink {
    fn name(&self) -> &'static str {
        "null_sink"
    }
}

impl Sink for NullSink {
    fn set_input_info(&mut self, info: FrameInfo) -> Result<(), MemoryMapError> {
        info.validate()?;
        self.input_info = Some(info);
        Ok(())
    }

    fn get_input_info(&self) -> Option<&FrameInfo> {
        self.input_info.as_ref()
    }

    fn write(&mut self, frame: FramePtr) -> Result<(), MemoryMapError> {
        self.frames += 1;
        self.tensors += frame.num_tensors();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn catalog_creates_registered_elements() {
        let catalog = ElementCatalog::with_builtins();
        assert!(catalog.create("raw_video_source", &params(&[])).is_ok());
        assert!(matches!(
            catalog.create("no_such_element", &params(&[])),
            Err(MemoryMapError::ElementNotFound(_))
        ));
    }

    #[test]
    fn source_negotiates_and_produces() {
        let ElementBox::Source(mut source) = ElementCatalog::with_builtins()
            .create("raw_video_source", &params(&[("width", "64"), ("height", "32"), ("count", "2")]))
            .unwrap()
        else {
            panic!("raw_video_source must be a source");
        };

        let info = source.get_output_info().unwrap().clone();
        assert_eq!(info.format, Some(ImageFormat::NV12));
        assert_eq!(info.tensors[0].shape, vec![32, 64]);

        let frame = source.read().unwrap().unwrap();
        assert_eq!(frame.num_tensors(), 2);
        assert!(source.read().unwrap().is_some());
        assert!(source.read().unwrap().is_none());
    }

    #[test]
    fn normalize_scales_u8_to_f32() {
        let ElementBox::Transform(mut transform) = ElementCatalog::with_builtins()
            .create("tensor_normalize", &params(&[]))
            .unwrap()
        else {
            panic!("tensor_normalize must be a transform");
        };

        let input_info = FrameInfo::new(
            vec![TensorInfo::new(vec![2, 4], DataType::U8)],
            MediaType::Video,
            None,
        );
        transform.set_input_info(input_info).unwrap();
        let out_info = transform.get_output_info().unwrap();
        assert_eq!(out_info.tensors[0].dtype, DataType::F32);
        assert_eq!(out_info.media_type, MediaType::Tensors);

        let mut tensor = CpuTensor::alloc(TensorInfo::new(vec![2, 4], DataType::U8)).unwrap();
        tensor.bytes_mut().copy_from_slice(&[0, 51, 102, 153, 204, 255, 0, 255]);
        let frame = Arc::new(Frame::new(MediaType::Video, None, vec![Arc::new(tensor.into())]));

        let out = transform.process(frame).unwrap();
        let out_bytes = match &*out.tensor(0).unwrap().clone() {
            crate::tensor::Tensor::Cpu(t) => t.bytes().to_vec(),
            _ => panic!("normalize output must be cpu memory"),
        };
        let as_f32: Vec<f32> = out_bytes.chunks_exact(4)
            .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert!((as_f32[1] - 0.2).abs() < 1e-6);
        assert!((as_f32[5] - 1.0).abs() < 1e-6);
        assert!(out.parent().is_some());
    }

    #[test]
    fn normalize_rejects_non_u8_negotiation() {
        let ElementBox::Transform(mut transform) = ElementCatalog::with_builtins()
            .create("tensor_normalize", &params(&[]))
            .unwrap()
        else {
            unreachable!()
        };
        let bad = FrameInfo::new(
            vec![TensorInfo::new(vec![2, 4], DataType::I64)],
            MediaType::Tensors,
            None,
        );
        assert!(matches!(
            transform.set_input_info(bad),
            Err(MemoryMapError::UnsupportedDataType { dtype: DataType::I64, .. })
        ));
    }

    #[test]
    fn pipeline_end_to_end() {
        let catalog = ElementCatalog::with_builtins();
        let p = params(&[("width", "32"), ("height", "16"), ("count", "3")]);
        let ElementBox::Source(mut source) = catalog.create("raw_video_source", &p).unwrap() else { unreachable!() };
        let ElementBox::Transform(mut transform) = catalog.create("tensor_normalize", &params(&[])).unwrap() else { unreachable!() };
        let ElementBox::Sink(mut sink) = catalog.create("null_sink", &params(&[])).unwrap() else { unreachable!() };

        let src_info = source.get_output_info().unwrap().clone();
        transform.set_input_info(src_info.clone()).unwrap();
        sink.set_input_info(transform.get_output_info().unwrap().clone()).unwrap();

        let mut frames = 0;
        while let Some(frame) = source.read().unwrap() {
            let out = transform.process(frame).unwrap();
            sink.write(out).unwrap();
            frames += 1;
        }
        assert_eq!(frames, 3);
    }
}

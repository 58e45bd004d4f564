// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2026 framemap contributors

use crate::types::*;

/// Shape, per-dimension byte strides and element type of one tensor.
/// Strides may describe padded layouts, e.g. decoder output with row padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorInfo {
    pub shape: Vec<usize>,
    pub stride: Vec<usize>,
    pub dtype: DataType,
}

impl TensorInfo {
    /// Dense row-major strides.
    pub fn new(shape: Vec<usize>, dtype: DataType) -> Self {
        let stride = contiguous_strides(&shape, dtype);
        Self { shape, stride, dtype }
    }

    /// Explicit strides, one byte stride per dimension.
    pub fn with_strides(shape: Vec<usize>, stride: Vec<usize>, dtype: DataType) -> Self {
        assert_eq!(shape.len(), stride.len(), "stride count must match shape count");
        Self { shape, stride, dtype }
    }

    pub fn itemsize(&self) -> usize {
        self.dtype.size()
    }

    /// Number of elements.
    pub fn size(&self) -> usize {
        self.shape.iter().product()
    }

    /// Total byte extent of the described region. Correct for padded layouts:
    /// the widest dimension span wins.
    pub fn nbytes(&self) -> usize {
        self.shape.iter().zip(&self.stride)
            .map(|(&s, &st)| s * st)
            .max()
            .unwrap_or(0)
    }

    pub fn is_contiguous(&self) -> bool {
        self.stride == contiguous_strides(&self.shape, self.dtype)
    }

    /// Drops leading dimensions of size 1 together with their strides,
    /// stopping at the first dimension whose size is not 1.
    pub fn squeeze(&self) -> TensorInfo {
        let skip = self.shape.iter().take_while(|&&d| d == 1).count();
        TensorInfo {
            shape: self.shape[skip..].to_vec(),
            stride: self.stride[skip..].to_vec(),
            dtype: self.dtype,
        }
    }
}

fn contiguous_strides(shape: &[usize], dtype: DataType) -> Vec<usize> {
    let mut stride = vec![0usize; shape.len()];
    let mut acc = dtype.size();
    for i in (0..shape.len()).rev() {
        stride[i] = acc;
        acc *= shape[i];
    }
    stride
}

/// Image-oriented view over a TensorInfo: axis lookup via the inferred layout.
pub struct ImageInfo<'a> {
    info: &'a TensorInfo,
    layout: ImageLayout,
}

impl<'a> ImageInfo<'a> {
    pub fn new(info: &'a TensorInfo) -> Self {
        let layout = ImageLayout::from_shape(&info.shape);
        Self { info, layout }
    }

    pub fn layout(&self) -> ImageLayout {
        self.layout
    }
    pub fn width(&self) -> Option<usize> {
        self.layout.w_position().map(|p| self.info.shape[p])
    }
    pub fn height(&self) -> Option<usize> {
        self.layout.h_position().map(|p| self.info.shape[p])
    }
    pub fn channels(&self) -> usize {
        self.layout.c_position().map_or(1, |p| self.info.shape[p])
    }
    pub fn batch(&self) -> usize {
        self.layout.n_position().map_or(1, |p| self.info.shape[p])
    }
    /// Bytes to advance one row down.
    pub fn row_stride(&self) -> Option<usize> {
        self.layout.h_position().map(|p| self.info.stride[p])
    }
    /// Bytes to advance one pixel right.
    pub fn pixel_stride(&self) -> Option<usize> {
        self.layout.w_position().map(|p| self.info.stride[p])
    }
}

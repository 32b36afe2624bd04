//! Raster containers
//!
//! `Raster` owns contiguous, row-major samples. `RasterView` borrows a
//! strided buffer (decoder planes, padded rows) whose layout is validated
//! once when the view is built, so row access never re-derives offsets.

use crate::depth_pipeline::common::error::{ConversionError, Result};

/// Owned width x height grid with `channels` interleaved samples per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster<T> {
    width: usize,
    height: usize,
    channels: usize,
    data: Vec<T>,
}

impl<T: Copy + Default> Raster<T> {
    pub fn new(width: usize, height: usize, channels: usize) -> Self {
        Self::filled(width, height, channels, T::default())
    }

    pub fn filled(width: usize, height: usize, channels: usize, value: T) -> Self {
        Self {
            width,
            height,
            channels,
            data: vec![value; width * height * channels],
        }
    }

    pub fn from_vec(width: usize, height: usize, channels: usize, data: Vec<T>) -> Result<Self> {
        if channels == 0 || data.len() != width * height * channels {
            return Err(ConversionError::InvalidDimensions(width, height));
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// Copies a strided view into a tightly packed raster.
    pub fn from_view(view: &RasterView<'_, T>) -> Self {
        let mut data = Vec::with_capacity(view.width() * view.height() * view.channels());
        for y in 0..view.height() {
            data.extend_from_slice(view.row(y));
        }
        Self {
            width: view.width(),
            height: view.height(),
            channels: view.channels(),
            data,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    pub fn row(&self, y: usize) -> &[T] {
        let len = self.width * self.channels;
        &self.data[y * len..(y + 1) * len]
    }

    pub fn row_mut(&mut self, y: usize) -> &mut [T] {
        let len = self.width * self.channels;
        &mut self.data[y * len..(y + 1) * len]
    }

    /// First channel of pixel (x, y).
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> T {
        self.data[(y * self.width + x) * self.channels]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: T) {
        self.data[(y * self.width + x) * self.channels] = value;
    }

    pub fn view(&self) -> RasterView<'_, T> {
        RasterView {
            data: &self.data,
            width: self.width,
            height: self.height,
            stride: self.width * self.channels,
            channels: self.channels,
        }
    }

    pub fn map<U: Copy + Default>(&self, f: impl Fn(T) -> U) -> Raster<U> {
        Raster {
            width: self.width,
            height: self.height,
            channels: self.channels,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }
}

impl Raster<u8> {
    /// Single-channel intensity. Mono rasters are cloned, RGB rasters are
    /// reduced with BT.601 integer weights.
    pub fn to_mono(&self) -> Raster<u8> {
        if self.channels == 1 {
            return self.clone();
        }
        let data = self
            .data
            .chunks_exact(self.channels)
            .map(|px| {
                if px.len() < 3 {
                    return px[0];
                }
                let (r, g, b) = (px[0] as u32, px[1] as u32, px[2] as u32);
                ((77 * r + 150 * g + 29 * b + 128) >> 8) as u8
            })
            .collect();
        Raster {
            width: self.width,
            height: self.height,
            channels: 1,
            data,
        }
    }
}

/// Borrowed strided 2-D view.
#[derive(Debug, Clone, Copy)]
pub struct RasterView<'a, T> {
    data: &'a [T],
    width: usize,
    height: usize,
    stride: usize,
    channels: usize,
}

impl<'a, T> RasterView<'a, T> {
    /// `stride` is the distance between row starts, in samples.
    pub fn new(
        data: &'a [T],
        width: usize,
        height: usize,
        stride: usize,
        channels: usize,
    ) -> Result<Self> {
        let row_len = width
            .checked_mul(channels)
            .ok_or(ConversionError::InvalidDimensions(width, height))?;
        if channels == 0 || stride < row_len {
            return Err(ConversionError::InvalidDimensions(width, height));
        }
        let required = match height {
            0 => 0,
            h => stride
                .checked_mul(h - 1)
                .and_then(|n| n.checked_add(row_len))
                .ok_or(ConversionError::InvalidDimensions(width, height))?,
        };
        if data.len() < required {
            return Err(ConversionError::InvalidDimensions(width, height));
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
            channels,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn row(&self, y: usize) -> &'a [T] {
        let start = y * self.stride;
        &self.data[start..start + self.width * self.channels]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_rejects_short_buffer() {
        let buf = vec![0u8; 10];
        let err = RasterView::new(&buf, 4, 3, 4, 1).unwrap_err();
        assert!(matches!(err, ConversionError::InvalidDimensions(4, 3)));
    }

    #[test]
    fn view_rejects_stride_narrower_than_row() {
        let buf = vec![0u8; 64];
        assert!(RasterView::new(&buf, 4, 2, 11, 3).is_err());
    }

    #[test]
    fn padded_rows_are_packed_on_copy() {
        // 3x2 mono image with two bytes of padding per row.
        let buf = [1u8, 2, 3, 0xEE, 0xEE, 4, 5, 6];
        let view = RasterView::new(&buf, 3, 2, 5, 1).unwrap();
        let raster = Raster::from_view(&view);
        assert_eq!(raster.data(), &[1, 2, 3, 4, 5, 6]);
        assert_eq!(raster.get(2, 1), 6);
    }

    #[test]
    fn from_vec_checks_length() {
        assert!(Raster::<i16>::from_vec(2, 2, 1, vec![0; 3]).is_err());
        assert!(Raster::<i16>::from_vec(2, 2, 1, vec![0; 4]).is_ok());
    }

    #[test]
    fn rgb_to_mono_uses_luma_weights() {
        let raster = Raster::from_vec(2, 1, 3, vec![255u8, 255, 255, 0, 0, 0]).unwrap();
        let mono = raster.to_mono();
        assert_eq!(mono.channels(), 1);
        assert_eq!(mono.data(), &[255, 0]);
    }
}

use ndarray::{Array2, ArrayView3};

use crate::shared::region::Region;

/// A single captured frame: contiguous pixel bytes in row-major order.
///
/// Sources produce RGB (3 channels). Frames are immutable once captured;
/// the stream processors own them for the duration of one tick.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    /// A zero-sized frame, standing in for a failed capture.
    pub fn empty() -> Self {
        Self {
            data: Vec::new(),
            width: 0,
            height: 0,
            channels: 3,
            index: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.is_empty()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Luminance plane as `[height, width]` floats in `0..=255`.
    pub fn to_luma(&self) -> Array2<f32> {
        let (h, w) = (self.height as usize, self.width as usize);
        let c = self.channels as usize;
        let mut luma = Array2::<f32>::zeros((h, w));
        if self.is_empty() {
            return luma;
        }
        for y in 0..h {
            for x in 0..w {
                let offset = (y * w + x) * c;
                luma[[y, x]] = if c >= 3 {
                    0.299 * self.data[offset] as f32
                        + 0.587 * self.data[offset + 1] as f32
                        + 0.114 * self.data[offset + 2] as f32
                } else {
                    self.data[offset] as f32
                };
            }
        }
        luma
    }

    /// Divides each dimension by `factor`: 2 halves the frame, 0.5 doubles it.
    ///
    /// RGB frames go through `image`'s triangle filter; other layouts fall
    /// back to nearest-neighbour sampling. Non-positive factors return an
    /// unchanged copy.
    pub fn resized(&self, factor: f64) -> Frame {
        if self.is_empty() || factor == 1.0 || !factor.is_finite() || factor <= 0.0 {
            return self.clone();
        }
        let new_w = ((self.width as f64 / factor).round() as u32).max(1);
        let new_h = ((self.height as f64 / factor).round() as u32).max(1);

        if self.channels == 3 {
            if let Some(img) =
                image::RgbImage::from_raw(self.width, self.height, self.data.clone())
            {
                let resized = image::imageops::resize(
                    &img,
                    new_w,
                    new_h,
                    image::imageops::FilterType::Triangle,
                );
                return Frame::new(resized.into_raw(), new_w, new_h, 3, self.index);
            }
        }

        let c = self.channels as usize;
        let mut data = Vec::with_capacity(new_w as usize * new_h as usize * c);
        for y in 0..new_h as usize {
            let src_y = ((y as f64 * factor) as usize).min(self.height as usize - 1);
            for x in 0..new_w as usize {
                let src_x = ((x as f64 * factor) as usize).min(self.width as usize - 1);
                let offset = (src_y * self.width as usize + src_x) * c;
                data.extend_from_slice(&self.data[offset..offset + c]);
            }
        }
        Frame::new(data, new_w, new_h, self.channels, self.index)
    }

    /// Copy of the pixels inside `region` (clamped to the frame).
    pub fn crop(&self, region: &Region) -> Frame {
        let r = region.clamped(self.width, self.height);
        let (w, h) = (r.width() as usize, r.height() as usize);
        let c = self.channels as usize;
        let mut data = Vec::with_capacity(w * h * c);
        for y in r.top as usize..r.bottom as usize {
            let row_start = (y * self.width as usize + r.left as usize) * c;
            data.extend_from_slice(&self.data[row_start..row_start + w * c]);
        }
        Frame::new(data, w as u32, h as u32, self.channels, self.index)
    }

    pub fn to_rgb_image(&self) -> Option<image::RgbImage> {
        if self.channels != 3 {
            return None;
        }
        image::RgbImage::from_raw(self.width, self.height, self.data.clone())
    }

    pub fn from_rgb_image(img: image::RgbImage, index: usize) -> Self {
        let (w, h) = img.dimensions();
        Frame::new(img.into_raw(), w, h, 3, index)
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}

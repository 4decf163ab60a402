//! Video frame types and processing

use crate::FrameSourceError;
use serde::{Deserialize, Serialize};

/// Color channel of an RGB frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorChannel {
    Red,
    #[default]
    Green,
    Blue,
}

impl ColorChannel {
    /// Byte offset of the channel within an RGB pixel
    pub fn offset(self) -> usize {
        match self {
            ColorChannel::Red => 0,
            ColorChannel::Green => 1,
            ColorChannel::Blue => 2,
        }
    }
}

/// Decoded RGB video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// RGB pixel data (width * height * 3)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Position of the frame in its clip
    pub sequence: u64,
}

impl VideoFrame {
    /// Create a new video frame from raw RGB data
    pub fn new(data: Vec<u8>, width: u32, height: u32, sequence: u64) -> Result<Self, FrameSourceError> {
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(FrameSourceError::Format(format!(
                "expected {} bytes for {}x{} RGB, got {}",
                expected,
                width,
                height,
                data.len()
            )));
        }

        Ok(Self {
            data,
            width,
            height,
            sequence,
        })
    }

    /// Create a frame where every pixel has the same color
    pub fn filled(width: u32, height: u32, rgb: [u8; 3], sequence: u64) -> Self {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 3)
            .collect();
        Self {
            data,
            width,
            height,
            sequence,
        }
    }

    /// Wrap a decoded `image` buffer
    pub fn from_image(img: image::RgbImage, sequence: u64) -> Self {
        let (width, height) = img.dimensions();
        Self {
            data: img.into_raw(),
            width,
            height,
            sequence,
        }
    }

    /// Get pixel at (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        Some([self.data[idx], self.data[idx + 1], self.data[idx + 2]])
    }

    /// Set pixel at (x, y); out-of-bounds writes are ignored
    pub fn set_pixel(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        self.data[idx..idx + 3].copy_from_slice(&rgb);
    }

    /// Convert to grayscale
    pub fn to_grayscale(&self) -> Vec<u8> {
        let mut gray = Vec::with_capacity(self.width as usize * self.height as usize);
        for pixel in self.data.chunks_exact(3) {
            // Luminance formula: 0.299*R + 0.587*G + 0.114*B
            let y = pixel[0] as f32 * 0.299 + pixel[1] as f32 * 0.587 + pixel[2] as f32 * 0.114;
            gray.push(y.round().min(255.0) as u8);
        }
        gray
    }

    /// Mean of one channel over a rectangle, clipped to the frame.
    ///
    /// Returns `None` when the clipped rectangle is empty.
    pub fn channel_mean(&self, x: i64, y: i64, w: i64, h: i64, channel: ColorChannel) -> Option<f64> {
        let x0 = x.clamp(0, self.width as i64) as usize;
        let y0 = y.clamp(0, self.height as i64) as usize;
        let x1 = x.saturating_add(w).clamp(0, self.width as i64) as usize;
        let y1 = y.saturating_add(h).clamp(0, self.height as i64) as usize;

        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        let stride = self.width as usize * 3;
        let offset = channel.offset();
        let mut sum = 0u64;
        for row in y0..y1 {
            let start = row * stride + x0 * 3 + offset;
            let end = row * stride + x1 * 3;
            sum += self.data[start..end]
                .iter()
                .step_by(3)
                .map(|&v| v as u64)
                .sum::<u64>();
        }

        let count = ((x1 - x0) * (y1 - y0)) as f64;
        Some(sum as f64 / count)
    }

    /// Resize frame using bilinear interpolation with pixel-center alignment
    pub fn resize(&self, new_width: u32, new_height: u32) -> VideoFrame {
        if new_width == self.width && new_height == self.height {
            return self.clone();
        }
        if self.width == 0 || self.height == 0 || new_width == 0 || new_height == 0 {
            return VideoFrame::filled(new_width, new_height, [0, 0, 0], self.sequence);
        }

        let mut resized = Vec::with_capacity(new_width as usize * new_height as usize * 3);

        let x_ratio = self.width as f32 / new_width as f32;
        let y_ratio = self.height as f32 / new_height as f32;
        let max_x = (self.width - 1) as f32;
        let max_y = (self.height - 1) as f32;

        for y in 0..new_height {
            let src_y = ((y as f32 + 0.5) * y_ratio - 0.5).clamp(0.0, max_y);
            let y0 = src_y.floor() as u32;
            let y1 = (y0 + 1).min(self.height - 1);
            let fy = src_y - y0 as f32;

            for x in 0..new_width {
                let src_x = ((x as f32 + 0.5) * x_ratio - 0.5).clamp(0.0, max_x);
                let x0 = src_x.floor() as u32;
                let x1 = (x0 + 1).min(self.width - 1);
                let fx = src_x - x0 as f32;

                let p00 = self.pixel_unchecked(x0, y0);
                let p10 = self.pixel_unchecked(x1, y0);
                let p01 = self.pixel_unchecked(x0, y1);
                let p11 = self.pixel_unchecked(x1, y1);

                for c in 0..3 {
                    let top = p00[c] as f32 * (1.0 - fx) + p10[c] as f32 * fx;
                    let bottom = p01[c] as f32 * (1.0 - fx) + p11[c] as f32 * fx;
                    let value = top * (1.0 - fy) + bottom * fy;
                    resized.push(value.round().clamp(0.0, 255.0) as u8);
                }
            }
        }

        VideoFrame {
            data: resized,
            width: new_width,
            height: new_height,
            sequence: self.sequence,
        }
    }

    fn pixel_unchecked(&self, x: u32, y: u32) -> [u8; 3] {
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }
}

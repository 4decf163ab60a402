//! Face boxes, regions of interest, and forehead derivation

use serde::{Deserialize, Serialize};

/// Face candidate box in frame pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl FaceBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Box area in pixels
    pub fn area(&self) -> i64 {
        self.width.max(0) as i64 * self.height.max(0) as i64
    }
}

/// Pick the candidate with the largest area. Ties keep the earliest candidate.
pub fn select_largest(faces: &[FaceBox]) -> Option<&FaceBox> {
    faces.iter().fold(None, |best: Option<&FaceBox>, face| match best {
        Some(current) if current.area() >= face.area() => Some(current),
        _ => Some(face),
    })
}

/// Axis-aligned rectangle in frame coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Region {
    /// Region area in pixels
    pub fn area(&self) -> i64 {
        self.width.max(0) as i64 * self.height.max(0) as i64
    }

    /// Intersect with a `frame_width` x `frame_height` frame.
    ///
    /// Returns `None` if nothing of the region remains.
    pub fn clip(&self, frame_width: u32, frame_height: u32) -> Option<Region> {
        let x0 = (self.x as i64).clamp(0, frame_width as i64);
        let y0 = (self.y as i64).clamp(0, frame_height as i64);
        let x1 = (self.x as i64 + self.width as i64).clamp(0, frame_width as i64);
        let y1 = (self.y as i64 + self.height as i64).clamp(0, frame_height as i64);

        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        Some(Region {
            x: x0 as i32,
            y: y0 as i32,
            width: (x1 - x0) as i32,
            height: (y1 - y0) as i32,
        })
    }
}

/// Forehead box as fractions of the face box.
///
/// Each product is truncated to whole pixels before it is applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForeheadOffsets {
    /// Horizontal offset from the face's left edge (fraction of face width)
    pub x: f64,
    /// Vertical offset from the face's top edge (fraction of face height)
    pub y: f64,
    /// Box width (fraction of face width)
    pub width: f64,
    /// Box height (fraction of face height)
    pub height: f64,
}

impl ForeheadOffsets {
    /// Interactive path box
    pub const TIGHT: ForeheadOffsets = ForeheadOffsets {
        x: 0.25,
        y: 0.1,
        width: 0.5,
        height: 0.15,
    };

    /// Batch path box
    pub const WIDE: ForeheadOffsets = ForeheadOffsets {
        x: 0.2,
        y: 0.1,
        width: 0.6,
        height: 0.15,
    };

    /// Forehead region of `face`
    pub fn derive(&self, face: &FaceBox) -> Region {
        let w = face.width as f64;
        let h = face.height as f64;

        Region {
            x: face.x + (self.x * w) as i32,
            y: face.y + (self.y * h) as i32,
            width: (self.width * w) as i32,
            height: (self.height * h) as i32,
        }
    }
}

//! Bounding-box geometry for recognized text regions.
//!
//! The service describes every line, word, selection mark, and table cell by
//! a quadrilateral of four corners, flattened as
//! `[x_tl, y_tl, x_tr, y_tr, x_br, y_br, x_bl, y_bl]` and ordered clockwise
//! from the top-left corner.

use serde::{Deserialize, Serialize};

/// A corner of a [`BoundingBox`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// X-coordinate.
    pub x: f32,
    /// Y-coordinate.
    pub y: f32,
}

/// Four corner points flattened into eight coordinates, clockwise from top-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoundingBox(pub [f32; 8]);

impl BoundingBox {
    /// Create a box from flattened coordinates.
    pub fn new(coordinates: [f32; 8]) -> Self {
        Self(coordinates)
    }

    /// Create a box from corners ordered top-left, top-right, bottom-right, bottom-left.
    pub fn from_points(points: [Point; 4]) -> Self {
        let [tl, tr, br, bl] = points;
        Self([tl.x, tl.y, tr.x, tr.y, br.x, br.y, bl.x, bl.y])
    }

    /// The flattened coordinates.
    pub fn coordinates(&self) -> &[f32; 8] {
        &self.0
    }

    /// Corners ordered top-left, top-right, bottom-right, bottom-left.
    pub fn points(&self) -> [Point; 4] {
        let [x0, y0, x1, y1, x2, y2, x3, y3] = self.0;
        [
            Point { x: x0, y: y0 },
            Point { x: x1, y: y1 },
            Point { x: x2, y: y2 },
            Point { x: x3, y: y3 },
        ]
    }

    /// See [`compute_angle`].
    pub fn angle(&self) -> f32 {
        compute_angle(self)
    }

    /// See [`rotate`].
    pub fn rotate(&self, angle: f32) -> Self {
        rotate(self, angle)
    }

    /// Rotate the box by the opposite of its own angle so its left-to-right
    /// axis becomes horizontal.
    pub fn deskew(&self) -> Self {
        rotate(self, -compute_angle(self))
    }
}

/// Angle in radians of the line from the midpoint of the left edge to the
/// midpoint of the right edge, relative to the positive x-axis.
///
/// Approximates how far a text line is rotated from horizontal.
pub fn compute_angle(bounding_box: &BoundingBox) -> f32 {
    let [x_tl, y_tl, x_tr, y_tr, x_br, y_br, x_bl, y_bl] = bounding_box.0;

    // Midpoint sums rather than averages: the factor of 2 cancels in atan2.
    let dy = (y_tr + y_br) - (y_tl + y_bl);
    let dx = (x_tr + x_br) - (x_tl + x_bl);
    dy.atan2(dx)
}

/// Rotate every corner by `angle` radians about the origin.
pub fn rotate(bounding_box: &BoundingBox, angle: f32) -> BoundingBox {
    let (sin, cos) = angle.sin_cos();
    let mut rotated = [0.0f32; 8];

    for (src, dst) in bounding_box.0.chunks_exact(2).zip(rotated.chunks_exact_mut(2)) {
        let (x, y) = (src[0], src[1]);
        dst[0] = x * cos - y * sin;
        dst[1] = x * sin + y * cos;
    }

    BoundingBox(rotated)
}

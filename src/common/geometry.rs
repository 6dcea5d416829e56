//! Rectangle type shared by the header, layers, masks, slices and tree.

use serde::Serialize;

/// A bounding rectangle in document coordinates.
///
/// Width is `right - left` and height is `bottom - top`; both may
/// legitimately be zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Rect {
    pub top: i32,
    pub left: i32,
    pub bottom: i32,
    pub right: i32,
}

impl Rect {
    pub const ZERO: Rect = Rect {
        top: 0,
        left: 0,
        bottom: 0,
        right: 0,
    };

    pub fn new(top: i32, left: i32, bottom: i32, right: i32) -> Self {
        Self {
            top,
            left,
            bottom,
            right,
        }
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// A rectangle is empty when either dimension is zero.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

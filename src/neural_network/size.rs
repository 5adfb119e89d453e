use std::fmt;
use std::ops::{Add, Div, Sub};

/// Two-dimensional extent of an image or kernel, stored as (rows, cols).
///
/// All arithmetic is elementwise and never goes below zero: subtraction saturates
/// at 0, which is exactly the clamping rule used for `VALID` convolution output sizes.
///
/// # Example
/// ```rust
/// use rustycnn::neural_network::Size;
///
/// let image = Size::new(28, 28);
/// let kernel = Size::new(5, 5);
///
/// assert_eq!(image - kernel + Size::new(1, 1), Size::new(24, 24));
/// assert_eq!(Size::new(24, 24) / 2, Size::new(12, 12));
/// assert_eq!(image.area(), 784);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size {
    pub rows: usize,
    pub cols: usize,
}

impl Size {
    /// Creates a new size from a row count and a column count.
    pub const fn new(rows: usize, cols: usize) -> Self {
        Size { rows, cols }
    }

    /// Creates a square size.
    pub const fn square(side: usize) -> Self {
        Size {
            rows: side,
            cols: side,
        }
    }

    /// Number of pixels covered by this size.
    pub fn area(&self) -> usize {
        self.rows * self.cols
    }

    /// Elementwise minimum of two sizes.
    pub fn min(self, other: Size) -> Size {
        Size {
            rows: self.rows.min(other.rows),
            cols: self.cols.min(other.cols),
        }
    }

    /// Returns `true` when either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }
}

impl Add for Size {
    type Output = Size;

    fn add(self, rhs: Size) -> Size {
        Size {
            rows: self.rows + rhs.rows,
            cols: self.cols + rhs.cols,
        }
    }
}

impl Sub for Size {
    type Output = Size;

    fn sub(self, rhs: Size) -> Size {
        Size {
            rows: self.rows.saturating_sub(rhs.rows),
            cols: self.cols.saturating_sub(rhs.cols),
        }
    }
}

impl Div for Size {
    type Output = Size;

    fn div(self, rhs: Size) -> Size {
        Size {
            rows: self.rows / rhs.rows,
            cols: self.cols / rhs.cols,
        }
    }
}

impl Div<usize> for Size {
    type Output = Size;

    fn div(self, rhs: usize) -> Size {
        Size {
            rows: self.rows / rhs,
            cols: self.cols / rhs,
        }
    }
}

impl From<(usize, usize)> for Size {
    fn from((rows, cols): (usize, usize)) -> Self {
        Size { rows, cols }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

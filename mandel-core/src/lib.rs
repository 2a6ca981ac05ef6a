//! Numeric backends and the escape-time kernel for the Mandelbrot renderer.

pub mod bigint;
pub mod decimal;
mod error;
pub mod mandelbrot;
pub mod number;
pub mod numeric;
pub mod rational;
pub mod viewport;

pub use error::{Error, Result};
pub use number::Scalar;

/// A pair of integer (width, height) dimensions.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Size {
    pub width: usize,
    pub height: usize,
}

impl Size {
    pub const fn new(width: usize, height: usize) -> Self {
        Size { width, height }
    }

    pub fn pixels(&self) -> usize {
        self.width * self.height
    }
}

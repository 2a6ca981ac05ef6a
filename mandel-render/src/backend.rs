//! Registry of numeric backends.
//!
//! Each backend pairs a [Scalar] type with its own viewport; the renderer drives them
//! through the object-safe [Plane] trait so the active backend can change at runtime.

use std::sync::Arc;

use mandel_core::{
    decimal::FixedDecimal,
    mandelbrot::{self, EscapeVector, Sampler},
    numeric::ComplexScalar,
    rational::ExactRational,
    viewport::Viewport,
    Scalar, Size,
};
use rust_decimal::Decimal;

use crate::{Error, Result};

/// A source of escape counts, one row at a time, for a frame whose parameters are fixed.
pub trait RowSource: Send + Sync {
    fn size(&self) -> Size;

    fn max_iterations(&self) -> usize;

    /// Fills `out`, which must be one row wide.
    fn row(&self, y: usize, out: &mut [Option<usize>]) -> mandel_core::Result<()>;
}

impl<N: Scalar> RowSource for Sampler<N> {
    fn size(&self) -> Size {
        Sampler::size(self)
    }

    fn max_iterations(&self) -> usize {
        self.limit()
    }

    fn row(&self, y: usize, out: &mut [Option<usize>]) -> mandel_core::Result<()> {
        Sampler::row(self, y, out)
    }
}

/// A viewport held in one backend's number type.
pub trait Plane: Send {
    fn set_view(&mut self, x_origin: f64, y_origin: f64, x_extent: f64) -> Result<()>;

    /// Sets the view from text, keeping all the precision the backend has.
    fn parse_view(&mut self, x_origin: &str, y_origin: &str, x_extent: &str) -> Result<()>;

    fn pan(&mut self, dx: i32, dy: i32, size: Size) -> Result<()>;

    fn zoom(&mut self, px: i32, py: i32, factor: f64, size: Size) -> Result<()>;

    /// The plane coordinate under a pixel, as `"x, y"`.
    fn coordinate_at(&self, px: usize, py: usize, size: Size) -> Result<String>;

    /// Snapshots the current view into a row source for one frame.
    fn prepare(&self, size: Size, max_iterations: usize) -> Result<Arc<dyn RowSource>>;

    /// Evaluates a whole frame on the rayon pool.
    fn evaluate_parallel(&self, size: Size, max_iterations: usize) -> Result<EscapeVector>;
}

struct PlaneState<N> {
    view: Viewport<N>,
}

impl<N: Scalar> PlaneState<N> {
    fn new() -> Self {
        PlaneState {
            view: Viewport::new(N::zero(), N::zero(), N::from_i32(1)),
        }
    }
}

impl<N: Scalar + 'static> Plane for PlaneState<N> {
    fn set_view(&mut self, x_origin: f64, y_origin: f64, x_extent: f64) -> Result<()> {
        self.view = Viewport::from_f64(x_origin, y_origin, x_extent)?;
        Ok(())
    }

    fn parse_view(&mut self, x_origin: &str, y_origin: &str, x_extent: &str) -> Result<()> {
        self.view = Viewport::parse(x_origin, y_origin, x_extent)?;
        Ok(())
    }

    fn pan(&mut self, dx: i32, dy: i32, size: Size) -> Result<()> {
        Ok(self.view.pan(dx, dy, size)?)
    }

    fn zoom(&mut self, px: i32, py: i32, factor: f64, size: Size) -> Result<()> {
        Ok(self.view.zoom(px, py, factor, size)?)
    }

    fn coordinate_at(&self, px: usize, py: usize, size: Size) -> Result<String> {
        let (x, y) = self.view.pixel_to_plane(px, py, size)?;
        Ok(format!("{}, {}", x, y))
    }

    fn prepare(&self, size: Size, max_iterations: usize) -> Result<Arc<dyn RowSource>> {
        Ok(Arc::new(Sampler::new(&self.view, size, max_iterations)?))
    }

    fn evaluate_parallel(&self, size: Size, max_iterations: usize) -> Result<EscapeVector> {
        Ok(mandelbrot::evaluate_parallel(
            &self.view,
            size,
            max_iterations,
        )?)
    }
}

fn plane<N: Scalar + 'static>() -> Box<dyn Plane> {
    Box::new(PlaneState::<N>::new())
}

/// Registered backends, in menu order.
const BACKENDS: &[(&str, fn() -> Box<dyn Plane>)] = &[
    ("f64", plane::<f64>),
    ("FixedDecimal<16>", plane::<FixedDecimal<16>>),
    ("FixedDecimal<10>", plane::<FixedDecimal<10>>),
    ("rational", plane::<ExactRational>),
    ("decimal128", plane::<Decimal>),
    ("f32", plane::<f32>),
    ("complex128", plane::<ComplexScalar>),
];

/// Names of the registered backends.
pub fn formats() -> impl Iterator<Item = &'static str> {
    BACKENDS.iter().map(|(name, _)| *name)
}

/// Position of a backend in [formats].
pub fn index_of(name: &str) -> Option<usize> {
    BACKENDS.iter().position(|(n, _)| *n == name)
}

/// A fresh plane for the named backend.
pub fn create(name: &str) -> Result<Box<dyn Plane>> {
    BACKENDS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, make)| make())
        .ok_or_else(|| Error::InvalidArgument(format!("unknown numeric format {}", name)))
}

/// One fresh plane per registered backend, in registry order.
pub fn create_all() -> Vec<Box<dyn Plane>> {
    BACKENDS.iter().map(|(_, make)| make()).collect()
}

//! Mapping between pixels and the complex plane.

use crate::{number::Scalar, Error, Result, Size};

/// The visible region of the plane: its top-left corner and width.
///
/// The height is derived from the output size, so pixels are square.
#[derive(Clone, Debug, PartialEq)]
pub struct Viewport<N> {
    x_origin: N,
    y_origin: N,
    x_extent: N,
}

/// Per-frame constants derived from a [Viewport] and an output size.
#[derive(Clone, Debug, PartialEq)]
pub struct Bounds<N> {
    pub x_min: N,
    pub x_max: N,
    pub y_min: N,
    pub y_max: N,
    pub x_scale: N,
    pub y_scale: N,
}

fn to_i32(value: usize, what: &str) -> Result<i32> {
    i32::try_from(value).map_err(|_| Error::InvalidArgument(format!("{} {} is too large", what, value)))
}

/// The output size as scalars, rejecting zero-area frames.
fn dimensions<N: Scalar>(size: Size) -> Result<(N, N)> {
    if size.width == 0 || size.height == 0 {
        return Err(Error::InvalidArgument(format!(
            "cannot map onto a {}x{} frame",
            size.width, size.height
        )));
    }
    Ok((
        N::from_i32(to_i32(size.width, "width")?),
        N::from_i32(to_i32(size.height, "height")?),
    ))
}

impl<N: Scalar> Viewport<N> {
    pub fn new(x_origin: N, y_origin: N, x_extent: N) -> Self {
        Viewport {
            x_origin,
            y_origin,
            x_extent,
        }
    }

    pub fn from_f64(x_origin: f64, y_origin: f64, x_extent: f64) -> Result<Self> {
        Ok(Self::new(
            N::from_f64(x_origin)?,
            N::from_f64(y_origin)?,
            N::from_f64(x_extent)?,
        ))
    }

    /// Builds a viewport from typed-in coordinates, without a detour through doubles.
    pub fn parse(x_origin: &str, y_origin: &str, x_extent: &str) -> Result<Self> {
        Ok(Self::new(
            N::parse(x_origin)?,
            N::parse(y_origin)?,
            N::parse(x_extent)?,
        ))
    }

    pub fn x_origin(&self) -> &N {
        &self.x_origin
    }

    pub fn y_origin(&self) -> &N {
        &self.y_origin
    }

    pub fn x_extent(&self) -> &N {
        &self.x_extent
    }

    /// `x_extent * height / width`.
    pub fn y_extent(&self, size: Size) -> Result<N> {
        let (width, height) = dimensions::<N>(size)?;
        self.x_extent.try_mul(&height)?.try_div(&width)
    }

    pub fn bounds(&self, size: Size) -> Result<Bounds<N>> {
        let (width, height) = dimensions::<N>(size)?;
        let y_extent = self.x_extent.try_mul(&height)?.try_div(&width)?;
        let x_min = self.x_origin.clone();
        let y_min = self.y_origin.clone();
        let x_max = x_min.try_add(&self.x_extent)?;
        let y_max = y_min.try_add(&y_extent)?;
        let x_scale = x_max.try_sub(&x_min)?.try_div(&width)?;
        let y_scale = y_max.try_sub(&y_min)?.try_div(&height)?;
        Ok(Bounds {
            x_min,
            x_max,
            y_min,
            y_max,
            x_scale,
            y_scale,
        })
    }

    pub fn pixel_to_plane(&self, px: usize, py: usize, size: Size) -> Result<(N, N)> {
        self.bounds(size)?.pixel_to_plane(px, py)
    }

    /// Moves the view by a drag of `(dx, dy)` pixels.
    /// Dragging right moves the origin left, so the content follows the cursor.
    pub fn pan(&mut self, dx: i32, dy: i32, size: Size) -> Result<()> {
        let (width, height) = dimensions::<N>(size)?;
        let b = self.bounds(size)?;
        let x_shift = N::from_i32(dx)
            .try_mul(&b.x_max.try_sub(&b.x_min)?)?
            .try_div(&width)?;
        let y_shift = N::from_i32(dy)
            .try_mul(&b.y_max.try_sub(&b.y_min)?)?
            .try_div(&height)?;
        let x_origin = self.x_origin.try_sub(&x_shift)?;
        let y_origin = self.y_origin.try_sub(&y_shift)?;

        self.x_origin = x_origin;
        self.y_origin = y_origin;
        Ok(())
    }

    /// Scales the view by `factor` around the pixel `(px, py)`, which keeps its plane coordinate.
    /// A factor below one zooms in.
    pub fn zoom(&mut self, px: i32, py: i32, factor: f64, size: Size) -> Result<()> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(Error::InvalidArgument(format!(
                "zoom factor must be positive, got {}",
                factor
            )));
        }
        let (width, height) = dimensions::<N>(size)?;
        let b = self.bounds(size)?;
        let x_span = b.x_max.try_sub(&b.x_min)?;
        let y_span = b.y_max.try_sub(&b.y_min)?;

        let x_pos = b
            .x_min
            .try_add(&N::from_i32(px).try_mul(&x_span)?.try_div(&width)?)?;
        let y_pos = b
            .y_min
            .try_add(&N::from_i32(py).try_mul(&y_span)?.try_div(&height)?)?;
        let x_ratio = x_pos.try_sub(&b.x_min)?.try_div(&x_span)?;
        let y_ratio = y_pos.try_sub(&b.y_min)?.try_div(&y_span)?;

        let factor = N::from_f64(factor)?;
        let x_extent = x_span.try_mul(&factor)?;
        let y_extent = y_span.try_mul(&factor)?;
        let x_origin = x_pos.try_sub(&x_extent.try_mul(&x_ratio)?)?;
        let y_origin = y_pos.try_sub(&y_extent.try_mul(&y_ratio)?)?;

        self.x_origin = x_origin;
        self.y_origin = y_origin;
        self.x_extent = x_extent;
        Ok(())
    }
}

impl<N: Scalar> Bounds<N> {
    pub fn pixel_x(&self, px: usize) -> Result<N> {
        let px = N::from_i32(to_i32(px, "column")?);
        self.x_min.try_add(&px.try_mul(&self.x_scale)?)
    }

    pub fn pixel_y(&self, py: usize) -> Result<N> {
        let py = N::from_i32(to_i32(py, "row")?);
        self.y_min.try_add(&py.try_mul(&self.y_scale)?)
    }

    pub fn pixel_to_plane(&self, px: usize, py: usize) -> Result<(N, N)> {
        Ok((self.pixel_x(px)?, self.pixel_y(py)?))
    }

    /// Fractional pixel position of a plane coordinate.
    pub fn plane_to_pixel(&self, x: &N, y: &N) -> Result<(f64, f64)> {
        let px = x.try_sub(&self.x_min)?.try_div(&self.x_scale)?;
        let py = y.try_sub(&self.y_min)?.try_div(&self.y_scale)?;
        Ok((px.to_f64()?, py.to_f64()?))
    }
}

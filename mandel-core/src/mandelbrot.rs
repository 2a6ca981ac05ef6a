//! Implementation of the Mandelbrot fractal,
//! parameterized on a numeric type.

use rayon::prelude::*;

use crate::{number::Scalar, viewport::Bounds, viewport::Viewport, Error, Result, Size};

/// Escape counts for a frame, row-major. `None` marks points that stayed bounded.
pub type EscapeVector = Vec<Option<usize>>;

/// Squared magnitude at which a point is considered escaped.
pub const BAILOUT: i32 = 4;

/// Iterates `z = z^2 + c` from zero for `c = (cx, cy)`.
///
/// Returns the number of steps taken before `|z|^2` reached `bailout`,
/// or `None` if `limit` steps were taken, even when the last of them escaped.
/// The squares computed for the bailout test are reused by the next step.
pub fn escape<N: Scalar>(cx: &N, cy: &N, limit: usize, bailout: &N) -> Result<Option<usize>> {
    let mut x = N::zero();
    let mut y = N::zero();
    let mut xsq = N::zero();
    let mut ysq = N::zero();
    let mut iteration = 0;

    while iteration < limit && !N::escapes(&xsq, &ysq, bailout)? {
        let mut next_y = x.try_mul(&y)?;
        next_y.truncate();
        let next_y = next_y.try_add(&next_y)?.try_add(cy)?;
        let mut next_x = xsq.try_sub(&ysq)?.try_add(cx)?;
        next_x.truncate();

        xsq = next_x.try_mul(&next_x)?;
        ysq = next_y.try_mul(&next_y)?;
        x = next_x;
        y = next_y;
        iteration += 1;
    }

    // The loop only stops short of the limit on escape; reaching the limit means in the set.
    Ok((iteration < limit).then_some(iteration))
}

/// Evaluates rows of one frame.
///
/// Holds everything that is constant across the frame: the bounds, the x coordinate of every
/// column, and the iteration limit.
#[derive(Clone, Debug)]
pub struct Sampler<N> {
    bounds: Bounds<N>,
    xs: Vec<N>,
    size: Size,
    limit: usize,
    bailout: N,
}

impl<N: Scalar> Sampler<N> {
    pub fn new(viewport: &Viewport<N>, size: Size, limit: usize) -> Result<Self> {
        let bounds = viewport.bounds(size)?;
        let xs = (0..size.width)
            .map(|px| {
                let mut x = bounds.pixel_x(px)?;
                x.truncate();
                Ok(x)
            })
            .collect::<Result<Vec<N>>>()?;
        Ok(Sampler {
            bounds,
            xs,
            size,
            limit,
            bailout: N::from_i32(BAILOUT),
        })
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn bounds(&self) -> &Bounds<N> {
        &self.bounds
    }

    /// Fills `out` with the escape counts of row `py`.
    pub fn row(&self, py: usize, out: &mut [Option<usize>]) -> Result<()> {
        if out.len() != self.xs.len() || py >= self.size.height {
            return Err(Error::InvalidArgument(format!(
                "row {} of width {} is outside a {}x{} frame",
                py,
                out.len(),
                self.size.width,
                self.size.height
            )));
        }
        let mut y = self.bounds.pixel_y(py)?;
        y.truncate();
        for (x, slot) in self.xs.iter().zip(out.iter_mut()) {
            *slot = escape(x, &y, self.limit, &self.bailout)?;
        }
        Ok(())
    }
}

/// Evaluates a frame on the calling thread.
pub fn evaluate<N: Scalar>(viewport: &Viewport<N>, size: Size, limit: usize) -> Result<EscapeVector> {
    let sampler = Sampler::new(viewport, size, limit)?;
    let mut output: EscapeVector = vec![None; size.pixels()];
    for (py, row) in output.chunks_mut(size.width).enumerate() {
        sampler.row(py, row)?;
    }
    Ok(output)
}

/// Evaluate a frame using any parallelism available in the global rayon pool.
pub fn evaluate_parallel<N: Scalar>(
    viewport: &Viewport<N>,
    size: Size,
    limit: usize,
) -> Result<EscapeVector> {
    let span = tracing::debug_span!("evaluate-parallel", width = size.width, height = size.height);
    let _guard = span.enter();
    let sampler = Sampler::new(viewport, size, limit)?;
    let mut output: EscapeVector = vec![None; size.pixels()];
    output
        .par_chunks_mut(size.width)
        .enumerate()
        .try_for_each(|(py, row)| sampler.row(py, row))?;
    Ok(output)
}

//! Mapping from escape counts to colors.

use crate::{frame::OPAQUE_BLACK, Error, Result};

/// Number of entries in the default palette.
pub const DEFAULT_PALETTE_SIZE: usize = 1024;

/// Gradient stops of the default palette, as ARGB:
/// burlywood, chocolate, tan, sienna, light steel blue, and back to burlywood.
pub const DEFAULT_STOPS: [u32; 6] = [
    0xFFDE_B887,
    0xFFD2_691E,
    0xFFD2_B48C,
    0xFFA0_522D,
    0xFFB0_C4DE,
    0xFFDE_B887,
];

/// A cyclic table of opaque ARGB colors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<u32>,
}

impl Palette {
    /// Wraps a color table; alpha is forced opaque.
    pub fn new(colors: Vec<u32>) -> Result<Self> {
        if colors.is_empty() {
            return Err(Error::InvalidArgument("palette has no colors".to_string()));
        }
        Ok(Palette {
            colors: colors.into_iter().map(|c| c | OPAQUE_BLACK).collect(),
        })
    }

    /// Linear interpolation between consecutive stops.
    ///
    /// Each pair of stops gets `size / (stops - 1)` entries; any entries left over repeat the final stop.
    pub fn gradient(stops: &[u32], size: usize) -> Result<Self> {
        if stops.len() < 2 {
            return Err(Error::InvalidArgument(
                "a gradient needs at least two stops".to_string(),
            ));
        }
        if size < stops.len() - 1 {
            return Err(Error::InvalidArgument(format!(
                "{} entries cannot hold {} gradient steps",
                size,
                stops.len() - 1
            )));
        }
        Ok(Palette {
            colors: gradient(stops, size),
        })
    }

    /// One full sweep of the hue circle at full saturation and value.
    pub fn hue_cycle(size: usize) -> Result<Self> {
        let colors = (0..size)
            .map(|i| {
                let hue = 360.0 * i as f64 / size as f64;
                let (r, g, b) = hsv::hsv_to_rgb(hue, 1.0, 1.0);
                pack(r, g, b)
            })
            .collect();
        Self::new(colors)
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn colors(&self) -> &[u32] {
        &self.colors
    }

    /// Spreads short iteration limits across the whole palette: `max(1, len / max_iterations)`.
    pub fn iteration_scale(&self, max_iterations: usize) -> usize {
        self.colors
            .len()
            .checked_div(max_iterations)
            .unwrap_or(1)
            .max(1)
    }

    /// The color of a pixel: black if it stayed bounded, else a palette entry.
    pub fn pixel(&self, escape: Option<usize>, scale: usize) -> u32 {
        match escape {
            None => OPAQUE_BLACK,
            Some(n) => self.colors[n.wrapping_mul(scale) % self.colors.len()],
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Palette {
            colors: gradient(&DEFAULT_STOPS, DEFAULT_PALETTE_SIZE),
        }
    }
}

fn pack(r: u8, g: u8, b: u8) -> u32 {
    OPAQUE_BLACK | (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
}

fn channels(color: u32) -> [i64; 3] {
    [
        i64::from((color >> 16) & 0xFF),
        i64::from((color >> 8) & 0xFF),
        i64::from(color & 0xFF),
    ]
}

// Requires at least two stops and `size >= stops.len() - 1`.
fn gradient(stops: &[u32], size: usize) -> Vec<u32> {
    let per_step = size / (stops.len() - 1);
    let mut colors = Vec::with_capacity(size);
    for pair in stops.windows(2) {
        let (from, to) = (channels(pair[0]), channels(pair[1]));
        for k in 0..per_step {
            let [r, g, b] = [0, 1, 2].map(|c| {
                let value = from[c] + (to[c] - from[c]) * k as i64 / per_step as i64;
                value.clamp(0, 255) as u8
            });
            colors.push(pack(r, g, b));
        }
    }
    let last = stops[stops.len() - 1] | OPAQUE_BLACK;
    colors.resize(size, last);
    colors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_palette_starts_at_burlywood() {
        let p = Palette::default();
        assert_eq!(p.len(), DEFAULT_PALETTE_SIZE);
        assert_eq!(p.colors()[0], 0xFFDE_B887);
        // Second segment begins exactly on its stop.
        assert_eq!(p.colors()[204], 0xFFD2_691E);
        assert_eq!(p.colors()[1023], 0xFFDE_B887);
        assert!(p.colors().iter().all(|c| c >> 24 == 0xFF));
    }

    #[test]
    fn gradient_interpolates() {
        let p = Palette::gradient(&[0xFF00_0000, 0xFFFF_FFFF], 4).unwrap();
        assert_eq!(p.colors(), &[0xFF00_0000, 0xFF3F_3F3F, 0xFF7F_7F7F, 0xFFBF_BFBF]);
        assert!(Palette::gradient(&[0xFF00_0000], 4).is_err());
        assert!(Palette::gradient(&[0, 1, 2], 1).is_err());
    }

    #[test]
    fn hue_cycle_starts_red() {
        let p = Palette::hue_cycle(6).unwrap();
        assert_eq!(p.colors()[0], 0xFFFF_0000);
        assert_eq!(p.len(), 6);
        assert!(Palette::hue_cycle(0).is_err());
    }

    #[test]
    fn iteration_scale_spreads_short_limits() {
        let p = Palette::default();
        assert_eq!(p.iteration_scale(100), 10);
        assert_eq!(p.iteration_scale(1024), 1);
        assert_eq!(p.iteration_scale(5000), 1);
        assert_eq!(p.iteration_scale(0), 1);
    }

    #[test]
    fn pixel_colors() {
        let p = Palette::new(vec![1, 2, 3]).unwrap();
        assert_eq!(p.pixel(None, 1), OPAQUE_BLACK);
        assert_eq!(p.pixel(Some(1), 1), 0xFF00_0002);
        assert_eq!(p.pixel(Some(2), 2), 0xFF00_0002);
        assert_eq!(p.pixel(Some(usize::MAX), 3), p.colors()[usize::MAX.wrapping_mul(3) % 3]);
        assert!(Palette::new(Vec::new()).is_err());
    }
}

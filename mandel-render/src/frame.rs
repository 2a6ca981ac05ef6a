//! The shared output frame.

use std::sync::atomic::{AtomicU32, Ordering};

use mandel_core::Size;

use crate::{palette::Palette, Error, Result};

/// Opaque black, as ARGB. Also the color of bounded points.
pub const OPAQUE_BLACK: u32 = 0xFF00_0000;

/// A row-major grid of packed ARGB pixels.
///
/// Workers write disjoint rows while readers take snapshots; pixels are individually atomic,
/// so a snapshot taken mid-render may mix old and new rows but never tears a pixel.
pub struct FrameBuffer {
    size: Size,
    pixels: Box<[AtomicU32]>,
}

impl FrameBuffer {
    pub fn new(size: Size) -> Self {
        let pixels = (0..size.pixels())
            .map(|_| AtomicU32::new(OPAQUE_BLACK))
            .collect();
        FrameBuffer { size, pixels }
    }

    pub fn size(&self) -> Size {
        self.size
    }

    /// Stores one row of colors. Alpha is forced opaque.
    pub fn write_row(&self, y: usize, colors: &[u32]) -> Result<()> {
        if y >= self.size.height || colors.len() != self.size.width {
            return Err(Error::InvalidArgument(format!(
                "row {} of width {} does not fit a {}x{} frame",
                y,
                colors.len(),
                self.size.width,
                self.size.height
            )));
        }
        let start = y * self.size.width;
        for (slot, color) in self.pixels[start..start + colors.len()].iter().zip(colors) {
            slot.store(color | OPAQUE_BLACK, Ordering::Relaxed);
        }
        Ok(())
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        Some(self.pixels[y * self.size.width + x].load(Ordering::Relaxed))
    }

    pub fn fill(&self, color: u32) {
        for p in self.pixels.iter() {
            p.store(color | OPAQUE_BLACK, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> Vec<u32> {
        self.pixels
            .iter()
            .map(|p| p.load(Ordering::Relaxed))
            .collect()
    }

    /// Colors a whole frame of escape counts at once.
    pub fn paint(
        &self,
        escapes: &[Option<usize>],
        palette: &Palette,
        max_iterations: usize,
    ) -> Result<()> {
        if escapes.len() != self.pixels.len() {
            return Err(Error::InvalidArgument(format!(
                "{} escape counts for a {}x{} frame",
                escapes.len(),
                self.size.width,
                self.size.height
            )));
        }
        let scale = palette.iteration_scale(max_iterations);
        for (slot, escape) in self.pixels.iter().zip(escapes) {
            slot.store(palette.pixel(*escape, scale), Ordering::Relaxed);
        }
        Ok(())
    }

    /// Converts the current contents to an RGBA image.
    pub fn to_image(&self) -> Result<image::RgbaImage> {
        let width = u32::try_from(self.size.width)
            .map_err(|_| Error::InvalidArgument("frame too wide for an image".to_string()))?;
        let height = u32::try_from(self.size.height)
            .map_err(|_| Error::InvalidArgument("frame too tall for an image".to_string()))?;
        let bytes = self
            .snapshot()
            .into_iter()
            .flat_map(|argb| {
                let [a, r, g, b] = argb.to_be_bytes();
                [r, g, b, a]
            })
            .collect();
        image::RgbaImage::from_raw(width, height, bytes)
            .ok_or_else(|| Error::Internal("pixel buffer does not match frame size".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_black() {
        let frame = FrameBuffer::new(Size::new(3, 2));
        assert_eq!(frame.snapshot(), vec![OPAQUE_BLACK; 6]);
        assert_eq!(frame.pixel(3, 0), None);
    }

    #[test]
    fn rows_land_in_place() {
        let frame = FrameBuffer::new(Size::new(3, 2));
        frame.write_row(1, &[0x112233, 0x445566, 0xFF778899]).unwrap();
        assert_eq!(frame.pixel(0, 1), Some(0xFF11_2233));
        assert_eq!(frame.pixel(2, 1), Some(0xFF77_8899));
        assert_eq!(frame.pixel(0, 0), Some(OPAQUE_BLACK));
        assert!(frame.write_row(2, &[0, 0, 0]).is_err());
        assert!(frame.write_row(0, &[0, 0]).is_err());
    }

    #[test]
    fn image_channels() {
        let frame = FrameBuffer::new(Size::new(2, 1));
        frame.write_row(0, &[0xFF12_3456, 0xFFAB_CDEF]).unwrap();
        let img = frame.to_image().unwrap();
        assert_eq!(img.dimensions(), (2, 1));
        assert_eq!(img.get_pixel(0, 0).0, [0x12, 0x34, 0x56, 0xFF]);
        assert_eq!(img.get_pixel(1, 0).0, [0xAB, 0xCD, 0xEF, 0xFF]);
    }

    #[test]
    fn paint_uses_palette() {
        let frame = FrameBuffer::new(Size::new(2, 1));
        let palette = Palette::new(vec![0xFF00_0001, 0xFF00_0002]).unwrap();
        frame.paint(&[None, Some(1)], &palette, 100).unwrap();
        assert_eq!(frame.snapshot(), vec![OPAQUE_BLACK, 0xFF00_0002]);
        assert!(frame.paint(&[None], &palette, 100).is_err());

        frame.fill(0x00FF_FFFF);
        assert_eq!(frame.snapshot(), vec![0xFFFF_FFFF; 2]);
    }
}

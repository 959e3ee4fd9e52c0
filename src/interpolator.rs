use image::RgbaImage;

use crate::enums::Interpolation;

pub(crate) struct Interpolator;

impl Interpolator {
    /// Sample the raster at an image-space position. Pixel `(i, j)` covers
    /// `[i, i + 1) x [j, j + 1)`; positions outside the raster yield `None`.
    pub(crate) fn sample(
        raster: &RgbaImage,
        x: f64,
        y: f64,
        interpolation: Interpolation,
    ) -> Option<[u8; 4]> {
        let (width, height) = raster.dimensions();
        if !(x >= 0.0 && y >= 0.0 && x < width as f64 && y < height as f64) {
            return None;
        }

        match interpolation {
            Interpolation::Nearest => Some(raster.get_pixel(x as u32, y as u32).0),
            Interpolation::Bilinear => {
                // Pixel centers sit at half-pixel offsets.
                let src_x = (x - 0.5).clamp(0.0, (width - 1) as f64) as f32;
                let src_y = (y - 0.5).clamp(0.0, (height - 1) as f64) as f32;
                Some(Self::bilinear_interpolate(raster, src_y, src_x))
            }
        }
    }

    #[inline]
    pub(crate) fn bilinear_interpolate(raster: &RgbaImage, y: f32, x: f32) -> [u8; 4] {
        let (width, height) = raster.dimensions();

        let y0 = y.floor() as u32;
        let x0 = x.floor() as u32;
        let y1 = (y0 + 1).min(height - 1);
        let x1 = (x0 + 1).min(width - 1);

        let dy = y - y0 as f32;
        let dx = x - x0 as f32;
        let one_minus_dx = 1.0 - dx;
        let one_minus_dy = 1.0 - dy;

        let p00 = raster.get_pixel(x0, y0).0;
        let p01 = raster.get_pixel(x1, y0).0;
        let p10 = raster.get_pixel(x0, y1).0;
        let p11 = raster.get_pixel(x1, y1).0;

        let mut out = [0u8; 4];
        for (c, value) in out.iter_mut().enumerate() {
            let v0 = (p00[c] as f32).mul_add(one_minus_dx, p01[c] as f32 * dx);
            let v1 = (p10[c] as f32).mul_add(one_minus_dx, p11[c] as f32 * dx);
            *value = v0.mul_add(one_minus_dy, v1 * dy).round().clamp(0.0, 255.0) as u8;
        }
        out
    }
}

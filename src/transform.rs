//! Affine matrices that place a frame inside the viewport.
//!
//! Three matrices are involved:
//!  - the fit matrix scales the frame uniformly so that it fits the viewport
//!    and centers it along the unconstrained axis,
//!  - the zoom-pan matrix holds the user's zoom step and pan factor,
//!  - the viewport matrix `fit * zoom_pan` maps image space to screen space.

use crate::error::GeometryError;
use crate::geometry::{Matrix, Point, Size};

/// Growth of the scale per zoom step.
pub const ZOOM_STEP_SIZE: f64 = 1.25;
pub const MIN_ZOOM_STEP: f64 = 0.0;
pub const MAX_ZOOM_STEP: f64 = 10.0;

/// Scale of a zoom step.
pub fn zoom_scale(step: f64) -> f64 {
    ZOOM_STEP_SIZE.powf(step)
}

/// Inverse of [`zoom_scale`]. Only meaningful for uniform scales.
pub fn zoom_step_from_scale(scale: f64) -> f64 {
    scale.ln() / ZOOM_STEP_SIZE.ln()
}

/// Uniformly scales `src` into `dst` and centers it.
pub fn scale_to_fit(src: Size, dst: Size) -> Result<Matrix, GeometryError> {
    if !src.is_valid() || !dst.is_valid() {
        return Err(GeometryError::EmptyViewport);
    }

    let dst_ratio = dst.width / dst.height;
    let src_ratio = src.width / src.height;

    let (scaled_width, scaled_height) = if src_ratio > dst_ratio {
        (dst.width, dst.width / src_ratio)
    } else {
        (dst.height * src_ratio, dst.height)
    };

    let offset_x = (dst.width - scaled_width) / 2.0;
    let offset_y = (dst.height - scaled_height) / 2.0;

    let scale = (scaled_width / src.width).min(scaled_height / src.height);

    Ok(Matrix::translate(offset_x, offset_y) * Matrix::scale(scale))
}

/// `translate(pan) * scale(1.25^step)`.
pub fn zoom_pan_matrix(zoom_step: f64, pan_factor: Point) -> Matrix {
    Matrix::translate(pan_factor.x, pan_factor.y) * Matrix::scale(zoom_scale(zoom_step))
}

/// The matrices derived from viewport size, frame size, zoom step and pan.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewportMatrices {
    pub fit: Matrix,
    pub zoom_pan: Matrix,
    pub viewport: Matrix,
}

impl ViewportMatrices {
    /// An empty viewport or frame falls back to an identity fit matrix.
    pub fn new(viewport_size: Size, frame_size: Size, zoom_step: f64, pan_factor: Point) -> Self {
        let fit = scale_to_fit(frame_size, viewport_size).unwrap_or(Matrix::IDENTITY);
        let zoom_pan = zoom_pan_matrix(zoom_step, pan_factor);
        Self {
            fit,
            zoom_pan,
            viewport: fit * zoom_pan,
        }
    }

    pub fn to_screen(&self, image: Point) -> Point {
        self.viewport.apply(image)
    }

    pub fn to_image(&self, screen: Point) -> Result<Point, GeometryError> {
        self.viewport
            .inverse()
            .map(|inv| inv.apply(screen))
            .ok_or(GeometryError::SingularMatrix)
    }
}

/// Zoom step and pan factor that center and maximize an image-space region.
///
/// The region's scale is clamped so that the resulting zoom never exceeds
/// [`MAX_ZOOM_STEP`]. A region that would need zooming out past the fit state
/// yields the fit state itself.
pub fn focus_region(
    matrices: &ViewportMatrices,
    viewport_size: Size,
    top_left: Point,
    bottom_right: Point,
) -> Result<(f64, Point), GeometryError> {
    if !viewport_size.is_valid() {
        return Err(GeometryError::EmptyViewport);
    }
    let inverse_fit = matrices.fit.inverse().ok_or(GeometryError::SingularMatrix)?;

    let min = Point::new(top_left.x.min(bottom_right.x), top_left.y.min(bottom_right.y));
    let max = Point::new(top_left.x.max(bottom_right.x), top_left.y.max(bottom_right.y));
    let region_center = min.midpoint(max);

    let top_left_screen = matrices.viewport.apply(min);
    let bottom_right_screen = matrices.viewport.apply(max);
    let region_width_screen = bottom_right_screen.x - top_left_screen.x;
    let region_height_screen = bottom_right_screen.y - top_left_screen.y;

    let w_ratio = viewport_size.width / region_width_screen;
    let h_ratio = viewport_size.height / region_height_screen;
    let scale_factor = w_ratio.min(h_ratio);

    let max_scale = zoom_scale(MAX_ZOOM_STEP) * matrices.fit.a / matrices.viewport.a;
    let clamped = scale_factor.min(max_scale).max(0.0);

    let scaled = Matrix::scale(clamped) * matrices.viewport;
    let region_center_screen = scaled.apply(region_center);
    let viewport_center = viewport_size.center();

    let next = Matrix::translate(
        viewport_center.x - region_center_screen.x,
        viewport_center.y - region_center_screen.y,
    ) * scaled;
    let next_zoom_pan = inverse_fit * next;

    let step = zoom_step_from_scale(next_zoom_pan.a);
    if !step.is_finite() || step <= MIN_ZOOM_STEP {
        return Ok((MIN_ZOOM_STEP, Point::ORIGIN));
    }
    Ok((step.min(MAX_ZOOM_STEP), next_zoom_pan.translation()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn assert_matrix(m: Matrix, scale: f64, e: f64, f: f64) {
        assert_abs_diff_eq!(m.a, scale, epsilon = 1e-12);
        assert_abs_diff_eq!(m.d, scale, epsilon = 1e-12);
        assert_abs_diff_eq!(m.b, 0.0);
        assert_abs_diff_eq!(m.c, 0.0);
        assert_abs_diff_eq!(m.e, e, epsilon = 1e-9);
        assert_abs_diff_eq!(m.f, f, epsilon = 1e-9);
    }

    fn fit(sw: f64, sh: f64, dw: f64, dh: f64) -> Matrix {
        scale_to_fit(Size::new(sw, sh), Size::new(dw, dh)).unwrap()
    }

    #[test]
    fn shrinks_source_to_destination() {
        assert_matrix(fit(500.0, 200.0, 100.0, 40.0), 0.2, 0.0, 0.0);
    }

    #[test]
    fn enlarges_source_to_destination() {
        assert_matrix(fit(125.0, 200.0, 500.0, 800.0), 4.0, 0.0, 0.0);
    }

    #[test]
    fn centers_horizontally() {
        assert_matrix(fit(300.0, 300.0, 500.0, 300.0), 1.0, 100.0, 0.0);
    }

    #[test]
    fn centers_vertically() {
        assert_matrix(fit(425.0, 150.0, 425.0, 650.0), 1.0, 0.0, 250.0);
    }

    #[test]
    fn scales_and_centers() {
        assert_matrix(fit(160.0, 540.0, 720.0, 270.0), 0.5, 320.0, 0.0);
    }

    #[test]
    fn fitted_source_stays_inside_destination() {
        for (sw, sh, dw, dh) in [
            (512.0, 512.0, 800.0, 600.0),
            (64.0, 1024.0, 333.0, 777.0),
            (1.0, 3.0, 1920.0, 1080.0),
        ] {
            let m = fit(sw, sh, dw, dh);
            let expected = (dw / sw).min(dh / sh);
            assert_abs_diff_eq!(m.a, expected, epsilon = 1e-12);
            assert!(sw * m.a <= dw + 1e-9);
            assert!(sh * m.a <= dh + 1e-9);
            assert_abs_diff_eq!(m.e, (dw - sw * m.a) / 2.0, epsilon = 1e-9);
            assert_abs_diff_eq!(m.f, (dh - sh * m.a) / 2.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn empty_sizes_are_rejected() {
        assert_eq!(
            scale_to_fit(Size::new(0.0, 10.0), Size::new(10.0, 10.0)),
            Err(GeometryError::EmptyViewport)
        );
        assert_eq!(
            scale_to_fit(Size::new(10.0, 10.0), Size::new(10.0, 0.0)),
            Err(GeometryError::EmptyViewport)
        );
    }

    #[test]
    fn zoom_pan_scales_then_translates() {
        let m = zoom_pan_matrix(2.0, Point::new(5.0, -3.0));
        assert_matrix(m, 1.5625, 5.0, -3.0);
    }

    #[test]
    fn zoom_step_round_trips_through_scale() {
        for step in [0.0, 1.0, 3.5, 10.0] {
            assert_abs_diff_eq!(zoom_step_from_scale(zoom_scale(step)), step, epsilon = 1e-9);
        }
    }

    #[test]
    fn image_and_screen_round_trip() {
        let m = ViewportMatrices::new(
            Size::new(800.0, 600.0),
            Size::new(512.0, 256.0),
            4.0,
            Point::new(-37.0, 12.5),
        );
        for p in [Point::new(0.0, 0.0), Point::new(511.0, 255.0), Point::new(100.25, 3.75)] {
            let back = m.to_image(m.to_screen(p)).unwrap();
            assert_abs_diff_eq!(back.x, p.x, epsilon = 1e-9);
            assert_abs_diff_eq!(back.y, p.y, epsilon = 1e-9);
        }
    }

    #[test]
    fn empty_viewport_uses_identity_fit() {
        let m = ViewportMatrices::new(Size::default(), Size::new(10.0, 10.0), 0.0, Point::ORIGIN);
        assert_eq!(m.fit, Matrix::IDENTITY);
    }

    #[test]
    fn focus_region_centers_region() {
        let viewport = Size::new(400.0, 400.0);
        let m = ViewportMatrices::new(viewport, Size::new(100.0, 100.0), 0.0, Point::ORIGIN);
        let (step, pan) =
            focus_region(&m, viewport, Point::new(25.0, 25.0), Point::new(75.0, 75.0)).unwrap();

        // A region of half the frame needs scale 2.
        assert_abs_diff_eq!(step, zoom_step_from_scale(2.0), epsilon = 1e-9);

        let next = ViewportMatrices::new(viewport, Size::new(100.0, 100.0), step, pan);
        let center = next.to_screen(Point::new(50.0, 50.0));
        assert_abs_diff_eq!(center.x, 200.0, epsilon = 1e-9);
        assert_abs_diff_eq!(center.y, 200.0, epsilon = 1e-9);
    }

    #[test]
    fn focus_region_clamps_to_max_zoom() {
        let viewport = Size::new(400.0, 400.0);
        let m = ViewportMatrices::new(viewport, Size::new(100.0, 100.0), 0.0, Point::ORIGIN);
        let (step, _) =
            focus_region(&m, viewport, Point::new(50.0, 50.0), Point::new(50.01, 50.01)).unwrap();
        assert_abs_diff_eq!(step, MAX_ZOOM_STEP, epsilon = 1e-9);
    }

    #[test]
    fn focus_region_larger_than_frame_resets() {
        let viewport = Size::new(400.0, 400.0);
        let m = ViewportMatrices::new(viewport, Size::new(100.0, 100.0), 0.0, Point::ORIGIN);
        let (step, pan) =
            focus_region(&m, viewport, Point::new(-100.0, -100.0), Point::new(200.0, 200.0))
                .unwrap();
        assert_eq!(step, 0.0);
        assert_eq!(pan, Point::ORIGIN);
    }

    #[test]
    fn focus_region_needs_a_viewport() {
        let m = ViewportMatrices::default();
        assert_eq!(
            focus_region(&m, Size::default(), Point::ORIGIN, Point::new(1.0, 1.0)),
            Err(GeometryError::EmptyViewport)
        );
    }
}

//! The viewport surface: sizing, gesture interpretation and rendering of one
//! frame through the viewport matrix.

use image::RgbaImage;
use rayon::prelude::*;
use tracing::debug;

use crate::config::ViewportConfig;
use crate::contrast_brightness::{self as cb, DisplayFilter};
use crate::enums::{InteractionMode, PointerKind};
use crate::error::GeometryError;
use crate::geometry::{Matrix, Point, Size};
use crate::interpolator::Interpolator;
use crate::transform::{
    self, MAX_ZOOM_STEP, ViewportMatrices, ZOOM_STEP_SIZE, zoom_step_from_scale,
};

/// User-controlled display state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    /// Exponent of [`ZOOM_STEP_SIZE`], in `[0, 10]`. Whole steps except
    /// after a pinch.
    pub zoom_step: f64,
    pub pan_factor: Point,
    pub brightness: f64,
    pub contrast: f64,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            zoom_step: 0.0,
            pan_factor: Point::ORIGIN,
            brightness: cb::DEFAULT,
            contrast: cb::DEFAULT,
            flip_horizontal: false,
            flip_vertical: false,
        }
    }
}

impl ViewportState {
    fn reset_zoom(&mut self) {
        self.zoom_step = 0.0;
        self.pan_factor = Point::ORIGIN;
    }
}

/// What overlays need to project image-space geometry onto the screen.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewportContext {
    /// Image space to screen space.
    pub matrix: Matrix,
    pub zoom_pan_matrix: Matrix,
    pub image_dimensions: Size,
}

impl ViewportContext {
    pub fn to_screen(&self, image: Point) -> Point {
        self.matrix.apply(image)
    }

    /// Uniform scale of the zoom-pan matrix.
    pub fn zoom_scale(&self) -> f64 {
        self.zoom_pan_matrix.a
    }
}

/// A pointer sample in screen space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerInput {
    pub position: Point,
    pub kind: PointerKind,
}

impl PointerInput {
    pub fn mouse(x: f64, y: f64) -> Self {
        Self {
            position: Point::new(x, y),
            kind: PointerKind::Mouse,
        }
    }

    pub fn touch(x: f64, y: f64) -> Self {
        Self {
            position: Point::new(x, y),
            kind: PointerKind::Touch,
        }
    }
}

/// A pointer event translated into image space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportEvent {
    pub position: Point,
    pub is_over_image: bool,
}

/// Gesture in progress.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Gesture {
    #[default]
    Idle,
    /// Mouse drag; `start` is the image-space position at pointer-down.
    Panning { start: Point },
    /// Contrast/brightness drag; `start` is the screen position at pointer-down.
    Adjusting {
        start: Point,
        contrast: f64,
        brightness: f64,
    },
    /// Touches on the surface, in image space at the last touch start or end.
    Pinching { starts: Vec<Point> },
}

pub struct ViewportSurface {
    config: ViewportConfig,
    viewport_size: Size,
    frame_size: Size,
    state: ViewportState,
    mode: InteractionMode,
    gesture: Gesture,
    multi_touch: bool,
}

impl ViewportSurface {
    pub fn new(config: ViewportConfig) -> Self {
        Self {
            config,
            viewport_size: Size::default(),
            frame_size: Size::default(),
            state: ViewportState::default(),
            mode: InteractionMode::default(),
            gesture: Gesture::default(),
            multi_touch: false,
        }
    }

    pub fn state(&self) -> &ViewportState {
        &self.state
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: InteractionMode) {
        self.mode = mode;
        self.gesture = match std::mem::take(&mut self.gesture) {
            pinch @ Gesture::Pinching { .. } => pinch,
            _ => Gesture::Idle,
        };
    }

    pub fn viewport_size(&self) -> Size {
        self.viewport_size
    }

    pub fn frame_size(&self) -> Size {
        self.frame_size
    }

    /// Record a measurement of the container. Returns `true` on change.
    pub fn resize(&mut self, size: Size) -> bool {
        if size == self.viewport_size {
            return false;
        }
        if !size.is_valid() {
            debug!(width = size.width, height = size.height, "Viewport has no area");
        }
        self.viewport_size = size;
        true
    }

    pub fn set_frame_size(&mut self, size: Size) {
        self.frame_size = size;
    }

    pub fn matrices(&self) -> ViewportMatrices {
        ViewportMatrices::new(
            self.viewport_size,
            self.frame_size,
            self.state.zoom_step,
            self.state.pan_factor,
        )
    }

    pub fn context(&self) -> ViewportContext {
        let matrices = self.matrices();
        ViewportContext {
            matrix: matrices.viewport,
            zoom_pan_matrix: matrices.zoom_pan,
            image_dimensions: self.frame_size,
        }
    }

    fn check_geometry(&self) -> Result<(), GeometryError> {
        if !self.viewport_size.is_valid() {
            return Err(GeometryError::EmptyViewport);
        }
        if !self.frame_size.is_valid() {
            return Err(GeometryError::NoFrame);
        }
        Ok(())
    }

    /// Screen space to image space.
    pub fn to_image(&self, screen: Point) -> Result<Point, GeometryError> {
        self.check_geometry()?;
        self.matrices().to_image(screen)
    }

    pub fn is_on_image(&self, position: Point) -> bool {
        self.frame_size.contains(position)
    }

    fn event_at(&self, screen: Point) -> Option<ViewportEvent> {
        match self.to_image(screen) {
            Ok(position) => Some(ViewportEvent {
                position,
                is_over_image: self.is_on_image(position),
            }),
            Err(error) => {
                debug!(%error, "Ignoring pointer input");
                None
            }
        }
    }

    /// Zoom one step around a screen position. Zooming out of the first step
    /// returns to the fit state; zooming in stops at [`MAX_ZOOM_STEP`].
    pub fn zoom_at(&mut self, pivot: Point, zoom_in: bool) -> bool {
        let current = self.state.zoom_step;
        let step = if zoom_in {
            if current >= MAX_ZOOM_STEP {
                return false;
            }
            (current + 1.0).min(MAX_ZOOM_STEP)
        } else {
            current - 1.0
        };

        if step <= 0.0 {
            self.state.reset_zoom();
            return true;
        }

        let Ok(pos) = self.to_image(pivot) else {
            debug!("Zoom without frame or viewport");
            return false;
        };
        // A pinch can leave a fractional step, so the last step in may be short.
        let step_size = ZOOM_STEP_SIZE.powf(step - current);
        let next = Matrix::compose(&[
            self.matrices().zoom_pan,
            Matrix::translate(pos.x, pos.y),
            Matrix::scale(step_size),
            Matrix::translate(-pos.x, -pos.y),
        ]);

        self.state.zoom_step = step;
        self.state.pan_factor = next.translation();
        true
    }

    pub fn zoom_in(&mut self) -> bool {
        self.zoom_at(self.viewport_size.center(), true)
    }

    pub fn zoom_out(&mut self) -> bool {
        self.zoom_at(self.viewport_size.center(), false)
    }

    /// One wheel tick. Negative `delta_y` zooms in.
    pub fn wheel(&mut self, screen: Point, delta_y: f64) -> bool {
        if matches!(self.gesture, Gesture::Panning { .. }) || delta_y == 0.0 {
            return false;
        }
        self.zoom_at(screen, delta_y < 0.0)
    }

    pub fn pointer_down(&mut self, input: PointerInput) -> Option<ViewportEvent> {
        if self.multi_touch {
            return None;
        }
        let event = self.event_at(input.position)?;

        if input.kind == PointerKind::Mouse {
            if self.mode == InteractionMode::Brightness {
                self.gesture = Gesture::Adjusting {
                    start: input.position,
                    contrast: self.state.contrast,
                    brightness: self.state.brightness,
                };
            } else if self.mode.pans() && self.state.zoom_step != 0.0 {
                self.gesture = Gesture::Panning {
                    start: event.position,
                };
            }
        }
        Some(event)
    }

    pub fn pointer_move(&mut self, input: PointerInput) -> Option<ViewportEvent> {
        if self.multi_touch {
            return None;
        }
        let event = self.event_at(input.position)?;
        if input.kind != PointerKind::Mouse {
            return Some(event);
        }

        match self.gesture {
            Gesture::Panning { start } => {
                let next = self.matrices().zoom_pan
                    * Matrix::translate(event.position.x - start.x, event.position.y - start.y);
                self.state.pan_factor = next.translation();
            }
            Gesture::Adjusting {
                start,
                contrast,
                brightness,
            } => {
                let dx = (input.position.x - start.x) / self.config.contrast_sensitivity;
                let dy = (input.position.y - start.y) / self.config.brightness_sensitivity;
                self.state.contrast = cb::clamp(contrast - dx);
                self.state.brightness = cb::clamp(brightness + dy);
            }
            _ => {}
        }
        Some(event)
    }

    pub fn pointer_up(&mut self, input: PointerInput) -> Option<ViewportEvent> {
        if self.multi_touch {
            return None;
        }
        if matches!(
            self.gesture,
            Gesture::Panning { .. } | Gesture::Adjusting { .. }
        ) {
            self.gesture = Gesture::Idle;
        }
        self.event_at(input.position)
    }

    pub fn double_click(&mut self, screen: Point) -> Option<ViewportEvent> {
        self.event_at(screen)
    }

    fn touch_positions(&self, touches: &[Point]) -> Option<Vec<Point>> {
        touches.iter().map(|t| self.to_image(*t).ok()).collect()
    }

    /// `touches` holds every touch on the surface after the new one landed.
    pub fn touch_start(&mut self, touches: &[Point]) {
        self.multi_touch = self.multi_touch || touches.len() > 1;
        if !self.multi_touch {
            return;
        }
        let starts = self.touch_positions(touches).unwrap_or_default();
        self.gesture = Gesture::Pinching { starts };
    }

    /// `touches` holds the touches that remain on the surface.
    pub fn touch_end(&mut self, touches: &[Point]) {
        self.multi_touch = self.multi_touch && !touches.is_empty();
        self.gesture = if self.multi_touch {
            Gesture::Pinching {
                starts: self.touch_positions(touches).unwrap_or_default(),
            }
        } else {
            Gesture::Idle
        };
    }

    /// Pinch zoom and two-finger pan. Returns `true` if the state changed.
    pub fn touch_move(&mut self, touches: &[Point]) -> bool {
        let [t1, t2, ..] = touches else {
            return false;
        };
        let Gesture::Pinching { starts } = &self.gesture else {
            return false;
        };
        let [start1, start2, ..] = starts[..] else {
            return false;
        };
        let (Ok(p1), Ok(p2)) = (self.to_image(*t1), self.to_image(*t2)) else {
            return false;
        };

        let center = p1.midpoint(p2);
        let prev_center = start1.midpoint(start2);
        let prev_distance = start1.distance_to(start2);
        if prev_distance == 0.0 {
            return false;
        }
        let distance_factor = p1.distance_to(p2) / prev_distance;

        let m = Matrix::compose(&[
            self.matrices().zoom_pan,
            Matrix::translate(center.x, center.y),
            Matrix::scale(distance_factor),
            Matrix::translate(-center.x, -center.y),
            Matrix::translate(center.x - prev_center.x, center.y - prev_center.y),
        ]);

        let mut zoom_step = zoom_step_from_scale(m.a);
        let mut pan_factor = m.translation();
        if zoom_step >= MAX_ZOOM_STEP || zoom_step.is_nan() {
            return false;
        }
        if zoom_step <= 0.0 {
            zoom_step = 0.0;
            pan_factor = Point::ORIGIN;
        }

        let changed = zoom_step != self.state.zoom_step || pan_factor != self.state.pan_factor;
        self.state.zoom_step = zoom_step;
        self.state.pan_factor = pan_factor;
        changed
    }

    /// Zoom and pan so that an image-space rectangle fills the viewport.
    pub fn focus_region(&mut self, top_left: Point, bottom_right: Point) -> Result<(), GeometryError> {
        self.check_geometry()?;
        let (zoom_step, pan_factor) =
            transform::focus_region(&self.matrices(), self.viewport_size, top_left, bottom_right)?;
        self.state.zoom_step = zoom_step;
        self.state.pan_factor = pan_factor;
        Ok(())
    }

    pub fn brightness_up(&mut self) {
        self.state.brightness = cb::clamp(self.state.brightness + self.config.brightness_step);
    }

    pub fn brightness_down(&mut self) {
        self.state.brightness = cb::clamp(self.state.brightness - self.config.brightness_step);
    }

    pub fn set_contrast(&mut self, contrast: f64) {
        self.state.contrast = cb::clamp(contrast);
    }

    pub fn set_brightness(&mut self, brightness: f64) {
        self.state.brightness = cb::clamp(brightness);
    }

    pub fn flip_horizontal(&mut self) {
        self.state.flip_horizontal = !self.state.flip_horizontal;
    }

    pub fn flip_vertical(&mut self) {
        self.state.flip_vertical = !self.state.flip_vertical;
    }

    /// Back to the fit state with default contrast and brightness.
    pub fn reset(&mut self) {
        self.state = ViewportState::default();
        self.gesture = Gesture::Idle;
        self.multi_touch = false;
    }

    /// Negative-scale pre-pass mirroring the raster inside its own bounds.
    fn flip_matrix(&self, size: Size) -> Matrix {
        let (sx, tx) = if self.state.flip_horizontal {
            (-1.0, size.width)
        } else {
            (1.0, 0.0)
        };
        let (sy, ty) = if self.state.flip_vertical {
            (-1.0, size.height)
        } else {
            (1.0, 0.0)
        };
        Matrix::translate(tx, ty) * Matrix::scale_xy(sx, sy)
    }

    /// Draw the raster into a viewport-sized image with the current matrix and
    /// display filter. `None` when the viewport has no area.
    pub fn render(&self, raster: &RgbaImage) -> Option<RgbaImage> {
        if !self.viewport_size.is_valid() {
            return None;
        }
        let width = self.viewport_size.width.round() as u32;
        let height = self.viewport_size.height.round() as u32;
        if width == 0 || height == 0 {
            return None;
        }

        let raster_size = Size::new(raster.width() as f64, raster.height() as f64);
        let matrices = ViewportMatrices::new(
            self.viewport_size,
            raster_size,
            self.state.zoom_step,
            self.state.pan_factor,
        );
        let inverse = matrices.viewport.inverse()?;
        let screen_to_source = self.flip_matrix(raster_size) * inverse;

        let filter = DisplayFilter::from_values(self.state.contrast, self.state.brightness);
        let lut = (!filter.is_identity()).then(|| filter.lut());
        let [red, green, blue] = self.config.background;
        let background = [red, green, blue, u8::MAX];
        let interpolation = self.config.interpolation;

        let mut out = RgbaImage::new(width, height);
        let buffer: &mut [u8] = &mut out;
        buffer
            .par_chunks_mut(width as usize * 4)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, pixel) in row.chunks_exact_mut(4).enumerate() {
                    let screen = Point::new(x as f64 + 0.5, y as f64 + 0.5);
                    let src = screen_to_source.apply(screen);
                    let value = Interpolator::sample(raster, src.x, src.y, interpolation)
                        .map(|[r, g, b, a]| match &lut {
                            Some(lut) => [lut[r as usize], lut[g as usize], lut[b as usize], a],
                            None => [r, g, b, a],
                        })
                        .unwrap_or(background);
                    pixel.copy_from_slice(&value);
                }
            });
        Some(out)
    }
}

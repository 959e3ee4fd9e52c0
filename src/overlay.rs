//! Image-space overlay primitives and the measurement and annotation tools
//! that create them.
//!
//! Overlays keep their anchors in image space. Every render projects them
//! through the [`ViewportContext`] of the surface, so they follow pan, zoom
//! and resize without being touched.

use serde::{Deserialize, Serialize};

use crate::config::OverlayConfig;
use crate::geometry::Point;
use crate::viewport::ViewportContext;

/// Screen-space drawing instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum ScreenShape {
    Circle { center: Point, radius: f64 },
    Polyline { points: Vec<Point> },
    Text { position: Point, text: String },
}

pub trait Overlay {
    /// Append the screen-space shapes of this overlay.
    fn project(&self, context: &ViewportContext, style: &OverlayConfig, shapes: &mut Vec<ScreenShape>);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marker {
    pub position: Point,
}

impl Marker {
    pub fn screen_radius(context: &ViewportContext, style: &OverlayConfig) -> f64 {
        if style.fixed_size_markers {
            style.marker_radius
        } else {
            style.marker_radius * context.zoom_scale()
        }
    }
}

impl Overlay for Marker {
    fn project(&self, context: &ViewportContext, style: &OverlayConfig, shapes: &mut Vec<ScreenShape>) {
        shapes.push(ScreenShape::Circle {
            center: context.to_screen(self.position),
            radius: Self::screen_radius(context, style),
        });
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Polyline {
    pub points: Vec<Point>,
}

impl Overlay for Polyline {
    fn project(&self, context: &ViewportContext, _style: &OverlayConfig, shapes: &mut Vec<ScreenShape>) {
        if self.points.len() < 2 {
            return;
        }
        shapes.push(ScreenShape::Polyline {
            points: self.points.iter().map(|p| context.to_screen(*p)).collect(),
        });
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub position: Point,
    pub text: String,
}

impl Overlay for Label {
    fn project(&self, context: &ViewportContext, _style: &OverlayConfig, shapes: &mut Vec<ScreenShape>) {
        shapes.push(ScreenShape::Text {
            position: context.to_screen(self.position),
            text: self.text.clone(),
        });
    }
}

/// Format a distance with at most `precision` decimals, without trailing zeros.
pub fn format_distance(distance: f64, precision: usize) -> String {
    let text = format!("{distance:.precision$}");
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    }
}

/// A distance measurement between two image-space points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub p1: Point,
    pub p2: Point,
}

impl Measurement {
    pub fn new(p1: Point, p2: Point) -> Self {
        Self { p1, p2 }
    }

    /// Distance in image pixels.
    pub fn distance(&self) -> f64 {
        self.p1.distance_to(self.p2)
    }

    pub fn midpoint(&self) -> Point {
        self.p1.midpoint(self.p2)
    }

    pub fn label(&self, precision: usize) -> String {
        format_distance(self.distance(), precision)
    }
}

impl Overlay for Measurement {
    fn project(&self, context: &ViewportContext, style: &OverlayConfig, shapes: &mut Vec<ScreenShape>) {
        Polyline {
            points: vec![self.p1, self.p2],
        }
        .project(context, style, shapes);
        Marker { position: self.p1 }.project(context, style, shapes);
        Marker { position: self.p2 }.project(context, style, shapes);
        Label {
            position: self.midpoint(),
            text: self.label(style.distance_precision),
        }
        .project(context, style, shapes);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: u64,
    pub position: Point,
    pub text: String,
}

impl Overlay for Annotation {
    fn project(&self, context: &ViewportContext, style: &OverlayConfig, shapes: &mut Vec<ScreenShape>) {
        Marker {
            position: self.position,
        }
        .project(context, style, shapes);

        let anchor = context.to_screen(self.position);
        let offset = Marker::screen_radius(context, style);
        shapes.push(ScreenShape::Text {
            position: Point::new(anchor.x + offset, anchor.y - offset),
            text: self.text.clone(),
        });
    }
}

/// Two-click distance measurement with a live preview.
#[derive(Debug, Clone, Default)]
pub struct MeasurementTool {
    pending: Option<Point>,
    cursor: Option<Point>,
    measurements: Vec<Measurement>,
}

impl MeasurementTool {
    /// The first click sets the pending point, the second completes the
    /// measurement.
    pub fn click(&mut self, position: Point) -> Option<Measurement> {
        match self.pending.take() {
            Some(p1) => {
                let measurement = Measurement::new(p1, position);
                self.measurements.push(measurement);
                self.cursor = None;
                Some(measurement)
            }
            None => {
                self.pending = Some(position);
                self.cursor = Some(position);
                None
            }
        }
    }

    pub fn hover(&mut self, position: Point) {
        if self.pending.is_some() {
            self.cursor = Some(position);
        }
    }

    pub fn pending(&self) -> Option<Point> {
        self.pending
    }

    /// Segment from the pending point to the cursor.
    pub fn preview(&self) -> Option<Measurement> {
        Some(Measurement::new(self.pending?, self.cursor?))
    }

    /// Drop the pending point without touching completed measurements.
    pub fn cancel(&mut self) {
        self.pending = None;
        self.cursor = None;
    }

    pub fn measurements(&self) -> &[Measurement] {
        &self.measurements
    }

    pub fn clear(&mut self) {
        self.cancel();
        self.measurements.clear();
    }
}

impl Overlay for MeasurementTool {
    fn project(&self, context: &ViewportContext, style: &OverlayConfig, shapes: &mut Vec<ScreenShape>) {
        for measurement in &self.measurements {
            measurement.project(context, style, shapes);
        }
        if let Some(preview) = self.preview() {
            preview.project(context, style, shapes);
        }
    }
}

/// Source of annotation text. `None` cancels the annotation.
pub trait AnnotationPrompt {
    fn prompt(&mut self, position: Point) -> Option<String>;
}

impl<F> AnnotationPrompt for F
where
    F: FnMut(Point) -> Option<String>,
{
    fn prompt(&mut self, position: Point) -> Option<String> {
        self(position)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnnotationTool {
    next_id: u64,
    annotations: Vec<Annotation>,
}

impl AnnotationTool {
    /// Ask for text and place an annotation. Cancelled or blank text places
    /// nothing.
    pub fn click(&mut self, position: Point, prompt: &mut dyn AnnotationPrompt) -> Option<&Annotation> {
        let text = prompt.prompt(position)?;
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        self.next_id += 1;
        self.annotations.push(Annotation {
            id: self.next_id,
            position,
            text: text.to_string(),
        });
        self.annotations.last()
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn clear(&mut self) {
        self.annotations.clear();
    }
}

impl Overlay for AnnotationTool {
    fn project(&self, context: &ViewportContext, style: &OverlayConfig, shapes: &mut Vec<ScreenShape>) {
        for annotation in &self.annotations {
            annotation.project(context, style, shapes);
        }
    }
}

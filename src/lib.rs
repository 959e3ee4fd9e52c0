//! # DICOM-viewport library
//!
//! This crate provides the core of an interactive viewer for single- and
//! multi-frame DICOM series: the affine transform model, gesture handling,
//! contrast/brightness, asynchronous frame loading and the overlays drawn on
//! top of the image.
//!
//! This library builds on the dicom-rs ecosystem to decode frames into 8-bit
//! grayscale rasters. Frames of a series are fetched and decoded on the tokio
//! runtime and committed to a per-series cache by the owner of the viewer, so
//! a series switch never lets a stale frame through. Rendering runs in
//! parallel using rayon.
//!
//! Coordinates live in one of two spaces:
//!  - Image space: pixels of the decoded frame
//!  - Screen space: pixels of the viewport
//!
//! A single matrix maps image space to screen space. It is composed from the
//! fit of the frame into the viewport and the user's zoom and pan. Pointer
//! input is mapped back through its inverse before it is interpreted.
//! DICOM files are assumed to have the following attributes:
//!  - Native (not encapsulated) pixel data
//!  - 8 or 16 bits allocated, one sample per pixel
//!  - One frame per file
//!
//! # Examples
//!
//! ## Showing the key image of a series
//!
//! Select all DICOM files of the dicom/ directory, wait for the key image,
//! zoom in two steps and render the viewport.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use dicom_viewport::{FileSource, Series, Size, Viewer, ViewerConfig};
//! # async fn run() {
//! let mut viewer = Viewer::new(Arc::new(FileSource::new()), ViewerConfig::default());
//! viewer.resize(Size::new(512.0, 512.0));
//! viewer.set_series(Series::from_directory("dicom").expect("should have listed directory"));
//! viewer.wait_for_current().await;
//! viewer.zoom_in();
//! viewer.zoom_in();
//! let image = viewer.render().expect("should have rendered key image");
//! image.save("result.png");
//! # }
//! ```

pub mod cine;
pub mod config;
pub mod contrast_brightness;
pub mod enums;
pub mod error;
pub mod frame_cache;
pub mod frame_decoder;
pub mod frame_source;
pub mod geometry;
mod interpolator;
pub mod overlay;
pub mod transform;
pub mod viewer;
pub mod viewport;

pub use config::ViewerConfig;
pub use enums::{InteractionMode, Interpolation, PointerKind};
pub use frame_cache::{FrameCache, LoadEvent};
pub use frame_decoder::{DecodedFrame, FrameDecoder, Metadata};
pub use frame_source::{FileSource, FrameSource, Series};
pub use geometry::{Matrix, Point, Size};
pub use viewer::{Viewer, ViewerCommand, ViewerHandle};
pub use viewport::{PointerInput, ViewportEvent, ViewportSurface};

//! The viewer: one series, one viewport, the active interaction mode and the
//! overlays drawn on top.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use image::RgbaImage;
use tracing::{debug, info, warn};
use web_time::Duration;

use crate::cine::CinePlayer;
use crate::config::ViewerConfig;
use crate::enums::InteractionMode;
use crate::frame_cache::{CacheState, FrameCache, LoadEvent};
use crate::frame_decoder::{DecodedFrame, Metadata};
use crate::frame_source::{FrameSource, Series};
use crate::geometry::{Point, Size};
use crate::overlay::{AnnotationPrompt, AnnotationTool, MeasurementTool, Overlay, ScreenShape};
use crate::viewport::{PointerInput, ViewportEvent, ViewportSurface};

/// Commands the surrounding page can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerCommand {
    ZoomIn,
    ZoomOut,
    BrightnessUp,
    BrightnessDown,
    FlipHorizontal,
    FlipVertical,
    ResetView,
}

type MetadataListener = Box<dyn FnMut(&Metadata)>;

pub struct Viewer {
    config: ViewerConfig,
    cache: FrameCache,
    surface: ViewportSurface,
    cine: CinePlayer,
    current_index: usize,
    measurement: MeasurementTool,
    annotation: AnnotationTool,
    prompt: Option<Box<dyn AnnotationPrompt>>,
    metadata: Option<Metadata>,
    metadata_listener: Option<MetadataListener>,
}

impl Viewer {
    pub fn new(source: Arc<dyn FrameSource>, config: ViewerConfig) -> Self {
        Self {
            cache: FrameCache::new(source),
            surface: ViewportSurface::new(config.viewport.clone()),
            cine: CinePlayer::new(config.playback.frame_rate),
            current_index: 0,
            measurement: MeasurementTool::default(),
            annotation: AnnotationTool::default(),
            prompt: None,
            metadata: None,
            metadata_listener: None,
            config,
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    /// Called with the metadata of frame 0 each time it loads.
    pub fn on_metadata(&mut self, listener: impl FnMut(&Metadata) + 'static) {
        self.metadata_listener = Some(Box::new(listener));
    }

    /// Text source for annotation clicks.
    pub fn set_annotation_prompt(&mut self, prompt: impl AnnotationPrompt + 'static) {
        self.prompt = Some(Box::new(prompt));
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }

    pub fn surface(&self) -> &ViewportSurface {
        &self.surface
    }

    pub fn cache(&self) -> &FrameCache {
        &self.cache
    }

    pub fn state(&self) -> CacheState {
        self.cache.state()
    }

    /// Replace the series. Loads of the previous series are abandoned, the view
    /// and all overlays are reset, and the key image becomes current.
    pub fn set_series(&mut self, series: Series) {
        let key_index = series.key_image_index();
        info!(series_id = series.id(), key_index, "Showing series");

        self.measurement.clear();
        self.annotation.clear();
        self.surface.reset();
        self.surface.set_frame_size(Size::default());
        self.cine.set_looping(false);
        self.metadata = None;

        self.cache.select(series);
        self.current_index = key_index;
        self.cache.request(key_index);
        if self.config.loader.prefetch_on_select {
            self.cache.request_all();
        }
    }

    pub fn clear_series(&mut self) {
        self.cache.clear();
        self.measurement.clear();
        self.annotation.clear();
        self.surface.set_frame_size(Size::default());
        self.current_index = 0;
        self.metadata = None;
    }

    pub fn frame_count(&self) -> usize {
        self.cache.len()
    }

    /// Number of frames ready to display.
    pub fn available_frames(&self) -> usize {
        self.cache.loaded_count()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// The current frame, if it has loaded.
    pub fn current_frame(&self) -> Option<&Arc<DecodedFrame>> {
        self.cache.get(self.current_index)
    }

    fn show(&mut self, index: usize) {
        self.current_index = index;
        match self.cache.get(index).map(|frame| frame.size()) {
            Some(size) => self.surface.set_frame_size(size),
            None => {
                self.cache.request(index);
            }
        }
    }

    /// Show frame `index`, clamped to the series. Stops playback.
    pub fn navigate(&mut self, index: usize) {
        let count = self.frame_count();
        if count == 0 {
            return;
        }
        self.cine.set_looping(false);
        self.show(index.min(count - 1));
    }

    pub fn step_frame(&mut self, delta: isize) {
        self.navigate(self.current_index.saturating_add_signed(delta));
    }

    pub fn is_playing(&self) -> bool {
        self.cine.is_looping()
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.cine.set_looping(playing);
    }

    pub fn frame_rate(&self) -> f64 {
        self.cine.frame_rate()
    }

    pub fn set_frame_rate(&mut self, rate: f64) {
        self.cine.set_frame_rate(rate);
    }

    /// Advance playback. Returns `true` when the current frame changed.
    pub fn tick(&mut self, elapsed: Duration) -> bool {
        let count = self.frame_count();
        match self.cine.tick(elapsed, self.current_index, count) {
            Some(index) if index != self.current_index => {
                self.show(index);
                true
            }
            _ => false,
        }
    }

    /// Commit every finished load.
    pub fn poll_loads(&mut self) -> Vec<LoadEvent> {
        let events = self.cache.poll_loads();
        for event in &events {
            self.handle_load(event);
        }
        events
    }

    /// Wait for the next load of the current series.
    pub async fn next_load(&mut self) -> Option<LoadEvent> {
        let event = self.cache.next_load().await?;
        self.handle_load(&event);
        Some(event)
    }

    /// Wait until the current frame has loaded. Returns `false` if its load
    /// failed or nothing is loading.
    pub async fn wait_for_current(&mut self) -> bool {
        while self.current_frame().is_none() {
            match self.next_load().await {
                Some(LoadEvent::Failed { index, .. }) if index == self.current_index => {
                    return false;
                }
                Some(_) => {}
                None => return false,
            }
        }
        true
    }

    fn handle_load(&mut self, event: &LoadEvent) {
        let LoadEvent::Loaded { index } = *event else {
            return;
        };
        let Some(frame) = self.cache.get(index).cloned() else {
            return;
        };

        if index == 0 {
            if let Some(listener) = self.metadata_listener.as_mut() {
                listener(&frame.metadata);
            }
            self.metadata = Some(frame.metadata.clone());
        }
        if index == self.current_index {
            self.surface.set_frame_size(frame.size());
        }
    }

    pub fn mode(&self) -> InteractionMode {
        self.surface.mode()
    }

    pub fn set_mode(&mut self, mode: InteractionMode) {
        if mode != InteractionMode::Measurement {
            self.measurement.cancel();
        }
        self.surface.set_mode(mode);
    }

    /// Turn `mode` on, or off if it is already active.
    pub fn toggle_mode(&mut self, mode: InteractionMode) {
        if self.mode() == mode {
            self.set_mode(InteractionMode::None);
        } else {
            self.set_mode(mode);
        }
    }

    pub fn resize(&mut self, size: Size) -> bool {
        self.surface.resize(size)
    }

    pub fn wheel(&mut self, screen: Point, delta_y: f64) -> bool {
        self.surface.wheel(screen, delta_y)
    }

    pub fn pointer_down(&mut self, input: PointerInput) -> Option<ViewportEvent> {
        let event = self.surface.pointer_down(input)?;
        if !event.is_over_image {
            return Some(event);
        }

        match self.mode() {
            InteractionMode::Measurement => {
                if let Some(measurement) = self.measurement.click(event.position) {
                    debug!(distance = measurement.distance(), "Measurement added");
                }
            }
            InteractionMode::Annotation => match self.prompt.as_mut() {
                Some(prompt) => {
                    self.annotation.click(event.position, &mut **prompt);
                }
                None => debug!("No annotation prompt installed"),
            },
            _ => {}
        }
        Some(event)
    }

    pub fn pointer_move(&mut self, input: PointerInput) -> Option<ViewportEvent> {
        let event = self.surface.pointer_move(input)?;
        if self.mode() == InteractionMode::Measurement {
            self.measurement.hover(event.position);
        }
        Some(event)
    }

    pub fn pointer_up(&mut self, input: PointerInput) -> Option<ViewportEvent> {
        self.surface.pointer_up(input)
    }

    pub fn double_click(&mut self, screen: Point) -> Option<ViewportEvent> {
        self.surface.double_click(screen)
    }

    pub fn touch_start(&mut self, touches: &[Point]) {
        self.surface.touch_start(touches);
    }

    pub fn touch_move(&mut self, touches: &[Point]) -> bool {
        self.surface.touch_move(touches)
    }

    pub fn touch_end(&mut self, touches: &[Point]) {
        self.surface.touch_end(touches);
    }

    pub fn focus_region(&mut self, top_left: Point, bottom_right: Point) -> bool {
        match self.surface.focus_region(top_left, bottom_right) {
            Ok(()) => true,
            Err(error) => {
                debug!(%error, "Cannot focus region");
                false
            }
        }
    }

    pub fn measurement(&self) -> &MeasurementTool {
        &self.measurement
    }

    pub fn annotation(&self) -> &AnnotationTool {
        &self.annotation
    }

    pub fn zoom_in(&mut self) {
        self.surface.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.surface.zoom_out();
    }

    pub fn brightness_up(&mut self) {
        self.surface.brightness_up();
    }

    pub fn brightness_down(&mut self) {
        self.surface.brightness_down();
    }

    pub fn flip_horizontal(&mut self) {
        self.surface.flip_horizontal();
    }

    pub fn flip_vertical(&mut self) {
        self.surface.flip_vertical();
    }

    /// Default view state and no overlays.
    pub fn reset_view(&mut self) {
        self.surface.reset();
        self.measurement.clear();
        self.annotation.clear();
    }

    pub fn execute(&mut self, command: ViewerCommand) {
        debug!(?command, "Viewer command");
        match command {
            ViewerCommand::ZoomIn => self.zoom_in(),
            ViewerCommand::ZoomOut => self.zoom_out(),
            ViewerCommand::BrightnessUp => self.brightness_up(),
            ViewerCommand::BrightnessDown => self.brightness_down(),
            ViewerCommand::FlipHorizontal => self.flip_horizontal(),
            ViewerCommand::FlipVertical => self.flip_vertical(),
            ViewerCommand::ResetView => self.reset_view(),
        }
    }

    /// Screen-space shapes of every measurement, the measurement preview and
    /// every annotation.
    pub fn overlays(&self) -> Vec<ScreenShape> {
        let context = self.surface.context();
        let mut shapes = Vec::new();
        self.measurement
            .project(&context, &self.config.overlay, &mut shapes);
        self.annotation
            .project(&context, &self.config.overlay, &mut shapes);
        shapes
    }

    /// Render the current frame, or `None` until it has loaded.
    pub fn render(&self) -> Option<RgbaImage> {
        self.surface.render(&self.current_frame()?.raster)
    }

    /// Stored sample under a screen position.
    pub fn pixel_value_at(&self, screen: Point) -> Option<u16> {
        let position = self.surface.to_image(screen).ok()?;
        self.current_frame()?.sample_at(position)
    }
}

type Command = Box<dyn Fn()>;

/// Imperative commands bound to a shared viewer. Commands issued after the
/// viewer is dropped, or while it is borrowed (from inside one of its own
/// callbacks), do nothing.
pub struct ViewerHandle {
    pub zoom_in: Command,
    pub zoom_out: Command,
    pub brightness_up: Command,
    pub brightness_down: Command,
    pub flip_horizontal: Command,
    pub flip_vertical: Command,
    pub reset_view: Command,
}

impl ViewerHandle {
    pub fn new(viewer: &Rc<RefCell<Viewer>>) -> Self {
        let bind = |command: ViewerCommand| -> Command {
            let viewer: Weak<RefCell<Viewer>> = Rc::downgrade(viewer);
            Box::new(move || {
                let Some(viewer) = viewer.upgrade() else {
                    return;
                };
                match viewer.try_borrow_mut() {
                    Ok(mut viewer) => viewer.execute(command),
                    Err(_) => warn!(?command, "Viewer is busy, dropping command"),
                }
            })
        };

        Self {
            zoom_in: bind(ViewerCommand::ZoomIn),
            zoom_out: bind(ViewerCommand::ZoomOut),
            brightness_up: bind(ViewerCommand::BrightnessUp),
            brightness_down: bind(ViewerCommand::BrightnessDown),
            flip_horizontal: bind(ViewerCommand::FlipHorizontal),
            flip_vertical: bind(ViewerCommand::FlipVertical),
            reset_view: bind(ViewerCommand::ResetView),
        }
    }
}

//! Per-series frame cache with asynchronous, cancellable loading.
//!
//! Every load runs as a tokio task and reports back through a channel owned
//! by the cache. Results are committed only when the owner drains the channel
//! ([`FrameCache::poll_loads`] or [`FrameCache::next_load`]), and only if the
//! series generation they were started under is still current.

use std::sync::Arc;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, info, warn};

use crate::error::LoadError;
use crate::frame_decoder::{DecodedFrame, FrameDecoder};
use crate::frame_source::{FrameSource, Series};

#[derive(Debug, Clone, Default)]
pub enum FrameSlot {
    #[default]
    Unloaded,
    Loading,
    Loaded(Arc<DecodedFrame>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// No series selected.
    Idle,
    /// A series is selected but no frame has loaded yet.
    LoadingFirst,
    Ready,
}

/// A committed load result.
#[derive(Debug)]
pub enum LoadEvent {
    Loaded { index: usize },
    Failed { index: usize, error: LoadError },
}

#[derive(Debug)]
struct LoadOutcome {
    generation: u64,
    index: usize,
    result: Result<DecodedFrame, LoadError>,
}

pub struct FrameCache {
    source: Arc<dyn FrameSource>,
    series: Option<Series>,
    generation: u64,
    slots: Vec<FrameSlot>,
    loaded_count: usize,
    sender: UnboundedSender<LoadOutcome>,
    receiver: UnboundedReceiver<LoadOutcome>,
}

impl FrameCache {
    pub fn new(source: Arc<dyn FrameSource>) -> Self {
        let (sender, receiver) = unbounded_channel();
        Self {
            source,
            series: None,
            generation: 0,
            slots: Vec::new(),
            loaded_count: 0,
            sender,
            receiver,
        }
    }

    /// Replace the series, invalidating every slot and every load in flight,
    /// and start loading the first frame.
    pub fn select(&mut self, series: Series) {
        self.generation += 1;
        self.slots = vec![FrameSlot::Unloaded; series.len()];
        self.loaded_count = 0;
        info!(
            series_id = series.id(),
            frames = series.len(),
            generation = self.generation,
            "Series selected"
        );
        self.series = Some(series);
        self.request(0);
    }

    /// Drop the series. Loads in flight complete without effect.
    pub fn clear(&mut self) {
        self.generation += 1;
        self.series = None;
        self.slots.clear();
        self.loaded_count = 0;
    }

    pub fn series(&self) -> Option<&Series> {
        self.series.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded_count
    }

    pub fn state(&self) -> CacheState {
        match (&self.series, self.loaded_count) {
            (None, _) => CacheState::Idle,
            (Some(_), 0) => CacheState::LoadingFirst,
            (Some(_), _) => CacheState::Ready,
        }
    }

    pub fn slot(&self, index: usize) -> Option<&FrameSlot> {
        self.slots.get(index)
    }

    pub fn get(&self, index: usize) -> Option<&Arc<DecodedFrame>> {
        match self.slots.get(index)? {
            FrameSlot::Loaded(frame) => Some(frame),
            _ => None,
        }
    }

    /// Number of loads of the current series that have not completed.
    pub fn pending(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot, FrameSlot::Loading))
            .count()
    }

    /// Start loading `index` unless it is loaded or already loading.
    ///
    /// Returns `true` if a load was started.
    pub fn request(&mut self, index: usize) -> bool {
        let Some(series) = &self.series else {
            return false;
        };
        let Some(path) = series.frame_paths().get(index).cloned() else {
            return false;
        };
        if !matches!(self.slots[index], FrameSlot::Unloaded) {
            return false;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(index, path = %path, "No async runtime available to load frame");
            return false;
        };

        debug!(index, path = %path, generation = self.generation, "Loading frame");
        self.slots[index] = FrameSlot::Loading;

        let source = Arc::clone(&self.source);
        let sender = self.sender.clone();
        let generation = self.generation;
        runtime.spawn(async move {
            let result = match source.fetch(&path).await {
                Ok(bytes) => {
                    match tokio::task::spawn_blocking(move || FrameDecoder::decode(&bytes)).await
                    {
                        Ok(decoded) => decoded.map_err(LoadError::from),
                        Err(e) => Err(LoadError::Task(e.to_string())),
                    }
                }
                Err(e) => Err(LoadError::from(e)),
            };
            // The receiver lives as long as the cache.
            let _ = sender.send(LoadOutcome {
                generation,
                index,
                result,
            });
        });
        true
    }

    /// Request every unloaded frame of the series.
    pub fn request_all(&mut self) -> usize {
        (0..self.slots.len())
            .filter(|&index| self.request(index))
            .count()
    }

    /// Commit every completion that has already arrived.
    pub fn poll_loads(&mut self) -> Vec<LoadEvent> {
        let mut events = Vec::new();
        while let Ok(outcome) = self.receiver.try_recv() {
            events.extend(self.commit(outcome));
        }
        events
    }

    /// Wait for the next completion of the current series and commit it.
    ///
    /// Returns `None` when nothing of the current series is in flight.
    pub async fn next_load(&mut self) -> Option<LoadEvent> {
        while self.pending() > 0 {
            let outcome = self.receiver.recv().await?;
            if let Some(event) = self.commit(outcome) {
                return Some(event);
            }
        }
        None
    }

    fn commit(&mut self, outcome: LoadOutcome) -> Option<LoadEvent> {
        let LoadOutcome {
            generation,
            index,
            result,
        } = outcome;

        if generation != self.generation {
            debug!(index, generation, "Discarding frame of a previous series");
            return None;
        }
        let slot = self.slots.get_mut(index)?;
        if !matches!(slot, FrameSlot::Loading) {
            return None;
        }

        match result {
            Ok(frame) => {
                debug!(index, "Frame loaded");
                *slot = FrameSlot::Loaded(Arc::new(frame));
                self.loaded_count += 1;
                Some(LoadEvent::Loaded { index })
            }
            Err(error) => {
                warn!(index, %error, "Cannot load frame");
                *slot = FrameSlot::Unloaded;
                Some(LoadEvent::Failed { index, error })
            }
        }
    }
}

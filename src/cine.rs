use web_time::Duration;

pub const MIN_FRAME_RATE: f64 = 1.0;
pub const MAX_FRAME_RATE: f64 = 240.0;
pub const DEFAULT_FRAME_RATE: f64 = 20.0;

/// Looping playback through the frames of a series.
#[derive(Debug, Clone)]
pub struct CinePlayer {
    frame_rate: f64,
    looping: bool,
    accumulated: Duration,
}

impl Default for CinePlayer {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_RATE)
    }
}

impl CinePlayer {
    pub fn new(frame_rate: f64) -> Self {
        Self {
            frame_rate: Self::clamp_rate(frame_rate),
            looping: false,
            accumulated: Duration::ZERO,
        }
    }

    fn clamp_rate(rate: f64) -> f64 {
        if rate.is_nan() {
            return DEFAULT_FRAME_RATE;
        }
        rate.clamp(MIN_FRAME_RATE, MAX_FRAME_RATE)
    }

    pub fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    pub fn set_frame_rate(&mut self, rate: f64) {
        self.frame_rate = Self::clamp_rate(rate);
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
        self.accumulated = Duration::ZERO;
    }

    pub fn frame_time(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frame_rate)
    }

    /// Advance by the elapsed time. Returns the next frame index once at least
    /// one frame period has accumulated; the remainder carries over.
    pub fn tick(&mut self, elapsed: Duration, frame_index: usize, frame_count: usize) -> Option<usize> {
        if !self.looping || frame_count == 0 {
            return None;
        }

        self.accumulated += elapsed;
        let frame_time = self.frame_time();
        if self.accumulated < frame_time {
            return None;
        }

        let frame_secs = frame_time.as_secs_f64();
        let steps = (self.accumulated.as_secs_f64() / frame_secs).floor().max(1.0);
        self.accumulated = Duration::from_secs_f64(
            (self.accumulated.as_secs_f64() - steps * frame_secs).max(0.0),
        );
        Some((frame_index + steps as usize) % frame_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_rate_is_clamped() {
        assert_eq!(CinePlayer::new(0.0).frame_rate(), MIN_FRAME_RATE);
        assert_eq!(CinePlayer::new(1000.0).frame_rate(), MAX_FRAME_RATE);
        assert_eq!(CinePlayer::new(f64::NAN).frame_rate(), DEFAULT_FRAME_RATE);
    }

    #[test]
    fn paused_player_does_not_advance() {
        let mut player = CinePlayer::new(10.0);
        assert_eq!(player.tick(Duration::from_secs(1), 0, 5), None);
    }

    #[test]
    fn advances_after_one_frame_period() {
        let mut player = CinePlayer::new(10.0);
        player.set_looping(true);
        assert_eq!(player.tick(Duration::from_millis(60), 0, 5), None);
        assert_eq!(player.tick(Duration::from_millis(60), 0, 5), Some(1));
        // 20ms carried over, 90ms more reaches the next period.
        assert_eq!(player.tick(Duration::from_millis(90), 1, 5), Some(2));
    }

    #[test]
    fn skips_frames_and_wraps() {
        let mut player = CinePlayer::new(10.0);
        player.set_looping(true);
        assert_eq!(player.tick(Duration::from_millis(350), 3, 5), Some(1));
    }
}

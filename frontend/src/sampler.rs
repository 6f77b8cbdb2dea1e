//! Per-chart sliding window over one channel's readings.

use crate::channel_store::{ChannelStore, Reading};
use crate::chart::{ChartWidget, Sample};
use shared::ViewerSection;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SamplerState {
    #[default]
    Active,
    Paused,
}

/// Pause/unpause button.
///
/// The label is derived from the state, so both always change together. It
/// names the action a press performs next.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PauseControl {
    state: SamplerState,
}

impl PauseControl {
    pub fn state(&self) -> SamplerState {
        self.state
    }

    pub fn label(&self) -> &'static str {
        match self.state {
            SamplerState::Active => "Pause",
            SamplerState::Paused => "Unpause",
        }
    }

    pub fn toggle(&mut self) -> SamplerState {
        self.state = match self.state {
            SamplerState::Active => SamplerState::Paused,
            SamplerState::Paused => SamplerState::Active,
        };
        self.state
    }
}

/// Viewer-editable retention, in seconds.
///
/// Clones share the value. The sampler reads it on every tick, so an edit
/// applies at the next tick without touching the window.
#[derive(Debug, Clone)]
pub struct RetentionControl {
    secs_bits: Arc<AtomicU64>,
}

impl RetentionControl {
    /// Invalid `secs` falls back to the viewer default retention.
    pub fn new(secs: f64) -> Self {
        let fallback = ViewerSection::default().retention_secs;
        let control = RetentionControl {
            secs_bits: Arc::new(AtomicU64::new(fallback.to_bits())),
        };
        control.set_secs(secs);
        control
    }

    /// Ignores values that are negative or not finite.
    pub fn set_secs(&self, secs: f64) -> bool {
        if !secs.is_finite() || secs < 0.0 {
            log::warn!("Ignoring invalid retention {}", secs);
            return false;
        }
        self.secs_bits.store(secs.to_bits(), Ordering::Relaxed);
        true
    }

    pub fn secs(&self) -> f64 {
        f64::from_bits(self.secs_bits.load(Ordering::Relaxed))
    }

    /// Retention too large for a `Duration` saturates to `Duration::MAX`.
    pub fn duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.secs()).unwrap_or(Duration::MAX)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Paused,
    /// The store has not seen a snapshot yet.
    NotReady,
    /// The store is initialized but has no value for this channel.
    NoReading,
    Sampled { retained: usize, evicted: usize },
}

pub struct SlidingWindowSampler {
    channel: String,
    store: Arc<ChannelStore>,
    window: VecDeque<Sample>,
    retention: RetentionControl,
    pause: PauseControl,
}

impl SlidingWindowSampler {
    pub fn new(channel: impl Into<String>, store: Arc<ChannelStore>, retention: RetentionControl) -> Self {
        SlidingWindowSampler {
            channel: channel.into(),
            store,
            window: VecDeque::new(),
            retention,
            pause: PauseControl::default(),
        }
    }

    /// One cadence step. Paused ticks leave the window and the chart alone.
    pub fn tick(&mut self, now: Instant, chart: &mut dyn ChartWidget) -> TickOutcome {
        if self.pause.state() == SamplerState::Paused {
            return TickOutcome::Paused;
        }
        if !self.store.is_initialized() {
            return TickOutcome::NotReady;
        }
        let value = match self.store.get(&self.channel) {
            Reading::Value(value) => value.as_sample(),
            Reading::NotYetAvailable => return TickOutcome::NoReading,
        };

        self.window.push_back(Sample { timestamp: now, value });

        let retention = self.retention.duration();
        let mut evicted = 0;
        while let Some(oldest) = self.window.front() {
            if now.saturating_duration_since(oldest.timestamp) <= retention {
                break;
            }
            self.window.pop_front();
            evicted += 1;
        }

        chart.set_data(self.window.make_contiguous());
        TickOutcome::Sampled {
            retained: self.window.len(),
            evicted,
        }
    }

    pub fn toggle_pause(&mut self) -> SamplerState {
        let state = self.pause.toggle();
        log::debug!("Chart '{}' is now {:?}", self.channel, state);
        state
    }

    pub fn pause_control(&self) -> &PauseControl {
        &self.pause
    }

    pub fn retention(&self) -> &RetentionControl {
        &self.retention
    }

    pub fn window(&self) -> &VecDeque<Sample> {
        &self.window
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::HeadlessChart;

    fn rpm(value: u32) -> String {
        format!(r#"{{"channels":[{{"name":"RPM","value":"{value} RPM"}}]}}"#)
    }

    fn ready_store() -> Arc<ChannelStore> {
        let store = ChannelStore::headless();
        store.on_snapshot(&rpm(1200)).unwrap();
        store
    }

    #[test]
    fn waits_for_first_snapshot() {
        let store = ChannelStore::headless();
        let mut chart = HeadlessChart::default();
        let mut sampler = SlidingWindowSampler::new("RPM", store.clone(), RetentionControl::new(5.0));

        assert_eq!(sampler.tick(Instant::now(), &mut chart), TickOutcome::NotReady);
        assert!(sampler.window().is_empty());
        assert_eq!(chart.redraw_count(), 0);

        store.on_snapshot(&rpm(1200)).unwrap();
        assert!(matches!(
            sampler.tick(Instant::now(), &mut chart),
            TickOutcome::Sampled { retained: 1, .. }
        ));
        assert_eq!(chart.series()[0].value, 1200.0);
    }

    #[test]
    fn unknown_channel_yields_no_sample() {
        let mut chart = HeadlessChart::default();
        let mut sampler = SlidingWindowSampler::new("OilTemp", ready_store(), RetentionControl::new(5.0));

        assert_eq!(sampler.tick(Instant::now(), &mut chart), TickOutcome::NoReading);
        assert!(sampler.window().is_empty());
    }

    #[test]
    fn non_numeric_value_is_sampled_as_nan() {
        let store = ChannelStore::headless();
        store
            .on_snapshot(r#"{"channels":[{"name":"RPM","value":"n/a"}]}"#)
            .unwrap();
        let mut chart = HeadlessChart::default();
        let mut sampler = SlidingWindowSampler::new("RPM", store, RetentionControl::new(5.0));

        sampler.tick(Instant::now(), &mut chart);
        assert_eq!(sampler.window().len(), 1);
        assert!(sampler.window()[0].value.is_nan());
    }

    #[test]
    fn window_never_holds_samples_older_than_retention() {
        let store = ready_store();
        let mut chart = HeadlessChart::default();
        let mut sampler = SlidingWindowSampler::new("RPM", store.clone(), RetentionControl::new(5.0));
        let start = Instant::now();
        let mut now = start;

        for tick in 0..60u32 {
            now = start + Duration::from_millis(100 * u64::from(tick));
            store.on_snapshot(&rpm(1200 + tick * 10)).unwrap();
            sampler.tick(now, &mut chart);
            assert!(
                sampler
                    .window()
                    .iter()
                    .all(|sample| now.duration_since(sample.timestamp) <= Duration::from_secs(5))
            );
        }

        assert_eq!(sampler.window().len(), 51);
        assert_eq!(sampler.window().front().map(|s| s.value), Some(1290.0));
        assert_eq!(chart.series().len(), 51);
        assert_eq!(now.duration_since(sampler.window()[0].timestamp), Duration::from_secs(5));
    }

    #[test]
    fn paused_ticks_freeze_the_window() {
        let store = ready_store();
        let mut chart = HeadlessChart::default();
        let mut sampler = SlidingWindowSampler::new("RPM", store.clone(), RetentionControl::new(1.0));
        let start = Instant::now();
        for tick in 0..5u64 {
            sampler.tick(start + Duration::from_millis(100 * tick), &mut chart);
        }
        let frozen = sampler.window().clone();
        let redraws = chart.redraw_count();

        assert_eq!(sampler.toggle_pause(), SamplerState::Paused);
        assert_eq!(sampler.pause_control().label(), "Unpause");
        for tick in 5..50u64 {
            store.on_snapshot(&rpm(9000)).unwrap();
            assert_eq!(
                sampler.tick(start + Duration::from_millis(100 * tick), &mut chart),
                TickOutcome::Paused
            );
        }
        assert_eq!(sampler.window(), &frozen);
        assert_eq!(chart.redraw_count(), redraws);

        assert_eq!(sampler.toggle_pause(), SamplerState::Active);
        assert_eq!(sampler.pause_control().label(), "Pause");
        let outcome = sampler.tick(start + Duration::from_millis(5000), &mut chart);
        assert_eq!(outcome, TickOutcome::Sampled { retained: 1, evicted: 5 });
    }

    #[test]
    fn retention_edit_applies_on_next_tick_without_reset() {
        let store = ready_store();
        let mut chart = HeadlessChart::default();
        let retention = RetentionControl::new(10.0);
        let mut sampler = SlidingWindowSampler::new("RPM", store, retention.clone());
        let start = Instant::now();
        for tick in 0..30u64 {
            sampler.tick(start + Duration::from_millis(100 * tick), &mut chart);
        }
        assert_eq!(sampler.window().len(), 30);

        assert!(retention.set_secs(1.0));
        assert!(!retention.set_secs(f64::NAN));
        assert!(!retention.set_secs(-2.0));
        assert_eq!(sampler.retention().secs(), 1.0);

        let outcome = sampler.tick(start + Duration::from_millis(3000), &mut chart);
        assert_eq!(outcome, TickOutcome::Sampled { retained: 11, evicted: 20 });
    }

    #[test]
    fn huge_retention_keeps_every_sample() {
        let mut chart = HeadlessChart::default();
        let retention = RetentionControl::new(5.0);
        let mut sampler = SlidingWindowSampler::new("RPM", ready_store(), retention.clone());
        let start = Instant::now();

        assert!(retention.set_secs(1e20));
        assert_eq!(retention.duration(), Duration::MAX);
        for tick in 0..3u64 {
            let outcome = sampler.tick(start + Duration::from_secs(3600 * tick), &mut chart);
            assert_eq!(
                outcome,
                TickOutcome::Sampled { retained: tick as usize + 1, evicted: 0 }
            );
        }
    }

    #[test]
    fn invalid_initial_retention_uses_viewer_default() {
        let default_secs = ViewerSection::default().retention_secs;
        assert_eq!(RetentionControl::new(-1.0).secs(), default_secs);
        assert_eq!(RetentionControl::new(f64::NAN).secs(), default_secs);
        assert_eq!(RetentionControl::new(0.0).secs(), 0.0);
    }
}

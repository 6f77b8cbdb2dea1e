//! One chart on the page: a sampler, its scale controller and the widget they
//! drive, run as a single task on the sampler cadence.

use crate::channel_store::ChannelStore;
use crate::chart::{AxisBounds, ChartWidget};
use crate::dataflow::{Relay, relay};
use crate::sampler::{RetentionControl, SamplerState, SlidingWindowSampler, TickOutcome};
use crate::scale::{Bound, ScaleController};
use futures::StreamExt;
use shared::ChartSection;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub struct ChartPanel<C: ChartWidget> {
    sampler: SlidingWindowSampler,
    scale: ScaleController,
    chart: C,
}

impl<C: ChartWidget + 'static> ChartPanel<C> {
    pub fn new(
        section: &ChartSection,
        default_retention_secs: f64,
        store: Arc<ChannelStore>,
        mut chart: C,
    ) -> Self {
        let retention = RetentionControl::new(section.retention_secs.unwrap_or(default_retention_secs));
        let configured = section
            .initial_bounds()
            .map(|(lower, upper)| AxisBounds::new(lower, upper));
        let scale = ScaleController::attach(&mut chart, configured);
        ChartPanel {
            sampler: SlidingWindowSampler::new(section.channel.clone(), store, retention),
            scale,
            chart,
        }
    }

    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        self.sampler.tick(now, &mut self.chart)
    }

    pub fn pause_pressed(&mut self) -> SamplerState {
        self.sampler.toggle_pause()
    }

    pub fn autoscale_pressed(&mut self) -> AxisBounds {
        self.scale.autoscale(&mut self.chart)
    }

    pub fn bound_edited(&mut self, which: Bound, value: f64) -> bool {
        self.scale.edit_bound(&mut self.chart, which, value)
    }

    pub fn retention_edited(&mut self, secs: f64) -> bool {
        self.sampler.retention().set_secs(secs)
    }

    pub fn zoom_completed(&mut self) {
        self.scale.zoom_completed(&mut self.chart)
    }

    pub fn sampler(&self) -> &SlidingWindowSampler {
        &self.sampler
    }

    pub fn scale(&self) -> &ScaleController {
        &self.scale
    }

    pub fn chart(&self) -> &C {
        &self.chart
    }

    /// Moves the panel onto its own task ticking every `cadence`.
    ///
    /// Dropping the returned handle stops the task.
    pub fn spawn(mut self, cadence: Duration) -> ChartPanelHandle {
        let channel = self.sampler.channel().to_string();
        let (pause_pressed_relay, mut pause_pressed_stream) = relay::<()>();
        let (autoscale_pressed_relay, mut autoscale_pressed_stream) = relay::<()>();
        let (bound_edited_relay, mut bound_edited_stream) = relay::<(Bound, f64)>();
        let (retention_edited_relay, mut retention_edited_stream) = relay::<f64>();
        let (zoom_completed_relay, mut zoom_completed_stream) = relay::<()>();

        let zoom_sender = zoom_completed_relay.clone();
        self.chart
            .on_zoom_complete(Box::new(move || zoom_sender.send(())));

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(cadence);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    now = ticker.tick() => {
                        self.tick(now.into_std());
                    }
                    Some(()) = pause_pressed_stream.next() => {
                        self.pause_pressed();
                    }
                    Some(()) = autoscale_pressed_stream.next() => {
                        self.autoscale_pressed();
                    }
                    Some((which, value)) = bound_edited_stream.next() => {
                        self.bound_edited(which, value);
                    }
                    Some(secs) = retention_edited_stream.next() => {
                        self.retention_edited(secs);
                    }
                    Some(()) = zoom_completed_stream.next() => {
                        self.zoom_completed();
                    }
                }
            }
        });

        log::debug!("Chart '{}' sampling every {:?}", channel, cadence);
        ChartPanelHandle {
            pause_pressed_relay,
            autoscale_pressed_relay,
            bound_edited_relay,
            retention_edited_relay,
            zoom_completed_relay,
            channel,
            task,
        }
    }
}

/// Controls of a running chart panel.
pub struct ChartPanelHandle {
    pub pause_pressed_relay: Relay<()>,
    pub autoscale_pressed_relay: Relay<()>,
    pub bound_edited_relay: Relay<(Bound, f64)>,
    pub retention_edited_relay: Relay<f64>,
    pub zoom_completed_relay: Relay<()>,
    channel: String,
    task: JoinHandle<()>,
}

impl ChartPanelHandle {
    pub fn channel(&self) -> &str {
        &self.channel
    }
}

impl Drop for ChartPanelHandle {
    fn drop(&mut self) {
        self.task.abort();
        log::debug!("Chart '{}' torn down", self.channel);
    }
}

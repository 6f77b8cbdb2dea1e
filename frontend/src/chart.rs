//! Chart widget contract and an in-memory widget implementing it.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp: Instant,
    /// NaN when the channel value had no numeric reading.
    pub value: f64,
}

/// Vertical range of one chart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisBounds {
    pub lower: f64,
    pub upper: f64,
}

impl AxisBounds {
    pub fn new(lower: f64, upper: f64) -> Self {
        AxisBounds { lower, upper }
    }

    /// Extremes of the finite values in `samples`, if there are any.
    pub fn of_samples(samples: &[Sample]) -> Option<Self> {
        samples
            .iter()
            .map(|sample| sample.value)
            .filter(|value| value.is_finite())
            .fold(None, |bounds, value| match bounds {
                None => Some(AxisBounds::new(value, value)),
                Some(AxisBounds { lower, upper }) => {
                    Some(AxisBounds::new(lower.min(value), upper.max(value)))
                }
            })
    }

    pub fn span(self) -> f64 {
        self.upper - self.lower
    }
}

impl Default for AxisBounds {
    fn default() -> Self {
        AxisBounds::new(0.0, 1.0)
    }
}

/// Options a chart is constructed with.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChartOptions {
    /// Fixed vertical range; `None` lets the widget derive it from the data.
    pub value_range: Option<AxisBounds>,
}

pub type ZoomCallback = Box<dyn FnMut() + Send>;

/// Line chart rendering capability used by samplers and scale controllers.
///
/// The widget owns rendering and interactive zoom. Callers own the data
/// lifecycle and the persisted vertical range.
pub trait ChartWidget: Send {
    /// Replaces the plotted series.
    fn set_data(&mut self, series: &[Sample]);

    /// Fixes the vertical range.
    fn set_range(&mut self, bounds: AxisBounds);

    /// Vertical range currently on screen.
    fn rendered_extremes(&self) -> AxisBounds;

    /// Registers a callback fired after every interactive zoom.
    fn on_zoom_complete(&mut self, callback: ZoomCallback);
}

struct HeadlessState {
    series: Vec<Sample>,
    value_range: Option<AxisBounds>,
    zoom_callbacks: Vec<ZoomCallback>,
    redraws: usize,
}

/// Chart kept entirely in memory.
///
/// Clones share one chart, so a test or console summary can observe the
/// widget a chart panel task is drawing into. Without a fixed range the
/// rendered extremes follow the finite data (a flat series is padded by one
/// unit each way; no data renders as `[0, 1]`).
#[derive(Clone)]
pub struct HeadlessChart {
    inner: Arc<Mutex<HeadlessState>>,
}

impl HeadlessChart {
    pub fn new(initial_series: &[Sample], options: ChartOptions) -> Self {
        HeadlessChart {
            inner: Arc::new(Mutex::new(HeadlessState {
                series: initial_series.to_vec(),
                value_range: options.value_range,
                zoom_callbacks: Vec::new(),
                redraws: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HeadlessState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn series(&self) -> Vec<Sample> {
        self.lock().series.clone()
    }

    pub fn value_range(&self) -> Option<AxisBounds> {
        self.lock().value_range
    }

    /// Number of `set_data` calls so far.
    pub fn redraw_count(&self) -> usize {
        self.lock().redraws
    }

    /// Drag-zoom on the vertical axis to `bounds`.
    pub fn zoom_vertical(&self, bounds: AxisBounds) {
        self.lock().value_range = Some(bounds);
        self.fire_zoom_complete();
    }

    /// Horizontal zoom-out. Like common plotting widgets this drops any fixed
    /// vertical range and rescales to the data.
    pub fn zoom_out_horizontal(&self) {
        self.lock().value_range = None;
        self.fire_zoom_complete();
    }

    fn fire_zoom_complete(&self) {
        // Callbacks run unlocked so they may call back into the chart.
        let mut callbacks = std::mem::take(&mut self.lock().zoom_callbacks);
        for callback in callbacks.iter_mut() {
            callback();
        }
        let mut state = self.lock();
        let registered_meanwhile = std::mem::take(&mut state.zoom_callbacks);
        state.zoom_callbacks = callbacks;
        state.zoom_callbacks.extend(registered_meanwhile);
    }
}

impl Default for HeadlessChart {
    fn default() -> Self {
        HeadlessChart::new(&[], ChartOptions::default())
    }
}

impl ChartWidget for HeadlessChart {
    fn set_data(&mut self, series: &[Sample]) {
        let mut state = self.lock();
        state.series = series.to_vec();
        state.redraws += 1;
    }

    fn set_range(&mut self, bounds: AxisBounds) {
        self.lock().value_range = Some(bounds);
    }

    fn rendered_extremes(&self) -> AxisBounds {
        let state = self.lock();
        if let Some(range) = state.value_range {
            return range;
        }
        match AxisBounds::of_samples(&state.series) {
            Some(bounds) if bounds.span() == 0.0 => {
                AxisBounds::new(bounds.lower - 1.0, bounds.upper + 1.0)
            }
            Some(bounds) => bounds,
            None => AxisBounds::default(),
        }
    }

    fn on_zoom_complete(&mut self, callback: ZoomCallback) {
        self.lock().zoom_callbacks.push(callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn series(values: &[f64]) -> Vec<Sample> {
        let start = Instant::now();
        values
            .iter()
            .enumerate()
            .map(|(i, value)| Sample {
                timestamp: start + Duration::from_millis(100 * i as u64),
                value: *value,
            })
            .collect()
    }

    #[test]
    fn extremes_ignore_unparsable_samples() {
        let samples = series(&[10.0, f64::NAN, 90.0, 50.0]);
        assert_eq!(
            AxisBounds::of_samples(&samples),
            Some(AxisBounds::new(10.0, 90.0))
        );
        assert_eq!(AxisBounds::of_samples(&series(&[f64::NAN])), None);
    }

    #[test]
    fn rendered_extremes_follow_data_until_range_is_fixed() {
        let mut chart = HeadlessChart::default();
        assert_eq!(chart.rendered_extremes(), AxisBounds::new(0.0, 1.0));

        chart.set_data(&series(&[5.0]));
        assert_eq!(chart.rendered_extremes(), AxisBounds::new(4.0, 6.0));

        chart.set_data(&series(&[10.0, 90.0]));
        assert_eq!(chart.rendered_extremes(), AxisBounds::new(10.0, 90.0));

        chart.set_range(AxisBounds::new(0.0, 100.0));
        chart.set_data(&series(&[10.0, 500.0]));
        assert_eq!(chart.rendered_extremes(), AxisBounds::new(0.0, 100.0));
        assert_eq!(chart.redraw_count(), 3);
    }

    #[test]
    fn horizontal_zoom_out_drops_fixed_range_and_notifies() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut chart = HeadlessChart::new(
            &series(&[10.0, 200.0]),
            ChartOptions {
                value_range: Some(AxisBounds::new(0.0, 50.0)),
            },
        );
        let counter = fired.clone();
        chart.on_zoom_complete(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        chart.zoom_out_horizontal();

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(chart.value_range(), None);
        assert_eq!(chart.rendered_extremes(), AxisBounds::new(10.0, 200.0));
    }

    #[test]
    fn zoom_callback_may_touch_the_chart() {
        let mut chart = HeadlessChart::default();
        let mut handle = chart.clone();
        chart.on_zoom_complete(Box::new(move || {
            handle.set_range(AxisBounds::new(1.0, 2.0));
        }));

        chart.zoom_vertical(AxisBounds::new(-5.0, 5.0));
        assert_eq!(chart.value_range(), Some(AxisBounds::new(1.0, 2.0)));
    }
}

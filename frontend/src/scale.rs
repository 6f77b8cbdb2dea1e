//! Keeps a chart's vertical range under explicit viewer control.

use crate::chart::{AxisBounds, ChartWidget};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Lower,
    Upper,
}

/// Values shown in the lower/upper bound inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundControls {
    pub lower: f64,
    pub upper: f64,
}

impl From<AxisBounds> for BoundControls {
    fn from(bounds: AxisBounds) -> Self {
        BoundControls {
            lower: bounds.lower,
            upper: bounds.upper,
        }
    }
}

impl From<BoundControls> for AxisBounds {
    fn from(controls: BoundControls) -> Self {
        AxisBounds::new(controls.lower, controls.upper)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScaleController {
    /// Last range the viewer asked for. `None` until autoscale, a bound
    /// edit or a configured range fixes one.
    bounds: Option<AxisBounds>,
    controls: BoundControls,
}

impl ScaleController {
    /// Binds to `chart`. A configured range is applied right away; otherwise
    /// the inputs show what the chart currently renders and the chart keeps
    /// auto-ranging.
    pub fn attach(chart: &mut dyn ChartWidget, configured: Option<AxisBounds>) -> Self {
        match configured {
            Some(bounds) => {
                chart.set_range(bounds);
                ScaleController {
                    bounds: Some(bounds),
                    controls: bounds.into(),
                }
            }
            None => ScaleController {
                bounds: None,
                controls: chart.rendered_extremes().into(),
            },
        }
    }

    pub fn autoscale(&mut self, chart: &mut dyn ChartWidget) -> AxisBounds {
        let extremes = chart.rendered_extremes();
        self.apply(chart, extremes);
        extremes
    }

    /// Applies both inputs as the fixed range after one of them changed.
    /// Non-finite input leaves everything as it was.
    pub fn edit_bound(&mut self, chart: &mut dyn ChartWidget, which: Bound, value: f64) -> bool {
        if !value.is_finite() {
            log::warn!("Ignoring non-numeric {:?} bound", which);
            return false;
        }
        self.follow_rendered(chart);
        match which {
            Bound::Lower => self.controls.lower = value,
            Bound::Upper => self.controls.upper = value,
        }
        let edited = AxisBounds::from(self.controls);
        self.apply(chart, edited);
        true
    }

    /// Zoom-complete callback: puts the last requested range back. Before
    /// any range is fixed the inputs just follow what the chart renders.
    pub fn zoom_completed(&mut self, chart: &mut dyn ChartWidget) {
        match self.bounds {
            Some(bounds) => self.apply(chart, bounds),
            None => self.follow_rendered(chart),
        }
    }

    /// While the chart auto-ranges, the inputs mirror its rendered extremes.
    fn follow_rendered(&mut self, chart: &dyn ChartWidget) {
        if self.bounds.is_none() {
            self.controls = chart.rendered_extremes().into();
        }
    }

    fn apply(&mut self, chart: &mut dyn ChartWidget, bounds: AxisBounds) {
        chart.set_range(bounds);
        self.bounds = Some(bounds);
        self.controls = bounds.into();
    }

    pub fn bounds(&self) -> Option<AxisBounds> {
        self.bounds
    }

    pub fn controls(&self) -> BoundControls {
        self.controls
    }
}

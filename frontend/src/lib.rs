//! Viewer side of the telemetry pipeline: the channel store fed by the
//! server connection, and per-chart panels sampling it into chart widgets.

pub mod channel_store;
pub mod chart;
pub mod chart_panel;
pub mod connection;
pub mod console;
pub mod dataflow;
pub mod sampler;
pub mod scale;

pub use channel_store::{ChannelRows, ChannelStore, Reading, SnapshotOutcome, StoreError};
pub use chart::{AxisBounds, ChartOptions, ChartWidget, HeadlessChart, Sample};
pub use chart_panel::{ChartPanel, ChartPanelHandle};
pub use sampler::{PauseControl, RetentionControl, SamplerState, SlidingWindowSampler, TickOutcome};
pub use scale::{Bound, BoundControls, ScaleController};

//! Log-based presentation for the `viewer` binary.

use crate::channel_store::ChannelRows;
use crate::chart::{ChartWidget, HeadlessChart};
use shared::ChannelValue;

#[derive(Debug, Default)]
pub struct ConsoleRows;

impl ChannelRows for ConsoleRows {
    fn init_rows(&mut self, names: &[String]) {
        log::info!("Channels: {}", names.join(", "));
    }

    fn set_value(&mut self, name: &str, value: &ChannelValue) {
        log::debug!("{} = {}", name, value);
    }
}

/// One-line status of a chart: window length, newest value, rendered range.
pub fn chart_summary(channel: &str, chart: &HeadlessChart) -> String {
    let series = chart.series();
    let extremes = chart.rendered_extremes();
    let last = match series.last() {
        Some(sample) if sample.value.is_nan() => "NaN".to_string(),
        Some(sample) => format!("{}", sample.value),
        None => "-".to_string(),
    };
    format!(
        "{}: {} sample(s), last {}, range [{}, {}]",
        channel,
        series.len(),
        last,
        extremes.lower,
        extremes.upper
    )
}

// Series color and dash-style assignment
use crate::domain::chart::DashStyle;
use crate::domain::error::ChartError;

pub const PLOT_COLORS: [&str; 12] = [
    "#0070DE", "#ABD473", "#9482C9", "#C41F3B", "#00FF96", "#A330C9", "#F58CBA", "#FF7D0A",
    "#C79C6E", "#FF4D6B", "#69CCF0", "#FFD100",
];

pub const MONO_COLORS: [&str; 5] = ["#000000", "#cccccc", "#7f7f7f", "#999999", "#666666"];

pub const DASH_STYLES: [DashStyle; 3] = [DashStyle::Solid, DashStyle::Dashed, DashStyle::Dotted];

/// Monochrome charts can't reuse a gray, so the palette size is a hard cap
pub const MONOCHROME_SERIES_LIMIT: usize = MONO_COLORS.len();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    monochrome: bool,
}

impl Palette {
    pub fn new(monochrome: bool) -> Self {
        Self { monochrome }
    }

    /// Fails when monochrome is requested for more series than there are grays
    pub fn check_series_count(&self, count: usize) -> Result<(), ChartError> {
        if self.monochrome && count > MONOCHROME_SERIES_LIMIT {
            return Err(ChartError::MonochromeSeriesLimitExceeded {
                count,
                limit: MONOCHROME_SERIES_LIMIT,
            });
        }
        Ok(())
    }

    /// Color by position within the series' metric group
    pub fn color(&self, series_index: usize) -> &'static str {
        if self.monochrome {
            MONO_COLORS[series_index % MONO_COLORS.len()]
        } else {
            PLOT_COLORS[series_index % PLOT_COLORS.len()]
        }
    }

    /// Dash style by metric group position
    pub fn dash_style(&self, metric_index: usize) -> DashStyle {
        DASH_STYLES[metric_index % DASH_STYLES.len()]
    }
}

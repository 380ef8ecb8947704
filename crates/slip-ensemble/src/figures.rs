use serde::{Deserialize, Serialize};
use slip_core::errors::ErrorInfo;
use slip_core::{ParameterVector, RunNumber};

use crate::stats::EnsembleStatistics;
use crate::surface::{moment_magnitude, FaultGeometry};

/// Canvas size of generated figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FigureConfig {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Default for FigureConfig {
    fn default() -> Self {
        Self {
            width: 480,
            height: 200,
        }
    }
}

/// Renders the per-run diagnostic plot.
///
/// Implementations must be pure: identical inputs produce identical bytes.
pub trait DiagnosticRenderer: Send + Sync {
    /// File extension of the produced artifact.
    fn extension(&self) -> &'static str {
        "svg"
    }

    /// Renders `params` against the ensemble-wide ranges in `stats`.
    fn render(
        &self,
        run: RunNumber,
        params: &ParameterVector,
        stats: &EnsembleStatistics,
    ) -> Result<Vec<u8>, ErrorInfo>;
}

/// Subfault strip coloured by slip on the shared ensemble scale.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SlipPlotRenderer {
    /// Fault whose subfaults are drawn.
    pub fault: FaultGeometry,
    /// Canvas size.
    pub figure: FigureConfig,
}

impl SlipPlotRenderer {
    /// Renderer for `fault` on a `figure` canvas.
    pub fn new(fault: FaultGeometry, figure: FigureConfig) -> Self {
        Self { fault, figure }
    }
}

impl DiagnosticRenderer for SlipPlotRenderer {
    fn render(
        &self,
        run: RunNumber,
        params: &ParameterVector,
        stats: &EnsembleStatistics,
    ) -> Result<Vec<u8>, ErrorInfo> {
        if !params.is_finite() {
            return Err(ErrorInfo::new("plot-nonfinite", "cannot plot non-finite slip")
                .with_context("run_number", run.to_string()));
        }
        Ok(render_slip_svg(run, params, stats, &self.fault, &self.figure).into_bytes())
    }
}

// YlOrRd
const SLIP_RAMP: [(u8, u8, u8); 9] = [
    (255, 255, 204),
    (255, 237, 160),
    (254, 217, 118),
    (254, 178, 76),
    (253, 141, 60),
    (252, 78, 42),
    (227, 26, 28),
    (189, 0, 38),
    (128, 0, 38),
];

/// Hex colour for a normalized slip in `[0, 1]`.
pub fn slip_color(t: f64) -> String {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.5 };
    let scaled = t * (SLIP_RAMP.len() - 1) as f64;
    let lower = (scaled.floor() as usize).min(SLIP_RAMP.len() - 2);
    let frac = scaled - lower as f64;
    let (r0, g0, b0) = SLIP_RAMP[lower];
    let (r1, g1, b1) = SLIP_RAMP[lower + 1];
    let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
    format!("#{:02x}{:02x}{:02x}", mix(r0, r1), mix(g0, g1), mix(b0, b1))
}

/// Deterministic SVG of one run's subfault slips.
pub fn render_slip_svg(
    run: RunNumber,
    params: &ParameterVector,
    stats: &EnsembleStatistics,
    fault: &FaultGeometry,
    config: &FigureConfig,
) -> String {
    let width = config.width.max(120) as f64;
    let height = config.height.max(120) as f64;
    let margin = 20.0;
    let strip_top = 36.0;
    let strip_height = (height - strip_top - 56.0).max(16.0);
    let strip_width = width - 2.0 * margin;

    let moment = fault.seismic_moment(params);
    let magnitude = moment_magnitude(moment)
        .map(|mw| format!("{mw:.2}"))
        .unwrap_or_else(|| "n/a".to_string());

    let mut parts = vec![format!(
        "<svg xmlns='http://www.w3.org/2000/svg' width='{w}' height='{h}'>",
        w = config.width,
        h = config.height
    )];
    parts.push(format!(
        "<text x='{margin}' y='22' font-family='sans-serif' font-size='13'>{prefix}: Mo = {moment:.3e} N m, Mw = {magnitude}</text>",
        prefix = run.prefix(),
    ));

    let cells = params.dim().max(1);
    let cell_width = strip_width / cells as f64;
    for (idx, &slip) in params.values().iter().enumerate() {
        let x = margin + idx as f64 * cell_width;
        parts.push(format!(
            "<rect x='{x:.2}' y='{strip_top:.2}' width='{cw:.2}' height='{strip_height:.2}' fill='{fill}' stroke='#333333' />",
            cw = cell_width,
            fill = slip_color(stats.normalize(slip)),
        ));
        parts.push(format!(
            "<text x='{cx:.2}' y='{cy:.2}' font-family='sans-serif' font-size='11' text-anchor='middle'>{slip:.2}</text>",
            cx = x + cell_width / 2.0,
            cy = strip_top + strip_height / 2.0 + 4.0,
        ));
    }

    let bar_top = strip_top + strip_height + 14.0;
    let segments = 16;
    let segment_width = strip_width / segments as f64;
    for idx in 0..segments {
        let t = (idx as f64 + 0.5) / segments as f64;
        parts.push(format!(
            "<rect x='{x:.2}' y='{bar_top:.2}' width='{sw:.2}' height='10' fill='{fill}' />",
            x = margin + idx as f64 * segment_width,
            sw = segment_width,
            fill = slip_color(t),
        ));
    }
    let (low, high) = stats
        .overall()
        .map(|range| (range.min, range.max))
        .unwrap_or((0.0, 0.0));
    parts.push(format!(
        "<text x='{margin}' y='{y:.2}' font-family='sans-serif' font-size='10'>{low:.2} m</text>",
        y = bar_top + 24.0,
    ));
    parts.push(format!(
        "<text x='{x:.2}' y='{y:.2}' font-family='sans-serif' font-size='10' text-anchor='end'>{high:.2} m</text>",
        x = margin + strip_width,
        y = bar_top + 24.0,
    ));
    parts.push("</svg>".into());
    parts.join("")
}

/// Aggregate bar chart of run outcomes (`true` = completed).
pub fn render_outcome_svg(outcomes: &[(RunNumber, bool)], config: &FigureConfig) -> String {
    let mut parts = vec![format!(
        "<svg xmlns='http://www.w3.org/2000/svg' width='{w}' height='{h}'>",
        w = config.width,
        h = config.height
    )];
    if !outcomes.is_empty() {
        let bar_width = config.width as f64 / outcomes.len() as f64;
        for (idx, (run, completed)) in outcomes.iter().enumerate() {
            let fill = if *completed { "#16a34a" } else { "#dc2626" };
            parts.push(format!(
                "<rect x='{x:.2}' y='0' width='{bw:.2}' height='{h}' fill='{fill}'><title>{prefix}</title></rect>",
                x = bar_width * idx as f64,
                bw = bar_width.max(1.0),
                h = config.height,
                prefix = run.prefix(),
            ));
        }
    }
    parts.push("</svg>".into());
    parts.join("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramp_endpoints() {
        assert_eq!(slip_color(0.0), "#ffffcc");
        assert_eq!(slip_color(1.0), "#800026");
        assert_eq!(slip_color(f64::NAN), slip_color(0.5));
    }
}

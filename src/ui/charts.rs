use std::ops::RangeInclusive;

use eframe::egui::{Color32, RichText, Stroke, Ui};
use egui_plot::{Bar, BarChart, BoxElem, BoxPlot, BoxSpread, GridMark, Plot};

use super::format::{format_count, format_currency};
use crate::data::summary::Summary;
use crate::state::AppState;

const CHART_HEIGHT: f32 = 280.0;
const BAR_COLOR: Color32 = Color32::from_rgb(76, 120, 168);

// ---------------------------------------------------------------------------
// KPI row
// ---------------------------------------------------------------------------

pub fn kpi_row(ui: &mut Ui, summary: &Summary) {
    let metrics = [
        ("Projects", format_count(summary.total_count)),
        ("Total Incentive", format_currency(summary.total_incentive)),
        ("Avg Incentive", format_currency(summary.average_incentive)),
    ];
    ui.columns(metrics.len(), |cols| {
        for (col, (label, value)) in cols.iter_mut().zip(metrics) {
            col.group(|ui: &mut Ui| {
                ui.vertical(|ui: &mut Ui| {
                    ui.label(label);
                    ui.label(RichText::new(value).size(26.0).strong());
                });
            });
        }
    });
}

// ---------------------------------------------------------------------------
// Charts (central panel)
// ---------------------------------------------------------------------------

/// KPIs and the four charts, two per row.
pub fn dashboard(ui: &mut Ui, state: &AppState) {
    kpi_row(ui, &state.summary);
    ui.separator();

    if state.summary.total_count == 0 {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("No projects match the current filters.");
        });
        return;
    }

    ui.columns(2, |cols| {
        if let [left, right] = cols {
            incentive_by_year(left, &state.summary);
            incentive_by_equipment_type(right, &state.summary);
        }
    });
    ui.add_space(8.0);
    ui.columns(2, |cols| {
        if let [left, right] = cols {
            top_new_makes(left, &state.summary);
            program_distribution(right, state);
        }
    });
}

fn chart_title(ui: &mut Ui, title: &str) {
    ui.label(RichText::new(title).strong());
}

/// Vertical bars, one per year.
fn incentive_by_year(ui: &mut Ui, summary: &Summary) {
    chart_title(ui, "Total Incentive by Year");
    let bars: Vec<Bar> = summary
        .incentive_by_year
        .iter()
        .map(|&(year, total)| Bar::new(f64::from(year), total).name(year).width(0.7))
        .collect();
    let chart = BarChart::new(bars)
        .name("Total Incentive")
        .color(BAR_COLOR)
        .element_formatter(Box::new(|bar, _| {
            format!("{}\n{}", bar.name, format_currency(bar.value))
        }));

    Plot::new("incentive_by_year")
        .height(CHART_HEIGHT)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .x_axis_label("Year")
        .y_axis_label("Total Incentive")
        .x_axis_formatter(|mark: GridMark, _: &RangeInclusive<f64>| integer_tick(mark.value))
        .show(ui, |plot_ui| plot_ui.bar_chart(chart));
}

/// Horizontal bars, largest at the top.
fn incentive_by_equipment_type(ui: &mut Ui, summary: &Summary) {
    chart_title(ui, "Total Incentive by Equipment Type");
    let labels: Vec<String> = summary
        .incentive_by_equipment_type
        .iter()
        .map(|(name, _)| name.clone())
        .collect();
    let bars = ranked_bars(summary.incentive_by_equipment_type.iter().map(|(n, v)| (n, *v)));
    let chart = BarChart::new(bars)
        .name("Total Incentive")
        .color(BAR_COLOR)
        .horizontal()
        .element_formatter(Box::new(|bar, _| {
            format!("{}\n{}", bar.name, format_currency(bar.value))
        }));

    Plot::new("incentive_by_equipment_type")
        .height(CHART_HEIGHT)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .x_axis_label("Total Incentive")
        .y_axis_formatter(category_axis(labels, true))
        .show(ui, |plot_ui| plot_ui.bar_chart(chart));
}

/// Horizontal bars of project counts, most common make at the top.
fn top_new_makes(ui: &mut Ui, summary: &Summary) {
    chart_title(
        ui,
        &format!(
            "Top {} New Equipment Makes (by Project Count)",
            summary.top_new_makes_by_count.len()
        ),
    );
    let labels: Vec<String> = summary
        .top_new_makes_by_count
        .iter()
        .map(|(name, _)| name.clone())
        .collect();
    let bars = ranked_bars(summary.top_new_makes_by_count.iter().map(|(n, c)| (n, *c as f64)));
    let chart = BarChart::new(bars)
        .name("Count")
        .color(BAR_COLOR)
        .horizontal()
        .element_formatter(Box::new(|bar, _| format!("{}\n{:.0} projects", bar.name, bar.value)));

    Plot::new("top_new_makes")
        .height(CHART_HEIGHT)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .x_axis_label("Count")
        .y_axis_formatter(category_axis(labels, true))
        .show(ui, |plot_ui| plot_ui.bar_chart(chart));
}

/// One box per program, coloured by program.
fn program_distribution(ui: &mut Ui, state: &AppState) {
    chart_title(ui, "Incentive Amount Distribution by Program");
    let groups: Vec<(&String, BoxStats)> = state
        .summary
        .incentive_distribution_by_program
        .iter()
        .filter_map(|(program, amounts)| Some((program, BoxStats::from_samples(amounts)?)))
        .collect();
    let labels: Vec<String> = groups.iter().map(|(p, _)| (*p).clone()).collect();

    let boxes: Vec<BoxElem> = groups
        .iter()
        .enumerate()
        .map(|(i, (program, stats))| {
            let color = state.program_colors.color_for(program);
            BoxElem::new(
                i as f64,
                BoxSpread::new(
                    stats.lower_whisker,
                    stats.q1,
                    stats.median,
                    stats.q3,
                    stats.upper_whisker,
                ),
            )
            .name(program.as_str())
            .box_width(0.6)
            .fill(color.linear_multiply(0.35))
            .stroke(Stroke::new(1.5, color))
        })
        .collect();

    Plot::new("program_distribution")
        .height(CHART_HEIGHT)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .x_axis_label("Incentive Program")
        .y_axis_label("Incentive Amount")
        .x_axis_formatter(category_axis(labels, false))
        .show(ui, |plot_ui| plot_ui.box_plot(BoxPlot::new(boxes).name("Incentive Amount")));
}

/// Bars at 0..n for a ranked list, the first entry placed highest.
fn ranked_bars<'a>(entries: impl ExactSizeIterator<Item = (&'a String, f64)>) -> Vec<Bar> {
    let n = entries.len();
    entries
        .enumerate()
        .map(|(i, (name, value))| Bar::new((n - 1 - i) as f64, value).name(name).width(0.7))
        .collect()
}

fn integer_tick(value: f64) -> String {
    if (value - value.round()).abs() < 1e-6 {
        format!("{:.0}", value)
    } else {
        String::new()
    }
}

/// Axis formatter that shows a category label at each integer position.
/// With `reversed`, label 0 sits at the highest position (see [`ranked_bars`]).
fn category_axis(
    labels: Vec<String>,
    reversed: bool,
) -> impl Fn(GridMark, &RangeInclusive<f64>) -> String + 'static {
    move |mark: GridMark, _range: &RangeInclusive<f64>| {
        let pos = mark.value.round();
        if (mark.value - pos).abs() > 1e-6 || pos < 0.0 {
            return String::new();
        }
        let pos = pos as usize;
        let idx = if reversed {
            match labels.len().checked_sub(pos + 1) {
                Some(i) => i,
                None => return String::new(),
            }
        } else {
            pos
        };
        labels.get(idx).cloned().unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Box statistics
// ---------------------------------------------------------------------------

/// Five-number summary with Tukey whiskers (furthest points within 1.5 IQR).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxStats {
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub upper_whisker: f64,
}

impl BoxStats {
    /// `None` for an empty sample.
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = samples.iter().copied().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);

        let q1 = quantile(&sorted, 0.25);
        let median = quantile(&sorted, 0.5);
        let q3 = quantile(&sorted, 0.75);
        let fence = 1.5 * (q3 - q1);

        let lower_whisker = sorted
            .iter()
            .copied()
            .find(|&v| v >= q1 - fence)
            .unwrap_or(q1);
        let upper_whisker = sorted
            .iter()
            .rev()
            .copied()
            .find(|&v| v <= q3 + fence)
            .unwrap_or(q3);

        Some(Self {
            lower_whisker,
            q1,
            median,
            q3,
            upper_whisker,
        })
    }
}

/// Linear interpolation between closest ranks on a sorted, non-empty slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let (Some(&a), Some(&b)) = (sorted.get(lo), sorted.get(hi)) else {
        return f64::NAN;
    };
    a + (b - a) * (pos - lo as f64)
}

/// Placeholder shown in the central panel without a dataset.
pub fn empty_message(ui: &mut Ui, state: &AppState) {
    ui.centered_and_justified(|ui: &mut Ui| match &state.status_message {
        Some(msg) => {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
        None => {
            ui.heading("Open a file to view projects  (File → Open…)");
        }
    });
}

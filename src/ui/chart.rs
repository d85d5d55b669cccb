use crate::data::{CandleColor, PlotData, PlotRow};
use chrono::TimeDelta;
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

pub const AXIS_WIDTH: u16 = 12;
pub const BACKGROUND: Color = Color::Rgb(0, 14, 20);
const HOVER_BG: Color = Color::Rgb(40, 52, 60);
const TOOLTIP_TIME: &str = "%Y-%m-%d %H:%M:%S%.3f";

fn view_block(title: String) -> Block<'static> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .style(Style::default().bg(BACKGROUND))
}

/// Horizontal placement of rows inside a plot rect. When there are more
/// rows than columns only the most recent ones are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartGeometry {
    pub plot: Rect,
    pub start: usize,
    pub visible: usize,
    pub col_width: u16,
}

impl ChartGeometry {
    pub fn new(plot: Rect, rows: usize) -> Option<Self> {
        if rows == 0 || plot.width == 0 || plot.height == 0 {
            return None;
        }
        let visible = rows.min(plot.width as usize);
        let col_width = (plot.width as usize / visible).max(1) as u16;
        Some(Self {
            plot,
            start: rows - visible,
            visible,
            col_width,
        })
    }

    pub fn indices(&self) -> std::ops::Range<usize> {
        self.start..self.start + self.visible
    }

    /// Column at which row `idx` is drawn.
    pub fn column_x(&self, idx: usize) -> Option<u16> {
        if !self.indices().contains(&idx) {
            return None;
        }
        let offset = (idx - self.start) as u16 * self.col_width;
        Some(self.plot.x + offset + self.col_width / 2)
    }

    pub fn index_at(&self, x: u16) -> Option<usize> {
        if x < self.plot.x || x >= self.plot.x + self.plot.width {
            return None;
        }
        let slot = ((x - self.plot.x) / self.col_width) as usize;
        (slot < self.visible).then_some(self.start + slot)
    }
}

/// Vertical value-to-row mapping for a plot rect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueScale {
    pub min: f64,
    pub max: f64,
}

impl ValueScale {
    pub fn from_values<'a>(values: impl IntoIterator<Item = &'a f64>) -> Option<Self> {
        let (min, max) = values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold((f64::MAX, f64::MIN), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
        (min <= max).then_some(Self { min, max })
    }

    fn range(&self) -> f64 {
        (self.max - self.min).max(0.0001)
    }

    pub fn y_of(&self, value: f64, plot: Rect) -> u16 {
        let span = plot.height.saturating_sub(1) as f64;
        let frac = ((self.max - value) / self.range()).clamp(0.0, 1.0);
        plot.y + (frac * span).round() as u16
    }

    pub fn value_at(&self, step: usize, steps: usize) -> f64 {
        self.max - (step as f64 / steps.max(1) as f64) * self.range()
    }
}

pub fn candle_color(color: CandleColor) -> Color {
    match color {
        CandleColor::Up => Color::Green,
        CandleColor::Down => Color::Red,
    }
}

pub fn price_tooltip(row: &PlotRow) -> String {
    format!(
        "Close {:.2}, {:.2}, {:.2}, {:.2}  Time {}",
        row.close,
        row.high,
        row.low,
        row.open,
        row.time.format(TOOLTIP_TIME)
    )
}

pub fn volume_tooltip(row: &PlotRow) -> String {
    format!(
        "Volume {:.2}  Time {}",
        row.volume,
        row.time.format(TOOLTIP_TIME)
    )
}

pub fn format_price(price: f64) -> String {
    format!("${:.4}", price)
}

fn set_cell(frame: &mut Frame, x: u16, y: u16, ch: char, fg: Color) {
    let area = frame.area();
    if x < area.x + area.width && y < area.y + area.height {
        frame.buffer_mut()[(x, y)].set_char(ch).set_fg(fg);
    }
}

fn draw_label(frame: &mut Frame, x: u16, y: u16, max_x: u16, label: &str) {
    for (j, ch) in label.chars().enumerate() {
        let x_pos = x + j as u16;
        if x_pos >= max_x {
            break;
        }
        set_cell(frame, x_pos, y, ch, Color::Gray);
    }
}

fn highlight_column(frame: &mut Frame, geometry: &ChartGeometry, hover: Option<usize>) {
    let Some(x) = hover.and_then(|idx| geometry.column_x(idx)) else {
        return;
    };
    let plot = geometry.plot;
    for y in plot.y..plot.y + plot.height {
        frame.buffer_mut()[(x, y)].set_bg(HOVER_BG);
    }
}

/// Draws `values` as a dotted line, interpolating between neighbouring rows
/// when each row spans several columns.
fn draw_overlay(
    frame: &mut Frame,
    geometry: &ChartGeometry,
    scale: &ValueScale,
    values: &[f64],
    color: Color,
) {
    let plot = geometry.plot;
    let points: Vec<(u16, f64)> = geometry
        .indices()
        .filter_map(|idx| Some((geometry.column_x(idx)?, *values.get(idx)?)))
        .filter(|(_, v)| v.is_finite())
        .collect();

    for pair in points.windows(2) {
        let (x0, v0) = pair[0];
        let (x1, v1) = pair[1];
        for x in x0..x1 {
            let t = (x - x0) as f64 / (x1 - x0).max(1) as f64;
            let y = scale.y_of(v0 + (v1 - v0) * t, plot);
            set_cell(frame, x, y, '•', color);
        }
    }
    if let Some((x, v)) = points.last() {
        set_cell(frame, *x, scale.y_of(*v, plot), '•', color);
    }
}

pub struct PriceChart<'a> {
    pub data: &'a PlotData,
    pub title: String,
    /// Width of one bar; daily or longer bars get dated axis labels.
    pub bar: TimeDelta,
    pub tight: Option<Color>,
    pub loose: Option<Color>,
    pub hover: Option<usize>,
}

impl PriceChart<'_> {
    /// Rect the candles occupy inside `area`: the block interior minus the
    /// right-hand price axis and the bottom time axis.
    pub fn plot_area(area: Rect) -> Rect {
        let inner = Block::default().borders(Borders::ALL).inner(area);
        Rect {
            x: inner.x,
            y: inner.y,
            width: inner.width.saturating_sub(AXIS_WIDTH),
            height: inner.height.saturating_sub(1),
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let mut block = view_block(self.title.clone());
        if let Some(row) = self.hover.and_then(|idx| self.data.row(idx)) {
            block = block.title_bottom(Line::from(Span::styled(
                price_tooltip(&row),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            )));
        }
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if self.data.is_empty() {
            let text = Line::from(Span::styled(
                "Waiting for data...",
                Style::default().fg(Color::Gray),
            ));
            frame.render_widget(Paragraph::new(text).alignment(Alignment::Center), inner);
            return;
        }

        let plot = Self::plot_area(area);
        if plot.width < 10 || plot.height < 3 {
            return;
        }
        let Some(geometry) = ChartGeometry::new(plot, self.data.len()) else {
            return;
        };

        let range = geometry.indices();
        let mut extents: Vec<f64> = Vec::with_capacity(range.len() * 4);
        extents.extend_from_slice(&self.data.low()[range.clone()]);
        extents.extend_from_slice(&self.data.high()[range.clone()]);
        if self.tight.is_some() {
            extents.extend_from_slice(&self.data.close_gam_tight()[range.clone()]);
        }
        if self.loose.is_some() {
            extents.extend_from_slice(&self.data.close_gam_loose()[range.clone()]);
        }
        let Some(scale) = ValueScale::from_values(&extents) else {
            return;
        };

        highlight_column(frame, &geometry, self.hover);
        self.draw_candles(frame, &geometry, &scale);

        if let Some(color) = self.tight {
            draw_overlay(frame, &geometry, &scale, self.data.close_gam_tight(), color);
        }
        if let Some(color) = self.loose {
            draw_overlay(frame, &geometry, &scale, self.data.close_gam_loose(), color);
        }

        self.draw_price_axis(frame, plot, &scale);
        self.draw_time_axis(frame, &geometry);
    }

    fn draw_candles(&self, frame: &mut Frame, geometry: &ChartGeometry, scale: &ValueScale) {
        let plot = geometry.plot;
        let (open, high, low, close) = (
            self.data.open(),
            self.data.high(),
            self.data.low(),
            self.data.close(),
        );
        let colors = self.data.candle_color();

        for idx in geometry.indices() {
            let Some(x) = geometry.column_x(idx) else {
                continue;
            };
            let color = candle_color(colors[idx]);

            let high_y = scale.y_of(high[idx], plot);
            let low_y = scale.y_of(low[idx], plot);
            for y in high_y..=low_y {
                set_cell(frame, x, y, '│', color);
            }

            let open_y = scale.y_of(open[idx], plot);
            let close_y = scale.y_of(close[idx], plot);
            for y in open_y.min(close_y)..=open_y.max(close_y) {
                set_cell(frame, x, y, '█', color);
            }
        }
    }

    fn draw_price_axis(&self, frame: &mut Frame, plot: Rect, scale: &ValueScale) {
        let axis_x = plot.x + plot.width + 1;
        let max_x = axis_x + AXIS_WIDTH - 1;
        let label_count = 5.min(plot.height as usize / 2).max(1);
        for i in 0..=label_count {
            let y = plot.y + (i as u16 * plot.height.saturating_sub(1)) / label_count as u16;
            let label = format_price(scale.value_at(i, label_count));
            draw_label(frame, axis_x, y, max_x, &label);
        }
    }

    fn draw_time_axis(&self, frame: &mut Frame, geometry: &ChartGeometry) {
        let times = self.data.time();
        let fmt = if self.bar >= TimeDelta::days(1) {
            "%m/%d"
        } else {
            "%H:%M"
        };

        let y = geometry.plot.y + geometry.plot.height;
        let max_x = geometry.plot.x + geometry.plot.width;
        let mut next_free = geometry.plot.x;
        for idx in geometry.indices() {
            let Some(x) = geometry.column_x(idx) else {
                continue;
            };
            let label = times[idx].format(fmt).to_string();
            let start = x.saturating_sub(label.len() as u16 / 2).max(geometry.plot.x);
            if start < next_free || start + label.len() as u16 > max_x {
                continue;
            }
            draw_label(frame, start, y, max_x, &label);
            next_free = start + label.len() as u16 + 3;
        }
    }
}

pub struct VolumeChart<'a> {
    pub data: &'a PlotData,
    pub smoothed: Option<Color>,
    pub hover: Option<usize>,
}

impl VolumeChart<'_> {
    pub fn plot_area(area: Rect) -> Rect {
        let inner = Block::default().borders(Borders::ALL).inner(area);
        Rect {
            width: inner.width.saturating_sub(AXIS_WIDTH),
            ..inner
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let mut block = view_block("Volume".to_string());
        if let Some(row) = self.hover.and_then(|idx| self.data.row(idx)) {
            block = block.title_bottom(Line::from(Span::styled(
                volume_tooltip(&row),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            )));
        }
        frame.render_widget(block, area);

        let plot = Self::plot_area(area);
        if plot.width < 10 || plot.height < 2 {
            return;
        }
        let Some(geometry) = ChartGeometry::new(plot, self.data.len()) else {
            return;
        };

        let range = geometry.indices();
        let mut extents: Vec<f64> = vec![0.0];
        extents.extend_from_slice(&self.data.volume()[range.clone()]);
        if self.smoothed.is_some() {
            extents.extend_from_slice(&self.data.volume_gam()[range.clone()]);
        }
        let Some(scale) = ValueScale::from_values(&extents) else {
            return;
        };

        highlight_column(frame, &geometry, self.hover);

        let base_y = plot.y + plot.height - 1;
        for idx in range {
            let Some(x) = geometry.column_x(idx) else {
                continue;
            };
            let volume = self.data.volume()[idx];
            if volume <= 0.0 {
                continue;
            }
            let top = scale.y_of(volume, plot);
            for y in top..=base_y {
                set_cell(frame, x, y, '▊', Color::Blue);
            }
        }

        if let Some(color) = self.smoothed {
            draw_overlay(frame, &geometry, &scale, self.data.volume_gam(), color);
        }

        let axis_x = plot.x + plot.width + 1;
        let max_x = axis_x + AXIS_WIDTH - 1;
        draw_label(frame, axis_x, plot.y, max_x, &format!("{:.0}", scale.max));
        if plot.height > 2 {
            draw_label(frame, axis_x, base_y, max_x, &format!("{:.0}", scale.min));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::source::tests::sample_data;
    use ratatui::{backend::TestBackend, Terminal};

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        buffer
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect::<String>()
    }

    #[test]
    fn geometry_shows_most_recent_rows_when_narrow() {
        let plot = Rect::new(0, 0, 40, 10);
        let g = ChartGeometry::new(plot, 100).unwrap();
        assert_eq!(g.visible, 40);
        assert_eq!(g.start, 60);
        assert_eq!(g.col_width, 1);
        assert_eq!(g.column_x(60), Some(0));
        assert_eq!(g.column_x(59), None);
        assert_eq!(g.index_at(39), Some(99));
    }

    #[test]
    fn geometry_spreads_rows_when_wide() {
        let plot = Rect::new(5, 0, 100, 10);
        let g = ChartGeometry::new(plot, 20).unwrap();
        assert_eq!(g.visible, 20);
        assert_eq!(g.col_width, 5);
        assert_eq!(g.column_x(0), Some(7));
        for idx in 0..20 {
            let x = g.column_x(idx).unwrap();
            assert_eq!(g.index_at(x), Some(idx));
        }
        assert_eq!(g.index_at(4), None);
    }

    #[test]
    fn geometry_needs_rows() {
        assert!(ChartGeometry::new(Rect::new(0, 0, 10, 10), 0).is_none());
    }

    #[test]
    fn scale_maps_extremes_to_edges() {
        let scale = ValueScale::from_values(&[10.0, 20.0]).unwrap();
        let plot = Rect::new(0, 2, 10, 11);
        assert_eq!(scale.y_of(20.0, plot), 2);
        assert_eq!(scale.y_of(10.0, plot), 12);
        assert_eq!(scale.y_of(15.0, plot), 7);
        assert_eq!(scale.y_of(99.0, plot), 2);
    }

    #[test]
    fn tooltips_show_millisecond_timestamps() {
        let data = sample_data(3);
        let row = data.row(1).unwrap();
        let price = price_tooltip(&row);
        assert!(price.starts_with("Close "));
        assert!(price.ends_with("2023-11-14 22:18:20.000"), "{price}");
        let volume = volume_tooltip(&row);
        assert!(volume.starts_with("Volume 11.00"), "{volume}");
    }

    #[test]
    fn price_labels_use_four_decimals() {
        assert_eq!(format_price(142.5), "$142.5000");
    }

    #[test]
    fn renders_candles_and_hover_text() {
        let data = sample_data(30);
        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        terminal
            .draw(|frame| {
                let chart = PriceChart {
                    data: &data,
                    title: "SOLUSDT 5m".to_string(),
                    bar: TimeDelta::minutes(5),
                    tight: Some(Color::Cyan),
                    loose: None,
                    hover: Some(29),
                };
                chart.render(frame, frame.area());
            })
            .unwrap();

        let text = buffer_text(&terminal);
        assert!(text.contains("SOLUSDT 5m"));
        assert!(text.contains('█'));
        assert!(text.contains('•'));
        assert!(text.contains("Close "));
        assert!(text.contains('$'));
    }

    #[test]
    fn hidden_overlays_are_not_drawn() {
        let data = sample_data(30);
        let mut terminal = Terminal::new(TestBackend::new(80, 10)).unwrap();
        terminal
            .draw(|frame| {
                let chart = VolumeChart {
                    data: &data,
                    smoothed: None,
                    hover: None,
                };
                chart.render(frame, frame.area());
            })
            .unwrap();

        let text = buffer_text(&terminal);
        assert!(text.contains('▊'));
        assert!(!text.contains('•'));
    }

    #[test]
    fn empty_store_shows_placeholder() {
        let data = PlotData::default();
        let mut terminal = Terminal::new(TestBackend::new(60, 12)).unwrap();
        terminal
            .draw(|frame| {
                PriceChart {
                    data: &data,
                    title: "empty".to_string(),
                    bar: TimeDelta::minutes(5),
                    tight: Some(Color::Cyan),
                    loose: Some(Color::Cyan),
                    hover: Some(3),
                }
                .render(frame, frame.area());
            })
            .unwrap();

        let text = buffer_text(&terminal);
        assert!(text.contains("empty"));
        assert!(text.contains("Waiting for data..."));
        assert!(!text.contains('█'));
    }

    fn time_axis_text(bar: TimeDelta) -> String {
        let data = sample_data(30);
        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        terminal
            .draw(|frame| {
                PriceChart {
                    data: &data,
                    title: "axis".to_string(),
                    bar,
                    tight: None,
                    loose: None,
                    hover: None,
                }
                .render(frame, frame.area());
            })
            .unwrap();
        buffer_text(&terminal)
    }

    #[test]
    fn time_axis_format_follows_bar_width() {
        let first = sample_data(30).time()[0];
        let intraday = time_axis_text(TimeDelta::minutes(5));
        assert!(intraday.contains(&first.format("%H:%M").to_string()));

        let daily = time_axis_text(TimeDelta::days(1));
        assert!(daily.contains(&first.format("%m/%d").to_string()));
        assert!(!daily.contains(&first.format("%H:%M").to_string()));
    }
}

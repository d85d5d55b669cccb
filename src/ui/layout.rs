use crate::data::PlotSource;
use crate::ui::{ChartGeometry, Overlay, OverlayControls, PriceChart, StatusBar, VolumeChart};
use chrono::TimeDelta;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    Frame,
};

const TOGGLE_WIDTH: u16 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardAreas {
    pub price: Rect,
    pub price_toggles: Rect,
    pub volume: Rect,
    pub volume_toggles: Rect,
    pub status: Rect,
}

impl DashboardAreas {
    pub fn compute(area: Rect) -> Self {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(10),
                Constraint::Length(9),
                Constraint::Length(1),
            ])
            .split(area);

        let split_row = |row: Rect| {
            Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Min(40), Constraint::Length(TOGGLE_WIDTH)])
                .split(row)
        };
        let price_row = split_row(rows[0]);
        let volume_row = split_row(rows[1]);

        Self {
            price: price_row[0],
            price_toggles: price_row[1],
            volume: volume_row[0],
            volume_toggles: volume_row[1],
            status: rows[2],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    Row(usize),
    Toggle(Overlay),
    Nothing,
}

pub struct LayoutManager {
    pub title: String,
    pub bar: TimeDelta,
    pub controls: OverlayControls,
    pub statusbar: StatusBar,
    pub hover: Option<usize>,
}

impl LayoutManager {
    pub fn new(title: String, bar: TimeDelta, controls: OverlayControls) -> Self {
        Self {
            title,
            bar,
            controls,
            statusbar: StatusBar::new(),
            hover: None,
        }
    }

    fn overlay_color(&self, overlay: Overlay) -> Option<ratatui::style::Color> {
        self.controls
            .is_visible(overlay)
            .then(|| overlay.color())
    }

    pub fn render(&mut self, frame: &mut Frame, source: &PlotSource) {
        let areas = DashboardAreas::compute(frame.area());
        let data = source.data();
        let focused = Some(self.controls.focused());

        PriceChart {
            data,
            title: self.title.clone(),
            bar: self.bar,
            tight: self.overlay_color(Overlay::CloseTight),
            loose: self.overlay_color(Overlay::CloseLoose),
            hover: self.hover,
        }
        .render(frame, areas.price);
        self.controls
            .close
            .render(frame, areas.price_toggles, focused);

        VolumeChart {
            data,
            smoothed: self.overlay_color(Overlay::Volume),
            hover: self.hover,
        }
        .render(frame, areas.volume);
        self.controls
            .volume
            .render(frame, areas.volume_toggles, focused);

        self.statusbar.updated_at = source.updated_at();
        self.statusbar.render(frame, areas.status);
    }

    /// Resolves a mouse position against the last drawn layout of size `area`.
    pub fn hit_test(&self, area: Rect, rows: usize, column: u16, row: u16) -> Hit {
        let areas = DashboardAreas::compute(area);
        let position = ratatui::layout::Position::new(column, row);

        if areas.price_toggles.contains(position) {
            return self
                .controls
                .close
                .hit(areas.price_toggles, column, row)
                .map_or(Hit::Nothing, Hit::Toggle);
        }
        if areas.volume_toggles.contains(position) {
            return self
                .controls
                .volume
                .hit(areas.volume_toggles, column, row)
                .map_or(Hit::Nothing, Hit::Toggle);
        }

        for (view, plot) in [
            (areas.price, PriceChart::plot_area(areas.price)),
            (areas.volume, VolumeChart::plot_area(areas.volume)),
        ] {
            if !view.contains(position) || row < plot.y || row >= plot.y + plot.height {
                continue;
            }
            if let Some(idx) = ChartGeometry::new(plot, rows).and_then(|g| g.index_at(column)) {
                return Hit::Row(idx);
            }
        }
        Hit::Nothing
    }

    /// Moves the inspected row by `delta`, starting from the newest row.
    pub fn step_hover(&mut self, rows: usize, delta: isize) {
        if rows == 0 {
            self.hover = None;
            return;
        }
        let current = self.hover.unwrap_or(rows - 1) as isize;
        let next = if self.hover.is_none() {
            current
        } else {
            (current + delta).clamp(0, rows as isize - 1)
        };
        self.hover = Some(next as usize);
    }

    /// Keeps the inspected row valid after the store has been replaced.
    pub fn clamp_hover(&mut self, rows: usize) {
        self.hover = match self.hover {
            Some(_) if rows == 0 => None,
            Some(idx) => Some(idx.min(rows - 1)),
            None => None,
        };
    }
}

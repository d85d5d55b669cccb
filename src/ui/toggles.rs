use crate::config::SmoothingConfig;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// A smoothed curve that can be layered over one of the charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay {
    CloseTight,
    CloseLoose,
    Volume,
}

impl Overlay {
    pub fn all() -> [Overlay; 3] {
        [Overlay::CloseTight, Overlay::CloseLoose, Overlay::Volume]
    }

    pub fn color(&self) -> Color {
        match self {
            Overlay::CloseTight | Overlay::Volume => Color::Rgb(255, 165, 0),
            Overlay::CloseLoose => Color::Cyan,
        }
    }

    pub fn shortcut(&self) -> char {
        match self {
            Overlay::CloseTight => '1',
            Overlay::CloseLoose => '2',
            Overlay::Volume => '3',
        }
    }

    pub fn from_shortcut(c: char) -> Option<Overlay> {
        Overlay::all().into_iter().find(|o| o.shortcut() == c)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Checkbox {
    pub overlay: Overlay,
    pub label: String,
    pub checked: bool,
}

pub struct CheckboxGroup {
    pub boxes: Vec<Checkbox>,
}

impl CheckboxGroup {
    pub fn contains(&self, overlay: Overlay) -> bool {
        self.boxes.iter().any(|b| b.overlay == overlay)
    }

    pub fn is_checked(&self, overlay: Overlay) -> bool {
        self.boxes
            .iter()
            .any(|b| b.overlay == overlay && b.checked)
    }

    fn toggle(&mut self, overlay: Overlay) {
        if let Some(b) = self.boxes.iter_mut().find(|b| b.overlay == overlay) {
            b.checked = !b.checked;
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, focused: Option<Overlay>) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let lines: Vec<Line> = self
            .boxes
            .iter()
            .map(|b| {
                let mark = if b.checked { "[x]" } else { "[ ]" };
                let style = if focused == Some(b.overlay) {
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
                } else {
                    Style::default().fg(Color::White)
                };
                Line::from(vec![
                    Span::styled(format!("{} ", mark), Style::default().fg(b.overlay.color())),
                    Span::styled(b.label.clone(), style),
                ])
            })
            .collect();

        frame.render_widget(Paragraph::new(lines), inner);
    }

    /// Maps a click inside `area` (the rect passed to `render`) to a checkbox.
    pub fn hit(&self, area: Rect, column: u16, row: u16) -> Option<Overlay> {
        let inner = Block::default().borders(Borders::ALL).inner(area);
        if column < inner.x || column >= inner.x + inner.width || row < inner.y {
            return None;
        }
        let idx = (row - inner.y) as usize;
        if row >= inner.y + inner.height {
            return None;
        }
        self.boxes.get(idx).map(|b| b.overlay)
    }
}

/// Visibility state for every overlay, split into the two checkbox groups
/// shown beside the price and volume charts.
pub struct OverlayControls {
    pub close: CheckboxGroup,
    pub volume: CheckboxGroup,
    focus: usize,
}

impl OverlayControls {
    pub fn new(smoothing: &SmoothingConfig) -> Self {
        Self {
            close: CheckboxGroup {
                boxes: vec![
                    Checkbox {
                        overlay: Overlay::CloseTight,
                        label: format!("Close GAM {}", smoothing.close_tight.n_splines),
                        checked: true,
                    },
                    Checkbox {
                        overlay: Overlay::CloseLoose,
                        label: format!("Close GAM {}", smoothing.close_loose.n_splines),
                        checked: false,
                    },
                ],
            },
            volume: CheckboxGroup {
                boxes: vec![Checkbox {
                    overlay: Overlay::Volume,
                    label: "Volume GAM".to_string(),
                    checked: true,
                }],
            },
            focus: 0,
        }
    }

    pub fn is_visible(&self, overlay: Overlay) -> bool {
        self.close.is_checked(overlay) || self.volume.is_checked(overlay)
    }

    pub fn toggle(&mut self, overlay: Overlay) {
        if self.close.contains(overlay) {
            self.close.toggle(overlay);
        } else {
            self.volume.toggle(overlay);
        }
        tracing::debug!(?overlay, visible = self.is_visible(overlay), "overlay toggled");
    }

    pub fn focused(&self) -> Overlay {
        Overlay::all()[self.focus]
    }

    pub fn focus_next(&mut self) {
        self.focus = (self.focus + 1) % Overlay::all().len();
    }

    pub fn focus_prev(&mut self) {
        let len = Overlay::all().len();
        self.focus = if self.focus == 0 { len - 1 } else { self.focus - 1 };
    }

    pub fn toggle_focused(&mut self) {
        self.toggle(self.focused());
    }
}

use crate::data::{RefreshEvent, Stage};
use chrono::{DateTime, Utc};
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Paragraph},
    Frame,
};

#[derive(Debug, Clone, PartialEq)]
pub enum LastRefresh {
    Pending,
    Ok { generation: u64, rows: usize },
    Failed { stage: Stage, message: String },
}

pub struct StatusBar {
    pub last: LastRefresh,
    pub updated_at: Option<DateTime<Utc>>,
}

impl StatusBar {
    pub fn new() -> Self {
        Self {
            last: LastRefresh::Pending,
            updated_at: None,
        }
    }

    pub fn record(&mut self, event: RefreshEvent) {
        self.last = match event {
            RefreshEvent::Published { generation, rows } => LastRefresh::Ok { generation, rows },
            RefreshEvent::Failed { stage, message } => LastRefresh::Failed { stage, message },
        };
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let (status_color, status_text) = match &self.last {
            LastRefresh::Pending => (Color::Yellow, "○ WAITING".to_string()),
            LastRefresh::Ok { generation, rows } => {
                (Color::Green, format!("● LIVE #{} {} bars", generation, rows))
            }
            LastRefresh::Failed { stage, message } => {
                (Color::Red, format!("○ {} failed: {}", stage, message))
            }
        };

        let updated = self
            .updated_at
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "--:--:--".to_string());

        let text = Line::from(vec![
            Span::styled(status_text, Style::default().fg(status_color)),
            Span::raw(" | "),
            Span::styled(format!("updated {}", updated), Style::default().fg(Color::White)),
            Span::raw(" | "),
            Span::styled("Q", Style::default().fg(Color::Yellow)),
            Span::raw(":Quit "),
            Span::styled("1-3", Style::default().fg(Color::Yellow)),
            Span::raw(":Toggle "),
            Span::styled("↑↓", Style::default().fg(Color::Yellow)),
            Span::raw(":Focus "),
            Span::styled("Space", Style::default().fg(Color::Yellow)),
            Span::raw(":Check "),
            Span::styled("←→", Style::default().fg(Color::Yellow)),
            Span::raw(":Inspect "),
            Span::styled("Esc", Style::default().fg(Color::Yellow)),
            Span::raw(":Clear"),
        ]);

        let para = Paragraph::new(text).block(Block::default());
        frame.render_widget(para, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_latest_cycle_outcome() {
        let mut bar = StatusBar::new();
        assert_eq!(bar.last, LastRefresh::Pending);

        bar.record(RefreshEvent::Published {
            generation: 4,
            rows: 100,
        });
        assert_eq!(
            bar.last,
            LastRefresh::Ok {
                generation: 4,
                rows: 100
            }
        );

        bar.record(RefreshEvent::Failed {
            stage: Stage::Fetch,
            message: "timed out".to_string(),
        });
        assert!(matches!(bar.last, LastRefresh::Failed { stage: Stage::Fetch, .. }));
    }
}

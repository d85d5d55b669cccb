use crate::data::{PlotSource, RefreshEvent};
use crate::ui::{Hit, LayoutManager, Overlay};
use color_eyre::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use ratatui::{layout::Rect, DefaultTerminal};
use std::time::Duration;
use tokio::sync::{mpsc, watch};

const INPUT_POLL: Duration = Duration::from_millis(50);

pub struct App {
    layout: LayoutManager,
    source: PlotSource,
    area: Rect,
    should_quit: bool,
}

impl App {
    pub fn new(layout: LayoutManager) -> Self {
        Self {
            layout,
            source: PlotSource::new(),
            area: Rect::default(),
            should_quit: false,
        }
    }

    pub async fn run(
        mut self,
        mut store: watch::Receiver<PlotSource>,
        mut events: mpsc::Receiver<RefreshEvent>,
    ) -> Result<()> {
        let mut terminal = ratatui::init();
        let result = match execute!(std::io::stdout(), EnableMouseCapture) {
            Ok(()) => self.event_loop(&mut terminal, &mut store, &mut events).await,
            Err(e) => Err(e.into()),
        };
        let _ = execute!(std::io::stdout(), DisableMouseCapture);
        ratatui::restore();
        result
    }

    async fn event_loop(
        &mut self,
        terminal: &mut DefaultTerminal,
        store: &mut watch::Receiver<PlotSource>,
        events: &mut mpsc::Receiver<RefreshEvent>,
    ) -> Result<()> {
        let mut input_tick = tokio::time::interval(INPUT_POLL);
        self.draw(terminal)?;

        loop {
            tokio::select! {
                _ = input_tick.tick() => {
                    let mut dirty = false;
                    while event::poll(Duration::ZERO)? {
                        dirty |= self.handle_event(event::read()?);
                    }
                    if self.should_quit {
                        tracing::info!("quit requested");
                        return Ok(());
                    }
                    if dirty {
                        self.draw(terminal)?;
                    }
                }
                changed = store.changed() => {
                    if changed.is_err() {
                        tracing::warn!("refresh loop ended, closing dashboard");
                        return Ok(());
                    }
                    let source = store.borrow_and_update().clone();
                    self.apply_store(source);
                    self.draw(terminal)?;
                }
                Some(event) = events.recv() => {
                    self.layout.statusbar.record(event);
                    self.draw(terminal)?;
                }
            }
        }
    }

    fn draw(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        terminal.draw(|frame| {
            self.area = frame.area();
            self.layout.render(frame, &self.source);
        })?;
        Ok(())
    }

    fn apply_store(&mut self, source: PlotSource) {
        self.layout.clamp_hover(source.data().len());
        self.source = source;
    }

    /// Returns whether the event changed anything on screen.
    fn handle_event(&mut self, event: Event) -> bool {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key),
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            Event::Resize(width, height) => {
                self.area = Rect::new(0, 0, width, height);
                true
            }
            _ => false,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> bool {
        let rows = self.source.data().len();
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => self.should_quit = true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true
            }
            KeyCode::Char(' ') | KeyCode::Enter => self.layout.controls.toggle_focused(),
            KeyCode::Char(c) => match Overlay::from_shortcut(c) {
                Some(overlay) => self.layout.controls.toggle(overlay),
                None => return false,
            },
            KeyCode::Up | KeyCode::BackTab => self.layout.controls.focus_prev(),
            KeyCode::Down | KeyCode::Tab => self.layout.controls.focus_next(),
            KeyCode::Left => self.layout.step_hover(rows, -1),
            KeyCode::Right => self.layout.step_hover(rows, 1),
            KeyCode::Esc => self.layout.hover = None,
            _ => return false,
        }
        true
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) -> bool {
        let rows = self.source.data().len();
        let hit = self
            .layout
            .hit_test(self.area, rows, mouse.column, mouse.row);
        match (mouse.kind, hit) {
            (MouseEventKind::Down(MouseButton::Left), Hit::Toggle(overlay)) => {
                self.layout.controls.toggle(overlay);
                true
            }
            (MouseEventKind::Moved | MouseEventKind::Drag(_), Hit::Row(idx)) => {
                let changed = self.layout.hover != Some(idx);
                self.layout.hover = Some(idx);
                changed
            }
            (MouseEventKind::Moved, Hit::Nothing) => self.layout.hover.take().is_some(),
            _ => false,
        }
    }
}

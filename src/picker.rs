use std::io::IsTerminal;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block as WidgetBlock, BorderType, Borders, Clear};
use ratatui::{DefaultTerminal, Frame};

use bcq::resolve::{PickOutcome, PickerItem, Prompter};

use crate::error::Result;

const MAX_VISIBLE: usize = 10;

/// Full-screen disambiguation popup. Reports `Unavailable` unless both
/// stdin and stdout are terminals, so piped invocations never block.
pub struct TerminalPrompter;

impl TerminalPrompter {
    pub fn is_available() -> bool {
        std::io::stdin().is_terminal() && std::io::stdout().is_terminal()
    }
}

impl Prompter for TerminalPrompter {
    fn pick(&self, title: &str, items: &[PickerItem]) -> Result<PickOutcome> {
        if items.is_empty() || !Self::is_available() {
            return Ok(PickOutcome::Unavailable);
        }

        let mut terminal = ratatui::try_init()?;
        let mut state = PickerState::new(items.len());
        let outcome = run(&mut terminal, title, items, &mut state);
        ratatui::restore();
        outcome
    }
}

fn run(
    terminal: &mut DefaultTerminal,
    title: &str,
    items: &[PickerItem],
    state: &mut PickerState,
) -> Result<PickOutcome> {
    loop {
        terminal.draw(|frame| render(frame, title, items, state))?;
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if let Some(outcome) = state.handle_key(&key) {
                return Ok(outcome);
            }
        }
    }
}

#[derive(Debug)]
struct PickerState {
    selected: usize,
    len: usize,
}

impl PickerState {
    fn new(len: usize) -> Self {
        Self { selected: 0, len }
    }

    fn handle_key(&mut self, key: &KeyEvent) -> Option<PickOutcome> {
        match (key.modifiers, key.code) {
            (KeyModifiers::NONE, KeyCode::Esc)
            | (KeyModifiers::NONE, KeyCode::Char('q'))
            | (KeyModifiers::CONTROL, KeyCode::Char('c')) => Some(PickOutcome::Cancelled),
            (KeyModifiers::NONE, KeyCode::Up) | (KeyModifiers::NONE, KeyCode::Char('k')) => {
                self.selected = self.selected.saturating_sub(1);
                None
            }
            (KeyModifiers::NONE, KeyCode::Down) | (KeyModifiers::NONE, KeyCode::Char('j')) => {
                if self.selected + 1 < self.len {
                    self.selected += 1;
                }
                None
            }
            (KeyModifiers::NONE, KeyCode::Enter) => Some(PickOutcome::Selected(self.selected)),
            _ => None,
        }
    }

    fn scroll_offset(&self, visible: usize) -> usize {
        if self.selected >= visible {
            self.selected - visible + 1
        } else {
            0
        }
    }
}

fn render(frame: &mut Frame, title: &str, items: &[PickerItem], state: &PickerState) {
    let area = frame.area();
    let max_items = MAX_VISIBLE.min(items.len());
    let popup_height = ((max_items + 2) as u16).min(area.height); // +2 for borders
    let popup_width = (area.width * 60 / 100).max(30).min(area.width);
    let x = area.x + (area.width.saturating_sub(popup_width)) / 2;
    let y = area.y + (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(x, y, popup_width, popup_height);
    frame.render_widget(Clear, popup_area);

    let block = WidgetBlock::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" {} ", title));

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let offset = state.scroll_offset(max_items);
    for (i, item) in items.iter().skip(offset).take(max_items).enumerate() {
        if i as u16 >= inner.height {
            break;
        }
        let is_selected = (i + offset) == state.selected;
        let style = if is_selected {
            Style::default().fg(Color::White).bg(Color::DarkGray)
        } else {
            Style::default().fg(Color::Cyan)
        };

        let width = inner.width as usize;
        let label = format!("{} (ID: {})", item.title, item.id);
        let label: String = label.chars().take(width).collect();
        let rest = width.saturating_sub(label.chars().count());
        let detail: String = if item.description.is_empty() || rest < 3 {
            String::new()
        } else {
            format!("  {}", item.description).chars().take(rest).collect()
        };
        let padding = rest.saturating_sub(detail.chars().count());

        let line = Line::from(vec![
            Span::styled(label, style),
            Span::styled(detail, style.fg(Color::Gray)),
            Span::styled(" ".repeat(padding), style),
        ]);
        let line_area = Rect::new(inner.x, inner.y + i as u16, inner.width, 1);
        frame.render_widget(line, line_area);
    }
}

//! Full-screen terminal front end.
//!
//! Layout, top to bottom: the output pane (transcript plus the partial
//! response of the cycle in flight), the progress line, the menu line and the
//! input box.  Key handling and command dispatch run on the UI thread and
//! change the view directly; background work reaches it only through the
//! redraw queue.

use std::io::{self, Stdout};
use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Frame;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::Result;
use crate::commands::{ChatCommand, help_text, parse_command};
use crate::controller::Controller;
use crate::observability::CycleStats;
use crate::prompts::{self, NamedPrompt};
use crate::ui::ChatView;

/// The terminal type the chat binary draws on.
pub type Tui = Terminal<CrosstermBackend<Stdout>>;

const MENU: &str = "Enter send | Esc cancel | F2 review | F3 intro | PgUp/PgDn scroll | /help | Ctrl+Q quit";

/// Initialize terminal
pub fn init_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore terminal
pub fn restore_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Rows `text` occupies once wrapped to `width` columns.
fn wrapped_height(text: &str, width: u16) -> u16 {
    let width = usize::from(width.max(1));
    let rows: usize = text
        .lines()
        .map(|line| Line::raw(line).width().div_ceil(width).max(1))
        .sum();
    u16::try_from(rows).unwrap_or(u16::MAX)
}

/// Draw `view`.
pub fn draw(frame: &mut Frame, view: &ChatView, model: &str) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let mut output = view.transcript_text();
    output.push_str(view.provisional());
    let height = chunks[0].height.saturating_sub(2);
    let rows = wrapped_height(&output, chunks[0].width.saturating_sub(2));
    let offset = rows.saturating_sub(height).saturating_sub(view.scroll());
    let title = format!(" aifun | {model} | history items: {} ", view.history_len());
    let pane = Paragraph::new(output)
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false })
        .scroll((offset, 0));
    frame.render_widget(pane, chunks[0]);

    let progress = if view.status().is_empty() {
        Line::from(Span::styled(
            view.progress().to_string(),
            Style::default().fg(Color::Yellow),
        ))
    } else {
        Line::from(vec![
            Span::styled(
                view.progress().to_string(),
                Style::default().fg(Color::Yellow),
            ),
            Span::raw("  "),
            Span::styled(view.status().to_string(), Style::default().fg(Color::Red)),
        ])
    };
    frame.render_widget(Paragraph::new(progress), chunks[1]);

    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            MENU,
            Style::default().add_modifier(Modifier::DIM),
        ))),
        chunks[2],
    );

    let input_title = if view.is_busy() {
        " streaming... (Esc to cancel) "
    } else {
        " message "
    };
    let input = Paragraph::new(view.input.as_str())
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL).title(input_title));
    frame.render_widget(input, chunks[3]);
}

/// What a key press asks the application to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    /// A line was entered.
    Submit(String),
    /// Cancel the cycle in flight.
    Cancel,
    /// Review the configured attachment.
    Review,
    /// Have the model introduce itself.
    Intro,
    /// Leave the application.
    Quit,
    /// Handled locally, or ignored.
    None,
}

/// Apply `key` to the input box and report what else it asks for.
pub fn handle_key(view: &mut ChatView, key: KeyEvent) -> KeyAction {
    if key.kind != KeyEventKind::Press {
        return KeyAction::None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') | KeyCode::Char('q') => KeyAction::Quit,
            _ => KeyAction::None,
        };
    }
    match key.code {
        KeyCode::Enter => {
            let line = std::mem::take(&mut view.input);
            if line.trim().is_empty() {
                KeyAction::None
            } else {
                KeyAction::Submit(line)
            }
        }
        KeyCode::Char(c) => {
            view.input.push(c);
            KeyAction::None
        }
        KeyCode::Backspace => {
            view.input.pop();
            KeyAction::None
        }
        KeyCode::Esc => KeyAction::Cancel,
        KeyCode::PageUp => {
            view.scroll_up(10);
            KeyAction::None
        }
        KeyCode::PageDown => {
            view.scroll_down(10);
            KeyAction::None
        }
        KeyCode::F(2) => KeyAction::Review,
        KeyCode::F(3) => KeyAction::Intro,
        _ => KeyAction::None,
    }
}

/// Whether the application keeps running after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Executes entered lines and key actions against a [`Controller`].
pub struct ChatApp {
    controller: Controller,
    catalog: Vec<NamedPrompt>,
}

impl ChatApp {
    pub fn new(controller: Controller, catalog: Vec<NamedPrompt>) -> Self {
        Self {
            controller,
            catalog,
        }
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    /// Act on a key action.
    pub fn on_action(&self, action: KeyAction, view: &mut ChatView) -> Flow {
        view.set_status("");
        match action {
            KeyAction::Submit(line) => return self.execute(&line, view),
            KeyAction::Cancel => {
                if !self.controller.cancel() {
                    view.set_status("nothing to cancel");
                }
            }
            KeyAction::Review => self.report(self.controller.review_attachment(None), view),
            KeyAction::Intro => self.report(self.controller.introduce(), view),
            KeyAction::Quit => {
                self.controller.cancel();
                return Flow::Quit;
            }
            KeyAction::None => {}
        }
        Flow::Continue
    }

    /// Run one entered line: a command or a message.
    pub fn execute(&self, line: &str, view: &mut ChatView) -> Flow {
        let Some(command) = parse_command(line) else {
            self.report(self.controller.submit_prompt(line.trim()), view);
            return Flow::Continue;
        };
        match command {
            ChatCommand::Help => view.append(help_text()),
            ChatCommand::Quit => {
                self.controller.cancel();
                return Flow::Quit;
            }
            ChatCommand::Clear => {
                if let Err(err) = self.controller.reset() {
                    view.set_status(err.to_string());
                }
            }
            ChatCommand::Review(path) => {
                self.report(
                    self.controller.review_attachment(path.map(PathBuf::from)),
                    view,
                );
            }
            ChatCommand::Intro => self.report(self.controller.introduce(), view),
            ChatCommand::Prompts => view.append(prompts::menu(&self.catalog)),
            ChatCommand::Prompt(n) => match prompts::select(&self.catalog, n) {
                Ok(prompt) => {
                    let name = prompt.name.clone();
                    match self.controller.set_system_instruction(prompt.prompt.clone()) {
                        Ok(()) => view.set_status(format!("system instruction: {name}")),
                        Err(err) => view.set_status(err.to_string()),
                    }
                }
                Err(err) => view.set_status(err.to_string()),
            },
            ChatCommand::System(text) => {
                let cleared = text.is_none();
                match self
                    .controller
                    .set_system_instruction(text.unwrap_or_default())
                {
                    Ok(()) if cleared => view.set_status("system instruction cleared"),
                    Ok(()) => view.set_status("system instruction set"),
                    Err(err) => view.set_status(err.to_string()),
                }
            }
            ChatCommand::Cancel => {
                if !self.controller.cancel() {
                    view.set_status("nothing to cancel");
                }
            }
            ChatCommand::Stats => view.append(format!(
                "history items: {}\n{}",
                view.history_len(),
                CycleStats::snapshot()
            )),
            ChatCommand::Invalid(message) => view.set_status(message),
        }
        Flow::Continue
    }

    fn report<T>(&self, started: Result<T>, view: &mut ChatView) {
        if let Err(err) = started {
            view.set_status(err.to_string());
        }
    }
}

//! Full-screen streaming chat with Gemini.
//!
//! # Usage
//!
//! ```bash
//! # Chat with the default model and the first catalog prompt
//! aifun-chat
//!
//! # Use the King Julian persona and give every response 90 seconds
//! aifun-chat --prompt 6 --timeout-secs 90
//!
//! # Review a different diff than gitdiff.txt
//! aifun-chat --review-file changes.diff
//! ```
//!
//! Logs go to `aifun.log` (see `--log-file`); set `AIFUN_LOG=debug` for more.

use std::sync::Arc;

use arrrg::CommandLine;
use crossterm::event::{Event, EventStream};
use futures::StreamExt;

use aifun::tui::{self, ChatApp, Flow, Tui};
use aifun::{
    ChatArgs, ChatConfig, Controller, Gemini, MarkdownRenderer, Renderer, SessionState,
    StreamCoordinator, UiLoop, logging,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("aifun-chat [OPTIONS]");
    let config = ChatConfig::from(args);
    logging::init(&config.log_file)?;

    let client = match Gemini::with_options(
        None,
        config.base_url.clone(),
        Some(config.model.clone()),
        None,
    ) {
        Ok(client) => Arc::new(client),
        Err(err) => {
            tracing::error!(error = %err, "cannot create client");
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    let catalog = config.catalog()?;
    let instruction = match config.chosen_instruction(&catalog)? {
        Some(text) => text,
        None => catalog.first().map(|p| p.prompt.clone()).unwrap_or_default(),
    };
    let coordinator = StreamCoordinator::new(client.clone(), client)
        .with_session(SessionState::with_system_instruction(instruction))
        .with_review_file(config.review_file.clone())
        .with_review_output(config.review_output.clone());

    let (mut ui, queue) = UiLoop::new();
    // ratatui draws raw text; ANSI styling would show up as garbage.
    let renderer: Arc<dyn Renderer> = Arc::new(MarkdownRenderer::plain());
    let controller = Controller::new(coordinator, queue, renderer).with_deadline(config.deadline);
    let app = ChatApp::new(controller, catalog);
    ui.view_mut().append(format!(
        "aifun chat ({}). Type /help for commands, Ctrl+Q to quit.",
        config.model
    ));
    tracing::info!(model = %config.model, "chat started");

    let model = config.model.to_string();
    let mut terminal = tui::init_terminal()?;
    let result = run(&mut terminal, &mut ui, &app, &model).await;
    tui::restore_terminal(&mut terminal)?;
    tracing::info!("chat ended");
    result.map_err(Into::into)
}

async fn run(terminal: &mut Tui, ui: &mut UiLoop, app: &ChatApp, model: &str) -> aifun::Result<()> {
    let mut events = EventStream::new();
    loop {
        terminal.draw(|frame| tui::draw(frame, ui.view(), model))?;
        tokio::select! {
            open = ui.wait() => {
                if !open {
                    break;
                }
            }
            event = events.next() => match event {
                Some(Ok(Event::Key(key))) => {
                    let action = tui::handle_key(ui.view_mut(), key);
                    if app.on_action(action, ui.view_mut()) == Flow::Quit {
                        break;
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => return Err(err.into()),
                None => break,
            },
        }
    }
    Ok(())
}

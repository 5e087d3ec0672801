//! Line-oriented diff reviewer.
//!
//! Pick a system instruction from the catalog, then type messages.  `file`
//! uploads `gitdiff.txt` (see `--review-file`) and streams a review, which is
//! also saved to `codereview.md`.  `exit` quits.  Ctrl+C cancels the response
//! being streamed.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::task::JoinHandle;

use aifun::commands::{ChatCommand, help_text, parse_command};
use aifun::observability::CycleStats;
use aifun::prompts::{self, NamedPrompt};
use aifun::{
    ChatArgs, ChatConfig, Controller, Gemini, MarkdownRenderer, Renderer, SessionState,
    StreamCoordinator, UiLoop, logging,
};

/// Prints what the UI loop accumulates to stdout.
#[derive(Default)]
struct Console {
    printed: usize,
    progress_shown: bool,
}

impl Console {
    fn flush(&mut self, ui: &UiLoop) {
        let view = ui.view();
        let transcript = view.transcript();
        if transcript.len() < self.printed {
            self.printed = 0;
        }
        for block in &transcript[self.printed..] {
            if self.progress_shown {
                println!();
                self.progress_shown = false;
            }
            print!("{block}");
        }
        self.printed = transcript.len();
        if !view.progress().is_empty() {
            print!("\r{}", view.progress());
            self.progress_shown = true;
        }
        let _ = std::io::stdout().flush();
    }

    async fn drive(&mut self, ui: &mut UiLoop, mut handle: JoinHandle<aifun::Result<String>>) {
        loop {
            tokio::select! {
                _ = ui.wait() => self.flush(ui),
                joined = &mut handle => {
                    ui.apply_pending();
                    self.flush(ui);
                    if let Err(err) = joined {
                        tracing::error!(error = %err, "generation task failed");
                        eprintln!("generation task failed: {err}");
                    }
                    return;
                }
            }
        }
    }
}

fn choose_prompt(rl: &mut DefaultEditor, catalog: &[NamedPrompt]) -> Result<String, ReadlineError> {
    print!("{}", prompts::menu(catalog));
    loop {
        let line = rl.readline(&format!("Choose a prompt [1-{}] (Enter for 1): ", catalog.len()))?;
        let line = line.trim();
        let n = if line.is_empty() {
            Ok(1)
        } else {
            line.parse::<usize>().map_err(|_| ())
        };
        match n.ok().map(|n| prompts::select(catalog, n)) {
            Some(Ok(prompt)) => {
                println!("Using \"{}\"\n", prompt.name);
                return Ok(prompt.prompt.clone());
            }
            Some(Err(err)) => println!("{err}"),
            None => println!("Not a number: {line}"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("aifun-review [OPTIONS]");
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

    let mut rl = DefaultEditor::new()?;
    let catalog = config.catalog()?;
    let instruction = match config.chosen_instruction(&catalog)? {
        Some(text) => text,
        None => match choose_prompt(&mut rl, &catalog) {
            Ok(text) => text,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => return Ok(()),
            Err(err) => return Err(err.into()),
        },
    };

    let coordinator = StreamCoordinator::new(client.clone(), client)
        .with_session(SessionState::with_system_instruction(instruction))
        .with_review_file(config.review_file.clone())
        .with_review_output(config.review_output.clone());
    let (mut ui, queue) = UiLoop::new();
    let renderer: Arc<dyn Renderer> = Arc::new(MarkdownRenderer::with_color(config.use_color));
    let controller = Controller::new(coordinator, queue, renderer).with_deadline(config.deadline);

    let interrupt = controller.clone();
    ctrlc::set_handler(move || {
        if interrupt.cancel() {
            tracing::info!("cancel requested");
        }
    })?;

    println!("aifun review ({})", config.model);
    println!(
        "Type 'file' to review {}, /help for commands, 'exit' to quit\n",
        config.review_file.display()
    );

    let mut console = Console::default();
    loop {
        let prompt = format!("History items: {}\n> ", ui.view().history_len());
        let line = match rl.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("Error: {err}");
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(line);

        let started = match parse_command(line) {
            None => controller.submit_prompt(line),
            Some(ChatCommand::Quit) => break,
            Some(ChatCommand::Review(path)) => {
                controller.review_attachment(path.map(PathBuf::from))
            }
            Some(ChatCommand::Intro) => controller.introduce(),
            Some(ChatCommand::Help) => {
                println!("{}", help_text());
                continue;
            }
            Some(ChatCommand::Clear) => {
                match controller.reset() {
                    Ok(()) => println!("Conversation cleared."),
                    Err(err) => println!("{err}"),
                }
                ui.apply_pending();
                console.flush(&ui);
                continue;
            }
            Some(ChatCommand::Prompts) => {
                print!("{}", prompts::menu(&catalog));
                continue;
            }
            Some(ChatCommand::Prompt(n)) => {
                match prompts::select(&catalog, n) {
                    Ok(prompt) => match controller.set_system_instruction(prompt.prompt.clone()) {
                        Ok(()) => println!("Using \"{}\"", prompt.name),
                        Err(err) => println!("{err}"),
                    },
                    Err(err) => println!("{err}"),
                }
                continue;
            }
            Some(ChatCommand::System(text)) => {
                let cleared = text.is_none();
                match controller.set_system_instruction(text.unwrap_or_default()) {
                    Ok(()) if cleared => println!("System instruction cleared."),
                    Ok(()) => println!("System instruction set."),
                    Err(err) => println!("{err}"),
                }
                continue;
            }
            Some(ChatCommand::Cancel) => {
                println!("Nothing to cancel.");
                continue;
            }
            Some(ChatCommand::Stats) => {
                println!("History items: {}\n{}", ui.view().history_len(), CycleStats::snapshot());
                continue;
            }
            Some(ChatCommand::Invalid(message)) => {
                println!("{message}");
                continue;
            }
        };

        match started {
            Ok(handle) => console.drive(&mut ui, handle).await,
            Err(err) => println!("{err}"),
        }
    }

    controller.cancel();
    println!("Goodbye!");
    Ok(())
}

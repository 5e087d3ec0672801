//! Presentation of model output and user input.
//!
//! The coordinator and the UI never assume a markup engine; they go through
//! the [`Renderer`] trait.  [`MarkdownRenderer`] is the stock implementation,
//! built on `pulldown-cmark`, with optional ANSI styling for line-oriented
//! terminals.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

use crate::Result;
use crate::observability::RENDER_FALLBACKS;

/// ANSI escape code for bold text (used for headings and strong emphasis).
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code for dim text (used for rules and link targets).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code for italic text.
const ANSI_ITALIC: &str = "\x1b[3m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for code).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for green text (used for the user echo).
const ANSI_GREEN: &str = "\x1b[32m";

/// Turns markdown and user input into display text.
pub trait Renderer: Send + Sync {
    /// Render model output.
    fn render(&self, markdown: &str) -> Result<String>;

    /// Format the user's own input for the transcript.
    fn format_user_echo(&self, text: &str, history_len: usize) -> Result<String>;
}

/// Render `markdown`, or return it unchanged if rendering fails.
pub fn render_or_raw(renderer: &dyn Renderer, markdown: &str) -> String {
    match renderer.render(markdown) {
        Ok(text) => text,
        Err(err) => {
            RENDER_FALLBACKS.click();
            tracing::warn!(error = %err, "render failed, showing raw text");
            markdown.to_string()
        }
    }
}

/// Format the user echo, or return the input unchanged if formatting fails.
pub fn echo_or_raw(renderer: &dyn Renderer, text: &str, history_len: usize) -> String {
    match renderer.format_user_echo(text, history_len) {
        Ok(echo) => echo,
        Err(err) => {
            RENDER_FALLBACKS.click();
            tracing::warn!(error = %err, "echo formatting failed, showing raw text");
            format!("{text}\n")
        }
    }
}

/// Markdown renderer with optional ANSI styling.
#[derive(Debug, Clone, Copy)]
pub struct MarkdownRenderer {
    use_color: bool,
}

impl MarkdownRenderer {
    /// Creates a new MarkdownRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self { use_color: true }
    }

    /// Creates a new MarkdownRenderer with ANSI colors disabled.
    ///
    /// The full-screen UI uses this; it styles text itself.
    pub fn plain() -> Self {
        Self { use_color: false }
    }

    /// Returns a renderer with colors enabled or disabled.
    pub fn with_color(use_color: bool) -> Self {
        Self { use_color }
    }

    fn style<'a>(&self, code: &'a str) -> &'a str {
        if self.use_color { code } else { "" }
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

struct ListState {
    next: Option<u64>,
}

impl Renderer for MarkdownRenderer {
    fn render(&self, markdown: &str) -> Result<String> {
        let options =
            Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
        let parser = Parser::new_ext(markdown, options);

        let mut out = String::new();
        let mut lists: Vec<ListState> = Vec::new();
        let mut link_targets: Vec<String> = Vec::new();
        let mut in_code_block = false;

        for event in parser {
            match event {
                Event::Start(Tag::Heading { level, .. }) => {
                    out.push_str(self.style(ANSI_BOLD));
                    out.push_str(&"#".repeat(level as usize));
                    out.push(' ');
                }
                Event::End(TagEnd::Heading(_)) => {
                    out.push_str(self.style(ANSI_RESET));
                    out.push_str("\n\n");
                }
                Event::End(TagEnd::Paragraph) => {
                    if lists.is_empty() {
                        out.push_str("\n\n");
                    } else {
                        out.push('\n');
                    }
                }
                Event::Start(Tag::Emphasis) => out.push_str(self.style(ANSI_ITALIC)),
                Event::Start(Tag::Strong) => out.push_str(self.style(ANSI_BOLD)),
                Event::End(TagEnd::Emphasis) | Event::End(TagEnd::Strong) => {
                    out.push_str(self.style(ANSI_RESET))
                }
                Event::Start(Tag::CodeBlock(kind)) => {
                    in_code_block = true;
                    if let CodeBlockKind::Fenced(lang) = kind {
                        if !lang.is_empty() && !self.use_color {
                            out.push_str(&format!("    [{lang}]\n"));
                        }
                    }
                    out.push_str(self.style(ANSI_CYAN));
                }
                Event::End(TagEnd::CodeBlock) => {
                    in_code_block = false;
                    out.push_str(self.style(ANSI_RESET));
                    out.push('\n');
                }
                Event::Start(Tag::List(start)) => {
                    if !lists.is_empty() && !out.ends_with('\n') {
                        out.push('\n');
                    }
                    lists.push(ListState { next: start });
                }
                Event::End(TagEnd::List(_)) => {
                    lists.pop();
                    if lists.is_empty() {
                        out.push('\n');
                    }
                }
                Event::Start(Tag::Item) => {
                    let depth = lists.len().saturating_sub(1);
                    out.push_str(&"  ".repeat(depth));
                    match lists.last_mut().and_then(|list| list.next.as_mut()) {
                        Some(n) => {
                            out.push_str(&format!("{n}. "));
                            *n += 1;
                        }
                        None => out.push_str("• "),
                    }
                }
                Event::End(TagEnd::Item) => {
                    if !out.ends_with('\n') {
                        out.push('\n');
                    }
                }
                Event::Start(Tag::Link { dest_url, .. }) => {
                    link_targets.push(dest_url.to_string());
                }
                Event::End(TagEnd::Link) => {
                    if let Some(url) = link_targets.pop() {
                        out.push_str(&format!(
                            " {}({url}){}",
                            self.style(ANSI_DIM),
                            self.style(ANSI_RESET)
                        ));
                    }
                }
                Event::Text(text) if in_code_block => {
                    for line in text.lines() {
                        out.push_str("    ");
                        out.push_str(line);
                        out.push('\n');
                    }
                }
                Event::Text(text) => out.push_str(&text),
                Event::Code(code) => {
                    out.push_str(self.style(ANSI_CYAN));
                    out.push('`');
                    out.push_str(&code);
                    out.push('`');
                    out.push_str(self.style(ANSI_RESET));
                }
                Event::Html(html) | Event::InlineHtml(html) => out.push_str(&html),
                Event::SoftBreak | Event::HardBreak => out.push('\n'),
                Event::Rule => {
                    out.push_str(self.style(ANSI_DIM));
                    out.push_str(&"─".repeat(40));
                    out.push_str(self.style(ANSI_RESET));
                    out.push_str("\n\n");
                }
                Event::TaskListMarker(done) => {
                    out.push_str(if done { "[x] " } else { "[ ] " });
                }
                Event::End(TagEnd::TableRow) | Event::End(TagEnd::TableHead) => out.push('\n'),
                Event::End(TagEnd::TableCell) => out.push_str(" | "),
                _ => {}
            }
        }

        let trimmed = out.trim_end();
        if trimmed.is_empty() {
            return Ok(String::new());
        }
        Ok(format!("{trimmed}\n"))
    }

    fn format_user_echo(&self, text: &str, history_len: usize) -> Result<String> {
        Ok(format!(
            "{}[{history_len}] >{} {}\n",
            self.style(ANSI_GREEN),
            self.style(ANSI_RESET),
            text.trim_end()
        ))
    }
}

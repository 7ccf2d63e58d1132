//! Terminal output with colors and formatting
//!
//! Uses ANSI escape codes for colors and styling.

use std::io::{self, Write};

use super::{render_plain, OutputEvent, OutputWriter, RULE_WIDTH};

// ANSI color codes
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const GRAY: &str = "\x1b[90m";

/// Terminal output writer with colors and formatting
pub struct TerminalOutput {
    use_colors: bool,
}

impl Default for TerminalOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalOutput {
    pub fn new() -> Self {
        Self { use_colors: true }
    }

    /// Create without colors
    pub fn without_colors() -> Self {
        Self { use_colors: false }
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.use_colors {
            format!("{}{}{}", color, text, RESET)
        } else {
            text.to_string()
        }
    }

    fn render(&self, event: &OutputEvent) -> String {
        match event {
            OutputEvent::Heading(title) => format!(
                "{}\n{}",
                self.paint(BOLD, title),
                self.paint(GRAY, &"-".repeat(RULE_WIDTH))
            ),
            OutputEvent::ServerMapping { .. } => self.paint(DIM, &render_plain(event)),
            OutputEvent::ToolsAvailable(names) => {
                format!("{} {}", self.paint(BOLD, "Tool AVAILABLE:"), names.join(", "))
            }
            OutputEvent::ToolChosen { tool, server } => {
                let mut out = format!("{} {}", self.paint(GREEN, "✅ LLM Choose:"), self.paint(BOLD, tool));
                if let Some(server) = server {
                    out.push_str(&format!("\n{}", self.paint(GRAY, &format!("Tool from Server: {}", server))));
                }
                out
            }
            OutputEvent::NoToolChosen => self.paint(RED, "❌ LLM didn't choose any tool"),
            OutputEvent::Query(query) => format!("{} {}", self.paint(CYAN, "User Query:"), query),
            OutputEvent::Warning(msg) => self.paint(YELLOW, &format!("Warning: {}", msg)),
            OutputEvent::Error(msg) => self.paint(RED, &format!("Error: {}", msg)),
            OutputEvent::Separator | OutputEvent::ResultsBanner => self.paint(GRAY, &render_plain(event)),
            OutputEvent::Text(_) | OutputEvent::ModelResponse(_) => render_plain(event),
        }
    }
}

impl OutputWriter for TerminalOutput {
    fn write(&self, event: OutputEvent) {
        let line = self.render(&event);
        match event {
            OutputEvent::Warning(_) | OutputEvent::Error(_) => eprintln!("{}", line),
            _ => println!("{}", line),
        }
    }

    fn flush(&self) {
        let _ = io::stdout().flush();
        let _ = io::stderr().flush();
    }

    fn supports_colors(&self) -> bool {
        self.use_colors
    }
}

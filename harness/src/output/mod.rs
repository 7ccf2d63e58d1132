//! Output abstraction for the host and the CLI
//!
//! The host emits [`OutputEvent`]s and never prints directly. Writers decide
//! how events look: colored for terminals, plain for pipes and CI.

mod plain;
mod terminal;

pub use plain::PlainOutput;
pub use terminal::TerminalOutput;

/// Width of separator rules
pub const RULE_WIDTH: usize = 60;

// ============================================================================
// Output Events
// ============================================================================

/// Events that can be displayed to the user
#[derive(Debug, Clone, PartialEq)]
pub enum OutputEvent {
    /// Plain text line
    Text(String),

    /// Section heading followed by a rule
    Heading(String),

    /// Which client instance serves an endpoint
    ServerMapping {
        endpoint: String,
        instance: u64,
        connected: bool,
    },

    /// Tool names offered to the model
    ToolsAvailable(Vec<String>),

    /// Banner printed before the first result
    ResultsBanner,

    /// The query an experiment ran
    Query(String),

    /// The model picked a tool
    ToolChosen {
        tool: String,
        server: Option<String>,
    },

    /// The model answered without picking a tool
    NoToolChosen,

    /// Free text from the model
    ModelResponse(String),

    /// Horizontal rule
    Separator,

    /// Warning message
    Warning(String),

    /// Error message
    Error(String),
}

// ============================================================================
// Output Writer Trait
// ============================================================================

/// Trait for writing output events
pub trait OutputWriter: Send + Sync {
    /// Write an output event
    fn write(&self, event: OutputEvent);

    /// Flush any buffered output
    fn flush(&self);

    /// Whether this writer supports colors/formatting
    fn supports_colors(&self) -> bool {
        false
    }
}

/// Create a default output writer based on environment
pub fn default_output() -> Box<dyn OutputWriter> {
    if atty::is(atty::Stream::Stdout) {
        Box::new(TerminalOutput::new())
    } else {
        Box::new(PlainOutput::new())
    }
}

/// Render an event without styling; shared by both writers
pub(crate) fn render_plain(event: &OutputEvent) -> String {
    match event {
        OutputEvent::Text(text) => text.clone(),
        OutputEvent::Heading(title) => format!("{}\n{}", title, "-".repeat(RULE_WIDTH)),
        OutputEvent::ServerMapping {
            endpoint,
            instance,
            connected,
        } => format!(
            "Server: {}\n  └─ Client Instance: #{}\n  └─ Client Status: {}\n",
            endpoint,
            instance,
            if *connected { "Connected" } else { "Not Connected" }
        ),
        OutputEvent::ToolsAvailable(names) => format!("Tool AVAILABLE: {}", names.join(", ")),
        OutputEvent::ResultsBanner => {
            let rule = "=".repeat(RULE_WIDTH);
            format!("{}\nResults\n{}", rule, rule)
        }
        OutputEvent::Query(query) => format!("User Query: {}", query),
        OutputEvent::ToolChosen { tool, server } => match server {
            Some(server) => format!("LLM Choose: {}\nTool from Server: {}", tool, server),
            None => format!("LLM Choose: {}", tool),
        },
        OutputEvent::NoToolChosen => "LLM didn't choose any tool".to_string(),
        OutputEvent::ModelResponse(text) => format!("LLM Response: {}", text),
        OutputEvent::Separator => "=".repeat(RULE_WIDTH),
        OutputEvent::Warning(msg) => format!("Warning: {}", msg),
        OutputEvent::Error(msg) => format!("Error: {}", msg),
    }
}

// ============================================================================
// Tests
// ============================================================================

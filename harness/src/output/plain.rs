//! Plain text output for pipes and CI environments

use std::io::{self, Write};

use super::{render_plain, OutputEvent, OutputWriter};

/// Plain text output writer (no colors)
#[derive(Debug, Default)]
pub struct PlainOutput;

impl PlainOutput {
    pub fn new() -> Self {
        Self
    }
}

impl OutputWriter for PlainOutput {
    fn write(&self, event: OutputEvent) {
        let line = render_plain(&event);
        match event {
            OutputEvent::Warning(_) | OutputEvent::Error(_) => eprintln!("{}", line),
            _ => println!("{}", line),
        }
    }

    fn flush(&self) {
        let _ = io::stdout().flush();
        let _ = io::stderr().flush();
    }
}

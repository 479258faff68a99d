//! Line-oriented terminal access for the monitor.

use std::collections::VecDeque;

use rustyline::{error::ReadlineError, DefaultEditor};

use crate::diagnostics::Result;

/// Where the monitor reads commands and writes its output.
pub trait Console {
    /// Reads one line; `None` at end of input.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;

    fn write_line(&mut self, text: &str) -> Result<()>;
}

/// Interactive console backed by a `rustyline` editor with history.
pub struct EditorConsole {
    editor: DefaultEditor,
}

impl EditorConsole {
    pub fn new() -> Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

impl Console for EditorConsole {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    self.editor.add_history_entry(trimmed).ok();
                }
                Ok(Some(line))
            }
            // Ctrl-C abandons the line being typed, not the session.
            Err(ReadlineError::Interrupted) => Ok(Some(String::new())),
            Err(ReadlineError::Eof) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write_line(&mut self, text: &str) -> Result<()> {
        println!("{text}");
        Ok(())
    }
}

/// Replays a fixed list of command lines and records everything written.
#[derive(Debug, Default)]
pub struct ScriptConsole {
    lines: VecDeque<String>,
    transcript: Vec<String>,
    output: Vec<String>,
    echo: bool,
}

impl ScriptConsole {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Also prints the transcript to standard output as it is produced.
    pub fn echoing(mut self) -> Self {
        self.echo = true;
        self
    }

    /// Prompts with the commands read, interleaved with the output.
    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    /// Everything written, one entry per line.
    pub fn output(&self) -> &[String] {
        &self.output
    }

    fn record(&mut self, text: String) {
        if self.echo {
            println!("{text}");
        }
        self.transcript.push(text);
    }
}

impl Console for ScriptConsole {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        let line = self.lines.pop_front();
        if let Some(line) = &line {
            self.record(format!("{prompt}{line}"));
        }
        Ok(line)
    }

    fn write_line(&mut self, text: &str) -> Result<()> {
        for line in text.lines() {
            self.output.push(line.to_string());
            self.record(line.to_string());
        }
        Ok(())
    }
}

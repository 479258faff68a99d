use crate::{evaluator::DEFAULT_TYPE_STACK, runtime::DEFAULT_VALUE_STACK};

/// Configuration for the monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Prompt printed before each command line.
    pub prompt: String,
    /// Maximum number of values one evaluation may hold at once.
    pub type_stack_capacity: usize,
    /// Capacity in bytes of the value stack shared with the host.
    pub value_stack_capacity: usize,
    /// Default byte budget of the `heap` command.
    pub heap_budget: usize,
    /// Lines shown around the current line by `list`.
    pub list_window: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            prompt: default_prompt(),
            type_stack_capacity: DEFAULT_TYPE_STACK,
            value_stack_capacity: DEFAULT_VALUE_STACK,
            heap_budget: 4096,
            list_window: 10,
        }
    }
}

impl MonitorConfig {
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }
}

/// The executable's name followed by `> `.
fn default_prompt() -> String {
    let name = std::env::args_os()
        .next()
        .and_then(|arg0| {
            std::path::Path::new(&arg0)
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "echo".to_string());
    format!("({name}) ")
}

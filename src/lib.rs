//! Core library for the Echo runtime monitor.
//! Suspends a running program at breakpoints, watches and interrupts, and
//! evaluates expressions against its live frames, heap and standard
//! environment from a line-oriented command prompt.

pub mod breakpoints;
pub mod coerce;
pub mod commands;
pub mod config;
pub mod demo;
pub mod diagnostics;
pub mod evaluator;
pub mod frame;
pub mod lexer;
pub mod memory;
pub mod mode;
pub mod render;
pub mod repl;
pub mod resolve;
pub mod runtime;
pub mod scope;
pub mod session;
pub mod stdlib;
pub mod symbol;
pub mod tree;
pub mod value;

pub use breakpoints::BreakpointManager;
pub use config::MonitorConfig;
pub use diagnostics::{Diagnostic, DiagnosticKind, MonitorError, SourceSpan};
pub use evaluator::{evaluate, Evaluation};
pub use repl::{Console, EditorConsole, ScriptConsole};
pub use runtime::Runtime;
pub use session::{clear_interrupts, Monitor, SessionResult, StopReason};

//! Entering and leaving the monitor.

use std::sync::{Mutex, PoisonError};

use tracing::{debug, info};

use crate::{
    breakpoints::BreakpointManager,
    commands::{self, Flow},
    config::MonitorConfig,
    diagnostics::{Diagnostic, Result},
    frame::FrameId,
    repl::Console,
    runtime::Runtime,
    tree::{Mask, NodeId, Tree},
};

/// Held by whichever thread is in the monitor.
static IN_MONITOR: Mutex<()> = Mutex::new(());

/// Status the host exits with when the user quits from the monitor.
pub const ABORT_STATUS: i32 = 1;

/// Why the host entered the monitor.
#[derive(Debug, Clone, PartialEq)]
pub enum StopReason {
    Interrupt,
    Breakpoint,
    TemporaryBreakpoint,
    Watch,
    Trace,
    RuntimeError(Diagnostic),
}

impl StopReason {
    pub fn describe(&self) -> &'static str {
        match self {
            StopReason::Interrupt => "interrupt",
            StopReason::Breakpoint => "breakpoint",
            StopReason::TemporaryBreakpoint => "temporary breakpoint",
            StopReason::Watch => "watch",
            StopReason::Trace => "trace",
            StopReason::RuntimeError(_) => "runtime error",
        }
    }
}

/// What the host does once the monitor returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionResult {
    Resume,
    /// Terminate the whole program with this status; the host must not
    /// execute any further units.
    Abort(i32),
}

/// Monitor state that outlives a single stop.
#[derive(Debug, Default)]
pub struct Monitor {
    pub config: MonitorConfig,
    pub breakpoints: BreakpointManager,
}

impl Monitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            config,
            breakpoints: BreakpointManager::new(),
        }
    }

    pub fn install_breakpoint(
        &mut self,
        rt: &mut Runtime,
        line: usize,
        guard: Option<String>,
    ) -> std::result::Result<usize, Diagnostic> {
        self.breakpoints.set(&mut rt.tree, line, guard)
    }

    /// Clears the breakpoint at `line`, or every breakpoint and the watch.
    pub fn clear_breakpoints(
        &mut self,
        rt: &mut Runtime,
        line: Option<usize>,
    ) -> std::result::Result<(), Diagnostic> {
        match line {
            Some(line) => self.breakpoints.clear_line(&mut rt.tree, line).map(drop),
            None => {
                self.breakpoints
                    .clear(&mut rt.tree, crate::breakpoints::ClearScope::All);
                Ok(())
            }
        }
    }

    /// Handles a stop at `node`. Guards are evaluated first; a stop whose guard
    /// does not hold returns at once without entering the command loop.
    pub fn enter(
        &mut self,
        rt: &mut Runtime,
        console: &mut dyn Console,
        reason: StopReason,
        node: NodeId,
    ) -> Result<SessionResult> {
        let _in_monitor = IN_MONITOR.lock().unwrap_or_else(PoisonError::into_inner);
        let frame = rt.frames.top();
        let capacity = self.config.type_stack_capacity;

        match &reason {
            StopReason::Breakpoint => {
                match self.breakpoints.evaluate_guard(rt, frame, node, capacity) {
                    Ok(false) => return Ok(SessionResult::Resume),
                    Ok(true) => {}
                    Err(diagnostic) => console.write_line(&diagnostic.to_string())?,
                }
            }
            StopReason::Watch => match self.breakpoints.evaluate_watch(rt, frame, capacity) {
                Ok(false) => return Ok(SessionResult::Resume),
                Ok(true) => {}
                Err(diagnostic) => console.write_line(&diagnostic.to_string())?,
            },
            StopReason::TemporaryBreakpoint => {
                let level = rt.tree.node(node).proc_level;
                if !self.breakpoints.accept_temporary(&rt.tree, level) {
                    return Ok(SessionResult::Resume);
                }
            }
            StopReason::Trace => {
                let line = rt.tree.line(node);
                let text = rt.source.line(line).unwrap_or_default();
                console.write_line(&format!("trace: line {line}: {}", text.trim()))?;
                return Ok(SessionResult::Resume);
            }
            StopReason::Interrupt | StopReason::RuntimeError(_) => {}
        }

        info!(reason = reason.describe(), line = rt.tree.line(node), "entering monitor");
        let result = loop {
            let mut session = MonitorSession {
                rt: &mut *rt,
                console: &mut *console,
                config: &mut self.config,
                breakpoints: &mut self.breakpoints,
                reason: reason.clone(),
                node,
                current_frame: frame,
            };
            let result = session.run()?;
            if result == SessionResult::Resume && matches!(reason, StopReason::RuntimeError(_)) {
                console.write_line("execution cannot continue after a runtime error; use quit")?;
                continue;
            }
            break result;
        };
        clear_interrupts(&rt.tree);
        info!(?result, "leaving monitor");
        Ok(result)
    }
}

/// Scratch state of one stop; dropped when the host resumes.
pub struct MonitorSession<'m> {
    pub rt: &'m mut Runtime,
    pub console: &'m mut dyn Console,
    pub config: &'m mut MonitorConfig,
    pub breakpoints: &'m mut BreakpointManager,
    pub reason: StopReason,
    pub node: NodeId,
    /// Frame in which `evaluate` starts looking up identifiers.
    pub current_frame: Option<FrameId>,
}

impl MonitorSession<'_> {
    fn run(&mut self) -> Result<SessionResult> {
        self.announce()?;
        loop {
            let prompt = self.config.prompt.clone();
            let Some(line) = self.console.read_line(&prompt)? else {
                debug!("end of monitor input");
                return Ok(match self.reason {
                    StopReason::RuntimeError(_) => SessionResult::Abort(ABORT_STATUS),
                    _ => SessionResult::Resume,
                });
            };
            match commands::dispatch(self, &line)? {
                Flow::Stay => {}
                Flow::Resume => return Ok(SessionResult::Resume),
                Flow::Abort(status) => return Ok(SessionResult::Abort(status)),
            }
        }
    }

    fn announce(&mut self) -> Result<()> {
        if let StopReason::RuntimeError(diagnostic) = &self.reason {
            let text = diagnostic.to_string();
            self.console.write_line(&text)?;
        }
        let line = self.rt.tree.line(self.node);
        let frame = self
            .current_frame
            .map(|id| format!(", frame {}", id.number()))
            .unwrap_or_default();
        let header = format!("stopped at line {line} ({}){frame}", self.reason.describe());
        self.console.write_line(&header)?;
        if let Some(text) = self.rt.source.line(line) {
            let text = format!("{line:>5}  {text}");
            self.console.write_line(&text)?;
        }
        Ok(())
    }

    /// Line the current frame is executing.
    pub fn current_line(&self) -> usize {
        self.current_frame
            .filter(|id| Some(*id) != self.rt.frames.top())
            .and_then(|id| self.rt.frames.get(id))
            .map_or(self.rt.tree.line(self.node), |frame| self.rt.tree.line(frame.node))
    }

    /// Procedure level of the unit execution stopped at.
    pub fn proc_level(&self) -> usize {
        self.rt.tree.node(self.node).proc_level
    }
}

/// Asks the host to stop at the next interruptible unit.
pub fn request_interrupt(tree: &Tree) {
    tree.set_mask_everywhere(Mask::INTERRUPT);
}

/// Clears every pending interrupt request. Safe to call from a signal handler.
pub fn clear_interrupts(tree: &Tree) {
    tree.clear_mask_everywhere(Mask::INTERRUPT);
}

//! Breakpoint, temporary breakpoint, watch and trace state on the program tree.

use tracing::{debug, info, warn};

use crate::{
    diagnostics::{Diagnostic, DiagnosticKind},
    evaluator::evaluate,
    frame::FrameId,
    mode::ModeId,
    runtime::Runtime,
    tree::{Mask, NodeId, Tree},
    value::Value,
};

/// Which breakpoint state `clear` removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearScope {
    All,
    Breakpoints,
    Watch,
}

#[derive(Debug, Default)]
pub struct BreakpointManager {
    watch: Option<String>,
    /// Deepest procedure level at which a stepping temporary may fire;
    /// `None` lets it fire anywhere.
    step_depth: Option<usize>,
}

impl BreakpointManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a breakpoint on every interruptible unit at `line`, replacing any
    /// guard they carried. Fails without touching the tree if there is none.
    pub fn set(&mut self, tree: &mut Tree, line: usize, guard: Option<String>) -> Result<usize, Diagnostic> {
        let nodes = interruptible(tree, line)?;
        for node in &nodes {
            tree.set_mask(*node, Mask::BREAKPOINT);
            tree.set_guard(*node, guard.clone());
        }
        info!(line, guard = guard.as_deref().unwrap_or(""), "breakpoint set");
        Ok(nodes.len())
    }

    pub fn set_temporary(&mut self, tree: &Tree, line: usize) -> Result<usize, Diagnostic> {
        let nodes = interruptible(tree, line)?;
        for node in &nodes {
            tree.set_mask(*node, Mask::TEMPORARY);
        }
        self.step_depth = None;
        debug!(line, "temporary breakpoint set");
        Ok(nodes.len())
    }

    /// Marks every interruptible unit so that execution stops at the next one
    /// whose procedure level is at most `depth`.
    pub fn set_temporary_everywhere(&mut self, tree: &Tree, depth: Option<usize>) {
        tree.set_mask_everywhere(Mask::TEMPORARY);
        self.step_depth = depth;
        debug!(?depth, "stepping");
    }

    /// Decides whether a temporary breakpoint reached at `proc_level` stops
    /// execution. When it does, every temporary breakpoint is removed.
    pub fn accept_temporary(&mut self, tree: &Tree, proc_level: usize) -> bool {
        if self.step_depth.is_some_and(|depth| proc_level > depth) {
            return false;
        }
        tree.clear_mask_everywhere(Mask::TEMPORARY);
        self.step_depth = None;
        true
    }

    /// Removes breakpoint state at `line`.
    pub fn clear_line(&mut self, tree: &mut Tree, line: usize) -> Result<usize, Diagnostic> {
        let nodes = interruptible(tree, line)?;
        for node in &nodes {
            tree.clear_mask(*node, Mask::BREAKPOINT | Mask::TEMPORARY);
            tree.set_guard(*node, None);
        }
        info!(line, "breakpoint cleared");
        Ok(nodes.len())
    }

    pub fn clear(&mut self, tree: &mut Tree, scope: ClearScope) {
        if matches!(scope, ClearScope::All | ClearScope::Breakpoints) {
            tree.clear_mask_everywhere(Mask::BREAKPOINT | Mask::TEMPORARY);
            for node in tree.preorder() {
                tree.set_guard(node, None);
            }
            self.step_depth = None;
        }
        if matches!(scope, ClearScope::All | ClearScope::Watch) {
            self.clear_watch(tree);
        }
        info!(?scope, "breakpoints cleared");
    }

    /// Installs `guard` as the single watch expression, returning the one it replaces.
    pub fn set_watch(&mut self, tree: &Tree, guard: String) -> Option<String> {
        tree.set_mask_everywhere(Mask::WATCH);
        info!(guard = guard.as_str(), "watch set");
        self.watch.replace(guard)
    }

    pub fn clear_watch(&mut self, tree: &Tree) -> Option<String> {
        tree.clear_mask_everywhere(Mask::WATCH);
        self.watch.take()
    }

    pub fn watch(&self) -> Option<&str> {
        self.watch.as_deref()
    }

    pub fn set_trace(&mut self, tree: &Tree, on: bool) {
        if on {
            tree.set_mask_everywhere(Mask::TRACE);
        } else {
            tree.clear_mask_everywhere(Mask::TRACE);
        }
    }

    /// Evaluates the guard of `node` in `frame`. `Ok(true)` means stop.
    ///
    /// A guard that fails to evaluate, or yields anything but a `BOOL`, is
    /// removed from every unit on its line and the stop goes ahead; the
    /// returned `Guard` diagnostic says why.
    pub fn evaluate_guard(
        &mut self,
        rt: &mut Runtime,
        frame: Option<FrameId>,
        node: NodeId,
        capacity: usize,
    ) -> Result<bool, Diagnostic> {
        let Some(guard) = rt.tree.guard(node).map(str::to_string) else {
            return Ok(true);
        };
        match check(rt, frame, &guard, capacity) {
            Ok(verdict) => Ok(verdict),
            Err(cause) => {
                let line = rt.tree.line(node);
                for id in rt.tree.interruptible_at(line) {
                    rt.tree.set_guard(id, None);
                }
                warn!(line, guard = guard.as_str(), "guard removed");
                Err(guard_failure(&guard, cause))
            }
        }
    }

    /// Evaluates the watch expression; a broken one is removed and stops execution.
    pub fn evaluate_watch(
        &mut self,
        rt: &mut Runtime,
        frame: Option<FrameId>,
        capacity: usize,
    ) -> Result<bool, Diagnostic> {
        let Some(guard) = self.watch.clone() else {
            return Ok(false);
        };
        check(rt, frame, &guard, capacity).map_err(|cause| {
            self.clear_watch(&rt.tree);
            warn!(guard = guard.as_str(), "watch removed");
            guard_failure(&guard, cause)
        })
    }

    /// Lines carrying a breakpoint or temporary breakpoint, with their guards.
    pub fn entries(&self, tree: &Tree) -> Vec<(usize, Mask, Option<String>)> {
        tree.marked_lines(Mask::BREAKPOINT | Mask::TEMPORARY)
            .into_iter()
            .map(|(line, mask, guard)| (line, mask, guard.map(str::to_string)))
            .collect()
    }
}

fn interruptible(tree: &Tree, line: usize) -> Result<Vec<NodeId>, Diagnostic> {
    let nodes = tree.interruptible_at(line);
    if nodes.is_empty() {
        return Err(Diagnostic::semantic(format!(
            "no interruptible unit at line {line}"
        )));
    }
    Ok(nodes)
}

fn check(
    rt: &mut Runtime,
    frame: Option<FrameId>,
    guard: &str,
    capacity: usize,
) -> Result<bool, Diagnostic> {
    let evaluation = evaluate(rt, frame, guard, capacity)?;
    match (evaluation.mode, evaluation.value) {
        (ModeId::BOOL, Value::Bool(verdict)) => Ok(verdict),
        (ModeId::BOOL, _) => Err(Diagnostic::access("guard yields an uninitialised BOOL")),
        (mode, _) => Err(Diagnostic::semantic(format!(
            "guard yields {} instead of BOOL",
            rt.describe(mode)
        ))),
    }
}

fn guard_failure(guard: &str, cause: Diagnostic) -> Diagnostic {
    Diagnostic::new(
        DiagnosticKind::Guard,
        format!("guard `{guard}` failed and was removed"),
    )
    .with_note(cause.to_string())
}

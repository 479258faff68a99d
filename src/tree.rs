//! The host program's syntax tree as seen by the monitor: source lines,
//! interruptible units, and the breakpoint state attached to them.

use std::{
    ops::BitOr,
    sync::atomic::{AtomicU8, Ordering},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Breakpoint bits of one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Mask(u8);

impl Mask {
    pub const BREAKPOINT: Mask = Mask(0x01);
    pub const TEMPORARY: Mask = Mask(0x02);
    pub const WATCH: Mask = Mask(0x04);
    pub const TRACE: Mask = Mask(0x08);
    pub const INTERRUPT: Mask = Mask(0x10);

    pub fn contains(self, other: Mask) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    pub fn intersects(self, other: Mask) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Mask {
    type Output = Mask;

    fn bitor(self, rhs: Mask) -> Mask {
        Mask(self.0 | rhs.0)
    }
}

#[derive(Debug)]
pub struct Node {
    pub line: usize,
    pub interruptible: bool,
    pub proc_level: usize,
    pub children: Vec<NodeId>,
    mask: AtomicU8,
    guard: Option<String>,
}

#[derive(Debug)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                line: 0,
                interruptible: false,
                proc_level: 0,
                children: Vec::new(),
                mask: AtomicU8::new(0),
                guard: None,
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn add(
        &mut self,
        parent: NodeId,
        line: usize,
        interruptible: bool,
        proc_level: usize,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            line,
            interruptible,
            proc_level,
            children: Vec::new(),
            mask: AtomicU8::new(0),
            guard: None,
        });
        if let Some(parent) = self.nodes.get_mut(parent.0) {
            parent.children.push(id);
        }
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn line(&self, id: NodeId) -> usize {
        self.node(id).line
    }

    pub fn mask(&self, id: NodeId) -> Mask {
        Mask(self.node(id).mask.load(Ordering::SeqCst))
    }

    pub fn set_mask(&self, id: NodeId, mask: Mask) {
        self.node(id).mask.fetch_or(mask.0, Ordering::SeqCst);
    }

    pub fn clear_mask(&self, id: NodeId, mask: Mask) {
        self.node(id).mask.fetch_and(!mask.0, Ordering::SeqCst);
    }

    pub fn guard(&self, id: NodeId) -> Option<&str> {
        self.node(id).guard.as_deref()
    }

    /// Replaces the guard of `id`, returning the one it owned before.
    pub fn set_guard(&mut self, id: NodeId, guard: Option<String>) -> Option<String> {
        std::mem::replace(&mut self.nodes[id.0].guard, guard)
    }

    /// Pre-order traversal from the root with an explicit worklist.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut pending = vec![self.root()];
        while let Some(id) = pending.pop() {
            order.push(id);
            pending.extend(self.node(id).children.iter().rev().copied());
        }
        order
    }

    pub fn interruptible_at(&self, line: usize) -> Vec<NodeId> {
        self.preorder()
            .into_iter()
            .filter(|id| {
                let node = self.node(*id);
                node.interruptible && node.line == line
            })
            .collect()
    }

    /// Sets `mask` on every interruptible node. Touches only atomics, so it is
    /// safe to call while another thread holds the tree.
    pub fn set_mask_everywhere(&self, mask: Mask) {
        for node in self.nodes.iter().filter(|node| node.interruptible) {
            node.mask.fetch_or(mask.0, Ordering::SeqCst);
        }
    }

    /// Clears `mask` on every node. Does not allocate, so it may run from a
    /// signal handler.
    pub fn clear_mask_everywhere(&self, mask: Mask) {
        for node in &self.nodes {
            node.mask.fetch_and(!mask.0, Ordering::SeqCst);
        }
    }

    /// Lines carrying any of `mask`, with the guard of the first such node.
    pub fn marked_lines(&self, mask: Mask) -> Vec<(usize, Mask, Option<&str>)> {
        let mut lines: Vec<(usize, Mask, Option<&str>)> = Vec::new();
        for id in self.preorder() {
            let bits = self.mask(id);
            if !bits.intersects(mask) {
                continue;
            }
            let line = self.line(id);
            match lines.iter_mut().find(|(seen, _, _)| *seen == line) {
                Some(entry) => {
                    entry.1 = entry.1 | bits;
                    if entry.2.is_none() {
                        entry.2 = self.guard(id);
                    }
                }
                None => lines.push((line, bits, self.guard(id))),
            }
        }
        lines.sort_by_key(|(line, _, _)| *line);
        lines
    }
}

/// The program text, for `list` and stop context.
#[derive(Debug, Default, Clone)]
pub struct SourceListing {
    name: String,
    lines: Vec<String>,
}

impl SourceListing {
    pub fn new(name: impl Into<String>, text: &str) -> Self {
        Self {
            name: name.into(),
            lines: text.lines().map(str::to_string).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Line `number`, counting from 1.
    pub fn line(&self, number: usize) -> Option<&str> {
        number
            .checked_sub(1)
            .and_then(|index| self.lines.get(index))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

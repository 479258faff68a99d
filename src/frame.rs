use crate::{memory::Address, scope::ScopeId, symbol::Symbol, tree::NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(usize);

impl FrameId {
    /// User-facing frame number; the outermost frame is 1.
    pub fn number(self) -> usize {
        self.0 + 1
    }
}

/// One activation record.
#[derive(Debug, Clone)]
pub struct Frame {
    pub address: Address,
    pub size: usize,
    /// The caller.
    pub dynamic_link: Option<FrameId>,
    /// The lexically enclosing frame.
    pub static_link: Option<FrameId>,
    pub node: NodeId,
    pub scope: ScopeId,
    pub proc_level: usize,
    /// Set for frames opened by a procedure call.
    pub routine: Option<Symbol>,
}

#[derive(Debug, Default)]
pub struct Frames {
    frames: Vec<Frame>,
}

impl Frames {
    pub fn push(&mut self, frame: Frame) -> FrameId {
        self.frames.push(frame);
        FrameId(self.frames.len() - 1)
    }

    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    pub fn top(&self) -> Option<FrameId> {
        self.frames.len().checked_sub(1).map(FrameId)
    }

    pub fn get(&self, id: FrameId) -> Option<&Frame> {
        self.frames.get(id.0)
    }

    pub fn get_mut(&mut self, id: FrameId) -> Option<&mut Frame> {
        self.frames.get_mut(id.0)
    }

    pub fn by_number(&self, number: usize) -> Option<FrameId> {
        number
            .checked_sub(1)
            .filter(|index| *index < self.frames.len())
            .map(FrameId)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// The call chain from `from` outwards, innermost first.
    pub fn dynamic_chain(&self, from: FrameId) -> impl Iterator<Item = (FrameId, &Frame)> + '_ {
        self.chain(from, |frame| frame.dynamic_link)
    }

    /// The lexical chain from `from` outwards, innermost first.
    pub fn static_chain(&self, from: FrameId) -> impl Iterator<Item = (FrameId, &Frame)> + '_ {
        self.chain(from, |frame| frame.static_link)
    }

    fn chain(
        &self,
        from: FrameId,
        link: fn(&Frame) -> Option<FrameId>,
    ) -> impl Iterator<Item = (FrameId, &Frame)> + '_ {
        let mut next = Some(from);
        std::iter::from_fn(move || {
            let id = next?;
            let frame = self.get(id)?;
            // Links always point outwards; anything else would loop forever.
            next = link(frame).filter(|outer| outer.0 < id.0);
            Some((id, frame))
        })
    }
}

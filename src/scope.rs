use crate::{mode::ModeId, stdlib::NativeId, symbol::Symbol, tree::NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    /// Byte offset within a frame opened for the owning scope.
    Frame(usize),
    Native(NativeId),
    Label(NodeId),
    /// Indicants and priority declarations occupy no storage.
    None,
}

/// One entry of a scope table.
#[derive(Debug, Clone)]
pub struct Tag {
    pub name: Symbol,
    pub mode: ModeId,
    pub storage: Storage,
    pub priority: Option<u8>,
}

/// A local generator: when a frame opens, the reference at `name` is made to
/// point at the anonymous storage at `target`.
#[derive(Debug, Clone, Copy)]
pub struct Generator {
    pub name: usize,
    pub target: usize,
}

#[derive(Debug, Default)]
pub struct Scope {
    pub outer: Option<ScopeId>,
    pub level: usize,
    identifiers: Vec<Tag>,
    operators: Vec<Tag>,
    priorities: Vec<Tag>,
    indicants: Vec<Tag>,
    labels: Vec<Tag>,
    frame_size: usize,
    generators: Vec<Generator>,
}

impl Scope {
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn generators(&self) -> &[Generator] {
        &self.generators
    }

    pub fn identifiers(&self) -> &[Tag] {
        &self.identifiers
    }

    pub fn operators(&self) -> &[Tag] {
        &self.operators
    }

    pub fn labels(&self) -> &[Tag] {
        &self.labels
    }

    /// Reserves `size` bytes of frame storage and binds `name` to them.
    pub fn declare_identifier(&mut self, name: Symbol, mode: ModeId, size: usize) -> usize {
        let offset = self.reserve(size);
        self.identifiers.push(Tag {
            name,
            mode,
            storage: Storage::Frame(offset),
            priority: None,
        });
        offset
    }

    /// Binds `name` (of mode `REF m`) to a reference slot plus a local
    /// generator for `target_size` bytes of `m`.
    pub fn declare_variable(
        &mut self,
        name: Symbol,
        mode: ModeId,
        ref_size: usize,
        target_size: usize,
    ) -> usize {
        let slot = self.declare_identifier(name, mode, ref_size);
        let target = self.reserve(target_size);
        self.generators.push(Generator { name: slot, target });
        slot
    }

    pub fn declare_native(&mut self, name: Symbol, mode: ModeId, native: NativeId) {
        self.identifiers.push(Tag {
            name,
            mode,
            storage: Storage::Native(native),
            priority: None,
        });
    }

    pub fn declare_operator(&mut self, name: Symbol, mode: ModeId, native: NativeId) {
        self.operators.push(Tag {
            name,
            mode,
            storage: Storage::Native(native),
            priority: None,
        });
    }

    pub fn declare_priority(&mut self, name: Symbol, priority: u8) {
        self.priorities.retain(|tag| tag.name != name);
        self.priorities.push(Tag {
            name,
            mode: ModeId::VOID,
            storage: Storage::None,
            priority: Some(priority),
        });
    }

    pub fn declare_indicant(&mut self, name: Symbol, mode: ModeId) {
        self.indicants.push(Tag {
            name,
            mode,
            storage: Storage::None,
            priority: None,
        });
    }

    pub fn declare_label(&mut self, name: Symbol, node: NodeId) {
        self.labels.push(Tag {
            name,
            mode: ModeId::VOID,
            storage: Storage::Label(node),
            priority: None,
        });
    }

    pub fn find_identifier(&self, name: Symbol) -> Option<&Tag> {
        self.identifiers.iter().find(|tag| tag.name == name)
    }

    pub fn find_priority(&self, name: Symbol) -> Option<u8> {
        self.priorities
            .iter()
            .find(|tag| tag.name == name)
            .and_then(|tag| tag.priority)
    }

    pub fn find_indicant(&self, name: Symbol) -> Option<ModeId> {
        self.indicants
            .iter()
            .find(|tag| tag.name == name)
            .map(|tag| tag.mode)
    }

    fn reserve(&mut self, size: usize) -> usize {
        let offset = self.frame_size;
        self.frame_size += size;
        offset
    }
}

#[derive(Debug, Default)]
pub struct Scopes {
    scopes: Vec<Scope>,
}

impl Scopes {
    pub fn open(&mut self, outer: Option<ScopeId>, level: usize) -> ScopeId {
        self.scopes.push(Scope {
            outer,
            level,
            ..Scope::default()
        });
        ScopeId(self.scopes.len() - 1)
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    pub fn get_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0]
    }

    /// Walks the lexical chain starting at `id`, innermost first.
    pub fn chain(&self, id: ScopeId) -> impl Iterator<Item = &Scope> + '_ {
        std::iter::successors(Some(self.get(id)), move |scope| {
            scope.outer.map(|outer| self.get(outer))
        })
    }
}

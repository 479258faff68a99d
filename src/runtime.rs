//! Host-side runtime state the monitor inspects: symbol and mode tables,
//! memory, scopes, frames, the program tree and the standard environment.

use tracing::debug;

use crate::{
    diagnostics::Diagnostic,
    frame::{Frame, FrameId, Frames},
    memory::{status, Address, Memory, ValueStack},
    mode::{ModeId, ModeTable, REF_SIZE},
    scope::{ScopeId, Scopes, Storage},
    session::StopReason,
    stdlib::{self, NativeId, Natives},
    symbol::{Symbol, SymbolTable},
    tree::{Mask, NodeId, SourceListing, Tree},
    value::{alloc_row, alloc_string, Procedure, Value},
};

pub const DEFAULT_VALUE_STACK: usize = 64 * 1024;

pub struct Runtime {
    pub symbols: SymbolTable,
    pub modes: ModeTable,
    pub memory: Memory,
    pub stack: ValueStack,
    pub scopes: Scopes,
    pub frames: Frames,
    pub tree: Tree,
    pub source: SourceListing,
    pub natives: Natives,
    standard_environ: ScopeId,
    routines: Vec<Symbol>,
}

impl Runtime {
    pub fn new(source: SourceListing) -> Self {
        Self::with_stack_capacity(source, DEFAULT_VALUE_STACK)
    }

    pub fn with_stack_capacity(source: SourceListing, capacity: usize) -> Self {
        let mut scopes = Scopes::default();
        let standard_environ = scopes.open(None, 0);
        let mut runtime = Self {
            symbols: SymbolTable::new(),
            modes: ModeTable::new(),
            memory: Memory::new(),
            stack: ValueStack::new(capacity),
            scopes,
            frames: Frames::default(),
            tree: Tree::new(),
            source,
            natives: Natives::default(),
            standard_environ,
            routines: Vec::new(),
        };
        stdlib::install(&mut runtime);
        runtime
    }

    pub fn standard_environ(&self) -> ScopeId {
        self.standard_environ
    }

    /// Interns `name` with embedded spaces folded out, as the scanner reads it.
    pub fn symbol(&mut self, name: &str) -> Symbol {
        self.symbols.intern(&fold(name))
    }

    pub fn describe(&self, mode: ModeId) -> String {
        self.modes.describe(mode, &self.symbols)
    }

    /// Opens a scope nested in `outer`, or in the standard environment.
    pub fn open_scope(&mut self, outer: Option<ScopeId>) -> ScopeId {
        let outer = outer.unwrap_or(self.standard_environ);
        let level = self.scopes.get(outer).level + 1;
        self.scopes.open(Some(outer), level)
    }

    /// Identity declaration: `mode name = ...`.
    pub fn declare(&mut self, scope: ScopeId, name: &str, mode: ModeId) -> usize {
        let symbol = self.symbol(name);
        let size = self.modes.size(mode);
        self.scopes.get_mut(scope).declare_identifier(symbol, mode, size)
    }

    /// Variable declaration: `mode name`, bound as `REF mode` to a local generator.
    pub fn declare_variable(&mut self, scope: ScopeId, name: &str, mode: ModeId) -> ModeId {
        let symbol = self.symbol(name);
        let ref_mode = self.modes.ref_to(mode);
        let target_size = self.modes.size(mode);
        self.scopes
            .get_mut(scope)
            .declare_variable(symbol, ref_mode, REF_SIZE, target_size);
        ref_mode
    }

    pub fn declare_indicant(&mut self, scope: ScopeId, name: &str, mode: ModeId) {
        let symbol = self.symbol(name);
        self.scopes.get_mut(scope).declare_indicant(symbol, mode);
    }

    pub fn declare_label(&mut self, scope: ScopeId, name: &str, node: NodeId) {
        let symbol = self.symbol(name);
        self.scopes.get_mut(scope).declare_label(symbol, node);
    }

    /// Registers a routine text of the program and returns the procedure value naming it.
    pub fn routine(&mut self, name: &str) -> Value {
        let symbol = self.symbol(name);
        self.routines.push(symbol);
        Value::Proc(Procedure::Routine(self.routines.len() as u32 - 1))
    }

    pub fn routine_name(&self, index: u32) -> Option<&str> {
        self.routines
            .get(index as usize)
            .map(|symbol| self.symbols.name(*symbol))
    }

    pub fn define_native<F>(&mut self, name: &str, mode: ModeId, callback: F) -> NativeId
    where
        F: Fn(&mut Memory, &[Value]) -> Result<Value, Diagnostic> + 'static,
    {
        let symbol = self.symbol(name);
        let id = self.natives.register(name, callback);
        self.scopes
            .get_mut(self.standard_environ)
            .declare_native(symbol, mode, id);
        id
    }

    pub fn define_operator<F>(&mut self, name: &str, mode: ModeId, callback: F) -> NativeId
    where
        F: Fn(&mut Memory, &[Value]) -> Result<Value, Diagnostic> + 'static,
    {
        let symbol = self.symbols.intern(name);
        let id = self.natives.register(name, callback);
        self.scopes
            .get_mut(self.standard_environ)
            .declare_operator(symbol, mode, id);
        id
    }

    pub fn define_priority(&mut self, name: &str, priority: u8) {
        let symbol = self.symbols.intern(name);
        self.scopes
            .get_mut(self.standard_environ)
            .declare_priority(symbol, priority);
    }

    /// Opens a frame for a serial clause or loop body.
    pub fn open_frame(&mut self, scope: ScopeId, node: NodeId) -> Result<FrameId, Diagnostic> {
        self.push_frame(scope, node, None)
    }

    /// Opens a frame for a call of the routine `name`.
    pub fn call_frame(
        &mut self,
        scope: ScopeId,
        node: NodeId,
        name: &str,
    ) -> Result<FrameId, Diagnostic> {
        let routine = self.symbol(name);
        self.push_frame(scope, node, Some(routine))
    }

    fn push_frame(
        &mut self,
        scope: ScopeId,
        node: NodeId,
        routine: Option<Symbol>,
    ) -> Result<FrameId, Diagnostic> {
        let dynamic_link = self.frames.top();
        let outer = self.scopes.get(scope).outer;
        let static_link = dynamic_link.and_then(|top| {
            self.frames
                .dynamic_chain(top)
                .find(|(_, frame)| Some(frame.scope) == outer)
                .map(|(id, _)| id)
        });
        let size = self.scopes.get(scope).frame_size();
        let address = self.memory.push_frame(size);
        for generator in self.scopes.get(scope).generators() {
            let mut bytes = Vec::with_capacity(REF_SIZE);
            bytes.push(status::INIT);
            address.offset_by(generator.target).encode(&mut bytes);
            self.memory
                .write(address.offset_by(generator.name), &bytes)?;
        }
        let proc_level = self.tree.node(node).proc_level;
        let id = self.frames.push(Frame {
            address,
            size,
            dynamic_link,
            static_link,
            node,
            scope,
            proc_level,
            routine,
        });
        debug!(frame = id.number(), size, "opened frame");
        Ok(id)
    }

    pub fn close_frame(&mut self) -> Option<Frame> {
        let frame = self.frames.pop()?;
        self.memory.pop_frame(frame.address);
        Some(frame)
    }

    /// Records that `frame` is now executing `node`.
    pub fn move_to(&mut self, frame: FrameId, node: NodeId) {
        if let Some(frame) = self.frames.get_mut(frame) {
            frame.node = node;
        }
    }

    /// Storage and mode of `name` as declared in the scope of `frame` itself.
    pub fn local(&self, frame: FrameId, name: Symbol) -> Option<(Address, ModeId)> {
        let frame = self.frames.get(frame)?;
        let tag = self.scopes.get(frame.scope).find_identifier(name)?;
        match tag.storage {
            Storage::Frame(offset) => Some((frame.address.offset_by(offset), tag.mode)),
            _ => None,
        }
    }

    /// Writes the value of an identity declaration.
    pub fn initialise(&mut self, frame: FrameId, name: &str, value: Value) -> Result<(), Diagnostic> {
        let (address, mode) = self.local_by_name(frame, name)?;
        let bytes = value.encode(&self.modes, mode);
        self.memory.write(address, &bytes)
    }

    /// Assigns through the reference bound to the variable `name`.
    pub fn assign(&mut self, frame: FrameId, name: &str, value: Value) -> Result<(), Diagnostic> {
        let (address, mode) = self.local_by_name(frame, name)?;
        let target_mode = self
            .modes
            .deref(mode)
            .ok_or_else(|| Diagnostic::semantic(format!("`{name}` is not a variable")))?;
        let Value::Ref(target) = self.read_value(address, mode)? else {
            return Err(Diagnostic::access(format!("`{name}` is uninitialised")));
        };
        let target = target.ok_or_else(|| Diagnostic::access("assignment through NIL"))?;
        let bytes = value.encode(&self.modes, target_mode);
        self.memory.write(target, &bytes)
    }

    fn local_by_name(&self, frame: FrameId, name: &str) -> Result<(Address, ModeId), Diagnostic> {
        self.symbols
            .lookup(&fold(name))
            .and_then(|symbol| self.local(frame, symbol))
            .ok_or_else(|| Diagnostic::semantic(format!("`{name}` is not declared in this frame")))
    }

    pub fn read_value(&self, address: Address, mode: ModeId) -> Result<Value, Diagnostic> {
        let bytes = self.memory.read(address, self.modes.size(mode))?;
        Ok(Value::decode(&self.modes, mode, bytes))
    }

    /// A heap generator: allocates storage for `mode`, initialised to `value`.
    pub fn heap_value(&mut self, mode: ModeId, value: Value) -> Result<Value, Diagnostic> {
        let bytes = value.encode(&self.modes, mode);
        let address = self.memory.allocate(bytes.len(), mode);
        self.memory.write(address, &bytes)?;
        Ok(Value::Ref(Some(address)))
    }

    pub fn new_row(
        &mut self,
        row_mode: ModeId,
        bounds: &[(i64, i64)],
        elements: &[Value],
    ) -> Result<Value, Diagnostic> {
        let address = alloc_row(&mut self.memory, &self.modes, row_mode, bounds, elements)?;
        Ok(Value::Row(Some(address)))
    }

    pub fn new_string(&mut self, text: &str) -> Result<Value, Diagnostic> {
        Ok(Value::Row(Some(alloc_string(&mut self.memory, text)?)))
    }

    /// Which entry reason, if any, a visit of `node` raises.
    pub fn pending_stop(&self, node: NodeId) -> Option<StopReason> {
        let mask = self.tree.mask(node);
        if mask.contains(Mask::INTERRUPT) {
            Some(StopReason::Interrupt)
        } else if mask.contains(Mask::BREAKPOINT) {
            Some(StopReason::Breakpoint)
        } else if mask.contains(Mask::TEMPORARY) {
            Some(StopReason::TemporaryBreakpoint)
        } else if mask.contains(Mask::WATCH) {
            Some(StopReason::Watch)
        } else if mask.contains(Mask::TRACE) {
            Some(StopReason::Trace)
        } else {
            None
        }
    }
}

pub(crate) fn fold(name: &str) -> String {
    name.chars().filter(|ch| !ch.is_whitespace()).collect()
}

//! The monitor's expression evaluator.
//!
//! Units are parsed and evaluated in one pass with priority climbing. Values
//! live as raw bytes on the runtime's [`ValueStack`](crate::memory::ValueStack)
//! and their modes on a parallel [`TypeStack`] owned by the evaluation.

use crate::{
    coerce::{self, Strength},
    diagnostics::Diagnostic,
    frame::FrameId,
    lexer::{Keyword, Scanner, Token, TokenKind},
    memory::{Address, RowDescriptor},
    mode::ModeId,
    resolve::{self, Binding},
    runtime::Runtime,
    stdlib::{NativeId, MAX_PRIORITY},
    value::{alloc_string, Procedure, Value},
};

pub const DEFAULT_TYPE_STACK: usize = 64;

/// Result of evaluating a unit, strongly dereferenced.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub mode: ModeId,
    pub value: Value,
}

/// Evaluates `text` with identifier lookup starting at `frame`.
///
/// The value stack is restored to its prior height whether or not evaluation
/// succeeds, and the collector is inhibited for the duration.
pub fn evaluate(
    rt: &mut Runtime,
    frame: Option<FrameId>,
    text: &str,
    type_stack_capacity: usize,
) -> Result<Evaluation, Diagnostic> {
    let tokens = Scanner::new(text).tokenize()?;
    let pointer = rt.stack.pointer();
    rt.memory.inhibit_collection();
    let outcome = Evaluator::new(rt, frame, tokens, type_stack_capacity).run();
    rt.memory.release_collection();
    rt.stack.reset(pointer);
    outcome
}

/// Modes of the values an evaluation has pushed, innermost last.
#[derive(Debug)]
pub struct TypeStack {
    modes: Vec<ModeId>,
    capacity: usize,
}

impl TypeStack {
    pub fn new(capacity: usize) -> Self {
        Self {
            modes: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, mode: ModeId) -> Result<(), Diagnostic> {
        if self.modes.len() >= self.capacity {
            return Err(Diagnostic::resource("expression too complex"));
        }
        self.modes.push(mode);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<ModeId, Diagnostic> {
        self.modes
            .pop()
            .ok_or_else(|| Diagnostic::syntax("expression expected"))
    }

    /// Mode `depth` entries below the top.
    pub fn peek(&self, depth: usize) -> Result<ModeId, Diagnostic> {
        self.modes
            .len()
            .checked_sub(depth + 1)
            .map(|index| self.modes[index])
            .ok_or_else(|| Diagnostic::syntax("expression expected"))
    }

    pub fn len(&self) -> usize {
        self.modes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }
}

struct Evaluator<'a> {
    rt: &'a mut Runtime,
    frame: Option<FrameId>,
    tokens: Vec<Token>,
    current: usize,
    types: TypeStack,
    nesting: usize,
}

impl<'a> Evaluator<'a> {
    fn new(rt: &'a mut Runtime, frame: Option<FrameId>, tokens: Vec<Token>, capacity: usize) -> Self {
        Self {
            rt,
            frame,
            tokens,
            current: 0,
            types: TypeStack::new(capacity),
            nesting: 0,
        }
    }

    fn run(mut self) -> Result<Evaluation, Diagnostic> {
        self.evaluation().map_err(|diagnostic| {
            let span = self.peek().span;
            diagnostic.or_span(span)
        })
    }

    fn evaluation(&mut self) -> Result<Evaluation, Diagnostic> {
        self.unit()?;
        if !self.check(&TokenKind::Eof) {
            let token = self.peek();
            return Err(Diagnostic::syntax(format!("unexpected `{}`", token.lexeme))
                .with_span(token.span));
        }
        if self.types.len() != 1 {
            return Err(Diagnostic::syntax("unit does not yield exactly one value"));
        }
        self.deref_top(Strength::Strong)?;
        let (mode, bytes) = self.pop()?;
        let value = self.decode(mode, &bytes);
        Ok(Evaluation { mode, value })
    }

    fn enter(&mut self) -> Result<(), Diagnostic> {
        self.nesting += 1;
        if self.nesting > self.types.capacity {
            return Err(Diagnostic::resource("expression too complex"));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.nesting = self.nesting.saturating_sub(1);
    }

    /// `unit := identity [":=" unit]`
    fn unit(&mut self) -> Result<(), Diagnostic> {
        self.enter()?;
        self.identity()?;
        if self.matches(&TokenKind::Becomes) {
            let becomes = self.previous().span;
            self.assignment().map_err(|diagnostic| diagnostic.or_span(becomes))?;
        }
        self.leave();
        Ok(())
    }

    fn assignment(&mut self) -> Result<(), Diagnostic> {
        let destination = self.types.peek(0)?;
        let Some(target) = self.rt.modes.deref(destination) else {
            return Err(Diagnostic::semantic(format!(
                "destination of an assignment must be a name, not {}",
                self.rt.describe(destination)
            )));
        };
        self.unit()?;
        self.coerce_top(target)?;
        let (_, source) = self.pop()?;
        let (mode, bytes) = self.pop()?;
        match self.decode(mode, &bytes) {
            Value::Ref(Some(address)) => self.rt.memory.write(address, &source)?,
            Value::Ref(None) => return Err(Diagnostic::access("assignment to NIL")),
            _ => return Err(Diagnostic::access("assignment to an uninitialised name")),
        }
        self.push(mode, &bytes)
    }

    /// Identity relations, priority 0.
    fn identity(&mut self) -> Result<(), Diagnostic> {
        self.formula(1)?;
        loop {
            let negate = match self.peek().kind {
                TokenKind::Keyword(Keyword::Is) | TokenKind::IdentityIs => false,
                TokenKind::Keyword(Keyword::Isnt) | TokenKind::IdentityIsnt => true,
                _ => return Ok(()),
            };
            let token = self.advance();
            self.formula(1)?;
            self.identity_relation(negate)
                .map_err(|diagnostic| diagnostic.or_span(token.span))?;
        }
    }

    fn identity_relation(&mut self, negate: bool) -> Result<(), Diagnostic> {
        let (right_mode, right) = self.pop()?;
        let (left_mode, left) = self.pop()?;
        for mode in [left_mode, right_mode] {
            if !self.rt.modes.is_ref(mode) && mode != ModeId::NIL {
                return Err(Diagnostic::semantic(format!(
                    "identity relation needs names, not {}",
                    self.rt.describe(mode)
                )));
            }
        }
        let mut left = (left_mode, self.target(left_mode, &left)?);
        let mut right = (right_mode, self.target(right_mode, &right)?);
        if left.0 == ModeId::NIL || right.0 == ModeId::NIL {
            // NIL is compared with the innermost name.
            while self.rt.modes.ref_depth(left.0) > 1 {
                left = self.follow(left)?;
            }
            while self.rt.modes.ref_depth(right.0) > 1 {
                right = self.follow(right)?;
            }
        } else {
            while self.rt.modes.ref_depth(left.0) > self.rt.modes.ref_depth(right.0) {
                left = self.follow(left)?;
            }
            while self.rt.modes.ref_depth(right.0) > self.rt.modes.ref_depth(left.0) {
                right = self.follow(right)?;
            }
            if left.0 != right.0 {
                return Err(Diagnostic::semantic(format!(
                    "cannot compare the identity of {} and {}",
                    self.rt.describe(left.0),
                    self.rt.describe(right.0)
                )));
            }
        }
        let same = left.1 == right.1;
        self.push_value(ModeId::BOOL, &Value::Bool(same != negate))
    }

    fn target(&self, mode: ModeId, bytes: &[u8]) -> Result<Option<Address>, Diagnostic> {
        match self.decode(mode, bytes) {
            Value::Ref(target) => Ok(target),
            _ => Err(Diagnostic::access("identity relation on an uninitialised name")),
        }
    }

    /// The name a name refers to, one level down.
    fn follow(
        &self,
        (mode, target): (ModeId, Option<Address>),
    ) -> Result<(ModeId, Option<Address>), Diagnostic> {
        let pointee = self.rt.modes.deref(mode).unwrap_or(ModeId::VOID);
        let address = target.ok_or_else(|| Diagnostic::access("attempt to dereference NIL"))?;
        match self.rt.read_value(address, pointee)? {
            Value::Ref(next) => Ok((pointee, next)),
            _ => Err(Diagnostic::access("attempt to dereference an uninitialised name")),
        }
    }

    /// Dyadic formulas of `priority` and above.
    fn formula(&mut self, priority: u8) -> Result<(), Diagnostic> {
        if priority > MAX_PRIORITY {
            return self.monadic();
        }
        self.formula(priority + 1)?;
        while let Some(operator) = self.dyadic_operator(priority) {
            self.advance();
            self.formula(priority + 1)?;
            self.apply_dyadic(&operator)
                .map_err(|diagnostic| diagnostic.or_span(operator.span))?;
        }
        Ok(())
    }

    fn dyadic_operator(&self, priority: u8) -> Option<Token> {
        let token = self.peek();
        match token.kind {
            TokenKind::Operator | TokenKind::Tag
                if resolve::priority(self.rt, &token.lexeme) == Some(priority) =>
            {
                Some(token.clone())
            }
            _ => None,
        }
    }

    fn apply_dyadic(&mut self, operator: &Token) -> Result<(), Diagnostic> {
        let right_mode = self.types.peek(0)?;
        let left_mode = self.types.peek(1)?;
        let found =
            resolve::resolve_operator(self.rt, &operator.lexeme, left_mode, Some(right_mode))?;
        let (right_mode, right) = self.pop()?;
        for _ in 0..found.left_derefs {
            self.deref_top_once()?;
        }
        self.push(right_mode, &right)?;
        for _ in 0..found.right_derefs {
            self.deref_top_once()?;
        }
        let (right_mode, right) = self.pop()?;
        let (left_mode, left) = self.pop()?;
        let args = [self.decode(left_mode, &left), self.decode(right_mode, &right)];
        self.call_native(found.id, &args, found.result, &operator.lexeme)
    }

    fn monadic(&mut self) -> Result<(), Diagnostic> {
        let Some(operator) = self.monadic_operator() else {
            return self.secondary();
        };
        self.enter()?;
        self.advance();
        self.monadic()?;
        let operand = self.types.peek(0)?;
        let found = resolve::resolve_operator(self.rt, &operator.lexeme, operand, None)
            .map_err(|diagnostic| diagnostic.or_span(operator.span))?;
        for _ in 0..found.left_derefs {
            self.deref_top_once()?;
        }
        let (mode, bytes) = self.pop()?;
        let args = [self.decode(mode, &bytes)];
        self.call_native(found.id, &args, found.result, &operator.lexeme)
            .map_err(|diagnostic| diagnostic.or_span(operator.span))?;
        self.leave();
        Ok(())
    }

    fn monadic_operator(&self) -> Option<Token> {
        let token = self.peek();
        match token.kind {
            TokenKind::Operator => Some(token.clone()),
            TokenKind::Tag if resolve::resolve_indicant(self.rt, &token.lexeme, self.frame).is_none() => {
                Some(token.clone())
            }
            _ => None,
        }
    }

    /// `secondary := identifier OF secondary | primary`
    fn secondary(&mut self) -> Result<(), Diagnostic> {
        if self.check(&TokenKind::Identifier) && self.check_next(&TokenKind::Keyword(Keyword::Of)) {
            let field = self.advance();
            self.advance();
            self.enter()?;
            self.secondary()?;
            self.leave();
            return self
                .select(&field.lexeme)
                .map_err(|diagnostic| diagnostic.or_span(field.span));
        }
        self.primary()
    }

    fn select(&mut self, field: &str) -> Result<(), Diagnostic> {
        let mode = self.deref_top(Strength::Weak)?;
        let (structure, through_name) = match self.rt.modes.deref(mode) {
            Some(target) => (target, true),
            None => (mode, false),
        };
        if !self.rt.modes.is_struct(structure) {
            return Err(Diagnostic::semantic(format!(
                "{} has no field `{field}`",
                self.rt.describe(mode)
            )));
        }
        let (offset, field_mode) = self
            .rt
            .symbols
            .lookup(field)
            .and_then(|symbol| self.rt.modes.field(structure, symbol))
            .ok_or_else(|| {
                Diagnostic::semantic(format!(
                    "{} has no field `{field}`",
                    self.rt.describe(structure)
                ))
            })?;
        let (_, bytes) = self.pop()?;
        if through_name {
            let address = match self.decode(mode, &bytes) {
                Value::Ref(Some(address)) => address,
                Value::Ref(None) => return Err(Diagnostic::access("selection from NIL")),
                _ => return Err(Diagnostic::access("selection from an uninitialised name")),
            };
            let field_ref = self.rt.modes.ref_to(field_mode);
            self.push_value(field_ref, &Value::Ref(Some(address.offset_by(offset))))
        } else {
            let size = self.rt.modes.size(field_mode);
            self.push(field_mode, &bytes[offset..offset + size])
        }
    }

    fn primary(&mut self) -> Result<(), Diagnostic> {
        let token = self.peek().clone();
        match &token.kind {
            TokenKind::IntDenotation => {
                self.advance();
                let value = token.lexeme.parse::<i64>().map_err(|_| {
                    Diagnostic::semantic(format!("denotation {} exceeds max int", token.lexeme))
                        .with_span(token.span)
                })?;
                self.push_value(ModeId::INT, &Value::Int(value))
            }
            TokenKind::RealDenotation => {
                self.advance();
                let value = token.lexeme.parse::<f64>().map_err(|_| {
                    Diagnostic::syntax(format!("malformed real denotation {}", token.lexeme))
                        .with_span(token.span)
                })?;
                self.push_value(ModeId::REAL, &Value::Real(value))
            }
            TokenKind::BitsDenotation => {
                self.advance();
                let value = bits_denotation(&token.lexeme).map_err(|d| d.with_span(token.span))?;
                self.push_value(ModeId::BITS, &Value::Bits(value))
            }
            TokenKind::StringDenotation => {
                self.advance();
                let mut chars = token.lexeme.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => self.push_value(ModeId::CHAR, &Value::Char(ch)),
                    _ => {
                        let address = alloc_string(&mut self.rt.memory, &token.lexeme)?;
                        self.push_value(ModeId::STRING, &Value::Row(Some(address)))
                    }
                }
            }
            TokenKind::Keyword(Keyword::True) | TokenKind::Keyword(Keyword::False) => {
                self.advance();
                let value = token.kind == TokenKind::Keyword(Keyword::True);
                self.push_value(ModeId::BOOL, &Value::Bool(value))
            }
            TokenKind::Keyword(Keyword::Nil) => {
                self.advance();
                self.push_value(ModeId::NIL, &Value::Ref(None))
            }
            TokenKind::Keyword(
                Keyword::Ref
                | Keyword::Long
                | Keyword::Int
                | Keyword::Real
                | Keyword::Bool
                | Keyword::Char
                | Keyword::Bits
                | Keyword::String
                | Keyword::Void,
            )
            | TokenKind::Tag => {
                self.cast().map_err(|d| d.or_span(token.span))?;
                self.suffixes()
            }
            TokenKind::Identifier => {
                self.advance();
                self.identifier(&token.lexeme)
                    .map_err(|d| d.or_span(token.span))?;
                self.suffixes()
            }
            TokenKind::LParen => {
                self.advance();
                self.unit()?;
                self.consume(&TokenKind::RParen, "expected `)`")?;
                self.suffixes()
            }
            TokenKind::Eof => Err(Diagnostic::syntax("expression expected").with_span(token.span)),
            _ => Err(Diagnostic::syntax(format!("unexpected `{}`", token.lexeme))
                .with_span(token.span)),
        }
    }

    fn identifier(&mut self, name: &str) -> Result<(), Diagnostic> {
        let symbol = self
            .rt
            .symbols
            .lookup(name)
            .ok_or_else(|| Diagnostic::semantic(format!("`{name}` is not declared")))?;
        match resolve::resolve_identifier(self.rt, symbol, self.frame)? {
            Binding::Local { address, mode, .. } => {
                let bytes = self.rt.memory.read(address, self.rt.modes.size(mode))?.to_vec();
                self.push(mode, &bytes)
            }
            Binding::Native { id, mode } => {
                let eager = self
                    .rt
                    .modes
                    .proc_signature(mode)
                    .filter(|(params, _)| params.is_empty())
                    .map(|(_, result)| result);
                match eager {
                    Some(result) => self.call_native(id, &[], result, name),
                    None => self.push_value(mode, &Value::Proc(Procedure::Native(id))),
                }
            }
        }
    }

    /// `cast := declarer "(" unit ")"`
    fn cast(&mut self) -> Result<(), Diagnostic> {
        let target = self.declarer()?;
        self.consume(&TokenKind::LParen, "a cast needs a parenthesised unit")?;
        self.unit()?;
        self.consume(&TokenKind::RParen, "expected `)`")?;
        self.coerce_top(target)
    }

    fn declarer(&mut self) -> Result<ModeId, Diagnostic> {
        let mut refs = 0;
        while self.matches(&TokenKind::Keyword(Keyword::Ref)) {
            refs += 1;
        }
        let long = self.matches(&TokenKind::Keyword(Keyword::Long));
        let token = self.advance();
        let mut mode = match (&token.kind, long) {
            (TokenKind::Keyword(Keyword::Int), false) => ModeId::INT,
            (TokenKind::Keyword(Keyword::Int), true) => ModeId::LONG_INT,
            (TokenKind::Keyword(Keyword::Real), false) => ModeId::REAL,
            (TokenKind::Keyword(Keyword::Real), true) => ModeId::LONG_REAL,
            (TokenKind::Keyword(Keyword::Bool), false) => ModeId::BOOL,
            (TokenKind::Keyword(Keyword::Char), false) => ModeId::CHAR,
            (TokenKind::Keyword(Keyword::Bits), false) => ModeId::BITS,
            (TokenKind::Keyword(Keyword::String), false) => ModeId::STRING,
            (TokenKind::Keyword(Keyword::Void), false) => ModeId::VOID,
            (TokenKind::Tag, false) => resolve::resolve_indicant(self.rt, &token.lexeme, self.frame)
                .ok_or_else(|| {
                    Diagnostic::semantic(format!("`{}` is not a mode indicant", token.lexeme))
                        .with_span(token.span)
                })?,
            _ => {
                return Err(Diagnostic::syntax(format!("malformed cast at `{}`", token.lexeme))
                    .with_span(token.span))
            }
        };
        for _ in 0..refs {
            mode = self.rt.modes.ref_to(mode);
        }
        Ok(mode)
    }

    fn suffixes(&mut self) -> Result<(), Diagnostic> {
        loop {
            if self.check(&TokenKind::LParen) {
                let open = self.advance();
                self.call().map_err(|d| d.or_span(open.span))?;
            } else if self.check(&TokenKind::LBracket) {
                let open = self.advance();
                self.slice().map_err(|d| d.or_span(open.span))?;
            } else {
                return Ok(());
            }
        }
    }

    fn call(&mut self) -> Result<(), Diagnostic> {
        let mode = self.deref_top(Strength::Strong)?;
        let Some((params, result)) = self
            .rt
            .modes
            .proc_signature(mode)
            .map(|(params, result)| (params.to_vec(), result))
        else {
            return Err(Diagnostic::semantic(format!(
                "{} cannot be called",
                self.rt.describe(mode)
            )));
        };
        let (_, bytes) = self.pop()?;
        let id = match self.decode(mode, &bytes) {
            Value::Proc(Procedure::Native(id)) => id,
            Value::Proc(Procedure::Routine(index)) => {
                let name = self.rt.routine_name(index).unwrap_or("?");
                return Err(Diagnostic::semantic(format!(
                    "cannot call routine `{name}` from the monitor"
                ))
                .with_note("only procedures of the standard environment may be called"));
            }
            _ => return Err(Diagnostic::access("call of an uninitialised procedure")),
        };
        let name = self
            .rt
            .natives
            .get(id)
            .map(|native| native.name.clone())
            .unwrap_or_default();
        let mut count = 0;
        if !self.check(&TokenKind::RParen) {
            loop {
                let Some(&param) = params.get(count) else {
                    return Err(arity(&name, params.len(), count + 1));
                };
                self.unit()?;
                self.coerce_top(param)?;
                count += 1;
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(&TokenKind::RParen, "expected `)` after arguments")?;
        if count != params.len() {
            return Err(arity(&name, params.len(), count));
        }
        let mut args = Vec::with_capacity(count);
        for _ in 0..count {
            let (mode, bytes) = self.pop()?;
            args.push(self.decode(mode, &bytes));
        }
        args.reverse();
        self.call_native(id, &args, result, &name)
    }

    fn slice(&mut self) -> Result<(), Diagnostic> {
        let mode = self.deref_top(Strength::Weak)?;
        let (row_mode, addressable) = match self.rt.modes.deref(mode) {
            Some(target) if self.rt.modes.is_row(target) => (target, true),
            _ if self.rt.modes.is_row(mode) => (mode, false),
            _ => {
                return Err(Diagnostic::semantic(format!(
                    "{} cannot be sliced",
                    self.rt.describe(mode)
                )))
            }
        };
        let (_, bytes) = self.pop()?;
        let row = if addressable {
            match self.decode(mode, &bytes) {
                Value::Ref(Some(address)) => self.rt.read_value(address, row_mode)?,
                Value::Ref(None) => return Err(Diagnostic::access("slice of NIL")),
                _ => Value::Undefined,
            }
        } else {
            self.decode(row_mode, &bytes)
        };
        let Value::Row(Some(descriptor)) = row else {
            return Err(Diagnostic::access("slice of an uninitialised row"));
        };
        let (dims, element) = self.rt.modes.row_shape(row_mode).unwrap_or((1, ModeId::VOID));

        let mut count = 0;
        loop {
            self.unit()?;
            self.coerce_top(ModeId::INT)?;
            count += 1;
            if !self.matches(&TokenKind::Comma) {
                break;
            }
        }
        self.consume(&TokenKind::RBracket, "expected `]`")?;
        if count != dims {
            return Err(Diagnostic::semantic(format!(
                "row has {dims} dimension(s) but {count} index(es) were given"
            )));
        }
        let mut subscripts = Vec::with_capacity(count);
        for _ in 0..count {
            let (mode, bytes) = self.pop()?;
            match self.decode(mode, &bytes) {
                Value::Int(index) => subscripts.push(index),
                _ => return Err(Diagnostic::access("index is uninitialised")),
            }
        }
        subscripts.reverse();

        let descriptor = RowDescriptor::read(&self.rt.memory, descriptor)?;
        let flat = descriptor.index_of(&subscripts)?;
        let size = self.rt.modes.size(element);
        let address = descriptor.elements.offset_by(flat * size);
        if addressable {
            let element_ref = self.rt.modes.ref_to(element);
            self.push_value(element_ref, &Value::Ref(Some(address)))
        } else {
            let bytes = self.rt.memory.read(address, size)?.to_vec();
            self.push(element, &bytes)
        }
    }

    fn call_native(
        &mut self,
        id: NativeId,
        args: &[Value],
        result: ModeId,
        name: &str,
    ) -> Result<(), Diagnostic> {
        if !args.iter().all(Value::is_defined) {
            return Err(Diagnostic::access(format!(
                "operand of `{name}` is uninitialised"
            )));
        }
        let native = self
            .rt
            .natives
            .get(id)
            .cloned()
            .ok_or_else(|| Diagnostic::semantic(format!("`{name}` has no native procedure")))?;
        let value = native.call(&mut self.rt.memory, args)?;
        self.push_value(result, &value)
    }

    fn push(&mut self, mode: ModeId, bytes: &[u8]) -> Result<(), Diagnostic> {
        self.types.push(mode)?;
        self.rt.stack.push(bytes)
    }

    fn push_value(&mut self, mode: ModeId, value: &Value) -> Result<(), Diagnostic> {
        let bytes = value.encode(&self.rt.modes, mode);
        self.push(mode, &bytes)
    }

    fn pop(&mut self) -> Result<(ModeId, Vec<u8>), Diagnostic> {
        let mode = self.types.pop()?;
        let bytes = self.rt.stack.pop(self.rt.modes.size(mode))?;
        Ok((mode, bytes))
    }

    fn decode(&self, mode: ModeId, bytes: &[u8]) -> Value {
        Value::decode(&self.rt.modes, mode, bytes)
    }

    fn deref_top(&mut self, strength: Strength) -> Result<ModeId, Diagnostic> {
        let mode = self.types.pop()?;
        let mode = coerce::deref(self.rt, mode, strength)?;
        self.types.push(mode)?;
        Ok(mode)
    }

    fn deref_top_once(&mut self) -> Result<ModeId, Diagnostic> {
        let mode = self.types.pop()?;
        let mode = coerce::deref_once(self.rt, mode)?;
        self.types.push(mode)?;
        Ok(mode)
    }

    fn coerce_top(&mut self, target: ModeId) -> Result<(), Diagnostic> {
        let mode = self.types.pop()?;
        let mode = coerce::coerce(self.rt, mode, target)?;
        self.types.push(mode)
    }

    fn matches(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, kind: &TokenKind, message: &str) -> Result<Token, Diagnostic> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            let token = self.peek();
            Err(Diagnostic::syntax(message).with_span(token.span))
        }
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn check_next(&self, kind: &TokenKind) -> bool {
        self.tokens
            .get(self.current + 1)
            .is_some_and(|token| &token.kind == kind)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.current += 1;
        }
        token
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }
}

fn bits_denotation(lexeme: &str) -> Result<u64, Diagnostic> {
    let (radix, digits) = lexeme
        .split_once('r')
        .ok_or_else(|| Diagnostic::syntax(format!("malformed bits denotation {lexeme}")))?;
    let radix = match radix {
        "2" => 2,
        "4" => 4,
        "8" => 8,
        "16" => 16,
        other => {
            return Err(Diagnostic::syntax(format!(
                "radix {other} is not 2, 4, 8 or 16"
            )))
        }
    };
    u64::from_str_radix(digits, radix)
        .map_err(|_| Diagnostic::syntax(format!("malformed bits denotation {lexeme}")))
}

fn arity(name: &str, expected: usize, given: usize) -> Diagnostic {
    Diagnostic::semantic(format!(
        "`{name}` expects {expected} argument(s), got {given}"
    ))
}

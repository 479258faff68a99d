use indexmap::IndexSet;

/// Interned name. Two symbols are the same name iff they compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

#[derive(Debug, Default)]
pub struct SymbolTable {
    names: IndexSet<String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, name: &str) -> Symbol {
        if let Some(index) = self.names.get_index_of(name) {
            return Symbol(index as u32);
        }
        let (index, _) = self.names.insert_full(name.to_string());
        Symbol(index as u32)
    }

    /// Looks a name up without interning it; a name nobody declared has no symbol.
    pub fn lookup(&self, name: &str) -> Option<Symbol> {
        self.names.get_index_of(name).map(|index| Symbol(index as u32))
    }

    pub fn name(&self, symbol: Symbol) -> &str {
        self.names
            .get_index(symbol.0 as usize)
            .map(String::as_str)
            .unwrap_or("?")
    }
}

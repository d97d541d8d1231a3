use deca_vm_lib::assembly::Address;


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {

    Code,
    Data

}


#[derive(Debug)]
pub struct Symbol {

    pub name: String,
    pub address: Address,
    pub kind: SymbolKind,
    /// Source line of the definition, for diagnostics.
    pub line_number: usize

}


/// A symbol named by a `.entry` or `.extern` directive.
#[derive(Debug)]
pub struct NamedReference {

    pub name: String,
    pub line_number: usize

}


/// Symbols in definition order. Lookup is linear, which is fine at the
/// expected scale of hundreds of symbols per file.
#[derive(Debug, Default)]
pub struct SymbolTable {

    symbols: Vec<Symbol>

}

impl SymbolTable {

    pub fn new() -> Self {
        Self::default()
    }


    /// Insert a new symbol. Fails when the name is already taken, returning
    /// the line number of the previous definition.
    pub fn declare(&mut self, name: &str, address: Address, kind: SymbolKind, line_number: usize) -> Result<(), usize> {

        if let Some(previous) = self.symbols.iter().find(|symbol| symbol.name == name) {
            return Err(previous.line_number);
        }

        self.symbols.push(Symbol {
            name: name.to_string(),
            address,
            kind,
            line_number,
        });

        Ok(())
    }


    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.iter().find(|symbol| symbol.name == name)
    }


    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }


    /// Move every data symbol after the code segment once the final
    /// instruction counter is known.
    pub fn relocate_data(&mut self, ic_final: Address) {
        for symbol in &mut self.symbols {
            if symbol.kind == SymbolKind::Data {
                symbol.address += ic_final;
            }
        }
    }


    pub fn len(&self) -> usize {
        self.symbols.len()
    }

}


#[cfg(test)]
mod tests {

    use super::*;


    #[test]
    fn declaration_and_lookup() {
        let mut table = SymbolTable::new();

        table.declare("MAIN", 100, SymbolKind::Code, 1).unwrap();
        table.declare("X", 0, SymbolKind::Data, 2).unwrap();

        let main = table.get("MAIN").unwrap();
        assert_eq!(main.address, 100);
        assert_eq!(main.kind, SymbolKind::Code);

        assert!(table.get("Y").is_none());
        assert_eq!(table.len(), 2);
    }


    #[test]
    fn duplicate_declaration_fails() {
        let mut table = SymbolTable::new();

        table.declare("MAIN", 100, SymbolKind::Code, 1).unwrap();

        let previous_line = table.declare("MAIN", 105, SymbolKind::Code, 7).unwrap_err();
        assert_eq!(previous_line, 1);
    }


    #[test]
    fn data_relocation() {
        let mut table = SymbolTable::new();

        table.declare("MAIN", 100, SymbolKind::Code, 1).unwrap();
        table.declare("X", 0, SymbolKind::Data, 2).unwrap();
        table.declare("Y", 2, SymbolKind::Data, 3).unwrap();

        table.relocate_data(107);

        assert_eq!(table.get("MAIN").unwrap().address, 100);
        assert_eq!(table.get("X").unwrap().address, 107);
        assert_eq!(table.get("Y").unwrap().address, 109);
    }

}

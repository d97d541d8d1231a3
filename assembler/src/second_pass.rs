use deca_vm_lib::assembly::{self, Address, Linkage, Word};

use crate::error::{DiagnosticList, ErrorKind};
use crate::first_pass::FirstPassResult;
use crate::memory_image::Cell;
use crate::symbol_table::{NamedReference, SymbolTable};


/// One use of an external symbol: the name and the address of the word that
/// references it. Recorded in code-emission order, so uses are sorted by
/// ascending address.
#[derive(Debug, PartialEq, Eq)]
pub struct ExternalUse {

    pub name: String,
    pub address: Address

}


/// A fully resolved memory word. After the second pass no pending symbol
/// reference survives, which this type makes impossible to represent.
#[derive(Debug)]
pub struct ResolvedWord {

    pub address: Address,
    pub word: Word

}


#[derive(Debug)]
pub struct SecondPassResult {

    pub words: Vec<ResolvedWord>,
    pub external_uses: Vec<ExternalUse>,
    pub symbols: SymbolTable,
    pub entries: Vec<NamedReference>,
    pub ic_final: Address,
    pub dc_final: Address

}


/// Resolve every pending reference, stamp the linkage bits and verify the
/// `.entry` / `.extern` lists.
pub fn run(first_pass: FirstPassResult, diagnostics: &mut DiagnosticList) -> SecondPassResult {

    let FirstPassResult { image, symbols, entries, externs, ic_final, dc_final } = first_pass;

    let mut words = Vec::with_capacity(image.len());
    let mut external_uses = Vec::new();

    for cell in image.into_cells() {

        let word = match cell.cell {

            Cell::Resolved(word) => assembly::with_linkage(word, Linkage::Absolute),

            Cell::Pending(name) => {

                if externs.iter().any(|reference| reference.name == name) {
                    let resolved = assembly::with_linkage(0, Linkage::External);
                    external_uses.push(ExternalUse { name, address: cell.address });
                    resolved

                } else if let Some(symbol) = symbols.get(&name) {
                    assembly::pack_symbol_address(symbol.address, Linkage::Relocatable)

                } else {
                    diagnostics.file_error(
                        ErrorKind::UndefinedSymbol,
                        format!("Undefined symbol \"{}\" referenced from address {}", name, cell.address).as_str()
                    );
                    0
                }
            }
        };

        words.push(ResolvedWord { address: cell.address, word });
    }

    // every exported name must be defined in this file
    for reference in &entries {
        if !symbols.contains(&reference.name) {
            diagnostics.error(
                ErrorKind::UndefinedSymbol,
                reference.line_number,
                format!(".entry name \"{}\" is not defined in this file", reference.name).as_str()
            );
        }
    }

    // a symbol cannot be both defined here and imported
    for reference in &externs {
        if symbols.contains(&reference.name) {
            diagnostics.error(
                ErrorKind::DuplicateSymbol,
                reference.line_number,
                format!("\"{}\" is declared .extern but defined in this file", reference.name).as_str()
            );
        }
    }

    SecondPassResult {
        words,
        external_uses,
        symbols,
        entries,
        ic_final,
        dc_final,
    }
}

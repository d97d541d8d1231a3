use std::fs;
use std::io;
use std::path::Path;

use deca_vm_lib::assembly::{
    self, Address, Word, CODE_ORIGIN, PAYLOAD_DIGITS, PAYLOAD_MASK, WORD_DIGITS, WORD_MASK
};

use crate::second_pass::SecondPassResult;


pub const SOURCE_EXTENSION: &str = "as";
pub const EXPANDED_EXTENSION: &str = "am";
pub const OBJECT_EXTENSION: &str = "ob";
pub const ENTRIES_EXTENSION: &str = "ent";
pub const EXTERNALS_EXTENSION: &str = "ext";


/// The rendered output artifacts of one source file. The map files exist
/// only when they would be non-empty.
#[derive(Debug)]
pub struct OutputFiles {

    pub object: String,
    pub entries: Option<String>,
    pub externals: Option<String>

}


pub fn render(result: &SecondPassResult) -> OutputFiles {
    OutputFiles {
        object: render_object(result),
        entries: render_entries(result),
        externals: render_externals(result),
    }
}


/// The `.ob` image: a `"<code size> <data size>"` header line, then one
/// `"<address> <word>"` line per memory cell. Code words print all 12 bits
/// including the linkage; data words print the 10-bit payload only.
pub fn render_object(result: &SecondPassResult) -> String {

    let code_size = result.ic_final - CODE_ORIGIN;
    let total = (code_size + result.dc_final) as usize;

    let mut image: Vec<Word> = vec![0; total];
    for word in &result.words {
        let index = (word.address - CODE_ORIGIN) as usize;
        if index < total {
            image[index] = word.word & WORD_MASK;
        }
    }

    let mut object = String::new();

    object.push_str(format!(
        "{} {}\n",
        assembly::strip_leading_a(&assembly::to_base4(code_size, PAYLOAD_DIGITS)),
        assembly::strip_leading_a(&assembly::to_base4(result.dc_final, PAYLOAD_DIGITS))
    ).as_str());

    for (index, word) in image.iter().enumerate() {

        let address = CODE_ORIGIN + index as Address;
        let address_field = assembly::to_base4(address & PAYLOAD_MASK, PAYLOAD_DIGITS);

        let word_field = if address < result.ic_final {
            assembly::to_base4(word & WORD_MASK, WORD_DIGITS)
        } else {
            assembly::to_base4((word >> 2) & PAYLOAD_MASK, PAYLOAD_DIGITS)
        };

        object.push_str(format!(
            "{} {}\n",
            assembly::strip_leading_a(&address_field),
            word_field
        ).as_str());
    }

    object
}


/// The `.ent` map: one `"<name> <address>"` line per `.entry` reference, in
/// declaration order. `None` when the file declares no entries.
pub fn render_entries(result: &SecondPassResult) -> Option<String> {

    if result.entries.is_empty() {
        return None;
    }

    let mut entries = String::new();

    for reference in &result.entries {
        if let Some(symbol) = result.symbols.get(&reference.name) {
            entries.push_str(format!(
                "{} {}\n",
                symbol.name,
                assembly::strip_leading_a(&assembly::to_base4(symbol.address & PAYLOAD_MASK, PAYLOAD_DIGITS))
            ).as_str());
        }
    }

    Some(entries)
}


/// The `.ext` map: one `"<name> <use address>"` line per external use, in
/// ascending use-address order. `None` when no external symbol was used.
pub fn render_externals(result: &SecondPassResult) -> Option<String> {

    if result.external_uses.is_empty() {
        return None;
    }

    let mut externals = String::new();

    for external_use in &result.external_uses {
        externals.push_str(format!(
            "{} {}\n",
            external_use.name,
            assembly::strip_leading_a(&assembly::to_base4(external_use.address & PAYLOAD_MASK, PAYLOAD_DIGITS))
        ).as_str());
    }

    Some(externals)
}


/// Write the artifacts next to the source, truncating stale files. A stale
/// map file from a previous run is removed when this run has none to write.
pub fn write(base_path: &Path, outputs: &OutputFiles) -> io::Result<()> {

    fs::write(base_path.with_extension(OBJECT_EXTENSION), &outputs.object)?;

    write_or_remove(&base_path.with_extension(ENTRIES_EXTENSION), outputs.entries.as_deref())?;
    write_or_remove(&base_path.with_extension(EXTERNALS_EXTENSION), outputs.externals.as_deref())?;

    Ok(())
}


fn write_or_remove(path: &Path, content: Option<&str>) -> io::Result<()> {
    match content {
        Some(content) => fs::write(path, content),
        None => match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error),
        }
    }
}

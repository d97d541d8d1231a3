#![deny(unused_must_use)]

mod cli_parser;
mod error;
mod preprocessor;
mod tokenizer;
mod symbol_table;
mod memory_image;
mod first_pass;
mod second_pass;
mod output;

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;

use deca_vm_lib::assembly::CODE_ORIGIN;

use crate::cli_parser::CliParser;
use crate::error::{DiagnosticList, ErrorKind};


fn main() -> ExitCode {

    let args = CliParser::parse();

    let mut any_failed = false;

    for input in &args.input_files {
        if !assemble_file(Path::new(input), args.check, args.verbose) {
            any_failed = true;
        }
    }

    if any_failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}


/// Run the whole pipeline for one source basename. Returns whether the file
/// assembled cleanly; output files are written only when it did.
fn assemble_file(base_path: &Path, check_only: bool, verbose: bool) -> bool {

    let source_path = base_path.with_extension(output::SOURCE_EXTENSION);
    let mut diagnostics = DiagnosticList::new(&source_path);

    let source = match fs::read_to_string(&source_path) {
        Ok(source) => source,
        Err(error) => {
            diagnostics.file_error(ErrorKind::IoFailure, format!("Cannot open source file: {}", error).as_str());
            return false;
        }
    };

    let expanded = preprocessor::preprocess(&source, &mut diagnostics);

    // A macro error leaves the expansion stream untrustworthy, so the passes
    // are not attempted at all
    if diagnostics.has_errors() {
        return false;
    }

    let expanded_path = base_path.with_extension(output::EXPANDED_EXTENSION);
    if let Err(error) = fs::write(&expanded_path, &expanded) {
        diagnostics.file_error(
            ErrorKind::IoFailure,
            format!("Cannot write \"{}\": {}", expanded_path.display(), error).as_str()
        );
        return false;
    }

    if verbose {
        println!("[{}] macros expanded into \"{}\"", base_path.display(), expanded_path.display());
    }

    let first = first_pass::run(&expanded, &mut diagnostics);

    if diagnostics.has_errors() {
        return false;
    }

    if verbose {
        println!(
            "[{}] first pass: {} code words, {} data words, {} symbols",
            base_path.display(),
            first.ic_final - CODE_ORIGIN,
            first.dc_final,
            first.symbols.len()
        );
    }

    let second = second_pass::run(first, &mut diagnostics);

    if diagnostics.has_errors() {
        return false;
    }

    let outputs = output::render(&second);

    if check_only {
        println!("[{}] ok (check only)", base_path.display());
        return true;
    }

    if let Err(error) = output::write(base_path, &outputs) {
        diagnostics.file_error(ErrorKind::IoFailure, format!("Cannot write the output files: {}", error).as_str());
        return false;
    }

    println!(
        "[{}] ok -> {}.{}{}{}",
        base_path.display(),
        base_path.display(),
        output::OBJECT_EXTENSION,
        if outputs.entries.is_some() { " + .ent" } else { "" },
        if outputs.externals.is_some() { " + .ext" } else { "" }
    );

    true
}


#[cfg(test)]
mod tests {

    use std::path::Path;

    use indoc::indoc;

    use deca_vm_lib::assembly::Linkage;

    use super::*;
    use crate::second_pass::SecondPassResult;


    fn assemble_source(source: &str) -> (SecondPassResult, DiagnosticList) {
        let mut diagnostics = DiagnosticList::new(Path::new("test.as"));

        let expanded = preprocessor::preprocess(source, &mut diagnostics);
        let first = first_pass::run(&expanded, &mut diagnostics);
        let second = second_pass::run(first, &mut diagnostics);

        (second, diagnostics)
    }


    #[test]
    fn label_on_macro_invocation_resolves_to_first_expanded_line() {
        let source = indoc! {"
            mcro M
            inc r1
            inc r2
            mcroend
            jmp L
            L: M
            stop
        "};

        let (result, diagnostics) = assemble_source(source);

        assert!(!diagnostics.has_errors());

        // jmp takes words 100..102, so the first expanded `inc` sits at 102
        let label = result.symbols.get("L").unwrap();
        assert_eq!(label.address, 102);

        let jmp_operand = result.words.iter().find(|word| word.address == 101).unwrap();
        assert_eq!(jmp_operand.word, (102 << 2) | Linkage::Relocatable.bits());

        assert_eq!(result.ic_final, 107);
    }


    #[test]
    fn full_program_pipeline() {
        let source = indoc! {"
            ; exercises every directive and addressing mode at once
            .entry MAIN
            .extern PRINTER

            mcro finish
            rts
            stop
            mcroend

            MAIN: mov #12, r1
            LOOP: cmp r1, MAT[r1][r2]
            bne LOOP
            lea STR, r3
            jsr PRINTER
            finish

            STR: .string \"hi\"
            MAT: .mat [2][2] 1, 2, 3, 4
            COUNT: .data 5, -5
        "};

        let (result, diagnostics) = assemble_source(source);

        assert!(!diagnostics.has_errors());

        // code: mov=3, cmp=4, bne=2, lea=3, jsr=2, rts=1, stop=1 words
        assert_eq!(result.ic_final, 116);
        assert_eq!(result.dc_final, 9);

        // data symbols sit after the code segment, in emission order
        assert_eq!(result.symbols.get("STR").unwrap().address, 116);
        assert_eq!(result.symbols.get("MAT").unwrap().address, 119);
        assert_eq!(result.symbols.get("COUNT").unwrap().address, 123);

        // the external use points at the jsr operand word
        assert_eq!(result.external_uses.len(), 1);
        assert_eq!(result.external_uses[0].name, "PRINTER");
        assert_eq!(result.external_uses[0].address, 113);

        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.symbols.get("MAIN").unwrap().address, 100);
    }

}

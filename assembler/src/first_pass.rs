use lazy_static::lazy_static;
use regex::Regex;

use deca_vm_lib::assembly::{self, Address, Word, CODE_ORIGIN};
use deca_vm_lib::op_codes::OpCode;

use crate::error::{DiagnosticList, ErrorKind};
use crate::memory_image::{Cell, MemoryImage};
use crate::symbol_table::{NamedReference, SymbolKind, SymbolTable};
use crate::tokenizer::{self, AddressingMode, COMMENT_PREFIX};


lazy_static! {

    static ref MAT_DIMENSIONS_REGEX: Regex = Regex::new(r"^\[\s*([+-]?[0-9]+)\]\[\s*([+-]?[0-9]+)\](.*)$").unwrap();

}


#[derive(Debug, Clone, Copy)]
enum DataDirective {

    Data,
    Text,
    Matrix

}


#[derive(Debug, Clone, Copy)]
enum ReferenceDirective {

    Entry,
    Extern

}

impl ReferenceDirective {

    const fn name(self) -> &'static str {
        match self {
            Self::Entry => ".entry",
            Self::Extern => ".extern",
        }
    }

}


/// Everything the first pass produces: the provisional image, the symbol
/// table (data symbols already relocated), the reference lists and the final
/// counters.
#[derive(Debug)]
pub struct FirstPassResult {

    pub image: MemoryImage,
    pub symbols: SymbolTable,
    pub entries: Vec<NamedReference>,
    pub externs: Vec<NamedReference>,
    pub ic_final: Address,
    pub dc_final: Address

}


struct FirstPass<'a> {

    ic: Address,
    dc: Address,
    image: MemoryImage,
    symbols: SymbolTable,
    entries: Vec<NamedReference>,
    externs: Vec<NamedReference>,
    diagnostics: &'a mut DiagnosticList

}


/// Run the first pass over the expanded intermediate text.
pub fn run(expanded: &str, diagnostics: &mut DiagnosticList) -> FirstPassResult {

    let mut pass = FirstPass {
        ic: CODE_ORIGIN,
        dc: 0,
        image: MemoryImage::new(),
        symbols: SymbolTable::new(),
        entries: Vec::new(),
        externs: Vec::new(),
        diagnostics,
    };

    for (index, line) in expanded.lines().enumerate() {
        pass.process_line(line, index + 1);
    }

    let ic_final = pass.ic;

    // Slide the data segment after the code segment now that its size is known
    pass.image.relocate_data(ic_final);
    pass.symbols.relocate_data(ic_final);

    FirstPassResult {
        image: pass.image,
        symbols: pass.symbols,
        entries: pass.entries,
        externs: pass.externs,
        ic_final,
        dc_final: pass.dc,
    }
}


impl FirstPass<'_> {

    fn process_line(&mut self, line: &str, line_number: usize) {

        let (label, rest) = tokenizer::split_label(line);

        // A lone label with nothing after it is dropped along with empty
        // and comment lines
        let Some((command, operand_text)) = tokenizer::command_token(rest) else {
            return;
        };

        if let Some(label) = label {
            if self.symbols.contains(label) {
                self.diagnostics.error(ErrorKind::DuplicateSymbol, line_number, format!("Symbol \"{}\" is already defined", label).as_str());
                return;
            }
            if !tokenizer::is_valid_symbol_name(label) {
                self.diagnostics.error(ErrorKind::IllegalSymbol, line_number, format!("\"{}\" is not a legal symbol name", label).as_str());
                return;
            }
        }

        if let Some(op_code) = OpCode::from_name(command) {
            self.handle_instruction(op_code, label, operand_text, line_number);
            return;
        }

        match command {

            ".data" => self.handle_data_directive(DataDirective::Data, label, operand_text, line_number),
            ".string" => self.handle_data_directive(DataDirective::Text, label, operand_text, line_number),
            ".mat" => self.handle_data_directive(DataDirective::Matrix, label, operand_text, line_number),

            ".entry" => self.handle_reference_directive(ReferenceDirective::Entry, label, operand_text, line_number),
            ".extern" => self.handle_reference_directive(ReferenceDirective::Extern, label, operand_text, line_number),

            _ if command.starts_with('.') => {
                self.diagnostics.error(ErrorKind::DirectiveError, line_number, format!("Unrecognized directive \"{}\"", command).as_str());
            }

            _ => {
                self.diagnostics.error(ErrorKind::UnknownCommand, line_number, format!("\"{}\" is not an instruction or a directive", command).as_str());
            }
        }
    }


    fn handle_instruction(&mut self, op_code: OpCode, label: Option<&str>, operand_text: &str, line_number: usize) {

        if tokenizer::has_invalid_commas(operand_text) {
            self.diagnostics.error(ErrorKind::MalformedOperand, line_number, "Stray comma in the operand field");
            return;
        }

        let (count, op1, op2) = tokenizer::split_operands(operand_text);
        let expected = op_code.operand_count();

        if count != expected {
            self.diagnostics.error(
                ErrorKind::ArityMismatch,
                line_number,
                format!(
                    "Instruction '{}' expects {} operand{}, but got {}",
                    op_code, expected, if expected == 1 { "" } else { "s" }, count
                ).as_str()
            );
            return;
        }

        let (src, dst) = match expected {
            2 => (tokenizer::classify_operand(&op1), tokenizer::classify_operand(&op2)),
            1 => (AddressingMode::Absent, tokenizer::classify_operand(&op1)),
            _ => (AddressingMode::Absent, AddressingMode::Absent),
        };

        if src == AddressingMode::Invalid || dst == AddressingMode::Invalid {
            let faulty = if src == AddressingMode::Invalid { &op1 } else if expected == 2 { &op2 } else { &op1 };
            self.diagnostics.error(
                ErrorKind::MalformedOperand,
                line_number,
                format!("\"{}\" is not a valid operand for instruction '{}'", faulty, op_code).as_str()
            );
            return;
        }

        if let Some(label) = label {
            if self.symbols.declare(label, self.ic, SymbolKind::Code, line_number).is_err() {
                self.diagnostics.error(ErrorKind::DuplicateSymbol, line_number, format!("Symbol \"{}\" is already defined", label).as_str());
                return;
            }
        }

        self.encode_instruction(op_code, src, dst);
    }


    /// Emit the header word and the operand words, advancing IC as each word
    /// is pushed.
    fn encode_instruction(&mut self, op_code: OpCode, src: AddressingMode, dst: AddressingMode) {

        let header = assembly::pack_header(op_code.code(), src.code(), dst.code());
        self.push_code(Cell::Resolved(header));

        // Two register operands share a single word
        if let (AddressingMode::Register(src_reg), AddressingMode::Register(dst_reg)) = (&src, &dst) {
            self.push_code(Cell::Resolved(assembly::pack_register_pair(src_reg.index(), dst_reg.index())));
            return;
        }

        self.encode_operand(src, true);
        self.encode_operand(dst, false);
    }


    fn encode_operand(&mut self, mode: AddressingMode, is_source: bool) {

        match mode {

            AddressingMode::Immediate(value) => {
                self.push_code(Cell::Resolved(assembly::pack_value(value)));
            }

            AddressingMode::Direct(name) => {
                self.push_code(Cell::Pending(name));
            }

            AddressingMode::Matrix { base, row, column } => {
                self.push_code(Cell::Pending(base));
                self.push_code(Cell::Resolved(assembly::pack_register_pair(row.index(), column.index())));
            }

            AddressingMode::Register(register) => {
                let word = if is_source {
                    assembly::pack_register_pair(register.index(), 0)
                } else {
                    assembly::pack_register_pair(0, register.index())
                };
                self.push_code(Cell::Resolved(word));
            }

            AddressingMode::Absent | AddressingMode::Invalid => {}
        }
    }


    fn push_code(&mut self, cell: Cell) {
        self.image.push(self.ic, cell);
        self.ic += 1;
    }


    fn handle_data_directive(&mut self, directive: DataDirective, label: Option<&str>, operand_text: &str, line_number: usize) {

        if let Some(label) = label {
            if self.symbols.declare(label, self.dc, SymbolKind::Data, line_number).is_err() {
                self.diagnostics.error(ErrorKind::DuplicateSymbol, line_number, format!("Symbol \"{}\" is already defined", label).as_str());
                return;
            }
        }

        let words = match directive {
            DataDirective::Data => self.encode_data(operand_text, line_number),
            DataDirective::Text => self.encode_string(operand_text, line_number),
            DataDirective::Matrix => self.encode_mat(operand_text, line_number),
        };

        if words.is_empty() {
            return;
        }

        let start_index = self.image.len();
        let ic_snapshot = self.ic;

        for (offset, word) in words.iter().enumerate() {
            // provisional address; the end-of-pass fix-up slides it after the code
            self.image.push(self.ic + self.dc + offset as Address, Cell::Resolved(*word));
        }

        self.image.record_chunk(start_index, words.len(), ic_snapshot);
        self.dc += words.len() as Address;
    }


    fn encode_data(&mut self, operand_text: &str, line_number: usize) -> Vec<Word> {

        let payload = operand_text.trim();
        let mut words = Vec::new();

        if payload.is_empty() {
            return words;
        }

        for token in payload.split(',') {
            match token.trim().parse::<i64>() {

                Ok(value) => words.push(assembly::pack_value(value as i16)),

                Err(_) => {
                    self.diagnostics.error(
                        ErrorKind::DirectiveError,
                        line_number,
                        format!("Invalid number \"{}\" in .data directive", token.trim()).as_str()
                    );
                    return Vec::new();
                }
            }
        }

        words
    }


    fn encode_string(&mut self, operand_text: &str, line_number: usize) -> Vec<Word> {

        let payload = operand_text.trim();

        let Some(rest) = payload.strip_prefix('"') else {
            self.diagnostics.error(ErrorKind::DirectiveError, line_number, "Missing opening quote in .string directive");
            return Vec::new();
        };

        let Some(end) = rest.find('"') else {
            self.diagnostics.error(ErrorKind::DirectiveError, line_number, "Missing closing quote in .string directive");
            return Vec::new();
        };

        if !rest[end + 1..].trim().is_empty() {
            self.diagnostics.error(ErrorKind::DirectiveError, line_number, "Unexpected characters after the closing quote in .string directive");
            return Vec::new();
        }

        let mut words: Vec<Word> = rest[..end].chars()
            .map(|c| assembly::pack_value(c as i16))
            .collect();

        // terminating zero word
        words.push(assembly::pack_value(0));

        words
    }


    fn encode_mat(&mut self, operand_text: &str, line_number: usize) -> Vec<Word> {

        let payload = operand_text.trim();

        let Some(captures) = MAT_DIMENSIONS_REGEX.captures(payload) else {
            self.diagnostics.error(ErrorKind::DirectiveError, line_number, "Invalid matrix dimensions in .mat directive");
            return Vec::new();
        };

        let rows = captures[1].parse::<i64>().unwrap_or(0);
        let columns = captures[2].parse::<i64>().unwrap_or(0);

        if rows <= 0 || columns <= 0 {
            self.diagnostics.error(ErrorKind::DirectiveError, line_number, "Matrix dimensions must be positive");
            return Vec::new();
        }

        let total = (rows * columns) as usize;

        // initializers may be followed by a comment
        let initializers = captures[3]
            .split(COMMENT_PREFIX)
            .next()
            .unwrap_or("")
            .trim();

        let mut words = Vec::with_capacity(total);

        if !initializers.is_empty() {

            let tokens: Vec<&str> = initializers.split(',').collect();

            if tokens.len() > total {
                self.diagnostics.error(
                    ErrorKind::DirectiveError,
                    line_number,
                    format!("Too many initializers in .mat directive: {} for {} elements", tokens.len(), total).as_str()
                );
                return Vec::new();
            }

            for token in tokens {
                match token.trim().parse::<i64>() {

                    Ok(value) => words.push(assembly::pack_value(value as i16)),

                    Err(_) => {
                        self.diagnostics.error(
                            ErrorKind::DirectiveError,
                            line_number,
                            format!("Invalid matrix initializer \"{}\"", token.trim()).as_str()
                        );
                        return Vec::new();
                    }
                }
            }
        }

        // missing initializers are zero-filled
        words.resize(total, assembly::pack_value(0));

        words
    }


    fn handle_reference_directive(&mut self, directive: ReferenceDirective, label: Option<&str>, operand_text: &str, line_number: usize) {

        if label.is_some() {
            // reported, but the reference below is still recorded
            self.diagnostics.error(
                ErrorKind::MisplacedLabel,
                line_number,
                format!("A label before {} is not allowed", directive.name()).as_str()
            );
        }

        let name = tokenizer::command_token(operand_text).map(|(token, _)| token);

        match name {

            Some(name) if tokenizer::is_valid_symbol_name(name) => {
                let reference = NamedReference {
                    name: name.to_string(),
                    line_number,
                };
                match directive {
                    ReferenceDirective::Entry => self.entries.push(reference),
                    ReferenceDirective::Extern => self.externs.push(reference),
                }
            }

            _ => {
                self.diagnostics.error(
                    ErrorKind::IllegalSymbol,
                    line_number,
                    format!("Missing or invalid symbol name after {}", directive.name()).as_str()
                );
            }
        }
    }

}

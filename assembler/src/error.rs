use std::fmt;
use std::path::{Path, PathBuf};

use colored::Colorize;
use indoc::formatdoc;


/// Classification of everything the assembler can report about a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {

    IoFailure,
    LineTooLong,
    MacroSyntax,
    IllegalSymbol,
    DuplicateSymbol,
    UndefinedSymbol,
    ArityMismatch,
    MalformedOperand,
    DirectiveError,
    MisplacedLabel,
    UnknownCommand

}

impl ErrorKind {

    pub const fn description(&self) -> &'static str {
        match self {
            Self::IoFailure => "I/O failure",
            Self::LineTooLong => "Line too long",
            Self::MacroSyntax => "Macro syntax error",
            Self::IllegalSymbol => "Illegal symbol",
            Self::DuplicateSymbol => "Duplicate symbol",
            Self::UndefinedSymbol => "Undefined symbol",
            Self::ArityMismatch => "Wrong operand count",
            Self::MalformedOperand => "Malformed operand",
            Self::DirectiveError => "Malformed directive",
            Self::MisplacedLabel => "Misplaced label",
            Self::UnknownCommand => "Unknown command",
        }
    }

}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}


#[derive(Debug)]
pub struct Diagnostic {

    pub kind: ErrorKind,
    /// 1-based source line, when the error is tied to one.
    pub line_number: Option<usize>,
    pub message: String

}


/// Per-file diagnostic sink. Every diagnostic is printed to stderr as soon as
/// it is recorded, so a failing run still surfaces everything it found; the
/// driver checks the count afterwards to decide the file outcome.
pub struct DiagnosticList {

    file_name: PathBuf,
    diagnostics: Vec<Diagnostic>

}

impl DiagnosticList {

    pub fn new(file_name: &Path) -> Self {
        Self {
            file_name: file_name.to_path_buf(),
            diagnostics: Vec::new(),
        }
    }


    pub fn error(&mut self, kind: ErrorKind, line_number: usize, message: &str) {
        self.record(Diagnostic {
            kind,
            line_number: Some(line_number),
            message: message.to_string(),
        });
    }


    /// An error that concerns the file as a whole rather than one line.
    pub fn file_error(&mut self, kind: ErrorKind, message: &str) {
        self.record(Diagnostic {
            kind,
            line_number: None,
            message: message.to_string(),
        });
    }


    fn record(&mut self, diagnostic: Diagnostic) {
        print_diagnostic(&self.file_name, &diagnostic);
        self.diagnostics.push(diagnostic);
    }


    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }


    pub fn error_count(&self) -> usize {
        self.diagnostics.len()
    }


    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

}


fn print_diagnostic(file_name: &Path, diagnostic: &Diagnostic) {

    let location = match diagnostic.line_number {
        Some(line_number) => format!("\"{}\" at line {}", file_name.display(), line_number),
        None => format!("\"{}\"", file_name.display()),
    };

    eprintln!("{}", formatdoc!("
        ❌ {} in {}:
           {}
        ",
        diagnostic.kind, location, diagnostic.message
    ).bright_red());
}

use crate::error::{DiagnosticList, ErrorKind};
use crate::tokenizer::{self, COMMENT_PREFIX, MACRO_END_KEYWORD, MACRO_KEYWORD, MAX_SOURCE_LINE_LENGTH};


#[derive(Debug)]
pub struct MacroDefinition {

    pub name: String,
    /// Body lines, trimmed, without the closing sentinel.
    pub body: Vec<String>,
    pub line_number: usize

}


/// Expand every macro in `source` and return the expanded intermediate text.
/// Any diagnostic recorded here is fatal for the file: the expansion stream
/// cannot be trusted after a macro error, and an over-long physical line
/// fails the file as well.
pub fn preprocess(source: &str, diagnostics: &mut DiagnosticList) -> String {

    check_line_lengths(source, diagnostics);

    let macros = collect_macros(source, diagnostics);
    let stripped = strip_definitions(source);

    expand(&stripped, &macros)
}


fn check_line_lengths(source: &str, diagnostics: &mut DiagnosticList) {
    for (index, line) in source.lines().enumerate() {
        if line.len() > MAX_SOURCE_LINE_LENGTH {
            diagnostics.error(
                ErrorKind::LineTooLong,
                index + 1,
                format!("Line is {} characters long, the limit is {}", line.len(), MAX_SOURCE_LINE_LENGTH).as_str()
            );
        }
    }
}


/// Collection sweep: record every `mcro <name>` ... `mcroend` block in
/// definition order. Scanning always resumes after the closing sentinel so
/// one bad definition does not hide the following ones.
fn collect_macros(source: &str, diagnostics: &mut DiagnosticList) -> Vec<MacroDefinition> {

    let mut macros: Vec<MacroDefinition> = Vec::new();
    let mut lines = source.lines().enumerate();

    while let Some((index, line)) = lines.next() {

        let definition_line = index + 1;
        let mut tokens = line.split_whitespace();

        if tokens.next() != Some(MACRO_KEYWORD) {
            continue;
        }

        let name = tokens.next().map(str::to_string);

        match &name {

            None => diagnostics.error(ErrorKind::MacroSyntax, definition_line, "Missing macro name after 'mcro'"),

            Some(name) => {
                if tokens.next().is_some() {
                    diagnostics.error(ErrorKind::MacroSyntax, definition_line, "Extra text after the macro name");
                }
                if !tokenizer::is_valid_symbol_name(name) {
                    diagnostics.error(ErrorKind::MacroSyntax, definition_line, format!("Invalid or reserved macro name \"{}\"", name).as_str());
                }
                if let Some(first) = macros.iter().find(|defined| &defined.name == name) {
                    diagnostics.error(
                        ErrorKind::MacroSyntax,
                        definition_line,
                        format!("Duplicate macro name \"{}\", first defined at line {}", name, first.line_number).as_str()
                    );
                }
            }
        }

        let mut body = Vec::new();
        let mut terminated = false;

        for (body_index, body_line) in lines.by_ref() {

            let trimmed = body_line.trim();

            if trimmed == MACRO_END_KEYWORD {
                terminated = true;
                break;
            }

            if trimmed.split_whitespace().next() == Some(MACRO_END_KEYWORD) {
                diagnostics.error(ErrorKind::MacroSyntax, body_index + 1, "Extra text after 'mcroend'");
                terminated = true;
                break;
            }

            body.push(trimmed.to_string());
        }

        if !terminated {
            diagnostics.error(ErrorKind::MacroSyntax, definition_line, "Macro definition is never closed by 'mcroend'");
        }
        if body.is_empty() {
            diagnostics.error(ErrorKind::MacroSyntax, definition_line, "Macro body is empty");
        }

        if let Some(name) = name {
            macros.push(MacroDefinition {
                name,
                body,
                line_number: definition_line,
            });
        }
    }

    macros
}


/// Rewrite the source without the definition blocks, `mcro` / `mcroend`
/// lines included. Macros do not nest.
fn strip_definitions(source: &str) -> String {

    let mut stripped = String::with_capacity(source.len());
    let mut inside_definition = false;

    for line in source.lines() {

        match line.split_whitespace().next() {
            Some(MACRO_KEYWORD) => {
                inside_definition = true;
                continue;
            }
            Some(MACRO_END_KEYWORD) => {
                inside_definition = false;
                continue;
            }
            _ => {}
        }

        if !inside_definition {
            stripped.push_str(line);
            stripped.push('\n');
        }
    }

    stripped
}


/// Expansion sweep over the stripped stream. A label on an invocation line
/// attaches to the first emitted body line; comment lines are dropped and
/// ordinary lines are re-emitted with normalized whitespace.
fn expand(stripped: &str, macros: &[MacroDefinition]) -> String {

    let mut expanded = String::new();

    for line in stripped.lines() {

        let trimmed = line.trim();

        if trimmed.is_empty() || trimmed.starts_with(COMMENT_PREFIX) {
            continue;
        }

        let (label, rest) = tokenizer::split_label(trimmed);
        let rest = rest.trim();
        let first_token = rest.split_whitespace().next().unwrap_or("");

        if let Some(definition) = macros.iter().find(|defined| defined.name == first_token) {

            let mut body = definition.body.iter();

            if let Some(first_line) = body.next() {
                match label {
                    Some(label) => expanded.push_str(format!("{}:\t{}\n", label, first_line).as_str()),
                    None => expanded.push_str(format!("\t{}\n", first_line).as_str()),
                }
            }

            for body_line in body {
                expanded.push_str(format!("\t{}\n", body_line).as_str());
            }

        } else {
            match label {
                Some(label) => expanded.push_str(format!("{}:\t{}\n", label, rest).as_str()),
                None => expanded.push_str(format!("\t{}\n", trimmed).as_str()),
            }
        }
    }

    expanded
}

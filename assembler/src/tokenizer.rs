use lazy_static::lazy_static;
use regex::Regex;
use static_assertions::const_assert;

use deca_vm_lib::op_codes::OpCode;
use deca_vm_lib::registers::Register;


/// Longest allowed physical source line, excluding the newline.
pub const MAX_SOURCE_LINE_LENGTH: usize = 80;

/// Longest allowed symbol name.
pub const MAX_SYMBOL_LENGTH: usize = 30;

// a label and its colon must fit on a legal line
const_assert!(MAX_SYMBOL_LENGTH + 1 < MAX_SOURCE_LINE_LENGTH);

pub const COMMENT_PREFIX: char = ';';

pub const MACRO_KEYWORD: &str = "mcro";
pub const MACRO_END_KEYWORD: &str = "mcroend";

pub const DIRECTIVE_NAMES: [&str; 5] = [".data", ".string", ".entry", ".extern", ".mat"];


lazy_static! {

    static ref IDENTIFIER_REGEX: Regex = Regex::new(r"^[a-zA-Z][a-zA-Z0-9]*$").unwrap();

    static ref IMMEDIATE_REGEX: Regex = Regex::new(r"^#[+-]?[0-9]+$").unwrap();

    static ref MATRIX_REGEX: Regex = Regex::new(r"^([^\[\],]+)\[([^\[\]]*)\]\[([^\[\]]*)\]\s*,?$").unwrap();

}


/// A classified instruction operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressingMode {

    Immediate(i16),
    Direct(String),
    Matrix { base: String, row: Register, column: Register },
    Register(Register),

    /// The operand slot is empty.
    Absent,
    /// The operand text matches no addressing form.
    Invalid

}

impl AddressingMode {

    /// The 2-bit mode field value in the instruction header word.
    /// An absent operand encodes as zero.
    pub fn code(&self) -> u16 {
        match self {
            Self::Immediate(_) => 0,
            Self::Direct(_) => 1,
            Self::Matrix { .. } => 2,
            Self::Register(_) => 3,
            Self::Absent | Self::Invalid => 0,
        }
    }

}


pub fn is_reserved_word(word: &str) -> bool {
    OpCode::from_name(word).is_some()
        || Register::from_name(word).is_some()
        || DIRECTIVE_NAMES.contains(&word)
        || word == MACRO_KEYWORD
        || word == MACRO_END_KEYWORD
}


/// Symbol grammar: a letter followed by alphanumerics, at most
/// [`MAX_SYMBOL_LENGTH`] characters, and not a reserved word.
pub fn is_valid_symbol_name(name: &str) -> bool {
    name.len() <= MAX_SYMBOL_LENGTH
        && IDENTIFIER_REGEX.is_match(name)
        && !is_reserved_word(name)
}


/// Split an optional leading `label:` marker off a line. The label text is
/// returned unvalidated; `rest` starts right after the colon. Comment lines
/// never carry a label.
pub fn split_label(line: &str) -> (Option<&str>, &str) {

    let trimmed = line.trim_start();

    if trimmed.starts_with(COMMENT_PREFIX) {
        return (None, line);
    }

    for (i, c) in trimmed.char_indices() {
        if c == ':' {
            if i == 0 {
                break;
            }
            return (Some(&trimmed[..i]), &trimmed[i + 1..]);
        }
        if c.is_whitespace() {
            break;
        }
    }

    (None, line)
}


/// The next whitespace-delimited token and the text after it, or `None` when
/// the remainder is empty or a comment.
pub fn command_token(rest: &str) -> Option<(&str, &str)> {

    let trimmed = rest.trim_start();

    if trimmed.is_empty() || trimmed.starts_with(COMMENT_PREFIX) {
        return None;
    }

    match trimmed.find(char::is_whitespace) {
        Some(end) => Some((&trimmed[..end], &trimmed[end..])),
        None => Some((trimmed, "")),
    }
}


/// Split at most two comma-separated operands, stripping every whitespace
/// character inside each operand. Text after a second comma is ignored;
/// comma discipline is checked separately by [`has_invalid_commas`].
pub fn split_operands(rest: &str) -> (usize, String, String) {

    let trimmed = rest.trim();

    if trimmed.is_empty() || trimmed.starts_with(COMMENT_PREFIX) {
        return (0, String::new(), String::new());
    }

    let mut parts = trimmed.splitn(3, ',');

    let op1: String = parts.next().unwrap_or("").chars().filter(|c| !c.is_whitespace()).collect();
    let op2: String = parts.next().unwrap_or("").chars().filter(|c| !c.is_whitespace()).collect();

    let count = if !op2.is_empty() {
        2
    } else if !op1.is_empty() {
        1
    } else {
        0
    };

    (count, op1, op2)
}


/// Detect a leading, trailing or doubled comma in an operand field.
pub fn has_invalid_commas(rest: &str) -> bool {

    let trimmed = rest.trim();

    if trimmed.starts_with(',') || trimmed.ends_with(',') {
        return true;
    }

    let mut previous_was_comma = false;

    for c in trimmed.chars() {
        if c == ',' {
            if previous_was_comma {
                return true;
            }
            previous_was_comma = true;
        } else if !c.is_whitespace() {
            previous_was_comma = false;
        }
    }

    false
}


/// Split `base[row][column]` into its three raw parts. Succeeds only on the
/// exact two-index shape, tolerating whitespace inside the brackets and one
/// trailing comma.
pub fn matrix_parts(expr: &str) -> Option<(String, String, String)> {

    let captures = MATRIX_REGEX.captures(expr)?;

    let base = captures[1].trim().to_string();
    let row = captures[2].chars().filter(|c| !c.is_whitespace()).collect();
    let column = captures[3].chars().filter(|c| !c.is_whitespace()).collect();

    Some((base, row, column))
}


pub fn classify_operand(operand: &str) -> AddressingMode {

    if operand.is_empty() {
        return AddressingMode::Absent;
    }

    if operand.starts_with('#') {
        if IMMEDIATE_REGEX.is_match(operand) {
            if let Ok(value) = operand[1..].parse::<i64>() {
                return AddressingMode::Immediate(value as i16);
            }
        }
        return AddressingMode::Invalid;
    }

    if let Some(register) = Register::from_name(operand) {
        return AddressingMode::Register(register);
    }

    if let Some((base, row, column)) = matrix_parts(operand) {
        match (Register::from_name(&row), Register::from_name(&column)) {
            (Some(row), Some(column)) if is_valid_symbol_name(&base) => {
                return AddressingMode::Matrix { base, row, column };
            }
            _ => return AddressingMode::Invalid,
        }
    }

    if is_valid_symbol_name(operand) {
        return AddressingMode::Direct(operand.to_string());
    }

    AddressingMode::Invalid
}


#[cfg(test)]
mod tests {

    use super::*;


    #[test]
    fn label_splitting() {
        let (label, rest) = split_label("MAIN: mov r1, r2");
        assert_eq!(label, Some("MAIN"));
        assert_eq!(rest, " mov r1, r2");

        let (label, _) = split_label("   LOOP:stop");
        assert_eq!(label, Some("LOOP"));

        assert_eq!(split_label("mov r1, r2").0, None);
        assert_eq!(split_label("; FOO: comment").0, None);
        assert_eq!(split_label(": stop").0, None);
        // the label text is not validated here
        assert_eq!(split_label("9BAD: stop").0, Some("9BAD"));
    }


    #[test]
    fn command_tokens() {
        assert_eq!(command_token("  mov r1, r2"), Some(("mov", " r1, r2")));
        assert_eq!(command_token("stop"), Some(("stop", "")));
        assert_eq!(command_token("   "), None);
        assert_eq!(command_token(" ; comment"), None);
    }


    #[test]
    fn operand_splitting() {
        assert_eq!(split_operands(" r1 , r2 "), (2, "r1".to_string(), "r2".to_string()));
        assert_eq!(split_operands("  # 5 "), (1, "#5".to_string(), String::new()));
        assert_eq!(split_operands(""), (0, String::new(), String::new()));
        assert_eq!(split_operands(" ; end"), (0, String::new(), String::new()));

        // whitespace inside an operand is stripped outright
        assert_eq!(split_operands("M [r1] [r2]").1, "M[r1][r2]");
    }


    #[test]
    fn comma_discipline() {
        assert!(has_invalid_commas(", r1"));
        assert!(has_invalid_commas("r1 ,"));
        assert!(has_invalid_commas("r1 ,, r2"));
        assert!(has_invalid_commas("r1 , , r2"));

        assert!(!has_invalid_commas("r1, r2"));
        assert!(!has_invalid_commas("r1"));
        assert!(!has_invalid_commas(""));
    }


    #[test]
    fn reserved_words() {
        assert!(is_reserved_word("mov"));
        assert!(is_reserved_word("stop"));
        assert!(is_reserved_word(".data"));
        assert!(is_reserved_word("mcro"));
        assert!(is_reserved_word("mcroend"));
        assert!(is_reserved_word("r0"));
        assert!(is_reserved_word("r7"));

        assert!(!is_reserved_word("MOV"));
        assert!(!is_reserved_word("main"));
    }


    #[test]
    fn symbol_names() {
        assert!(is_valid_symbol_name("MAIN"));
        assert!(is_valid_symbol_name("x1y2"));
        assert!(is_valid_symbol_name(&"A".repeat(MAX_SYMBOL_LENGTH)));

        assert!(!is_valid_symbol_name(""));
        assert!(!is_valid_symbol_name("1ABC"));
        assert!(!is_valid_symbol_name("A_B"));
        assert!(!is_valid_symbol_name("mov"));
        assert!(!is_valid_symbol_name("r3"));
        assert!(!is_valid_symbol_name(&"A".repeat(MAX_SYMBOL_LENGTH + 1)));
    }


    #[test]
    fn matrix_shapes() {
        assert_eq!(
            matrix_parts("M[r1][r2]"),
            Some(("M".to_string(), "r1".to_string(), "r2".to_string()))
        );
        assert_eq!(
            matrix_parts("MAT[ r1 ][ r2 ],"),
            Some(("MAT".to_string(), "r1".to_string(), "r2".to_string()))
        );

        assert_eq!(matrix_parts("M[r1]"), None);
        assert_eq!(matrix_parts("M[r1][r2][r3]"), None);
        assert_eq!(matrix_parts("[r1][r2]"), None);
        assert_eq!(matrix_parts("M[r1][r2]x"), None);
    }


    #[test]
    fn operand_classification() {
        assert_eq!(classify_operand("#5"), AddressingMode::Immediate(5));
        assert_eq!(classify_operand("#-1"), AddressingMode::Immediate(-1));
        assert_eq!(classify_operand("#+12"), AddressingMode::Immediate(12));

        assert_eq!(classify_operand("r3"), AddressingMode::Register(Register::R3));
        assert_eq!(classify_operand("X"), AddressingMode::Direct("X".to_string()));
        assert_eq!(classify_operand(""), AddressingMode::Absent);

        assert_eq!(
            classify_operand("M[r2][r5]"),
            AddressingMode::Matrix {
                base: "M".to_string(),
                row: Register::R2,
                column: Register::R5,
            }
        );

        assert_eq!(classify_operand("#"), AddressingMode::Invalid);
        assert_eq!(classify_operand("#x"), AddressingMode::Invalid);
        assert_eq!(classify_operand("r8"), AddressingMode::Invalid);
        assert_eq!(classify_operand("M[x][r2]"), AddressingMode::Invalid);
        assert_eq!(classify_operand("M[r1][r2"), AddressingMode::Invalid);
        assert_eq!(classify_operand("9name"), AddressingMode::Invalid);
        assert_eq!(classify_operand("mov"), AddressingMode::Invalid);
    }


    #[test]
    fn mode_codes() {
        assert_eq!(classify_operand("#0").code(), 0);
        assert_eq!(classify_operand("X").code(), 1);
        assert_eq!(classify_operand("M[r1][r2]").code(), 2);
        assert_eq!(classify_operand("r0").code(), 3);
    }

}

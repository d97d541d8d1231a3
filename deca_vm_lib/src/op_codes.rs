use std::fmt;

use static_assertions::const_assert;

use crate::assembly::OPCODE_FIELD_BITS;


macro_rules! declare_op_codes {
    ($($name:ident $repr:ident argc: $operands:literal),+) => {

/// The instruction set. Discriminants are the 4-bit opcode values as they
/// appear in the instruction header word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum OpCode {
    $($name),+
}

pub const OP_CODE_COUNT: usize = [$(stringify!($name)),+].len();

impl OpCode {

    /// Return the opcode given its mnemonic.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            $(stringify!($repr) => Self::$name,)+

            _ => return None
        })
    }

    pub const fn name(&self) -> &'static str {
        match self {
            $(Self::$name => stringify!($repr)),+
        }
    }

    /// How many operands the instruction takes (0, 1 or 2).
    /// Single-operand instructions treat their operand as the destination.
    pub const fn operand_count(&self) -> usize {
        match self {
            $(Self::$name => $operands),+
        }
    }

    /// The numeric opcode encoded into the header word.
    pub const fn code(&self) -> u16 {
        *self as u16
    }

}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

    };
}

declare_op_codes! {

    MOV mov argc: 2,
    CMP cmp argc: 2,
    ADD add argc: 2,
    SUB sub argc: 2,
    LEA lea argc: 2,

    CLR clr argc: 1,
    NOT not argc: 1,
    INC inc argc: 1,
    DEC dec argc: 1,
    JMP jmp argc: 1,
    BNE bne argc: 1,
    JSR jsr argc: 1,
    RED red argc: 1,
    PRN prn argc: 1,

    RTS rts argc: 0,
    STOP stop argc: 0

}

const_assert!(OP_CODE_COUNT <= 1 << OPCODE_FIELD_BITS);

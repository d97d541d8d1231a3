use std::fmt;

use static_assertions::const_assert;

use crate::assembly::REGISTER_FIELD_BITS;


macro_rules! declare_registers {
    ($($name:ident $repr:ident),+) => {

/// The general purpose registers of the machine.
#[allow(dead_code, non_camel_case_types)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Register {
    $(
        $name,
    )+
}

pub const REGISTER_COUNT: usize = [$(stringify!($name)),+].len();

impl Register {

    /// Return the register given its source name.
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

    /// The register number as it appears in register operand words.
    pub const fn index(&self) -> u16 {
        *self as u16
    }

}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

    };
}

declare_registers! {

    R0 r0,
    R1 r1,
    R2 r2,
    R3 r3,
    R4 r4,
    R5 r5,
    R6 r6,
    R7 r7

}

const_assert!(REGISTER_COUNT <= 1 << REGISTER_FIELD_BITS);

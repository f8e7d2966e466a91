// Copyright (C) 2025 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::fmt::{Display, Write};

use crate::GeneralRegister;

/// A memory location, addressed as `[base + index * scale + displacement]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryOperand {
    base: GeneralRegister,
    index: Option<GeneralRegister>,
    scale: SibScale,
    displacement: i32,
}

impl MemoryOperand {
    #[must_use]
    pub fn new(base: GeneralRegister) -> Self {
        Self {
            base,
            index: Default::default(),
            scale: Default::default(),
            displacement: Default::default(),
        }
    }

    #[must_use]
    pub fn with_index(self, index: GeneralRegister, scale: SibScale) -> Self {
        Self {
            index: Some(index),
            scale,
            ..self
        }
    }

    #[must_use]
    pub fn with_displacement(self, displacement: i32) -> Self {
        Self {
            displacement,
            ..self
        }
    }

    /// Returns the operand that lies `bytes` further in memory.
    #[must_use]
    pub fn offset(&self, bytes: i32) -> Self {
        Self {
            displacement: self.displacement + bytes,
            ..*self
        }
    }

    #[must_use]
    pub const fn base(&self) -> GeneralRegister {
        self.base
    }

    #[must_use]
    pub const fn index(&self) -> Option<GeneralRegister> {
        self.index
    }

    #[must_use]
    pub const fn scale(&self) -> SibScale {
        self.scale
    }

    #[must_use]
    pub const fn displacement(&self) -> i32 {
        self.displacement
    }
}

impl From<GeneralRegister> for MemoryOperand {
    fn from(value: GeneralRegister) -> Self {
        Self::new(value)
    }
}

impl Display for MemoryOperand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_char('[')?;
        f.write_str(self.base.name64())?;

        if let Some(index) = self.index {
            f.write_str(" + ")?;
            f.write_str(index.name64())?;

            if self.scale != SibScale::Scale1 {
                f.write_str(" * ")?;
                self.scale.fmt(f)?;
            }
        }

        if self.displacement > 0 {
            write!(f, " + {}", self.displacement)?;
        } else if self.displacement < 0 {
            write!(f, " - {}", self.displacement.unsigned_abs())?;
        }

        f.write_char(']')
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SibScale {
    #[default]
    Scale1,
    Scale2,
    Scale4,
    Scale8,
}

impl SibScale {
    #[must_use]
    pub const fn factor(&self) -> i32 {
        match self {
            Self::Scale1 => 1,
            Self::Scale2 => 2,
            Self::Scale4 => 4,
            Self::Scale8 => 8,
        }
    }
}

impl Display for SibScale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.factor().fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use pretty_assertions::assert_eq;

    use super::*;

    #[rstest]
    #[case(
        MemoryOperand::new(GeneralRegister::Rsp),
        "[rsp]"
    )]
    #[case(
        MemoryOperand::new(GeneralRegister::Rbp).with_displacement(-16),
        "[rbp - 16]"
    )]
    #[case(
        MemoryOperand::new(GeneralRegister::Rsi).with_index(GeneralRegister::Rcx, SibScale::Scale4).with_displacement(32),
        "[rsi + rcx * 4 + 32]"
    )]
    #[case(
        MemoryOperand::new(GeneralRegister::R8).with_index(GeneralRegister::R9, SibScale::Scale1),
        "[r8 + r9]"
    )]
    fn display_test(#[case] input: MemoryOperand, #[case] expected: &str) {
        assert_eq!(input.to_string(), expected);
    }

    #[test]
    fn offset_accumulates() {
        let base = MemoryOperand::new(GeneralRegister::Rdx).with_displacement(8);

        assert_eq!(base.offset(4).displacement(), 12);
        assert_eq!(base.offset(4).offset(-12).displacement(), 0);
        assert_eq!(base.offset(0), base);
        assert_eq!(base.offset(4).base(), GeneralRegister::Rdx);
    }
}

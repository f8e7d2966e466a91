// Copyright (C) 2025 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::fmt::Display;

use crate::{MemoryOperand, VectorRegister};

/// Where the contents of a value can be read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    Register(VectorRegister),
    Memory(MemoryOperand),
}

impl Operand {
    #[must_use]
    pub const fn as_register(&self) -> Option<VectorRegister> {
        match self {
            Self::Register(register) => Some(*register),
            Self::Memory(..) => None,
        }
    }

    #[must_use]
    pub const fn as_memory(&self) -> Option<MemoryOperand> {
        match self {
            Self::Register(..) => None,
            Self::Memory(memory) => Some(*memory),
        }
    }
}

impl From<VectorRegister> for Operand {
    fn from(value: VectorRegister) -> Self {
        Self::Register(value)
    }
}

impl From<MemoryOperand> for Operand {
    fn from(value: MemoryOperand) -> Self {
        Self::Memory(value)
    }
}

impl Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Register(register) => register.fmt(f),
            Self::Memory(memory) => memory.fmt(f),
        }
    }
}

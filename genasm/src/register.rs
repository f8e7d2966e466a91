// Copyright (C) 2024 - 2025 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::fmt::Display;

use strum::{AsRefStr, EnumIter};

/// The general purpose registers, used for addressing memory (stack pointer,
/// argument pointers, etc.).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum GeneralRegister {
    Rax,
    Rbx,
    Rcx,
    Rdx,
    Rsi,
    Rdi,
    Rbp,
    Rsp,
    R8,
    R9,
    R10,
    R11,
    R12,
    R13,
    R14,
    R15,
}

impl GeneralRegister {
    #[must_use]
    pub const fn name64(&self) -> &'static str {
        match self {
            Self::Rax => "rax",
            Self::Rbx => "rbx",
            Self::Rcx => "rcx",
            Self::Rdx => "rdx",
            Self::Rsi => "rsi",
            Self::Rdi => "rdi",
            Self::Rbp => "rbp",
            Self::Rsp => "rsp",
            Self::R8 => "r8",
            Self::R9 => "r9",
            Self::R10 => "r10",
            Self::R11 => "r11",
            Self::R12 => "r12",
            Self::R13 => "r13",
            Self::R14 => "r14",
            Self::R15 => "r15",
        }
    }
}

impl Display for GeneralRegister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name64())
    }
}

/// A class of vector registers sharing a common width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum RegisterClass {
    /// SSE
    Xmm,
    /// AVX
    Ymm,
    /// AVX-512
    Zmm,
}

impl RegisterClass {
    #[must_use]
    pub const fn width_bits(&self) -> usize {
        match self {
            Self::Xmm => 128,
            Self::Ymm => 256,
            Self::Zmm => 512,
        }
    }

    #[must_use]
    pub const fn count(&self) -> usize {
        match self {
            Self::Xmm => 16,
            Self::Ymm => 16,
            Self::Zmm => 32,
        }
    }

    #[must_use]
    pub const fn register_set(&self) -> RegisterSet {
        match self {
            Self::Xmm => XMM,
            Self::Ymm => YMM,
            Self::Zmm => ZMM,
        }
    }
}

impl Display for RegisterClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// A physical vector register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VectorRegister {
    class: RegisterClass,
    index: u8,
}

impl VectorRegister {
    #[must_use]
    pub const fn new(class: RegisterClass, index: u8) -> Self {
        Self { class, index }
    }

    #[must_use]
    pub const fn class(&self) -> RegisterClass {
        self.class
    }

    #[must_use]
    pub const fn index(&self) -> usize {
        self.index as usize
    }
}

impl Display for VectorRegister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.class, self.index)
    }
}

/// The registers an [`Allocator`](crate::Allocator) may hand out, in order of
/// preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterSet {
    class: RegisterClass,
    registers: &'static [VectorRegister],
}

impl RegisterSet {
    #[must_use]
    pub const fn class(&self) -> RegisterClass {
        self.class
    }

    #[must_use]
    pub const fn count(&self) -> usize {
        self.registers.len()
    }

    #[must_use]
    pub const fn width_bits(&self) -> usize {
        self.class.width_bits()
    }

    /// The distance in bytes between two consecutive spill slots.
    #[must_use]
    pub const fn span_bytes(&self) -> usize {
        self.width_bits() / 8
    }

    #[must_use]
    pub const fn registers(&self) -> &'static [VectorRegister] {
        self.registers
    }

    #[must_use]
    pub fn register(&self, id: usize) -> Option<VectorRegister> {
        self.registers.get(id).copied()
    }

    /// Only hand out the first `count` registers, e.g. to keep the others for
    /// constants the kernel manages itself.
    #[must_use]
    pub fn limited_to(&self, count: usize) -> Self {
        Self {
            class: self.class,
            registers: &self.registers[..count.min(self.registers.len())],
        }
    }
}

const fn vector_registers<const N: usize>(class: RegisterClass) -> [VectorRegister; N] {
    let mut registers = [VectorRegister::new(class, 0); N];

    let mut index = 0;
    while index < N {
        registers[index] = VectorRegister::new(class, index as u8);
        index += 1;
    }

    registers
}

const XMM_REGISTERS: [VectorRegister; 16] = vector_registers(RegisterClass::Xmm);
const YMM_REGISTERS: [VectorRegister; 16] = vector_registers(RegisterClass::Ymm);
const ZMM_REGISTERS: [VectorRegister; 32] = vector_registers(RegisterClass::Zmm);

/// The registers introduced by SSE.
pub const XMM: RegisterSet = RegisterSet {
    class: RegisterClass::Xmm,
    registers: &XMM_REGISTERS,
};

/// The registers introduced by AVX.
pub const YMM: RegisterSet = RegisterSet {
    class: RegisterClass::Ymm,
    registers: &YMM_REGISTERS,
};

/// The registers introduced by AVX-512.
pub const ZMM: RegisterSet = RegisterSet {
    class: RegisterClass::Zmm,
    registers: &ZMM_REGISTERS,
};

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use pretty_assertions::assert_eq;
    use strum::IntoEnumIterator;

    #[rstest]
    #[case(XMM, 16, 128, 16)]
    #[case(YMM, 16, 256, 32)]
    #[case(ZMM, 32, 512, 64)]
    fn register_set_shape(#[case] set: RegisterSet, #[case] count: usize, #[case] width: usize, #[case] span: usize) {
        assert_eq!(set.count(), count);
        assert_eq!(set.width_bits(), width);
        assert_eq!(set.span_bytes(), span);
    }

    #[test]
    fn registers_are_in_index_order() {
        for class in RegisterClass::iter() {
            let set = class.register_set();
            assert_eq!(set.count(), class.count());

            for (id, register) in set.registers().iter().enumerate() {
                assert_eq!(register.index(), id);
                assert_eq!(register.class(), class);
            }
        }
    }

    #[rstest]
    #[case(VectorRegister::new(RegisterClass::Xmm, 0), "xmm0")]
    #[case(VectorRegister::new(RegisterClass::Ymm, 15), "ymm15")]
    #[case(VectorRegister::new(RegisterClass::Zmm, 31), "zmm31")]
    fn display_test(#[case] input: VectorRegister, #[case] expected: &str) {
        assert_eq!(input.to_string(), expected);
    }

    #[test]
    fn limited_register_set() {
        let set = ZMM.limited_to(4);
        assert_eq!(set.count(), 4);
        assert_eq!(set.width_bits(), 512);
        assert_eq!(set.register(3), Some(VectorRegister::new(RegisterClass::Zmm, 3)));
        assert_eq!(set.register(4), None);

        assert_eq!(XMM.limited_to(100), XMM);
    }

    #[test]
    fn register_out_of_range() {
        assert_eq!(YMM.register(16), None);
        assert_eq!(ZMM.register(16), Some(VectorRegister::new(RegisterClass::Zmm, 16)));
    }
}

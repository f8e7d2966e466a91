// Copyright (C) 2025 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::fmt::Display;

use strum::AsRefStr;

use crate::{MemoryOperand, Operand, RegisterClass, VectorRegister};

/// The vector instructions the allocator (and the code generators driving it)
/// can emit. Rendered in Intel syntax.
///
/// | Variant          | Mnemonic (xmm/ymm) | Mnemonic (zmm)
/// |------------------|--------------------|------------------
/// | `LoadUnaligned`  | `vmovdqu`          | `vmovdqu32`
/// | `LoadAligned`    | `vmovdqa`          | `vmovdqa32`
/// | `StoreUnaligned` | `vmovdqu`          | `vmovdqu32`
/// | `StoreAligned`   | `vmovdqa`          | `vmovdqa32`
/// | `Move`           | `vmovdqu`          | `vmovdqu32`
/// | `Broadcast`      | `vpbroadcastd`     | `vpbroadcastd`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VectorInstruction {
    LoadUnaligned { dst: VectorRegister, src: MemoryOperand },
    LoadAligned { dst: VectorRegister, src: MemoryOperand },

    StoreUnaligned { dst: MemoryOperand, src: VectorRegister },
    StoreAligned { dst: MemoryOperand, src: VectorRegister },

    /// Replicate the 32-bit element at `src` across every lane of `dst`.
    Broadcast { dst: VectorRegister, src: MemoryOperand },

    Move { dst: VectorRegister, src: VectorRegister },

    Binary {
        operation: VectorOperation,
        dst: VectorRegister,
        lhs: VectorRegister,
        rhs: Operand,
    },

    //
    // Virtual Instructions
    //

    Comment(String),
}

impl VectorInstruction {
    #[must_use]
    pub fn is_store(&self) -> bool {
        matches!(self, Self::StoreAligned { .. } | Self::StoreUnaligned { .. })
    }

    #[must_use]
    pub fn is_virtual(&self) -> bool {
        matches!(self, Self::Comment(..))
    }
}

impl Display for VectorInstruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LoadUnaligned { dst, src } => {
                write!(f, "{} {dst}, {src}", unaligned_move(dst.class()))
            }

            Self::LoadAligned { dst, src } => {
                write!(f, "{} {dst}, {src}", aligned_move(dst.class()))
            }

            Self::StoreUnaligned { dst, src } => {
                write!(f, "{} {dst}, {src}", unaligned_move(src.class()))
            }

            Self::StoreAligned { dst, src } => {
                write!(f, "{} {dst}, {src}", aligned_move(src.class()))
            }

            Self::Broadcast { dst, src } => {
                write!(f, "vpbroadcastd {dst}, {src}")
            }

            Self::Move { dst, src } => {
                write!(f, "{} {dst}, {src}", unaligned_move(dst.class()))
            }

            Self::Binary { operation, dst, lhs, rhs } => {
                write!(f, "{}{} {dst}, {lhs}, {rhs}", operation.as_ref(), operation.element_suffix(dst.class()))
            }

            Self::Comment(comment) => {
                write!(f, "; {comment}")
            }
        }
    }
}

#[must_use]
const fn unaligned_move(class: RegisterClass) -> &'static str {
    match class {
        RegisterClass::Zmm => "vmovdqu32",
        _ => "vmovdqu",
    }
}

#[must_use]
const fn aligned_move(class: RegisterClass) -> &'static str {
    match class {
        RegisterClass::Zmm => "vmovdqa32",
        _ => "vmovdqa",
    }
}

/// Lane-wise operations on 32-bit integer elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum VectorOperation {
    Vpaddd,
    Vpxor,
    Vpand,
    Vpor,
}

impl VectorOperation {
    /// The bitwise operations only exist with an element size under EVEX.
    #[must_use]
    pub fn element_suffix(&self, class: RegisterClass) -> &'static str {
        match (class, self) {
            (RegisterClass::Zmm, Self::Vpxor | Self::Vpand | Self::Vpor) => "d",
            _ => "",
        }
    }
}

// Copyright (C) 2025 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! A register allocator for hand-written vector kernels. Code generators create
//! [`Value`]s and ask for them as registers or operands while emitting their
//! instructions; the [`Allocator`] loads, evicts and spills as needed.

mod address;
mod allocator;
mod emitter;
mod error;
mod instruction;
mod operand;
mod pool;
mod register;
mod stats;
mod value;

pub use self::{
    address::{
        MemoryOperand,
        SibScale,
    },
    allocator::{
        Allocator,
        LeakedValue,
    },
    emitter::{
        AsmWriter,
        EmitError,
        Emitter,
    },
    error::AllocError,
    instruction::{
        VectorInstruction,
        VectorOperation,
    },
    operand::Operand,
    register::{
        GeneralRegister,
        RegisterClass,
        RegisterSet,
        VectorRegister,
        XMM,
        YMM,
        ZMM,
    },
    stats::{
        AllocatorStats,
        StatsRegion,
    },
    value::{
        Value,
        ValueId,
        ValueState,
    },
};

// Copyright (C) 2025 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use thiserror::Error;

use crate::{EmitError, RegisterClass, ValueId, ValueState};

/// Misuse of the allocator by a code generator. None of these can be recovered
/// from: the generated code would be incorrect, so generation must stop.
#[derive(Debug, Error)]
pub enum AllocError {
    #[error("all {count} {class} registers are held by values that cannot be evicted")]
    Unschedulable {
        class: RegisterClass,
        count: usize,
    },

    #[error("value {value} has no location while it is {state}")]
    NoLocation {
        value: ValueId,
        state: ValueState,
    },

    #[error("value {0} is not tracked by this allocator (already consumed?)")]
    UnknownValue(ValueId),

    #[error("register {index} does not exist, there are only {count}")]
    RegisterOutOfRange {
        index: usize,
        count: usize,
    },

    #[error(transparent)]
    Emit(#[from] EmitError),
}

// Copyright (C) 2025 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::fmt::Display;

use log::info;

use crate::{AllocError, Allocator, Emitter, VectorInstruction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatorStats {
    pub free_registers: usize,
    pub total_registers: usize,
    pub tracked_values: usize,
    pub spills: usize,
    /// How many stack slots were needed at most.
    pub slots: usize,
}

impl Display for AllocatorStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{} free ({} total + {} spills + {} slots)",
            self.free_registers,
            self.total_registers,
            self.tracked_values,
            self.spills,
            self.slots,
        )
    }
}

/// A region of generated code, bracketed by statistics comments.
#[derive(Debug)]
#[must_use = "finish the region to emit the closing statistics"]
pub struct StatsRegion {
    label: String,
}

impl StatsRegion {
    pub(crate) fn new(label: String) -> Self {
        Self { label }
    }

    pub fn finish<E: Emitter>(self, alloc: &mut Allocator<E>) -> Result<AllocatorStats, AllocError> {
        self.report(alloc, "out")
    }

    pub(crate) fn report<E: Emitter>(&self, alloc: &mut Allocator<E>, when: &str) -> Result<AllocatorStats, AllocError> {
        let stats = alloc.snapshot();
        let line = format!("[{}] {when}: {stats}", self.label);

        info!("{line}");
        alloc.emit(VectorInstruction::Comment(line))?;

        Ok(stats)
    }
}

// Copyright (C) 2025 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::io::Write;

use thiserror::Error;

use crate::VectorInstruction;

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("failed to write instruction: {0}")]
    Io(#[from] std::io::Error),
}

/// The backend that receives every instruction the allocator decides to emit.
pub trait Emitter {
    fn emit(&mut self, instruction: VectorInstruction) -> Result<(), EmitError>;
}

/// Records the instructions, e.g. for inspection in tests.
impl Emitter for Vec<VectorInstruction> {
    fn emit(&mut self, instruction: VectorInstruction) -> Result<(), EmitError> {
        self.push(instruction);
        Ok(())
    }
}

impl<E: Emitter + ?Sized> Emitter for &mut E {
    fn emit(&mut self, instruction: VectorInstruction) -> Result<(), EmitError> {
        (**self).emit(instruction)
    }
}

/// Writes the instructions as textual assembly, one per line.
#[derive(Debug)]
pub struct AsmWriter<W: Write> {
    output: W,
    indent: &'static str,
    instruction_count: usize,
}

impl<W: Write> AsmWriter<W> {
    #[must_use]
    pub fn new(output: W) -> Self {
        Self {
            output,
            indent: "    ",
            instruction_count: 0,
        }
    }

    /// How many real (non-virtual) instructions were written.
    #[must_use]
    pub fn instruction_count(&self) -> usize {
        self.instruction_count
    }

    pub fn write_label(&mut self, name: &str) -> Result<(), EmitError> {
        writeln!(self.output, "{name}:")?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), EmitError> {
        self.output.flush()?;
        Ok(())
    }

    #[must_use]
    pub fn into_inner(self) -> W {
        self.output
    }
}

impl<W: Write> Emitter for AsmWriter<W> {
    fn emit(&mut self, instruction: VectorInstruction) -> Result<(), EmitError> {
        if !instruction.is_virtual() {
            self.instruction_count += 1;
        }

        writeln!(self.output, "{}{instruction}", self.indent)?;
        Ok(())
    }
}

// Copyright (C) 2025 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use genasm::{
    AllocError,
    Allocator,
    Emitter,
    GeneralRegister,
    MemoryOperand,
    RegisterSet,
    Value,
    VectorInstruction,
    VectorOperation,
};
use log::debug;

/// The kernel needs the current pair, the destination and the round key in
/// registers at the same time.
pub const MIN_REGISTERS: usize = 4;

/// A mixing kernel: `inputs` vectors are loaded from `[rsi]`, mixed with their
/// neighbour and a broadcast round key from `[rdx]` for every round, folded
/// together and stored to `[rdi]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MixingKernel {
    pub register_set: RegisterSet,
    pub inputs: usize,
    pub rounds: usize,
}

impl MixingKernel {
    #[must_use]
    pub fn new_allocator<E: Emitter>(&self, emitter: E) -> Allocator<E> {
        Allocator::new(emitter, self.register_set, MemoryOperand::new(GeneralRegister::Rsp))
    }

    pub fn generate<E: Emitter>(&self, alloc: &mut Allocator<E>) -> Result<(), AllocError> {
        let span = self.register_set.span_bytes() as i32;
        let input = MemoryOperand::new(GeneralRegister::Rsi);
        let keys = MemoryOperand::new(GeneralRegister::Rdx);
        let output = MemoryOperand::new(GeneralRegister::Rdi);

        let region = alloc.stats("kernel")?;

        let mut state = Vec::with_capacity(self.inputs);
        for index in 0..self.inputs {
            state.push(alloc.new_value_from(input.offset(index as i32 * span)));
        }

        let keys = alloc.new_values_broadcast_from(self.rounds, keys, 32);
        for (round, key) in keys.into_iter().enumerate() {
            let round_region = alloc.stats(format!("round {round}"))?;

            state = self.mix(alloc, state, &key)?;
            key.free(alloc)?;

            round_region.finish(alloc)?;
        }

        let result = self.fold(alloc, state)?;
        if let Some(result) = result {
            let register = result.consume(alloc)?;
            alloc.emit(VectorInstruction::StoreUnaligned { dst: output, src: register })?;
        }

        region.finish(alloc)?;
        Ok(())
    }

    /// `next[i] = (state[i] ^ state[i + 1]) + key`
    fn mix<E: Emitter>(&self, alloc: &mut Allocator<E>, state: Vec<Value>, key: &Value) -> Result<Vec<Value>, AllocError> {
        let mut next = Vec::with_capacity(state.len());

        for index in 0..state.len() {
            let neighbour = &state[(index + 1) % state.len()];

            let lhs = state[index].get(alloc)?;
            let rhs = neighbour.get_operand(alloc)?;

            let out = alloc.new_value();
            let dst = out.reg(alloc)?;
            alloc.emit(VectorInstruction::Binary { operation: VectorOperation::Vpxor, dst, lhs, rhs })?;

            let key = key.get_operand(alloc)?;
            alloc.emit(VectorInstruction::Binary { operation: VectorOperation::Vpaddd, dst, lhs: dst, rhs: key })?;

            next.push(out);
        }

        for value in state {
            value.free(alloc)?;
        }

        Ok(next)
    }

    fn fold<E: Emitter>(&self, alloc: &mut Allocator<E>, state: Vec<Value>) -> Result<Option<Value>, AllocError> {
        let mut values = state.into_iter();
        let Some(accumulator) = values.next() else {
            debug!("Geen invoer, er valt niets te combineren");
            return Ok(None);
        };

        for value in values {
            let dst = accumulator.get(alloc)?;
            let rhs = value.consume_operand(alloc)?;
            alloc.emit(VectorInstruction::Binary { operation: VectorOperation::Vpxor, dst, lhs: dst, rhs })?;
        }

        Ok(Some(accumulator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use pretty_assertions::assert_eq;

    use genasm::{XMM, YMM, ZMM};

    fn generate(kernel: MixingKernel) -> (Vec<VectorInstruction>, usize) {
        let mut alloc = kernel.new_allocator(Vec::new());
        kernel.generate(&mut alloc).unwrap();

        let spills = alloc.spill_count();
        assert!(alloc.leak_report().is_empty());
        (alloc.into_emitter(), spills)
    }

    #[rstest]
    #[case(XMM)]
    #[case(YMM)]
    #[case(ZMM)]
    fn ends_with_store_to_output(#[case] register_set: RegisterSet) {
        let (instructions, _) = generate(MixingKernel { register_set, inputs: 4, rounds: 2 });

        let store = instructions.iter().rev().find(|instruction| !instruction.is_virtual());
        assert!(matches!(
            store,
            Some(VectorInstruction::StoreUnaligned { dst, .. }) if *dst == MemoryOperand::new(GeneralRegister::Rdi)
        ));
    }

    #[test]
    fn no_spills_with_enough_registers() {
        let (instructions, spills) = generate(MixingKernel { register_set: ZMM, inputs: 4, rounds: 3 });

        assert_eq!(spills, 0);
        assert!(!instructions.iter().any(|instruction| matches!(instruction, VectorInstruction::StoreAligned { .. })));
    }

    #[test]
    fn spills_under_pressure() {
        let (instructions, spills) = generate(MixingKernel { register_set: YMM.limited_to(MIN_REGISTERS), inputs: 8, rounds: 2 });

        assert!(spills > 0);
        let register_limit = MIN_REGISTERS;
        for instruction in &instructions {
            if let VectorInstruction::Binary { dst, lhs, .. } = instruction {
                assert!(dst.index() < register_limit);
                assert!(lhs.index() < register_limit);
            }
        }
    }

    #[test]
    fn one_broadcast_per_round_without_pressure() {
        let (instructions, _) = generate(MixingKernel { register_set: ZMM, inputs: 3, rounds: 5 });

        let broadcasts: Vec<_> = instructions.iter()
            .filter_map(|instruction| match instruction {
                VectorInstruction::Broadcast { src, .. } => Some(src.displacement()),
                _ => None,
            })
            .collect();

        assert_eq!(broadcasts, vec![0, 4, 8, 12, 16]);
    }

    #[test]
    fn no_inputs_emits_only_stats() {
        let (instructions, _) = generate(MixingKernel { register_set: XMM, inputs: 0, rounds: 1 });

        assert!(instructions.iter().all(|instruction| instruction.is_virtual()));
        assert_eq!(instructions.len(), 4);
    }
}

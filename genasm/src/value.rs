// Copyright (C) 2025 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::fmt::Display;

use log::trace;

use crate::{AllocError, Allocator, Emitter, MemoryOperand, Operand, VectorInstruction, VectorRegister};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ValueId(pub(crate) u64);

impl ValueId {
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Display for ValueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Where the data of a value currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueState {
    /// Nothing has been written to the value yet.
    Empty,

    /// The data still resides at `source` and is loaded on first use,
    /// replicated across all lanes when `broadcast` is set.
    Lazy {
        source: MemoryOperand,
        broadcast: bool,
    },

    Live {
        register: VectorRegister,
    },

    Spilled {
        slot: usize,
        location: MemoryOperand,
        aligned: bool,
    },
}

impl ValueState {
    #[must_use]
    pub const fn is_live(&self) -> bool {
        matches!(self, Self::Live { .. })
    }

    #[must_use]
    pub const fn register(&self) -> Option<VectorRegister> {
        match self {
            Self::Live { register } => Some(*register),
            _ => None,
        }
    }

    /// The concrete location of the data, if there is one.
    #[must_use]
    pub const fn location(&self) -> Option<Operand> {
        match self {
            Self::Empty => None,
            Self::Lazy { .. } => None,
            Self::Live { register } => Some(Operand::Register(*register)),
            Self::Spilled { location, .. } => Some(Operand::Memory(*location)),
        }
    }
}

impl Display for ValueState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Lazy { source, broadcast: false } => write!(f, "Lazy({source})"),
            Self::Lazy { source, broadcast: true } => write!(f, "Lazy(broadcast {source})"),
            Self::Live { register } => write!(f, "Live({register})"),
            Self::Spilled { slot, .. } => write!(f, "Spilled({slot})"),
        }
    }
}

/// A handle to a value tracked by an [`Allocator`].
///
/// Values are not [`Clone`]: [`Value::consume`] and [`Value::free`] take the
/// handle, so a released value cannot be used again.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "values must be consumed or freed, otherwise they are leaked"]
pub struct Value {
    id: ValueId,
}

impl Value {
    pub(crate) const fn new(id: ValueId) -> Self {
        Self { id }
    }

    #[must_use]
    pub const fn id(&self) -> ValueId {
        self.id
    }

    /// The current state, or [`None`] if the allocator doesn't know this value.
    #[must_use]
    pub fn state<E: Emitter>(&self, alloc: &Allocator<E>) -> Option<ValueState> {
        alloc.state_of(self.id)
    }

    #[must_use]
    pub fn has_register<E: Emitter>(&self, alloc: &Allocator<E>) -> bool {
        self.state(alloc).is_some_and(|state| state.is_live())
    }

    /// Returns the register for the value. If the value is not live yet, a
    /// register is assigned and the data is loaded into it.
    pub fn get<E: Emitter>(&self, alloc: &mut Allocator<E>) -> Result<VectorRegister, AllocError> {
        match alloc.touch(self.id)? {
            ValueState::Live { register } => Ok(register),

            state => {
                let register = alloc.assign_register(self.id)?;
                if let Some(load) = materialize(state, register) {
                    alloc.emit(load)?;
                }
                Ok(register)
            }
        }
    }

    /// Returns where the value can be read from. Memory operands are returned
    /// as-is, except for broadcasts, which only exist as a register-producing
    /// instruction.
    pub fn get_operand<E: Emitter>(&self, alloc: &mut Allocator<E>) -> Result<Operand, AllocError> {
        match alloc.touch(self.id)? {
            ValueState::Empty => {
                alloc.assign_register(self.id).map(Operand::Register)
            }

            ValueState::Lazy { source, broadcast: false } => {
                Ok(Operand::Memory(source))
            }

            ValueState::Lazy { source, broadcast: true } => {
                let register = alloc.assign_register(self.id)?;
                alloc.emit(VectorInstruction::Broadcast { dst: register, src: source })?;
                Ok(Operand::Register(register))
            }

            state @ ValueState::Live { .. } | state @ ValueState::Spilled { .. } => {
                state.location().ok_or(AllocError::NoLocation { value: self.id, state })
            }
        }
    }

    /// Reads the value via [`Value::get`] and releases it.
    pub fn consume<E: Emitter>(self, alloc: &mut Allocator<E>) -> Result<VectorRegister, AllocError> {
        let register = self.get(alloc)?;
        self.free(alloc)?;
        Ok(register)
    }

    /// Reads the value via [`Value::get_operand`] and releases it.
    pub fn consume_operand<E: Emitter>(self, alloc: &mut Allocator<E>) -> Result<Operand, AllocError> {
        let operand = self.get_operand(alloc)?;
        self.free(alloc)?;
        Ok(operand)
    }

    /// Returns a register for the value without loading anything into it, for
    /// when the value is the destination of the next instruction. Whatever
    /// the value held before is discarded.
    pub fn reg<E: Emitter>(&self, alloc: &mut Allocator<E>) -> Result<VectorRegister, AllocError> {
        match alloc.touch(self.id)? {
            ValueState::Live { register } => Ok(register),
            _ => alloc.assign_register(self.id),
        }
    }

    /// Binds the value to register `index`.
    ///
    /// If the register is free, the value is only bound to it and its previous
    /// contents are not carried over. If another value occupies the register,
    /// that value is moved out of the way and the data of this value is moved
    /// or loaded into the register in its place.
    pub fn become_register<E: Emitter>(&self, alloc: &mut Allocator<E>, index: usize) -> Result<VectorRegister, AllocError> {
        let target = alloc.register_set().register(index)
            .ok_or(AllocError::RegisterOutOfRange { index, count: alloc.register_set().count() })?;

        let state = alloc.touch(self.id)?;
        if state.register() == Some(target) {
            return Ok(target);
        }

        if let Some(occupant) = alloc.holder_of(target) {
            trace!("Register {target} is bezet door {occupant}, die maakt plaats voor {}", self.id);
            let destination = alloc.allocate_spill_slot();
            alloc.displace_to(occupant, destination)?;

            if let Some(instruction) = materialize(state, target) {
                alloc.emit(instruction)?;
            }
        }

        alloc.set_state(self.id, ValueState::Live { register: target })?;
        Ok(target)
    }

    /// Releases the value, returning its register or stack slot to the
    /// allocator.
    pub fn free<E: Emitter>(self, alloc: &mut Allocator<E>) -> Result<(), AllocError> {
        alloc.free_value(self.id)
    }
}

/// The instruction that brings data in `state` into `dst`, if there is any.
fn materialize(state: ValueState, dst: VectorRegister) -> Option<VectorInstruction> {
    match state {
        ValueState::Empty => None,

        ValueState::Lazy { source, broadcast: true } => Some(VectorInstruction::Broadcast { dst, src: source }),
        ValueState::Lazy { source, broadcast: false } => Some(VectorInstruction::LoadUnaligned { dst, src: source }),

        ValueState::Live { register } if register == dst => None,
        ValueState::Live { register } => Some(VectorInstruction::Move { dst, src: register }),

        ValueState::Spilled { location, aligned: true, .. } => Some(VectorInstruction::LoadAligned { dst, src: location }),
        ValueState::Spilled { location, aligned: false, .. } => Some(VectorInstruction::LoadUnaligned { dst, src: location }),
    }
}

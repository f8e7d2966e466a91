// Copyright (C) 2025 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::{collections::BTreeMap, fmt::Display, panic::Location};

use log::{debug, trace, warn};

use crate::{
    pool::IdPool,
    AllocError,
    AllocatorStats,
    Emitter,
    MemoryOperand,
    RegisterSet,
    StatsRegion,
    Value,
    ValueId,
    ValueState,
    VectorInstruction,
    VectorRegister,
};

/// Schedules values onto the vector registers of one [`RegisterSet`], spilling
/// to the stack when they run out.
///
/// One allocator is used per generated function. It is driven serially by the
/// code generator; nothing in here is meant to be shared between threads.
#[derive(Debug)]
pub struct Allocator<E: Emitter> {
    emitter: E,
    register_set: RegisterSet,
    clock: u64,
    registers: IdPool,
    stack: IdPool,
    stack_base: MemoryOperand,
    span: usize,
    spill_count: usize,
    high_water_slot: Option<usize>,
    values: BTreeMap<ValueId, TrackedValue>,
}

#[derive(Debug, Clone, Copy)]
struct TrackedValue {
    age: u64,
    state: ValueState,
    origin: &'static Location<'static>,
}

impl<E: Emitter> Allocator<E> {
    /// Creates an allocator whose spill slots start at `stack_base`, each slot
    /// as wide as a register of `register_set`.
    #[must_use]
    pub fn new(emitter: E, register_set: RegisterSet, stack_base: MemoryOperand) -> Self {
        Self {
            emitter,
            register_set,
            clock: 0,
            registers: IdPool::bounded(register_set.count()),
            stack: IdPool::unbounded(),
            stack_base,
            span: register_set.span_bytes(),
            spill_count: 0,
            high_water_slot: None,
            values: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn register_set(&self) -> RegisterSet {
        self.register_set
    }

    #[must_use]
    pub fn emitter(&self) -> &E {
        &self.emitter
    }

    /// Returns the backend, reporting any values that were never released.
    #[must_use]
    pub fn into_emitter(self) -> E {
        _ = self.leak_report();
        self.emitter
    }

    /// Emits an instruction of the code generator itself, interleaved with the
    /// loads and spills of the allocator.
    pub fn emit(&mut self, instruction: VectorInstruction) -> Result<(), AllocError> {
        self.emitter.emit(instruction)?;
        Ok(())
    }

    #[track_caller]
    pub fn new_value(&mut self) -> Value {
        self.track(ValueState::Empty)
    }

    /// Creates a value that is loaded from `source` when first used.
    #[track_caller]
    pub fn new_value_from(&mut self, source: MemoryOperand) -> Value {
        self.track(ValueState::Lazy { source, broadcast: false })
    }

    /// Creates a value whose lanes are all loaded with the element at `source`
    /// when first used.
    #[track_caller]
    pub fn new_value_broadcast_from(&mut self, source: MemoryOperand) -> Value {
        self.track(ValueState::Lazy { source, broadcast: true })
    }

    #[track_caller]
    pub fn new_values(&mut self, count: usize) -> Vec<Value> {
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.new_value());
        }
        values
    }

    /// Creates `count` broadcast values for consecutive elements of
    /// `element_bits` each, starting at `source`.
    #[track_caller]
    pub fn new_values_broadcast_from(&mut self, count: usize, source: MemoryOperand, element_bits: usize) -> Vec<Value> {
        let element_size = element_bits / 8;

        let mut values = Vec::with_capacity(count);
        for index in 0..count {
            values.push(self.new_value_broadcast_from(source.offset((index * element_size) as i32)));
        }
        values
    }

    /// Returns a register that is currently free, without claiming it.
    ///
    /// The register is claimed and immediately released again, which is only
    /// sound because nothing can run in between: the allocator is exclusively
    /// borrowed for the whole call.
    #[must_use]
    pub fn free_register_probe(&mut self) -> Option<usize> {
        let register = self.registers.allocate()?;
        self.registers.release(register);
        Some(register)
    }

    /// Reports every value that is still tracked, i.e. was never consumed or
    /// freed.
    pub fn leak_report(&self) -> Vec<LeakedValue> {
        let leaks: Vec<LeakedValue> = self.values.iter()
            .map(|(id, value)| LeakedValue {
                id: *id,
                state: value.state,
                origin: value.origin,
            })
            .collect();

        for leak in &leaks {
            warn!("{leak}");
        }

        leaks
    }

    #[must_use]
    pub fn snapshot(&self) -> AllocatorStats {
        AllocatorStats {
            free_registers: self.register_set.count() - self.registers.allocated_count(),
            total_registers: self.register_set.count(),
            tracked_values: self.values.len(),
            spills: self.spill_count,
            slots: self.high_water_slot.map_or(0, |slot| slot + 1),
        }
    }

    /// Emits the current allocation statistics as a comment, and returns the
    /// region that emits the closing statistics when finished.
    pub fn stats(&mut self, label: impl Into<String>) -> Result<StatsRegion, AllocError> {
        let region = StatsRegion::new(label.into());
        region.report(self, "in")?;
        Ok(region)
    }

    #[must_use]
    pub fn tracked_values(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn spill_count(&self) -> usize {
        self.spill_count
    }

    /// The highest stack slot that was ever used.
    #[must_use]
    pub fn high_water_slot(&self) -> Option<usize> {
        self.high_water_slot
    }

    /// The size of the stack area the spill slots occupy.
    #[must_use]
    pub fn spill_area_size(&self) -> usize {
        self.snapshot().slots * self.span
    }
}

impl<E: Emitter> Allocator<E> {
    #[track_caller]
    fn track(&mut self, state: ValueState) -> Value {
        let id = ValueId(self.tick());
        let origin = Location::caller();

        trace!("Nieuwe waarde {id} ({state}) aangemaakt op {origin}");

        self.values.insert(id, TrackedValue {
            age: id.0,
            state,
            origin,
        });

        Value::new(id)
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn tracked(&self, id: ValueId) -> Result<&TrackedValue, AllocError> {
        self.values.get(&id).ok_or(AllocError::UnknownValue(id))
    }

    fn tracked_mut(&mut self, id: ValueId) -> Result<&mut TrackedValue, AllocError> {
        self.values.get_mut(&id).ok_or(AllocError::UnknownValue(id))
    }

    #[must_use]
    pub(crate) fn state_of(&self, id: ValueId) -> Option<ValueState> {
        self.values.get(&id).map(|value| value.state)
    }

    /// Marks the value as the most recently used, and returns its state.
    pub(crate) fn touch(&mut self, id: ValueId) -> Result<ValueState, AllocError> {
        let age = self.tick();
        let value = self.tracked_mut(id)?;
        value.age = age;
        Ok(value.state)
    }

    /// The live value holding `register`, if any.
    #[must_use]
    pub(crate) fn holder_of(&self, register: VectorRegister) -> Option<ValueId> {
        self.values.iter()
            .find(|(_, value)| value.state.register() == Some(register))
            .map(|(id, _)| *id)
    }

    /// Takes a free register, or evicts the least recently used live value
    /// (never `excluding`) and hands its register over.
    pub(crate) fn allocate_register(&mut self, excluding: ValueId) -> Result<usize, AllocError> {
        if let Some(register) = self.registers.allocate() {
            return Ok(register);
        }

        let Some((victim, register)) = self.find_oldest_live(excluding) else {
            return Err(AllocError::Unschedulable {
                class: self.register_set.class(),
                count: self.register_set.count(),
            });
        };

        let destination = self.allocate_spill_slot();
        debug!("Register {register} wordt vrijgemaakt voor {excluding}: {victim} gaat naar {destination}");

        self.emit_displacement(register, destination)?;

        // The register stays claimed, it goes straight from the victim to the
        // caller. The destination was claimed by `allocate_spill_slot`.
        self.tracked_mut(victim)?.state = destination;

        Ok(register.index())
    }

    /// Finds a place for a value that has to leave its register: a free
    /// register if there is one, a stack slot otherwise.
    pub(crate) fn allocate_spill_slot(&mut self) -> ValueState {
        if let Some(index) = self.registers.allocate() {
            return ValueState::Live {
                register: self.register_at(index),
            };
        }

        let slot = self.stack.allocate_growing();
        self.spill_count += 1;
        self.high_water_slot = self.high_water_slot.max(Some(slot));

        ValueState::Spilled {
            slot,
            location: self.stack_base.offset((slot * self.span) as i32),
            aligned: true,
        }
    }

    /// Assigns a register to the value, evicting another value if needed. No
    /// data is moved into it.
    pub(crate) fn assign_register(&mut self, id: ValueId) -> Result<VectorRegister, AllocError> {
        let index = self.allocate_register(id)?;
        let register = self.register_at(index);
        self.set_state(id, ValueState::Live { register })?;
        Ok(register)
    }

    /// Moves the live value to `destination`.
    pub(crate) fn displace_to(&mut self, id: ValueId, destination: ValueState) -> Result<(), AllocError> {
        let state = self.tracked(id)?.state;
        let Some(register) = state.register() else {
            return Err(AllocError::NoLocation { value: id, state });
        };

        self.emit_displacement(register, destination)?;
        self.set_state(id, destination)
    }

    /// Replaces the state of the value, returning the register or slot it held
    /// to its pool and claiming the one of the new state.
    pub(crate) fn set_state(&mut self, id: ValueId, state: ValueState) -> Result<(), AllocError> {
        let previous = self.tracked(id)?.state;
        self.release_location(previous);
        self.claim_location(state);

        trace!("Waarde {id}: {previous} -> {state}");
        self.tracked_mut(id)?.state = state;
        Ok(())
    }

    pub(crate) fn free_value(&mut self, id: ValueId) -> Result<(), AllocError> {
        let value = self.values.remove(&id).ok_or(AllocError::UnknownValue(id))?;
        self.release_location(value.state);

        trace!("Waarde {id} ({}) is vrijgegeven", value.state);
        Ok(())
    }

    fn emit_displacement(&mut self, register: VectorRegister, destination: ValueState) -> Result<(), AllocError> {
        let instruction = match destination {
            ValueState::Live { register: dst } => VectorInstruction::Move { dst, src: register },
            ValueState::Spilled { location, aligned: true, .. } => VectorInstruction::StoreAligned { dst: location, src: register },
            ValueState::Spilled { location, aligned: false, .. } => VectorInstruction::StoreUnaligned { dst: location, src: register },

            ValueState::Empty | ValueState::Lazy { .. } => {
                unreachable!("Kan niet verplaatsen naar een toestand zonder locatie: {destination}")
            }
        };

        self.emit(instruction)
    }

    fn find_oldest_live(&self, excluding: ValueId) -> Option<(ValueId, VectorRegister)> {
        self.values.iter()
            .filter(|(id, _)| **id != excluding)
            .filter_map(|(id, value)| Some((*id, value.age, value.state.register()?)))
            .min_by_key(|(_, age, _)| *age)
            .map(|(id, _, register)| (id, register))
    }

    fn release_location(&mut self, state: ValueState) {
        match state {
            ValueState::Live { register } => self.registers.release(register.index()),
            ValueState::Spilled { slot, .. } => self.stack.release(slot),
            ValueState::Empty | ValueState::Lazy { .. } => (),
        }
    }

    fn claim_location(&mut self, state: ValueState) {
        match state {
            ValueState::Live { register } => self.registers.mark(register.index()),
            ValueState::Spilled { slot, .. } => self.stack.mark(slot),
            ValueState::Empty | ValueState::Lazy { .. } => (),
        }
    }

    fn register_at(&self, index: usize) -> VectorRegister {
        self.register_set.registers()[index]
    }
}

/// A value that was still tracked when the allocator was torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeakedValue {
    pub id: ValueId,
    pub state: ValueState,
    pub origin: &'static Location<'static>,
}

impl Display for LeakedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "leaked value {} ({}), created at {}", self.id, self.state, self.origin)
    }
}

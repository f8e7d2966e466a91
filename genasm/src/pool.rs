// Copyright (C) 2025 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

const WORD_BITS: usize = u64::BITS as usize;

/// A set of small integer ids, always handing out the lowest free one.
///
/// A bounded pool (registers) never grows past its capacity, an unbounded
/// pool (stack slots) grows on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IdPool {
    words: Vec<u64>,
    capacity: Option<usize>,
    allocated: usize,
}

impl IdPool {
    #[must_use]
    pub fn bounded(capacity: usize) -> Self {
        Self {
            words: vec![0; capacity.div_ceil(WORD_BITS)],
            capacity: Some(capacity),
            allocated: 0,
        }
    }

    #[must_use]
    pub fn unbounded() -> Self {
        Self {
            words: Vec::new(),
            capacity: None,
            allocated: 0,
        }
    }

    #[must_use]
    pub fn allocate(&mut self) -> Option<usize> {
        let id = self.lowest_free()?;
        self.mark(id);
        Some(id)
    }

    /// Allocates from a pool without capacity, which can never run out.
    #[must_use]
    pub fn allocate_growing(&mut self) -> usize {
        debug_assert!(self.capacity.is_none(), "een begrensde pool kan niet groeien");

        let id = self.first_unset();
        self.mark(id);
        id
    }

    pub fn release(&mut self, id: usize) {
        debug_assert!(self.is_allocated(id), "id {id} is niet in gebruik");

        let (word, bit) = position(id);
        if let Some(word) = self.words.get_mut(word) {
            if *word & bit != 0 {
                *word &= !bit;
                self.allocated -= 1;
            }
        }
    }

    pub fn mark(&mut self, id: usize) {
        if let Some(capacity) = self.capacity {
            debug_assert!(id < capacity, "id {id} valt buiten de pool van {capacity}");
        }

        let (word, bit) = position(id);
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }

        if self.words[word] & bit == 0 {
            self.words[word] |= bit;
            self.allocated += 1;
        }
    }

    #[must_use]
    pub fn is_allocated(&self, id: usize) -> bool {
        let (word, bit) = position(id);
        self.words.get(word).is_some_and(|word| word & bit != 0)
    }

    #[must_use]
    pub fn allocated_count(&self) -> usize {
        self.allocated
    }

    fn lowest_free(&self) -> Option<usize> {
        let candidate = self.first_unset();

        match self.capacity {
            Some(capacity) if candidate >= capacity => None,
            _ => Some(candidate),
        }
    }

    fn first_unset(&self) -> usize {
        self.words.iter()
            .enumerate()
            .find(|(_, word)| **word != u64::MAX)
            .map(|(index, word)| index * WORD_BITS + word.trailing_ones() as usize)
            .unwrap_or(self.words.len() * WORD_BITS)
    }
}

#[must_use]
const fn position(id: usize) -> (usize, u64) {
    (id / WORD_BITS, 1u64 << (id % WORD_BITS))
}

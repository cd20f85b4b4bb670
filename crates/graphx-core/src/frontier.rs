// Copyright The GraphX Authors
// Use of this source code is governed by an MIT OR Apache-2.0 license
// that can be found in the LICENSE file.

//! The frontier: a polymorphic node container, tagged by kind, that backs
//! level-synchronous graph traversal. Only [`FrontierKind::Queue`] is
//! implemented; the others are declarable (the ISA and the VM both accept
//! them) but every operation on them fails until a hardware backend defines
//! their semantics.

use remain::sorted;
use thiserror::Error;

/// Ring-buffer capacity; a power of two so head/back can be masked instead of
/// using modulo, and so `back - front == CAPACITY` unambiguously means full.
pub const CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontierKind {
    Queue,
    PriorityQueue,
    BucketQueue,
    Set,
}

#[sorted]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontierError {
    #[error("frontier is empty")]
    Empty,
    #[error("frontier is full")]
    Full,
    #[error("frontier kind {kind:?} is reserved but not yet implemented")]
    Unsupported { kind: FrontierKind },
}

/// A single FIFO ring buffer of node ids, plus the kind tag the reserved
/// (not-yet-implemented) container kinds need to carry even while unusable.
#[derive(Debug, Clone)]
pub struct Frontier {
    kind: FrontierKind,
    buffer: Box<[i32; CAPACITY]>,
    /// Monotonically increasing; never wraps within a VM's lifetime at this
    /// capacity and instruction budget, so `front`/`back` need no modular
    /// arithmetic beyond the mask applied at buffer-index time.
    front: u64,
    back: u64,
}

impl Frontier {
    pub fn new(kind: FrontierKind) -> Self {
        Frontier {
            kind,
            buffer: Box::new([0; CAPACITY]),
            front: 0,
            back: 0,
        }
    }

    pub fn kind(&self) -> FrontierKind {
        self.kind
    }

    /// Resets to empty, recording `kind`. Does not reallocate the backing
    /// buffer; its stale contents are simply made unreachable by the
    /// front/back reset.
    pub fn init(&mut self, kind: FrontierKind) {
        self.kind = kind;
        self.front = 0;
        self.back = 0;
    }

    fn require_queue(&self) -> Result<(), FrontierError> {
        match self.kind {
            FrontierKind::Queue => Ok(()),
            kind => Err(FrontierError::Unsupported { kind }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.front == self.back
    }

    fn is_full(&self) -> bool {
        self.back - self.front == CAPACITY as u64
    }

    pub fn push(&mut self, node: i32) -> Result<(), FrontierError> {
        self.require_queue()?;
        if self.is_full() {
            return Err(FrontierError::Full);
        }
        let slot = (self.back as usize) & (CAPACITY - 1);
        self.buffer[slot] = node;
        self.back += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Result<i32, FrontierError> {
        self.require_queue()?;
        if self.is_empty() {
            return Err(FrontierError::Empty);
        }
        let slot = (self.front as usize) & (CAPACITY - 1);
        let value = self.buffer[slot];
        self.front += 1;
        Ok(value)
    }
}

/// The VM's double-buffered frontier pair: `current` is drained by `FPOP`,
/// `next` is filled by `FPUSH`, and `FSWAP` exchanges their roles without
/// moving any data.
#[derive(Debug, Clone)]
pub struct FrontierPair {
    current: Frontier,
    next: Frontier,
}

impl FrontierPair {
    pub fn new(kind: FrontierKind) -> Self {
        FrontierPair {
            current: Frontier::new(kind),
            next: Frontier::new(kind),
        }
    }

    pub fn reset(&mut self, kind: FrontierKind) {
        self.current.init(kind);
        self.next.init(kind);
    }

    pub fn current(&self) -> &Frontier {
        &self.current
    }

    pub fn push_next(&mut self, node: i32) -> Result<(), FrontierError> {
        self.next.push(node)
    }

    /// Pushes directly into `current`, bypassing the producer/consumer
    /// convention `FPUSH`/`FPOP`/`FSWAP` otherwise maintain. Used by `FFILL`,
    /// which seeds a traversal with every node id before the first `FSWAP`.
    pub fn push_current(&mut self, node: i32) -> Result<(), FrontierError> {
        self.current.push(node)
    }

    pub fn pop_current(&mut self) -> Result<i32, FrontierError> {
        self.current.pop()
    }

    pub fn current_is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// Exchanges `current` and `next`, then re-initializes the freshly-swapped
    /// `next` to empty of the same kind it already had.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.current, &mut self.next);
        let kind = self.next.kind();
        self.next.init(kind);
    }
}

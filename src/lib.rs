//! A deferred-call queue: a resizable ring buffer of `(callback, arguments)`
//! pairs, executed strictly in FIFO order on demand.
//!
//! The queue is an embeddable primitive for cooperative scheduling inside a
//! single thread of control: producers [`push`](Queue::push) calls, a driver
//! loop [`dequeue`](Queue::dequeue)s them, and [`QueueRef::set_timeout`]
//! builds delay-based rescheduling out of nothing but those two operations.
//!
//! ```
//! use cqueue::{Arg, GrowthMode, Queue};
//!
//! fn greet(_q: &mut Queue, args: &[Arg]) -> i32 {
//!     assert_eq!(args[0].as_str(), Some("User"));
//!     0
//! }
//!
//! let mut q = Queue::new(3, GrowthMode::Static).unwrap();
//! q.push(greet, &[Arg::from("User")]).unwrap();
//! assert_eq!(q.len(), 1);
//! q.dequeue().unwrap();
//! assert!(q.is_empty());
//! ```
//!
//! There is no internal locking: the only guarded hazard is *same-thread
//! reentrancy*, a callback calling back into the queue that is executing it.
//! Pushes from inside a callback are fine; a reentrant dequeue or
//! capacity operation fails with [`Error::Busy`].

#![deny(missing_debug_implementations)]

use core::mem;
use core::mem::size_of;
use std::rc::Rc;

mod arg;
mod bulk;
mod capacity;
mod slot;
mod timer;
mod util;

pub use arg::Arg;
pub use arg::Callback;
pub use timer::Clock;
pub use timer::QueueRef;
pub use timer::StdClock;
pub use timer::Tick;

use slot::Slot;
use slot::DEFAULT_ARG_CAPACITY;
use slot::MAX_ARG_CAPACITY;
use slot::MIN_ARG_CAPACITY;

/// Smallest allowed queue capacity.
pub const MIN_CAPACITY: usize = 1;
/// Absolute queue capacity ceiling, the `Max` growth mode's limit.
pub const MAX_CAPACITY: usize = usize::MAX >> 1;

/// Queue errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A capacity, limit, delta, or count parameter is outside its range.
    #[error("capacity or count out of range")]
    CapacityOutOfRange,
    /// An argument count or argument capacity exceeds the per-slot ceiling.
    #[error("argument capacity out of range")]
    ArgOutOfRange,
    /// Allocation failed with the queue untouched.
    #[error("out of memory")]
    AllocFailed,
    /// Allocation failed partway and the queue rolled back to its previous
    /// capacity.
    #[error("out of memory, queue state restored")]
    AllocFailedButRestored,
    /// The queue is full and its capacity is static.
    #[error("static capacity overflow")]
    StaticOverflow,
    /// Growth would exceed the configured capacity limit.
    #[error("capacity limit overflow")]
    LimitOverflow,
    /// Growth would exceed the absolute capacity ceiling.
    #[error("absolute capacity overflow")]
    MaxOverflow,
    /// The requested resize would not change the capacity.
    #[error("capacity would not change")]
    CapacityUnchanged,
    /// Shrinking would drop engaged calls and clamping was not permitted.
    #[error("engaged calls do not fit in the new capacity")]
    EngagedCellsDoNotFit,
    /// A new capacity limit is below the current capacity.
    #[error("capacity does not fit in the new limit")]
    LimitBelowCapacity,
    /// Nothing to dequeue.
    #[error("queue is empty")]
    Empty,
    /// The queue is already executing a call (reentrancy guard).
    #[error("queue is busy")]
    Busy,
    /// The variable argument list was empty where one is required.
    #[error("empty variable argument list")]
    VarArgsMismatch,
    /// An engaged call's arguments would not survive the requested
    /// argument-capacity change.
    #[error("engaged arguments would be truncated")]
    ArgsInUse,
    /// The default argument capacity already has the requested value.
    #[error("argument capacity is unchanged")]
    SameArgCapacity,
    /// A count exceeds the calls actually available.
    #[error("count exceeds available calls")]
    CountExceedsAvailable,
}

/// Fill status of the ring.
///
/// `read == write` is ambiguous on its own; the status disambiguates the
/// completely-empty and completely-full cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Empty,
    Stable,
    Full,
}

/// Capacity growth policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthMode {
    /// Capacity never changes after init; a push into a full queue fails.
    Static,
    /// Capacity may grow up to the contained limit.
    Limit(usize),
    /// Capacity may grow up to [`MAX_CAPACITY`].
    Max,
}

/// Aggregate snapshot of a queue's state, all pure reads.
#[derive(Debug, Clone)]
pub struct QueueInfo {
    pub status: Status,
    pub len: usize,
    pub capacity: usize,
    pub capacity_bytes: usize,
    pub growth_mode: GrowthMode,
}

/// The deferred-call queue.
#[derive(Debug)]
pub struct Queue {
    pub(crate) slots: Vec<Slot>,
    pub(crate) read: usize,
    pub(crate) write: usize,
    pub(crate) status: Status,
    pub(crate) mode: GrowthMode,
    pub(crate) increment: usize,
    pub(crate) default_arg_capacity: usize,
    pub(crate) busy: bool,
    pub(crate) clock: Rc<dyn Clock>,
}

impl Queue {
    /// Creates a queue with `capacity` slots and the default per-slot
    /// argument capacity.
    pub fn new(capacity: usize, mode: GrowthMode) -> Result<Queue, Error> {
        Queue::with_arg_capacity(capacity, mode, DEFAULT_ARG_CAPACITY)
    }

    /// Creates a queue whose slots each start with room for `arg_capacity`
    /// arguments.
    pub fn with_arg_capacity(
        capacity: usize,
        mode: GrowthMode,
        arg_capacity: usize,
    ) -> Result<Queue, Error> {
        if !(MIN_CAPACITY..=MAX_CAPACITY).contains(&capacity) {
            return Err(Error::CapacityOutOfRange);
        }
        if !(MIN_ARG_CAPACITY..=MAX_ARG_CAPACITY).contains(&arg_capacity) {
            return Err(Error::ArgOutOfRange);
        }
        if let GrowthMode::Limit(limit) = mode {
            if limit > MAX_CAPACITY {
                return Err(Error::CapacityOutOfRange);
            }
            if limit < capacity {
                return Err(Error::LimitBelowCapacity);
            }
        }

        let slots = slot::make_slots(capacity, arg_capacity)?;
        Ok(Queue {
            slots,
            read: 0,
            write: 0,
            status: Status::Empty,
            mode,
            increment: capacity::INIT_INCREMENT,
            default_arg_capacity: arg_capacity,
            busy: false,
            clock: Rc::new(StdClock::new()),
        })
    }

    /// Replaces the tick source used for deadline comparisons.
    pub fn set_clock(&mut self, clock: Rc<dyn Clock>) {
        self.clock = clock;
    }

    /// Current tick count of the queue's clock.
    pub fn now(&self) -> Tick {
        self.clock.now()
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        &*self.clock
    }

    //// enqueue family ////

    /// Enqueues `func` with a static argument list followed by a variable
    /// one; either may be empty. Grows the queue automatically when full.
    pub fn push_with(
        &mut self,
        func: Callback,
        static_args: &[Arg],
        var_args: &[Arg],
    ) -> Result<(), Error> {
        self.push_raw(func, static_args, var_args)
    }

    /// Enqueues `func` with a runtime-built argument list. The list must be
    /// non-empty; zero-argument calls go through [`push_void`](Queue::push_void).
    pub fn push(&mut self, func: Callback, var_args: &[Arg]) -> Result<(), Error> {
        if var_args.is_empty() {
            return Err(Error::VarArgsMismatch);
        }
        self.push_raw(func, &[], var_args)
    }

    /// Enqueues a zero-argument call.
    pub fn push_void(&mut self, func: Callback) -> Result<(), Error> {
        self.push_raw(func, &[], &[])
    }

    pub(crate) fn push_raw(
        &mut self,
        func: Callback,
        static_args: &[Arg],
        var_args: &[Arg],
    ) -> Result<(), Error> {
        if self.status == Status::Full {
            self.grow_inner(0, true)?;
        }

        let count = static_args.len() + var_args.len();
        let write = self.write;
        let slot = &mut self.slots[write];
        slot.prepare(count)?;
        slot.args.extend_from_slice(static_args);
        slot.args.extend_from_slice(var_args);
        slot.func = Some(func);

        self.write = (write + 1) % self.capacity();
        self.status = if self.write == self.read {
            Status::Full
        } else {
            Status::Stable
        };
        Ok(())
    }

    //// dequeue ////

    /// Executes the oldest engaged call and returns its return code.
    ///
    /// The busy flag is held for the duration of the callback; the callback
    /// receives this queue and may push into it freely, while reentrant
    /// dequeues and capacity operations fail with [`Error::Busy`].
    pub fn dequeue(&mut self) -> Result<i32, Error> {
        if self.status == Status::Empty {
            return Err(Error::Empty);
        }
        if self.busy {
            return Err(Error::Busy);
        }

        let slot = &mut self.slots[self.read];
        debug_assert!(slot.func.is_some());
        let func = slot.func.take().ok_or(Error::Empty)?;
        // Move the arguments out: a push from inside the callback may grow
        // and reorder the slot array, so nothing may borrow it across the
        // call.
        let mut args = mem::take(&mut slot.args);

        self.busy = true;
        let rc = func(self, &args);
        self.busy = false;

        // Hand the argument storage back for reuse. A growth reorder leaves
        // the in-flight cell at the (updated) read cursor, so this lands in
        // the cell that was just executed.
        args.clear();
        self.slots[self.read].args = args;

        self.read = (self.read + 1) % self.capacity();
        self.status = if self.read == self.write {
            Status::Empty
        } else {
            Status::Stable
        };
        Ok(rc)
    }

    /// Discards every engaged call by resetting the cursors; slot storage
    /// is left in place to be overwritten by future pushes.
    pub fn clear(&mut self) -> Result<(), Error> {
        if self.busy {
            return Err(Error::Busy);
        }
        self.read = 0;
        self.write = 0;
        self.status = Status::Empty;
        Ok(())
    }

    //// argument capacity control ////

    /// Changes the argument capacity given to newly created slots.
    pub fn set_default_arg_capacity(&mut self, arg_capacity: usize) -> Result<(), Error> {
        if !(MIN_ARG_CAPACITY..=MAX_ARG_CAPACITY).contains(&arg_capacity) {
            return Err(Error::ArgOutOfRange);
        }
        if arg_capacity == self.default_arg_capacity {
            return Err(Error::SameArgCapacity);
        }
        self.default_arg_capacity = arg_capacity;
        Ok(())
    }

    /// Re-reserves every slot's argument storage at `arg_capacity`.
    ///
    /// Engaged slots keep their arguments; one whose argument count exceeds
    /// the new capacity fails the operation, or is left alone when
    /// `skip_unshrinkable` is set.
    pub fn equalize_arg_capacities(
        &mut self,
        arg_capacity: usize,
        skip_unshrinkable: bool,
    ) -> Result<(), Error> {
        if self.busy {
            return Err(Error::Busy);
        }
        if !(MIN_ARG_CAPACITY..=MAX_ARG_CAPACITY).contains(&arg_capacity) {
            return Err(Error::ArgOutOfRange);
        }

        let len = self.len();
        let capacity = self.capacity();

        let mut offset = self.read;
        for _ in 0..len {
            let slot = &mut self.slots[offset];
            if arg_capacity < slot.args.len() {
                if !skip_unshrinkable {
                    return Err(Error::ArgsInUse);
                }
            } else if slot.args.capacity() != arg_capacity {
                slot.set_arg_capacity(arg_capacity, true)?;
            }
            offset = (offset + 1) % capacity;
        }

        let mut offset = self.write % capacity;
        for _ in 0..capacity - len {
            let slot = &mut self.slots[offset];
            if slot.args.capacity() != arg_capacity {
                slot.set_arg_capacity(arg_capacity, false)?;
            }
            offset = (offset + 1) % capacity;
        }
        Ok(())
    }

    //// introspection ////

    /// Number of engaged (pushed, not yet executed) calls.
    pub fn len(&self) -> usize {
        if self.read < self.write {
            self.write - self.read
        } else if self.status == Status::Full || self.read > self.write {
            self.capacity() - self.read + self.write
        } else {
            0
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status == Status::Empty
    }

    pub fn is_full(&self) -> bool {
        self.status == Status::Full
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn growth_mode(&self) -> GrowthMode {
        self.mode
    }

    /// Total bytes held by the queue, its slot array, and every slot's
    /// argument storage.
    pub fn capacity_in_bytes(&self) -> usize {
        let mut bytes = size_of::<Queue>() + self.slots.capacity() * size_of::<Slot>();
        for slot in &self.slots {
            bytes += slot.arg_bytes();
        }
        bytes
    }

    pub fn info(&self) -> QueueInfo {
        QueueInfo {
            status: self.status,
            len: self.len(),
            capacity: self.capacity(),
            capacity_bytes: self.capacity_in_bytes(),
            growth_mode: self.mode,
        }
    }
}

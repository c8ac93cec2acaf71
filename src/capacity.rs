//! Capacity control: growing, shrinking, and the segment reordering that
//! keeps the engaged region contiguous from index 0 across a resize.
//!
//! The ring stores heap-owning slots, so a resize never throws storage
//! away. Normalization moves whole [`Slot`]s by swap, preserving every
//! slot's reserved argument storage wherever it ends up.

use core::mem;

use crate::slot;
use crate::slot::Slot;
use crate::util::max;
use crate::Error;
use crate::GrowthMode;
use crate::Queue;
use crate::Status;
use crate::MAX_CAPACITY;

/// Smallest automatic growth step.
pub(crate) const MIN_INCREMENT: usize = 1;
/// Growth step a fresh queue starts with.
pub(crate) const INIT_INCREMENT: usize = 8;
/// Ceiling the growth step saturates at.
pub(crate) const MAX_INCREMENT: usize = 16384;

impl Queue {
    /// Grows the queue by `delta` slots, or by the adaptive increment when
    /// `delta` is zero. With `align` set, a delta beyond the mode's
    /// remaining headroom is clamped to the headroom instead of failing.
    pub fn grow(&mut self, delta: usize, align: bool) -> Result<(), Error> {
        if self.busy {
            return Err(Error::Busy);
        }
        self.grow_inner(delta, align)
    }

    /// Shrinks the queue by `delta` slots, or down to the engaged region
    /// when `delta` is zero. With `align` set, a delta that would cut into
    /// engaged calls is clamped to the free space instead of failing.
    pub fn shrink(&mut self, delta: usize, align: bool) -> Result<(), Error> {
        if self.busy {
            return Err(Error::Busy);
        }
        self.shrink_inner(delta, align)
    }

    /// Resizes the queue to exactly `new_capacity` slots. With `align` set,
    /// a shrink below the engaged region clamps instead of failing.
    pub fn resize(&mut self, new_capacity: usize, align: bool) -> Result<(), Error> {
        if self.busy {
            return Err(Error::Busy);
        }
        let capacity = self.capacity();
        if new_capacity == capacity {
            return Err(Error::CapacityUnchanged);
        }
        if new_capacity > capacity {
            self.grow_inner(new_capacity - capacity, false)
        } else {
            self.shrink_inner(capacity - new_capacity, align)
        }
    }

    /// Replaces the growth policy.
    ///
    /// Shrinking into a new `Limit` below the current capacity fails with
    /// [`Error::LimitBelowCapacity`] unless `adapt_limit` is set, in which
    /// case the queue is shrunk (clamping to its engaged region) first.
    pub fn set_growth_mode(
        &mut self,
        mode: GrowthMode,
        adapt_limit: bool,
    ) -> Result<(), Error> {
        if self.busy {
            return Err(Error::Busy);
        }
        if let GrowthMode::Limit(limit) = mode {
            if !(crate::MIN_CAPACITY..=MAX_CAPACITY).contains(&limit) {
                return Err(Error::CapacityOutOfRange);
            }
            if limit < self.capacity() {
                if !adapt_limit {
                    return Err(Error::LimitBelowCapacity);
                }
                self.shrink_inner(self.capacity() - limit, true)?;
            }
        }
        self.mode = mode;
        Ok(())
    }

    pub(crate) fn grow_inner(&mut self, delta: usize, align: bool) -> Result<(), Error> {
        let capacity = self.capacity();

        let limit = match self.mode {
            GrowthMode::Static => return Err(Error::StaticOverflow),
            GrowthMode::Limit(limit) => limit,
            GrowthMode::Max => MAX_CAPACITY,
        };

        let generated = delta == 0;
        let mut delta = if generated { self.increment } else { delta };

        let headroom = limit - capacity;
        if delta > headroom {
            if headroom == 0 || !align {
                return Err(match self.mode {
                    GrowthMode::Limit(_) => Error::LimitOverflow,
                    _ => Error::MaxOverflow,
                });
            }
            delta = headroom;
        }

        self.normalize();

        // Build the new cells before committing: a failure here must leave
        // the queue exactly as it was, cursor parking included.
        match self.extend_slots(delta) {
            Ok(()) => {}
            Err(err) => {
                if self.write == capacity {
                    self.write = 0;
                }
                return Err(err);
            }
        }

        if generated {
            self.adapt_increment(headroom > capacity);
        }
        if self.status == Status::Full {
            self.status = Status::Stable;
        }
        Ok(())
    }

    fn extend_slots(&mut self, delta: usize) -> Result<(), Error> {
        let mut fresh = slot::make_slots(delta, self.default_arg_capacity)?;
        self.slots
            .try_reserve_exact(delta)
            .map_err(|_| Error::AllocFailedButRestored)?;
        self.slots.append(&mut fresh);
        Ok(())
    }

    pub(crate) fn shrink_inner(&mut self, delta: usize, align: bool) -> Result<(), Error> {
        let capacity = self.capacity();
        let len = self.len();

        let generated = delta == 0;
        let mut delta = if generated { capacity - len } else { delta };
        if delta > MAX_CAPACITY {
            return Err(Error::CapacityOutOfRange);
        }

        // At least one cell always remains.
        let headroom = capacity - max(len, 1);
        if headroom == 0 {
            return Err(Error::CapacityUnchanged);
        }
        if delta > headroom {
            if !align && !generated {
                return Err(Error::EngagedCellsDoNotFit);
            }
            delta = headroom;
        }

        self.normalize_for_shrink(delta);
        self.slots.truncate(capacity - delta);
        self.slots.shrink_to_fit();

        self.adapt_increment(false);

        let capacity = self.capacity();
        self.write = self.read + len;
        if self.write >= capacity {
            self.write = 0;
        }
        if len == capacity {
            self.status = Status::Full;
        }
        Ok(())
    }

    /// Halves or doubles the automatic growth step, saturating at the
    /// increment bounds.
    fn adapt_increment(&mut self, raise: bool) {
        if raise {
            self.increment = (self.increment * 2).min(MAX_INCREMENT);
        } else {
            self.increment = (self.increment / 2).max(MIN_INCREMENT);
        }
    }

    /// Puts the ring in a state where appending cells at the array tail
    /// extends the free region. An undivided engaged block can stay where
    /// it is; only a wrapped one has to move.
    fn normalize(&mut self) {
        if self.status == Status::Empty {
            self.read = 0;
            self.write = 0;
            return;
        }
        if self.write == 0 {
            // One contiguous segment ending exactly at the array tail; park
            // the cursor past the end so the segment reads as undivided.
            self.write = self.capacity();
        }
        if self.status == Status::Full && self.read != 0 {
            self.reorder_divided_full();
        } else if self.write < self.read {
            self.reorder_divided();
        }
    }

    fn normalize_for_shrink(&mut self, delta: usize) {
        if self.status == Status::Empty {
            self.read = 0;
            self.write = 0;
            return;
        }
        if self.write == 0 {
            self.write = self.capacity();
        }
        if self.status == Status::Full && self.read != 0 {
            self.reorder_divided_full();
        } else if self.write < self.read {
            self.reorder_divided();
        } else if self.read != 0 && self.capacity() - self.write < delta {
            self.shift_to_front();
        }
    }

    /// Undivided engaged block not starting at 0: swap it cell by cell to
    /// the front. Swapping keeps the displaced free cells' storage alive
    /// behind the block.
    fn shift_to_front(&mut self) {
        let read = self.read;
        let len = self.write - read;
        for k in 0..len {
            self.slots.swap(k, read + k);
        }
        self.read = 0;
        self.write = len;
    }

    /// Divided engaged region (`write < read`): stash both segments in push
    /// order, sweep the free cells to the array tail, then lay the stash
    /// back down from index 0.
    fn reorder_divided(&mut self) {
        let capacity = self.capacity();
        let (read, write) = (self.read, self.write);
        let len = capacity - read + write;
        let free = capacity - len;

        let mut stash: Vec<Slot> = Vec::with_capacity(len);
        for cell in &mut self.slots[read..capacity] {
            stash.push(mem::take(cell));
        }
        for cell in &mut self.slots[0..write] {
            stash.push(mem::take(cell));
        }

        // The free cells sit in `[write, read)`; walk them from the back so
        // each lands in the vacated tail without clobbering another.
        for k in 0..free {
            self.slots.swap(read - 1 - k, capacity - 1 - k);
        }

        for (k, cell) in stash.into_iter().enumerate() {
            self.slots[k] = cell;
        }
        self.read = 0;
        self.write = len;
    }

    /// Full queue with `read != 0`: every cell is engaged, so this is a pure
    /// rotation. Stash the head segment `[0, read)`, slide the back segment
    /// forward, append the stash.
    fn reorder_divided_full(&mut self) {
        let capacity = self.capacity();
        let read = self.read;

        let mut stash: Vec<Slot> = Vec::with_capacity(read);
        for cell in &mut self.slots[0..read] {
            stash.push(mem::take(cell));
        }

        for k in 0..capacity - read {
            self.slots.swap(k, read + k);
        }

        for (k, cell) in stash.into_iter().enumerate() {
            self.slots[capacity - read + k] = cell;
        }
        self.read = 0;
        self.write = capacity;
    }
}

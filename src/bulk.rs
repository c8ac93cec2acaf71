//! Whole-queue operations: deep cloning and moving calls between queues.

use std::rc::Rc;

use crate::slot::Slot;
use crate::Error;
use crate::Queue;
use crate::Status;

impl Queue {
    /// Deep copy: same capacity, growth mode, clock, and engaged calls,
    /// with independently owned argument storage per slot.
    pub fn try_clone(&self) -> Result<Queue, Error> {
        if self.busy {
            return Err(Error::Busy);
        }

        let mut slots: Vec<Slot> = Vec::new();
        slots
            .try_reserve_exact(self.slots.len())
            .map_err(|_| Error::AllocFailed)?;
        for slot in &self.slots {
            slots.push(slot.try_clone()?);
        }

        Ok(Queue {
            slots,
            read: self.read,
            write: self.write,
            status: self.status,
            mode: self.mode,
            increment: self.increment,
            default_arg_capacity: self.default_arg_capacity,
            busy: false,
            clock: Rc::clone(&self.clock),
        })
    }

    /// Appends every engaged call of `src` onto `self`, in `src`'s order.
    /// `src` is left untouched.
    pub fn concat(&mut self, src: &Queue) -> Result<(), Error> {
        if self.busy || src.busy {
            return Err(Error::Busy);
        }

        let incoming = src.len();
        if incoming == 0 {
            return Ok(());
        }

        let needed = self.len() + incoming;
        if needed > self.capacity() {
            self.grow_inner(needed - self.capacity(), false)?;
        }

        let src_capacity = src.capacity();
        let mut offset = src.read;
        for _ in 0..incoming {
            let slot = &src.slots[offset];
            if let Some(func) = slot.func {
                self.push_raw(func, &[], &slot.args)?;
            }
            offset = (offset + 1) % src_capacity;
        }
        Ok(())
    }

    /// Moves up to `count` calls from the front of `src` onto the back of
    /// `self`.
    ///
    /// `cut_by_len` clamps a count above `src`'s engaged calls instead of
    /// failing; `cut_by_headroom` clamps to what fits in `self` without
    /// growing (otherwise `self` grows to take them all).
    pub fn transfer(
        &mut self,
        src: &mut Queue,
        count: usize,
        cut_by_headroom: bool,
        cut_by_len: bool,
    ) -> Result<(), Error> {
        if self.busy || src.busy {
            return Err(Error::Busy);
        }
        if count == 0 {
            return Err(Error::CapacityOutOfRange);
        }

        let available = src.len();
        if available == 0 {
            return Err(Error::Empty);
        }
        let mut count = if count > available {
            if !cut_by_len {
                return Err(Error::CountExceedsAvailable);
            }
            available
        } else {
            count
        };

        let headroom = self.capacity() - self.len();
        if count > headroom {
            if cut_by_headroom {
                if headroom == 0 {
                    return Err(Error::CapacityUnchanged);
                }
                count = headroom;
            } else {
                self.grow_inner(count - headroom, false)?;
            }
        }

        let src_capacity = src.capacity();
        for _ in 0..count {
            let slot = &src.slots[src.read];
            if let Some(func) = slot.func {
                self.push_raw(func, &[], &slot.args)?;
            }
            src.slots[src.read].func = None;
            src.read = (src.read + 1) % src_capacity;
        }
        src.status = if src.read == src.write {
            Status::Empty
        } else {
            Status::Stable
        };
        Ok(())
    }

    /// Drops up to `count` engaged calls without executing them, from the
    /// front by default or from the back with `from_back`. `cut_by_len`
    /// clamps an oversized count instead of failing. Returns the number of
    /// calls dropped.
    pub fn skip(
        &mut self,
        count: usize,
        cut_by_len: bool,
        from_back: bool,
    ) -> Result<usize, Error> {
        // A skip from inside a callback would race the in-flight dequeue's
        // own cursor advance.
        if self.busy {
            return Err(Error::Busy);
        }
        if count == 0 {
            return Err(Error::CapacityOutOfRange);
        }

        let len = self.len();
        if len == 0 {
            return Err(Error::Empty);
        }
        let count = if count > len {
            if !cut_by_len {
                return Err(Error::CountExceedsAvailable);
            }
            len
        } else {
            count
        };

        let capacity = self.capacity();
        if from_back {
            let mut remaining = count;
            if self.write < remaining {
                remaining -= self.write;
                self.write = capacity;
            }
            self.write -= remaining;
        } else {
            self.read = (self.read + count) % capacity;
        }

        self.status = if count == len {
            Status::Empty
        } else {
            Status::Stable
        };
        Ok(count)
    }
}

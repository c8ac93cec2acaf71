
use core::mem::size_of;

use crate::arg::{Arg, Callback};
use crate::Error;

/// Per-slot argument capacity bounds. Slots grow their argument storage
/// independently of the queue, up to a hard ceiling.
pub(crate) const MIN_ARG_CAPACITY: usize = 2;
pub(crate) const DEFAULT_ARG_CAPACITY: usize = 5;
pub(crate) const MAX_ARG_CAPACITY: usize = 20;

/// One ring cell: a callback and its argument storage.
///
/// The argument `Vec`'s length is the stored call's argument count and its
/// capacity is the slot's own argument capacity, which is reserved up front
/// and reused across calls so repeated pushes into the same cell stay
/// allocation-free.
#[derive(Debug, Default)]
pub(crate) struct Slot {
    pub(crate) func: Option<Callback>,
    pub(crate) args: Vec<Arg>,
}

impl Slot {
    pub(crate) fn with_arg_capacity(arg_capacity: usize) -> Result<Slot, Error> {
        let mut args = Vec::new();
        args.try_reserve_exact(arg_capacity)
            .map_err(|_| Error::AllocFailed)?;
        Ok(Slot { func: None, args })
    }

    /// Clears the slot's arguments and makes room for `count` new ones,
    /// growing the slot's argument capacity if needed.
    pub(crate) fn prepare(&mut self, count: usize) -> Result<(), Error> {
        if count > MAX_ARG_CAPACITY {
            return Err(Error::ArgOutOfRange);
        }
        self.args.clear();
        if count > self.args.capacity() {
            self.args
                .try_reserve_exact(count)
                .map_err(|_| Error::AllocFailed)?;
        }
        Ok(())
    }

    /// Re-reserves the slot's argument storage at exactly `arg_capacity`.
    /// With `keep` the engaged arguments survive (the caller has checked
    /// they fit); without it the storage is replaced wholesale.
    pub(crate) fn set_arg_capacity(
        &mut self,
        arg_capacity: usize,
        keep: bool,
    ) -> Result<(), Error> {
        if !keep {
            let mut args = Vec::new();
            args.try_reserve_exact(arg_capacity)
                .map_err(|_| Error::AllocFailed)?;
            self.args = args;
            return Ok(());
        }

        debug_assert!(self.args.len() <= arg_capacity);
        if self.args.capacity() > arg_capacity {
            self.args.shrink_to(arg_capacity);
        } else {
            let extra = arg_capacity - self.args.len();
            self.args
                .try_reserve_exact(extra)
                .map_err(|_| Error::AllocFailed)?;
        }
        Ok(())
    }

    /// Deep copy preserving the slot's argument capacity.
    pub(crate) fn try_clone(&self) -> Result<Slot, Error> {
        let mut args = Vec::new();
        args.try_reserve_exact(self.args.capacity())
            .map_err(|_| Error::AllocFailed)?;
        args.extend_from_slice(&self.args);
        Ok(Slot {
            func: self.func,
            args,
        })
    }

    pub(crate) fn arg_bytes(&self) -> usize {
        self.args.capacity() * size_of::<Arg>()
    }
}

/// Batch-creates `count` slots, each with its own argument allocation.
///
/// A failure partway through drops whatever was built, so the caller sees
/// either a complete batch or untouched state; the partial case is reported
/// as the recoverable allocation error.
pub(crate) fn make_slots(count: usize, arg_capacity: usize) -> Result<Vec<Slot>, Error> {
    let mut slots = Vec::new();
    slots.try_reserve_exact(count).map_err(|_| Error::AllocFailed)?;
    for _ in 0..count {
        match Slot::with_arg_capacity(arg_capacity) {
            Ok(slot) => slots.push(slot),
            Err(_) => return Err(Error::AllocFailedButRestored),
        }
    }
    Ok(slots)
}

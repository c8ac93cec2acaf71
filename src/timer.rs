//! Tick-based delayed dispatch, built out of the queue's own push and
//! dequeue rather than a separate timer wheel.
//!
//! [`QueueRef::set_timeout`] enqueues an internal trampoline carrying a
//! deadline, the target queue, and the user's call. Each time the driver
//! loop dequeues the trampoline before the deadline it simply re-enqueues
//! itself, so an idle polling loop degenerates into cheap push/pop pairs
//! until the clock catches up.

use core::cell::Ref;
use core::cell::RefCell;
use core::cell::RefMut;
use core::fmt;
use std::rc::Rc;
use std::time::Instant;

use crate::Arg;
use crate::Callback;
use crate::Error;
use crate::Queue;

/// Monotonic tick count. Ticks wrap; deadline comparisons are performed
/// with wrap-safe signed differences.
pub type Tick = u64;

/// Source of ticks for deadline arithmetic.
pub trait Clock: fmt::Debug {
    fn now(&self) -> Tick;

    /// Conversion factor for second-denominated delays.
    fn ticks_per_second(&self) -> Tick {
        1000
    }
}

/// Millisecond clock over [`Instant`], the default tick source.
#[derive(Debug)]
pub struct StdClock {
    origin: Instant,
}

impl StdClock {
    pub fn new() -> StdClock {
        StdClock {
            origin: Instant::now(),
        }
    }
}

impl Default for StdClock {
    fn default() -> StdClock {
        StdClock::new()
    }
}

impl Clock for StdClock {
    fn now(&self) -> Tick {
        self.origin.elapsed().as_millis() as Tick
    }
}

/// Shared handle to a queue, required for the timer machinery so a pending
/// timeout can name its source and target queues inside its own argument
/// frame.
#[derive(Debug, Clone)]
pub struct QueueRef {
    inner: Rc<RefCell<Queue>>,
}

// The trampoline's frame layout: bookkeeping first, user arguments after.
const FRAME_SOURCE: usize = 0;
const FRAME_DEADLINE: usize = 1;
const FRAME_TARGET: usize = 2;
const FRAME_FUNC: usize = 3;
const FRAME_LEN: usize = 4;

impl QueueRef {
    pub fn new(queue: Queue) -> QueueRef {
        QueueRef {
            inner: Rc::new(RefCell::new(queue)),
        }
    }

    pub fn borrow(&self) -> Ref<'_, Queue> {
        self.inner.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Queue> {
        self.inner.borrow_mut()
    }

    /// True when both handles refer to the same queue.
    pub fn ptr_eq(&self, other: &QueueRef) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Schedules `func(args)` to run on `target` once `delay` ticks (or
    /// seconds, with `in_seconds`) have elapsed on this queue's clock.
    ///
    /// The delay is a lower bound: the call fires on the first dequeue of
    /// this queue at or after the deadline, so resolution is bounded by how
    /// often the driver loop runs.
    pub fn set_timeout(
        &self,
        delay: Tick,
        in_seconds: bool,
        target: &QueueRef,
        func: Callback,
        args: &[Arg],
    ) -> Result<(), Error> {
        let mut source = self.inner.try_borrow_mut().map_err(|_| Error::Busy)?;
        let delay = if in_seconds {
            delay.wrapping_mul(source.clock().ticks_per_second())
        } else {
            delay
        };
        let deadline = source.now().wrapping_add(delay);
        let frame = [
            Arg::Queue(QueueRef {
                inner: Rc::clone(&self.inner),
            }),
            Arg::U64(deadline),
            Arg::Queue(target.clone()),
            Arg::Func(func),
        ];
        source.push_raw(timeout_frame, &frame, args)
    }
}

impl PartialEq for QueueRef {
    fn eq(&self, other: &QueueRef) -> bool {
        self.ptr_eq(other)
    }
}

/// The trampoline behind [`QueueRef::set_timeout`]. Re-enqueues itself on
/// the source queue while the deadline is in the future (or while the
/// target is unavailable), then fires the user call on the target.
fn timeout_frame(ctx: &mut Queue, args: &[Arg]) -> i32 {
    if args.len() < FRAME_LEN {
        return -1;
    }
    let (
        Some(Arg::Queue(source)),
        Some(Arg::U64(deadline)),
        Some(Arg::Queue(target)),
        Some(Arg::Func(func)),
    ) = (
        args.get(FRAME_SOURCE),
        args.get(FRAME_DEADLINE),
        args.get(FRAME_TARGET),
        args.get(FRAME_FUNC),
    )
    else {
        return -1;
    };

    if crate::util::scmp(ctx.now(), *deadline).is_ge() {
        let user_args = &args[FRAME_LEN..];
        if source.ptr_eq(target) {
            // The target is the queue we are already executing on; calling
            // through `ctx` avoids a second borrow of the same cell.
            return func(ctx, user_args);
        }
        return match target.inner.try_borrow_mut() {
            Ok(mut target) => match target.push_raw(*func, &[], user_args) {
                Ok(()) => 0,
                Err(_) => -1,
            },
            // The target is mid-dequeue; keep the frame alive on the
            // source and deliver on a later drain pass.
            Err(_) => match ctx.push_raw(timeout_frame, &args[..FRAME_LEN], &args[FRAME_LEN..]) {
                Ok(()) => 0,
                Err(_) => -1,
            },
        };
    }

    // Not due yet; put ourselves back at the end of the line.
    match ctx.push_raw(timeout_frame, &args[..FRAME_LEN], &args[FRAME_LEN..]) {
        Ok(()) => 0,
        Err(_) => -1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn std_clock_is_monotonic() {
        let clock = StdClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn refs_compare_by_identity() {
        let a = QueueRef::new(Queue::new(2, crate::GrowthMode::Static).unwrap());
        let b = a.clone();
        let c = QueueRef::new(Queue::new(2, crate::GrowthMode::Static).unwrap());
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use cqueue::{Arg, Clock, Error, GrowthMode, Queue, QueueRef, Tick};

#[derive(Debug, Default)]
struct TestClock {
    ticks: Cell<Tick>,
}

impl Clock for TestClock {
    fn now(&self) -> Tick {
        self.ticks.get()
    }
}

type Log = RefCell<Vec<i32>>;

fn record(_q: &mut Queue, args: &[Arg]) -> i32 {
    let log: &Log = args[0]
        .as_opaque()
        .and_then(|p| <dyn Any>::downcast_ref(&**p))
        .unwrap();
    let value = args[1].as_i32().unwrap();
    log.borrow_mut().push(value);
    value
}

fn timed_queue(capacity: usize) -> (QueueRef, Rc<TestClock>) {
    let clock = Rc::new(TestClock::default());
    let q = QueueRef::new(Queue::new(capacity, GrowthMode::Max).unwrap());
    q.borrow_mut().set_clock(clock.clone());
    (q, clock)
}

#[test]
fn fires_once_deadline_passes() {
    let (q, clock) = timed_queue(4);
    let log: Rc<Log> = Rc::new(RefCell::new(Vec::new()));
    q.set_timeout(10, false, &q, record, &[Arg::opaque(log.clone()), Arg::I32(42)])
        .unwrap();

    // before the deadline each dequeue just re-enqueues the timer
    for tick in 0..10 {
        clock.ticks.set(tick);
        assert_eq!(q.borrow_mut().dequeue(), Ok(0));
        assert_eq!(q.borrow().len(), 1);
        assert!(log.borrow().is_empty());
    }

    clock.ticks.set(10);
    assert_eq!(q.borrow_mut().dequeue(), Ok(42));
    assert!(q.borrow().is_empty());
    assert_eq!(*log.borrow(), vec![42]);
}

#[test]
fn zero_delay_fires_on_first_dequeue() {
    let (q, _clock) = timed_queue(4);
    let log: Rc<Log> = Rc::new(RefCell::new(Vec::new()));
    q.set_timeout(0, false, &q, record, &[Arg::opaque(log.clone()), Arg::I32(1)])
        .unwrap();
    assert_eq!(q.borrow_mut().dequeue(), Ok(1));
    assert_eq!(*log.borrow(), vec![1]);
}

#[test]
fn second_denominated_delay() {
    let (q, clock) = timed_queue(4);
    let log: Rc<Log> = Rc::new(RefCell::new(Vec::new()));
    // TestClock keeps the default 1000 ticks per second
    q.set_timeout(2, true, &q, record, &[Arg::opaque(log.clone()), Arg::I32(2)])
        .unwrap();

    clock.ticks.set(1999);
    assert_eq!(q.borrow_mut().dequeue(), Ok(0));
    assert!(log.borrow().is_empty());

    clock.ticks.set(2000);
    assert_eq!(q.borrow_mut().dequeue(), Ok(2));
    assert_eq!(*log.borrow(), vec![2]);
}

#[test]
fn delivers_to_another_queue() {
    let (src, clock) = timed_queue(4);
    let dst = QueueRef::new(Queue::new(4, GrowthMode::Max).unwrap());
    let log: Rc<Log> = Rc::new(RefCell::new(Vec::new()));

    src.set_timeout(5, false, &dst, record, &[Arg::opaque(log.clone()), Arg::I32(9)])
        .unwrap();
    clock.ticks.set(5);

    // firing only moves the call; the target runs it on its own schedule
    assert_eq!(src.borrow_mut().dequeue(), Ok(0));
    assert!(src.borrow().is_empty());
    assert_eq!(dst.borrow().len(), 1);
    assert!(log.borrow().is_empty());

    assert_eq!(dst.borrow_mut().dequeue(), Ok(9));
    assert_eq!(*log.borrow(), vec![9]);
}

#[test]
fn busy_target_defers_delivery() {
    let (src, clock) = timed_queue(4);
    let dst = QueueRef::new(Queue::new(4, GrowthMode::Max).unwrap());
    let log: Rc<Log> = Rc::new(RefCell::new(Vec::new()));

    src.set_timeout(1, false, &dst, record, &[Arg::opaque(log.clone()), Arg::I32(7)])
        .unwrap();
    clock.ticks.set(1);

    // the target is held mid-operation, so the frame stays on the source
    let guard = dst.borrow();
    assert_eq!(src.borrow_mut().dequeue(), Ok(0));
    assert_eq!(src.borrow().len(), 1);
    assert_eq!(guard.len(), 0);
    drop(guard);

    assert_eq!(src.borrow_mut().dequeue(), Ok(0));
    assert!(src.borrow().is_empty());
    assert_eq!(dst.borrow().len(), 1);
    assert_eq!(dst.borrow_mut().dequeue(), Ok(7));
    assert_eq!(*log.borrow(), vec![7]);
}

#[test]
fn timers_interleave_with_ordinary_calls() {
    let (q, clock) = timed_queue(8);
    let log: Rc<Log> = Rc::new(RefCell::new(Vec::new()));
    q.set_timeout(3, false, &q, record, &[Arg::opaque(log.clone()), Arg::I32(30)])
        .unwrap();
    q.borrow_mut()
        .push(record, &[Arg::opaque(log.clone()), Arg::I32(1)])
        .unwrap();

    // tick 0: timer defers behind the ordinary call, which runs
    q.borrow_mut().dequeue().unwrap();
    q.borrow_mut().dequeue().unwrap();
    assert_eq!(*log.borrow(), vec![1]);

    clock.ticks.set(3);
    q.borrow_mut().dequeue().unwrap();
    assert_eq!(*log.borrow(), vec![1, 30]);
    assert!(q.borrow().is_empty());
}

#[test]
fn busy_source_rejects_scheduling() {
    let (q, _clock) = timed_queue(4);
    let guard = q.borrow_mut();
    assert_eq!(
        q.set_timeout(1, false, &q, record, &[]),
        Err(Error::Busy),
    );
    drop(guard);
    q.set_timeout(1, false, &q, record, &[]).unwrap();
}

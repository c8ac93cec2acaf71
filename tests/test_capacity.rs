use cqueue::{Arg, Error, GrowthMode, Queue, Status};

fn ret(_q: &mut Queue, args: &[Arg]) -> i32 {
    args[0].as_i32().unwrap()
}

fn nop(_q: &mut Queue, _args: &[Arg]) -> i32 {
    0
}

fn fill(q: &mut Queue, range: std::ops::Range<i32>) {
    for i in range {
        q.push(ret, &[Arg::I32(i)]).unwrap();
    }
}

fn drain(q: &mut Queue) -> Vec<i32> {
    let mut out = Vec::new();
    while !q.is_empty() {
        out.push(q.dequeue().unwrap());
    }
    out
}

#[test]
fn push_grows_within_limit() {
    let mut q = Queue::new(4, GrowthMode::Limit(8)).unwrap();
    fill(&mut q, 0..5);
    // the adaptive step wanted 8 cells but clamps to the limit
    assert_eq!(q.capacity(), 8);
    assert_eq!(drain(&mut q), vec![0, 1, 2, 3, 4]);
}

#[test]
fn limit_is_hard() {
    let mut q = Queue::new(2, GrowthMode::Limit(4)).unwrap();
    assert_eq!(q.grow(5, false), Err(Error::LimitOverflow));
    assert_eq!(q.capacity(), 2);
    // aligned, the same request clamps to the limit
    q.grow(5, true).unwrap();
    assert_eq!(q.capacity(), 4);
    assert_eq!(q.grow(1, true), Err(Error::LimitOverflow));
    fill(&mut q, 0..4);
    assert_eq!(q.push(ret, &[Arg::I32(4)]), Err(Error::LimitOverflow));
    assert_eq!(drain(&mut q), vec![0, 1, 2, 3]);
}

#[test]
fn explicit_grow_preserves_wrapped_order() {
    let mut q = Queue::new(4, GrowthMode::Max).unwrap();
    fill(&mut q, 0..4);
    assert_eq!(q.dequeue(), Ok(0));
    assert_eq!(q.dequeue(), Ok(1));
    fill(&mut q, 4..6); // wraps

    q.grow(4, false).unwrap();
    assert_eq!(q.capacity(), 8);
    assert_eq!(drain(&mut q), vec![2, 3, 4, 5]);
}

#[test]
fn shrink_wrapped_to_engaged() {
    let mut q = Queue::new(8, GrowthMode::Max).unwrap();
    fill(&mut q, 0..8);
    for i in 0..4 {
        assert_eq!(q.dequeue(), Ok(i));
    }
    fill(&mut q, 8..10); // wraps: two cells at the front

    // delta 0 means down to the engaged region
    q.shrink(0, false).unwrap();
    assert_eq!(q.capacity(), 6);
    assert_eq!(q.status(), Status::Full);
    assert_eq!(drain(&mut q), vec![4, 5, 6, 7, 8, 9]);
}

#[test]
fn shrink_respects_engaged_cells() {
    let mut q = Queue::new(4, GrowthMode::Max).unwrap();
    fill(&mut q, 0..3);
    assert_eq!(q.shrink(3, false), Err(Error::EngagedCellsDoNotFit));
    assert_eq!(q.capacity(), 4);

    q.shrink(3, true).unwrap(); // clamps to the single free cell
    assert_eq!(q.capacity(), 3);
    assert_eq!(q.status(), Status::Full);
    assert_eq!(drain(&mut q), vec![0, 1, 2]);
}

#[test]
fn last_cell_stays() {
    let mut q = Queue::new(1, GrowthMode::Max).unwrap();
    assert_eq!(q.shrink(0, false), Err(Error::CapacityUnchanged));
    assert_eq!(q.shrink(1, true), Err(Error::CapacityUnchanged));
    assert_eq!(q.capacity(), 1);
}

#[test]
fn resize_round_trip() {
    let mut q = Queue::new(4, GrowthMode::Max).unwrap();
    fill(&mut q, 0..3);
    q.resize(10, false).unwrap();
    assert_eq!(q.capacity(), 10);
    assert_eq!(q.resize(10, false), Err(Error::CapacityUnchanged));
    q.resize(3, false).unwrap();
    assert_eq!(q.capacity(), 3);
    assert_eq!(q.status(), Status::Full);
    assert_eq!(drain(&mut q), vec![0, 1, 2]);
}

#[test]
fn adaptive_increment_doubles() {
    let mut q = Queue::new(1, GrowthMode::Max).unwrap();
    q.push(ret, &[Arg::I32(0)]).unwrap();
    q.push(ret, &[Arg::I32(1)]).unwrap();
    // first automatic growth uses the initial step of 8
    assert_eq!(q.capacity(), 9);
    fill(&mut q, 2..10);
    // the step doubled to 16 after the first growth succeeded with headroom
    assert_eq!(q.capacity(), 25);
    assert_eq!(drain(&mut q), (0..10).collect::<Vec<_>>());
}

#[test]
fn growth_mode_changes() {
    let mut q = Queue::new(4, GrowthMode::Static).unwrap();
    fill(&mut q, 0..2);

    assert_eq!(
        q.set_growth_mode(GrowthMode::Limit(2), false),
        Err(Error::LimitBelowCapacity),
    );
    assert_eq!(q.capacity(), 4);

    // adapting shrinks first, clamped to the engaged region
    q.set_growth_mode(GrowthMode::Limit(2), true).unwrap();
    assert_eq!(q.capacity(), 2);
    assert_eq!(q.growth_mode(), GrowthMode::Limit(2));

    q.set_growth_mode(GrowthMode::Max, false).unwrap();
    fill(&mut q, 2..5);
    assert!(q.capacity() > 2);
    assert_eq!(drain(&mut q), vec![0, 1, 2, 3, 4]);
}

#[test]
fn grow_rejected_when_static() {
    let mut q = Queue::new(2, GrowthMode::Static).unwrap();
    assert_eq!(q.grow(1, false), Err(Error::StaticOverflow));
    assert_eq!(q.resize(4, false), Err(Error::StaticOverflow));
    // shrinking a static queue is allowed
    q.shrink(1, false).unwrap();
    assert_eq!(q.capacity(), 1);
}

#[test]
fn construction_bounds() {
    assert_eq!(
        Queue::new(0, GrowthMode::Static).unwrap_err(),
        Error::CapacityOutOfRange,
    );
    assert_eq!(
        Queue::new(4, GrowthMode::Limit(2)).unwrap_err(),
        Error::LimitBelowCapacity,
    );
    assert_eq!(
        Queue::with_arg_capacity(4, GrowthMode::Static, 1).unwrap_err(),
        Error::ArgOutOfRange,
    );
    assert_eq!(
        Queue::with_arg_capacity(4, GrowthMode::Static, 21).unwrap_err(),
        Error::ArgOutOfRange,
    );
}

#[test]
fn arg_capacity_control() {
    let mut q = Queue::with_arg_capacity(4, GrowthMode::Static, 2).unwrap();
    assert_eq!(q.set_default_arg_capacity(2), Err(Error::SameArgCapacity));
    q.set_default_arg_capacity(10).unwrap();
    assert_eq!(q.set_default_arg_capacity(1), Err(Error::ArgOutOfRange));

    let args: Vec<Arg> = (0..5).map(Arg::I32).collect();
    q.push(nop, &args).unwrap();

    // shrinking storage under a 5-argument call must fail or skip it
    assert_eq!(q.equalize_arg_capacities(3, false), Err(Error::ArgsInUse));
    q.equalize_arg_capacities(3, true).unwrap();
    q.equalize_arg_capacities(8, false).unwrap();
    assert_eq!(q.dequeue(), Ok(0));
}

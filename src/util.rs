
use core::cmp::Ordering;

// min/max
pub(crate) use core::cmp::max;

// scmp/sdiff, signed comparison of unsigned ticks
//
// Tick counts are free-running and may wrap; comparing them directly
// would misorder deadlines that straddle the wrap point. The signed
// difference is correct as long as the two compared ticks are less than
// half the tick range apart.
#[inline]
pub(crate) fn sdiff(a: u64, b: u64) -> i64 {
    a.wrapping_sub(b) as i64
}

#[inline]
pub(crate) fn scmp(a: u64, b: u64) -> Ordering {
    sdiff(a, b).cmp(&0)
}

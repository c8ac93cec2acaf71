
use core::fmt;
use core::ptr;
use std::any::Any;
use std::rc::Rc;

use crate::Queue;
use crate::QueueRef;

/// A callback stored in a queue slot.
///
/// The first parameter is the queue the call is being dequeued from, which
/// makes same-queue pushes from inside a callback possible without aliasing
/// the queue; a reentrant [`Queue::dequeue`] on it fails with
/// [`Error::Busy`](crate::Error::Busy). The return value is the callback's
/// own return code, surfaced by [`Queue::dequeue`].
pub type Callback = fn(&mut Queue, &[Arg]) -> i32;

/// One callback argument.
///
/// A tagged variant rather than an untagged union: the discriminant travels
/// with the value, so a callback can check what it was actually given
/// instead of trusting a call-site convention. Reference variants (`Str`,
/// `Opaque`, `Queue`) hold shared payloads and compare by identity where
/// content comparison makes no sense.
#[derive(Clone)]
pub enum Arg {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Usize(usize),
    Isize(isize),
    F32(f32),
    F64(f64),
    Char(char),
    Str(Rc<str>),
    Opaque(Rc<dyn Any>),
    Queue(QueueRef),
    Func(Callback),
}

macro_rules! scalar_accessor {
    ($name:ident, $variant:ident, $ty:ty) => {
        pub fn $name(&self) -> Option<$ty> {
            match self {
                Arg::$variant(v) => Some(*v),
                _ => None,
            }
        }
    };
}

impl Arg {
    scalar_accessor!(as_u8, U8, u8);
    scalar_accessor!(as_u16, U16, u16);
    scalar_accessor!(as_u32, U32, u32);
    scalar_accessor!(as_u64, U64, u64);
    scalar_accessor!(as_i8, I8, i8);
    scalar_accessor!(as_i16, I16, i16);
    scalar_accessor!(as_i32, I32, i32);
    scalar_accessor!(as_i64, I64, i64);
    scalar_accessor!(as_usize, Usize, usize);
    scalar_accessor!(as_isize, Isize, isize);
    scalar_accessor!(as_f32, F32, f32);
    scalar_accessor!(as_f64, F64, f64);
    scalar_accessor!(as_char, Char, char);
    scalar_accessor!(as_func, Func, Callback);

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Arg::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_opaque(&self) -> Option<&Rc<dyn Any>> {
        match self {
            Arg::Opaque(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_queue(&self) -> Option<&QueueRef> {
        match self {
            Arg::Queue(q) => Some(q),
            _ => None,
        }
    }

    /// Wraps an arbitrary shared payload, the safe stand-in for a
    /// type-erased pointer argument.
    pub fn opaque<T: Any>(payload: Rc<T>) -> Arg {
        Arg::Opaque(payload)
    }
}

macro_rules! scalar_from {
    ($variant:ident, $ty:ty) => {
        impl From<$ty> for Arg {
            fn from(v: $ty) -> Arg {
                Arg::$variant(v)
            }
        }
    };
}

scalar_from!(U8, u8);
scalar_from!(U16, u16);
scalar_from!(U32, u32);
scalar_from!(U64, u64);
scalar_from!(I8, i8);
scalar_from!(I16, i16);
scalar_from!(I32, i32);
scalar_from!(I64, i64);
scalar_from!(Usize, usize);
scalar_from!(Isize, isize);
scalar_from!(F32, f32);
scalar_from!(F64, f64);
scalar_from!(Char, char);

impl From<&str> for Arg {
    fn from(s: &str) -> Arg {
        Arg::Str(Rc::from(s))
    }
}

impl From<String> for Arg {
    fn from(s: String) -> Arg {
        Arg::Str(Rc::from(s))
    }
}

impl From<QueueRef> for Arg {
    fn from(q: QueueRef) -> Arg {
        Arg::Queue(q)
    }
}

impl PartialEq for Arg {
    fn eq(&self, other: &Arg) -> bool {
        match (self, other) {
            (Arg::U8(a), Arg::U8(b)) => a == b,
            (Arg::U16(a), Arg::U16(b)) => a == b,
            (Arg::U32(a), Arg::U32(b)) => a == b,
            (Arg::U64(a), Arg::U64(b)) => a == b,
            (Arg::I8(a), Arg::I8(b)) => a == b,
            (Arg::I16(a), Arg::I16(b)) => a == b,
            (Arg::I32(a), Arg::I32(b)) => a == b,
            (Arg::I64(a), Arg::I64(b)) => a == b,
            (Arg::Usize(a), Arg::Usize(b)) => a == b,
            (Arg::Isize(a), Arg::Isize(b)) => a == b,
            (Arg::F32(a), Arg::F32(b)) => a == b,
            (Arg::F64(a), Arg::F64(b)) => a == b,
            (Arg::Char(a), Arg::Char(b)) => a == b,
            (Arg::Str(a), Arg::Str(b)) => a == b,
            (Arg::Opaque(a), Arg::Opaque(b)) => Rc::ptr_eq(a, b),
            (Arg::Queue(a), Arg::Queue(b)) => a.ptr_eq(b),
            (Arg::Func(a), Arg::Func(b)) => ptr::fn_addr_eq(*a, *b),
            _ => false,
        }
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::U8(v) => write!(f, "U8({})", v),
            Arg::U16(v) => write!(f, "U16({})", v),
            Arg::U32(v) => write!(f, "U32({})", v),
            Arg::U64(v) => write!(f, "U64({})", v),
            Arg::I8(v) => write!(f, "I8({})", v),
            Arg::I16(v) => write!(f, "I16({})", v),
            Arg::I32(v) => write!(f, "I32({})", v),
            Arg::I64(v) => write!(f, "I64({})", v),
            Arg::Usize(v) => write!(f, "Usize({})", v),
            Arg::Isize(v) => write!(f, "Isize({})", v),
            Arg::F32(v) => write!(f, "F32({})", v),
            Arg::F64(v) => write!(f, "F64({})", v),
            Arg::Char(v) => write!(f, "Char({:?})", v),
            Arg::Str(v) => write!(f, "Str({:?})", v),
            Arg::Opaque(_) => write!(f, "Opaque(..)"),
            Arg::Queue(_) => write!(f, "Queue(..)"),
            // these really need to be in hex to be readable
            Arg::Func(v) => write!(f, "Func(0x{:x})", *v as usize),
        }
    }
}

//! Stand-ins for the `tracing` macros, used when the `tracing` feature is off.
//! Modules import the real macros under `#[cfg(feature = "tracing")]` and fall back to these.

#![allow(unused_macros)]

macro_rules! debug {
    ($($t: tt)*) => {};
}

macro_rules! info {
    ($($t: tt)*) => {};
}

macro_rules! warn {
    ($($t: tt)*) => {};
}

macro_rules! error {
    ($($t: tt)*) => {};
}

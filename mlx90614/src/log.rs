// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Internal logging macros.
//!
//! With the `defmt` feature enabled these forward to the matching `defmt` macros. Without it they
//! expand to nothing, so the arguments are not evaluated.

#[cfg(feature = "defmt")]
macro_rules! debug {
    ($($arg:tt)*) => (defmt::debug!($($arg)*));
}

#[cfg(not(feature = "defmt"))]
macro_rules! debug {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "defmt")]
macro_rules! log_warn {
    ($($arg:tt)*) => (defmt::warn!($($arg)*));
}

#[cfg(not(feature = "defmt"))]
macro_rules! log_warn {
    ($($arg:tt)*) => {};
}

pub(crate) use debug;
// `warn` on its own is ambiguous with the built-in lint attribute.
pub(crate) use log_warn as warn;

#[cfg(all(test, not(feature = "defmt")))]
mod test {
    use super::{debug, warn};

    #[test]
    fn macros_in_scope() {
        debug!("reading {=u8:#x}", 0x5Au8);
        warn!("{=u8:#x} did not respond", 0x5Au8);
    }
}

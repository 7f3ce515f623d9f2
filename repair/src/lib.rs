//! Generate-evaluate-select repair of a single artifact file.
//!
//! A generator proposes full replacements for the artifact at several
//! diversity levels, an external oracle (a test command) scores each one, and
//! the best candidate is kept across rounds. The artifact is only written when
//! the search ships a full pass or ends with a strict improvement.
//!
//! - **[`core`]**: Pure logic (scores, extraction, selection). No I/O.
//! - **[`io`]**: Side effects (artifact file, processes, config, round logs).
//!   Generator and oracle sit behind traits so tests can script them.
//!
//! [`candidate`], [`round`] and [`search`] combine the two into the search
//! driven by `repair run`.

pub mod candidate;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod round;
pub mod search;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

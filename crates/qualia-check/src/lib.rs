//! Subtype checking over refined types and diagnostic reporting.
//!
//! [`CheckRun`] drives one complete run: it snapshots declared types through
//! the factory, refines every routine, then walks reachable code with the
//! [`SubtypeChecker`] and hands the collected [`Violation`]s to a
//! [`DiagnosticReporter`].

mod checker;
mod report;
mod run;
mod violation;

pub use crate::checker::SubtypeChecker;
pub use crate::report::DiagnosticReporter;
pub use crate::run::{CheckOptions, CheckOutcome, CheckRun, RunError, RunStats};
pub use crate::violation::{Violation, ViolationCode};

//! Shared test harness modules for the paises CLI.
#![expect(
    clippy::panic,
    reason = "Tests assert panic branches to surface unexpected CLI outcomes"
)]

use super::*;

mod config_unit;
mod helpers;

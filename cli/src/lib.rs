// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Command-line front end of davsync.

#![warn(
    trivial_casts,
    trivial_numeric_casts,
    missing_debug_implementations,
    unstable_features,
    unused_import_braces,
    unused_qualifications,
    clippy::dbg_macro,
    clippy::pedantic
)]
#![allow(clippy::missing_errors_doc, clippy::print_stdout)]

mod cli;
mod cmd_status;
mod cmd_sync;
mod config;

pub use crate::cli::{Cli, Commands, run};
pub use crate::cmd_status::CmdStatus;
pub use crate::cmd_sync::CmdSync;
pub use crate::config::parse_config;

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Webshell — Core types and error definitions shared across all crates.

pub mod backend;
pub mod config;
pub mod error;
pub mod human_errors;
pub mod types;

pub use config::{AppConfig, ReadinessConfig};
pub use error::WebshellError;
pub use types::*;

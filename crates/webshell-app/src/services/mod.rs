// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service layer. Constructs the host services once at startup and hands
// them to whatever drives the page view.

pub mod app_services;
pub mod data_dir;

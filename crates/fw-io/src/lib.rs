// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2026 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of FlowWeave — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Run settings and file plumbing around the FlowWeave core.
//!
//! Everything here is deliberately thin: the YAML settings file is a plain
//! serde model, base tables travel as an indices CSV plus a square data CSV,
//! and proxies are read from column-schema'd CSV files into [`fw_proxy::Proxy`]
//! values. The core never touches the filesystem itself.

pub mod csv;
pub mod error;
pub mod proxy_csv;
pub mod settings;

pub use error::{Error, Result};
pub use settings::Settings;

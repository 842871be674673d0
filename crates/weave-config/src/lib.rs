// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2026 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of FlowWeave — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Process-level knobs shared by every FlowWeave binary: tracing subscriber
//! setup and deterministic-execution configuration.

pub mod determinism;
pub mod tracing;

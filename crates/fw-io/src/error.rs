// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2026 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of FlowWeave — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// I/O-layer failures, always carrying the offending file and, where it
/// exists, the line.
#[derive(Debug, Error)]
pub enum Error {
    #[error("could not open {path}: {source}", path = .path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{source} ({path})", path = .path.display())]
    Csv { path: PathBuf, source: csv::Error },
    #[error("could not parse {path}: {source}", path = .path.display())]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("could not parse number '{value}' ({path} line {line})", path = .path.display())]
    Number {
        value: String,
        path: PathBuf,
        line: usize,
    },
    #[error("unexpected number of columns ({path} line {line})", path = .path.display())]
    RowWidth { path: PathBuf, line: usize },
    #[error("not enough rows ({path})", path = .path.display())]
    NotEnoughRows { path: PathBuf },
    #[error("too many rows ({path})", path = .path.display())]
    TooManyRows { path: PathBuf },
    #[error("column '{column}' not found in {path}", path = .path.display())]
    MissingColumn { column: String, path: PathBuf },
    #[error("{kind} '{name}' from {path} not found", path = .path.display())]
    UnknownId {
        kind: String,
        name: String,
        path: PathBuf,
    },
    #[error("{source} ({path} line {line})", path = .path.display())]
    Table {
        path: PathBuf,
        line: usize,
        source: fw_core::Error,
    },
    #[error("{source} ({path})", path = .path.display())]
    Proxy {
        path: PathBuf,
        source: fw_proxy::Error,
    },
    #[error("{source} ({path} line {line})", path = .path.display())]
    ProxyRow {
        path: PathBuf,
        line: usize,
        source: fw_proxy::Error,
    },
}

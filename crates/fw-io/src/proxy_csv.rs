// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2026 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of FlowWeave — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Proxy and mapping CSV readers.
//!
//! A proxy file's header is matched against the settings schema: select
//! columns filter rows, the value column carries the number, index columns
//! become tensor axes in file order, everything else is ignored. Mapping
//! files bridge a foreign vocabulary to the table's; a `-` in either cell
//! skips the row.

use std::collections::HashSet;
use std::path::Path;

use num_traits::NumCast;
use tracing::debug;

use fw_core::{IndexSet, Value};
use fw_proxy::{FlowPosition, Proxy, ProxyAxis};

use crate::error::{Error, Result};
use crate::settings::{MappingSpec, ProxySpec};

enum Column {
    Ignore,
    Select(String),
    Value,
    Index(usize),
}

/// Reads the foreign/native relation rows of a mapping file.
fn read_mapping(spec: &MappingSpec) -> Result<Vec<(String, String)>> {
    let path = &spec.file;
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|source| Error::Csv {
            path: path.clone(),
            source,
        })?;
    let headers = reader
        .headers()
        .map_err(|source| Error::Csv {
            path: path.clone(),
            source,
        })?
        .clone();
    let foreign_column = headers
        .iter()
        .position(|name| name == spec.foreign_column)
        .ok_or_else(|| Error::MissingColumn {
            column: spec.foreign_column.clone(),
            path: path.clone(),
        })?;
    let native_column = headers
        .iter()
        .position(|name| name == spec.native_column)
        .ok_or_else(|| Error::MissingColumn {
            column: spec.native_column.clone(),
            path: path.clone(),
        })?;

    let mut links = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| Error::Csv {
            path: path.clone(),
            source,
        })?;
        let foreign = record.get(foreign_column).unwrap_or("-");
        let native = record.get(native_column).unwrap_or("-");
        if foreign == "-" || native == "-" {
            continue;
        }
        links.push((foreign.to_owned(), native.to_owned()));
    }
    debug!(
        file = %path.display(),
        links = links.len(),
        "read mapping relation"
    );
    Ok(links)
}

/// Reads one proxy per its settings record, resolving axes against the
/// (split) index set of the working table.
pub fn read_proxy<V: Value>(spec: &ProxySpec, set: &IndexSet) -> Result<Proxy<V>> {
    let path = &spec.file;
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|source| Error::Csv {
            path: path.clone(),
            source,
        })?;
    let headers = reader
        .headers()
        .map_err(|source| Error::Csv {
            path: path.clone(),
            source,
        })?
        .clone();

    let mut columns = Vec::with_capacity(headers.len());
    let mut axes = Vec::new();
    let mut seen = HashSet::new();
    for name in headers.iter() {
        let Some(column_spec) = spec.columns.get(name) else {
            columns.push(Column::Ignore);
            continue;
        };
        seen.insert(name.to_owned());
        match column_spec.axis_kind() {
            None => match column_spec {
                crate::settings::ColumnSpec::Select { value } => {
                    columns.push(Column::Select(value.clone()));
                }
                _ => columns.push(Column::Value),
            },
            Some(kind) => {
                let axis = match column_spec.mapping() {
                    None => ProxyAxis::unmapped(kind, set),
                    Some(mapping_spec) => {
                        let links = read_mapping(mapping_spec)?;
                        ProxyAxis::mapped(kind, set, links).map_err(|source| Error::Proxy {
                            path: mapping_spec.file.clone(),
                            source,
                        })?
                    }
                };
                columns.push(Column::Index(axes.len()));
                axes.push(axis);
            }
        }
    }
    for column in spec.columns.keys() {
        if !seen.contains(column) {
            return Err(Error::MissingColumn {
                column: column.clone(),
                path: path.clone(),
            });
        }
    }

    let axis_count = axes.len();
    let mut proxy = Proxy::new(axes).map_err(|source| Error::Proxy {
        path: path.clone(),
        source,
    })?;

    let mut coordinates = vec![0usize; axis_count];
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|source| Error::Csv {
            path: path.clone(),
            source,
        })?;
        let line = row + 2; // the header occupies line 1
        let mut value = V::zero();
        let mut skip = false;
        for (position, column) in columns.iter().enumerate() {
            let field = record.get(position).unwrap_or("");
            match column {
                Column::Ignore => {}
                Column::Select(expected) => {
                    if field != expected {
                        skip = true;
                    }
                }
                Column::Value => {
                    let parsed: f64 = field.trim().parse().map_err(|_| Error::Number {
                        value: field.to_owned(),
                        path: path.clone(),
                        line,
                    })?;
                    value = NumCast::from(parsed).unwrap_or_else(V::nan);
                }
                Column::Index(axis_index) => {
                    let axis = &proxy.axes()[*axis_index];
                    let coordinate = match axis.mapping() {
                        Some(mapping) => {
                            mapping
                                .foreign_index(field)
                                .ok_or_else(|| Error::UnknownId {
                                    kind: axis.kind().to_string(),
                                    name: field.to_owned(),
                                    path: path.clone(),
                                })?
                        }
                        None => axis.kind().native_level(set, field).map_err(|source| {
                            Error::Proxy {
                                path: path.clone(),
                                source,
                            }
                        })?,
                    };
                    coordinates[*axis_index] = coordinate;
                }
            }
            if skip {
                break;
            }
        }
        if !skip {
            proxy
                .set(&coordinates, value)
                .map_err(|source| Error::ProxyRow {
                    path: path.clone(),
                    line,
                    source,
                })?;
        }
    }

    for application in &spec.applications {
        let positions: Vec<FlowPosition> =
            application.iter().map(|&position| position.into()).collect();
        proxy
            .add_application(&positions)
            .map_err(|source| Error::Proxy {
                path: path.clone(),
                source,
            })?;
    }
    Ok(proxy)
}

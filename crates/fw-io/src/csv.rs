// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2026 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of FlowWeave — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Base-table CSV load and save.
//!
//! The indices file holds one `region,sector` row per admitted pair, in
//! table row order; the data file is the square numeric grid in the same
//! order. Values at or below the threshold are clamped to zero on load.

use std::path::Path;

use num_traits::NumCast;

use fw_core::{IndexSet, Table, Value};

use crate::error::{Error, Result};

fn csv_error(path: &Path, source: csv::Error) -> Error {
    Error::Csv {
        path: path.to_owned(),
        source,
    }
}

fn reader(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|source| csv_error(path, source))
}

/// Reads a base table at super resolution from an indices file and a square
/// data file.
pub fn read_table<V: Value>(
    index_path: &Path,
    data_path: &Path,
    threshold: V,
) -> Result<Table<V>> {
    let mut set = IndexSet::new();
    let mut index_reader = reader(index_path)?;
    for (row, record) in index_reader.records().enumerate() {
        let record = record.map_err(|source| csv_error(index_path, source))?;
        if record.len() != 2 {
            return Err(Error::RowWidth {
                path: index_path.to_owned(),
                line: row + 1,
            });
        }
        set.add_index(&record[1], &record[0])
            .map_err(|source| Error::Table {
                path: index_path.to_owned(),
                line: row + 1,
                source,
            })?;
    }
    set.rebuild_indices();

    let size = set.size();
    let mut table = Table::new(set, V::zero());
    let mut data_reader = reader(data_path)?;
    let mut rows = 0;
    for (row, record) in data_reader.records().enumerate() {
        let record = record.map_err(|source| csv_error(data_path, source))?;
        if row >= size {
            return Err(Error::TooManyRows {
                path: data_path.to_owned(),
            });
        }
        if record.len() != size {
            return Err(Error::RowWidth {
                path: data_path.to_owned(),
                line: row + 1,
            });
        }
        for (column, field) in record.iter().enumerate() {
            let parsed: f64 = field.trim().parse().map_err(|_| Error::Number {
                value: field.to_owned(),
                path: data_path.to_owned(),
                line: row + 1,
            })?;
            let value: V = NumCast::from(parsed).unwrap_or_else(V::nan);
            if value > threshold {
                table.set(row, column, value);
            }
        }
        rows += 1;
    }
    if rows < size {
        return Err(Error::NotEnoughRows {
            path: data_path.to_owned(),
        });
    }
    Ok(table)
}

/// Writes a table as an indices file plus a square data file, both at leaf
/// resolution in canonical row order.
pub fn write_table<V: Value>(table: &Table<V>, index_path: &Path, data_path: &Path) -> Result<()> {
    let set = table.index_set();

    let mut index_writer =
        csv::Writer::from_path(index_path).map_err(|source| csv_error(index_path, source))?;
    for cell in set.total_indices() {
        index_writer
            .write_record([set.region(cell.region).name(), set.sector(cell.sector).name()])
            .map_err(|source| csv_error(index_path, source))?;
    }
    index_writer
        .flush()
        .map_err(|source| Error::Open {
            path: index_path.to_owned(),
            source,
        })?;

    let mut data_writer =
        csv::Writer::from_path(data_path).map_err(|source| csv_error(data_path, source))?;
    let size = set.size();
    for row in 0..size {
        let record: Vec<String> = (0..size)
            .map(|column| table.get(row, column).to_string())
            .collect();
        data_writer
            .write_record(&record)
            .map_err(|source| csv_error(data_path, source))?;
    }
    data_writer.flush().map_err(|source| Error::Open {
        path: data_path.to_owned(),
        source,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use approx::assert_relative_eq;

    use super::*;

    fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn threshold_clamps_small_values_to_zero() {
        let dir = tempfile::tempdir().unwrap();
        let index = write(dir.path(), "index.csv", "X,A\nX,B\n");
        let data = write(dir.path(), "data.csv", "0.1,1e-9\n2.0,0.5\n");
        let table: Table<f64> = read_table(&index, &data, 1e-6).unwrap();
        assert_relative_eq!(table.get(0, 0), 0.1);
        assert_relative_eq!(table.get(0, 1), 0.0);
        assert_relative_eq!(table.get(1, 0), 2.0);
        assert_relative_eq!(table.get(1, 1), 0.5);
    }

    #[test]
    fn round_trip_preserves_indices_and_values() {
        let dir = tempfile::tempdir().unwrap();
        let index = write(dir.path(), "index.csv", "X,A\nX,B\nY,B\n");
        let data = write(
            dir.path(),
            "data.csv",
            "1.5,0.25,3\n0.125,2,0.75\n4,0.5,1\n",
        );
        let table: Table<f64> = read_table(&index, &data, 0.0).unwrap();

        let out_index = dir.path().join("out_index.csv");
        let out_data = dir.path().join("out_data.csv");
        write_table(&table, &out_index, &out_data).unwrap();
        let reloaded: Table<f64> = read_table(&out_index, &out_data, 0.0).unwrap();

        assert_eq!(table.index_set().size(), reloaded.index_set().size());
        assert_eq!(table.raw_data(), reloaded.raw_data());
        assert_eq!(
            fs::read_to_string(&out_index).unwrap(),
            "X,A\nX,B\nY,B\n"
        );
    }

    #[test]
    fn short_rows_are_rejected_with_line_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let index = write(dir.path(), "index.csv", "X,A\nX,B\n");
        let data = write(dir.path(), "data.csv", "1,2\n3\n");
        let err = read_table::<f64>(&index, &data, 0.0).unwrap_err();
        assert!(matches!(err, Error::RowWidth { line: 2, .. }));
    }

    #[test]
    fn missing_rows_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let index = write(dir.path(), "index.csv", "X,A\nX,B\n");
        let data = write(dir.path(), "data.csv", "1,2\n");
        let err = read_table::<f64>(&index, &data, 0.0).unwrap_err();
        assert!(matches!(err, Error::NotEnoughRows { .. }));
    }

    #[test]
    fn duplicate_index_rows_carry_context() {
        let dir = tempfile::tempdir().unwrap();
        let index = write(dir.path(), "index.csv", "X,A\nX,A\n");
        let data = write(dir.path(), "data.csv", "1\n");
        let err = read_table::<f64>(&index, &data, 0.0).unwrap_err();
        assert!(matches!(err, Error::Table { line: 2, .. }));
    }

    #[test]
    fn unparsable_numbers_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let index = write(dir.path(), "index.csv", "X,A\n");
        let data = write(dir.path(), "data.csv", "abc\n");
        let err = read_table::<f64>(&index, &data, 0.0).unwrap_err();
        assert!(matches!(err, Error::Number { line: 1, .. }));
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2026 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of FlowWeave — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! The YAML run-settings model.
//!
//! ```yaml
//! table:
//!   index: flows_index.csv
//!   data: flows.csv
//!   threshold: 1e-6
//! subs:
//!   - { type: sector, id: A, into: [A1, A2] }
//! proxies:
//!   - file: population.csv
//!     columns:
//!       year: { type: select, value: "2015" }
//!       region: { type: subregion }
//!       population: { type: value }
//!     applications:
//!       - [r]
//! output:
//!   index: refined_index.csv
//!   data: refined.csv
//! ```

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use fw_proxy::{AxisKind, FlowPosition, Split};

use crate::error::{Error, Result};

/// Everything one batch run needs, read from a single YAML file.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub table: TableSpec,
    #[serde(default)]
    pub subs: Vec<SubSpec>,
    #[serde(default)]
    pub proxies: Vec<ProxySpec>,
    pub output: OutputSpec,
}

impl Settings {
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| Error::Open {
            path: path.to_owned(),
            source,
        })?;
        serde_yaml::from_reader(file).map_err(|source| Error::Yaml {
            path: path.to_owned(),
            source,
        })
    }

    /// The split instructions in declared order.
    pub fn splits(&self) -> Vec<Split> {
        self.subs
            .iter()
            .map(|sub| match sub.kind {
                SubKind::Sector => Split::Sector {
                    id: sub.id.clone(),
                    into: sub.into.clone(),
                },
                SubKind::Region => Split::Region {
                    id: sub.id.clone(),
                    into: sub.into.clone(),
                },
            })
            .collect()
    }
}

/// Base-table input: indices CSV, square data CSV and the load threshold
/// below which values are clamped to zero.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableSpec {
    pub index: PathBuf,
    pub data: PathBuf,
    #[serde(default)]
    pub threshold: f64,
}

/// Refined-table output, mirroring the input format at leaf resolution.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputSpec {
    pub index: PathBuf,
    pub data: PathBuf,
}

/// One split instruction.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubSpec {
    #[serde(rename = "type")]
    pub kind: SubKind,
    pub id: String,
    pub into: Vec<String>,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubKind {
    Sector,
    Region,
}

/// One proxy: its CSV source, the per-column schema and the applications.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProxySpec {
    pub file: PathBuf,
    pub columns: HashMap<String, ColumnSpec>,
    pub applications: Vec<Vec<PositionSpec>>,
}

/// Role of one CSV column. Columns of the file not named in the schema are
/// ignored.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ColumnSpec {
    /// Keep only rows whose cell equals the literal.
    Select { value: String },
    /// The numeric proxy value.
    Value,
    Sector {
        #[serde(default)]
        mapping: Option<MappingSpec>,
    },
    Subsector {
        #[serde(default)]
        mapping: Option<MappingSpec>,
    },
    Region {
        #[serde(default)]
        mapping: Option<MappingSpec>,
    },
    Subregion {
        #[serde(default)]
        mapping: Option<MappingSpec>,
    },
}

impl ColumnSpec {
    /// The axis kind of an index column, `None` for select/value columns.
    pub fn axis_kind(&self) -> Option<AxisKind> {
        match self {
            ColumnSpec::Select { .. } | ColumnSpec::Value => None,
            ColumnSpec::Sector { .. } => Some(AxisKind::Sector),
            ColumnSpec::Subsector { .. } => Some(AxisKind::Subsector),
            ColumnSpec::Region { .. } => Some(AxisKind::Region),
            ColumnSpec::Subregion { .. } => Some(AxisKind::Subregion),
        }
    }

    pub fn mapping(&self) -> Option<&MappingSpec> {
        match self {
            ColumnSpec::Select { .. } | ColumnSpec::Value => None,
            ColumnSpec::Sector { mapping }
            | ColumnSpec::Subsector { mapping }
            | ColumnSpec::Region { mapping }
            | ColumnSpec::Subregion { mapping } => mapping.as_ref(),
        }
    }
}

/// Foreign ↔ native bridge of one mapped index column.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MappingSpec {
    pub file: PathBuf,
    pub foreign_column: String,
    pub native_column: String,
}

/// Flow index an application assigns to one index column, in declaration
/// order.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PositionSpec {
    I,
    R,
    J,
    S,
}

impl From<PositionSpec> for FlowPosition {
    fn from(spec: PositionSpec) -> Self {
        match spec {
            PositionSpec::I => FlowPosition::I,
            PositionSpec::R => FlowPosition::R,
            PositionSpec::J => FlowPosition::J,
            PositionSpec::S => FlowPosition::S,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_settings_deserialise() {
        let yaml = r#"
table:
  index: base_index.csv
  data: base.csv
  threshold: 1e-6
subs:
  - { type: sector, id: A, into: [A1, A2] }
  - { type: region, id: X, into: [X1, X2] }
proxies:
  - file: population.csv
    columns:
      year: { type: select, value: "2015" }
      region: { type: subregion }
      population: { type: value }
      iso3: { type: region, mapping: { file: iso3.csv, foreign_column: iso3, native_column: region } }
    applications:
      - [r, s]
output:
  index: refined_index.csv
  data: refined.csv
"#;
        let settings: Settings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.table.threshold, 1e-6);
        assert_eq!(settings.subs.len(), 2);
        assert_eq!(settings.splits().len(), 2);
        let proxy = &settings.proxies[0];
        assert_eq!(proxy.columns.len(), 4);
        assert!(matches!(
            proxy.columns["year"],
            ColumnSpec::Select { .. }
        ));
        assert_eq!(
            proxy.columns["region"].axis_kind(),
            Some(AxisKind::Subregion)
        );
        assert_eq!(
            proxy.columns["iso3"].mapping().unwrap().foreign_column,
            "iso3"
        );
        assert_eq!(proxy.applications, vec![vec![PositionSpec::R, PositionSpec::S]]);
    }

    #[test]
    fn files_load_and_failures_carry_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("run.yml");
        std::fs::write(
            &good,
            "table: { index: i.csv, data: d.csv }\noutput: { index: oi.csv, data: od.csv }\n",
        )
        .unwrap();
        assert!(Settings::from_path(&good).is_ok());

        let bad = dir.path().join("bad.yml");
        std::fs::write(&bad, "table: [not, a, mapping]\n").unwrap();
        assert!(matches!(
            Settings::from_path(&bad),
            Err(Error::Yaml { .. })
        ));
        assert!(matches!(
            Settings::from_path(&dir.path().join("absent.yml")),
            Err(Error::Open { .. })
        ));
    }

    #[test]
    fn threshold_defaults_to_zero() {
        let yaml = r#"
table: { index: i.csv, data: d.csv }
output: { index: oi.csv, data: od.csv }
"#;
        let settings: Settings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.table.threshold, 0.0);
        assert!(settings.subs.is_empty());
        assert!(settings.proxies.is_empty());
    }
}

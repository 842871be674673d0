// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2026 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of FlowWeave — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! The `flowweave` batch binary: one settings file in, a refined table out.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use tracing::info;

use fw_core::Table;
use fw_io::Settings;
use fw_proxy::{Proxy, Refiner};

#[derive(Parser)]
#[command(
    name = "flowweave",
    version,
    disable_version_flag = true,
    about = "Regional and sectoral refinement of multi-regional input-output tables",
    long_about = "Splits selected sectors and regions of a multi-regional input-output \
table into finer parts and redistributes the flows along proxy evidence, conserving \
every aggregate of the base table."
)]
struct Cli {
    /// YAML run settings (base table, splits, proxies, output).
    settings: PathBuf,

    /// Print version information.
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    version: Option<bool>,
}

fn run(settings_path: &Path) -> fw_io::Result<()> {
    let settings = Settings::from_path(settings_path)?;

    info!(
        index = %settings.table.index.display(),
        data = %settings.table.data.display(),
        "loading base table"
    );
    let basetable: Table<f64> = fw_io::csv::read_table(
        &settings.table.index,
        &settings.table.data,
        settings.table.threshold,
    )?;
    info!(size = basetable.index_set().size(), "loaded base table");

    let splits = settings.splits();
    let mut refiner = Refiner::new(&basetable, &splits).map_err(|source| fw_io::Error::Proxy {
        path: settings_path.to_owned(),
        source,
    })?;

    for (number, proxy_spec) in settings.proxies.iter().enumerate() {
        info!(
            proxy = number + 1,
            file = %proxy_spec.file.display(),
            "applying proxy"
        );
        let proxy: Proxy<f64> = fw_io::proxy_csv::read_proxy(proxy_spec, refiner.index_set())?;
        refiner
            .apply(&proxy)
            .map_err(|source| fw_io::Error::Proxy {
                path: proxy_spec.file.clone(),
                source,
            })?;
    }

    let refined = refiner.finish();
    fw_io::csv::write_table(&refined, &settings.output.index, &settings.output.data)?;
    info!(
        size = refined.index_set().size(),
        output = %settings.output.data.display(),
        "wrote refined table"
    );
    Ok(())
}

fn main() -> ExitCode {
    weave_config::tracing::ensure_tracing();
    let cli = Cli::parse();
    match run(&cli.settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(255)
        }
    }
}

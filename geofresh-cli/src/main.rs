// SPDX-FileCopyrightText: 2026 Geofresh Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Geofresh CLI
//!
//! Command-line front end for the dataset refresh pipeline.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use geofresh_core::{
    DatasetInstance, DatasetKind, InstanceDetail, RefreshConfig, RefreshOutcome, SharedRegistry,
    Updater,
};

#[derive(Parser)]
#[command(name = "geofresh")]
#[command(version, about = "Keep geo datasets fresh on disk and in memory")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Data directory (default: platform data dir + "geofresh")
    #[arg(long, global = true, env = "GEOFRESH_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Proxy URL, e.g. socks5://127.0.0.1:9050
    #[arg(long, global = true, env = "GEOFRESH_PROXY")]
    proxy: Option<String>,

    /// HTTP timeout in seconds
    #[arg(long, global = true, env = "GEOFRESH_TIMEOUT", default_value_t = 90)]
    timeout: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, validate and commit the selected datasets
    Update {
        /// Dataset to refresh
        #[arg(value_enum, default_value = "all")]
        kind: KindArg,

        /// Override the local file path (single dataset only)
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// Show the currently loadable datasets
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum KindArg {
    All,
    Mmdb,
    Asn,
    Geoip,
    Geosite,
}

impl KindArg {
    fn kind(self) -> Option<DatasetKind> {
        match self {
            KindArg::All => None,
            KindArg::Mmdb => Some(DatasetKind::Mmdb),
            KindArg::Asn => Some(DatasetKind::Asn),
            KindArg::Geoip => Some(DatasetKind::GeoIp),
            KindArg::Geosite => Some(DatasetKind::GeoSite),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let data_dir = cli.data_dir.unwrap_or_else(|| {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("geofresh")
    });
    std::fs::create_dir_all(&data_dir)?;

    let mut config = RefreshConfig::default().with_storage_dir(data_dir);
    config.timeout = Duration::from_secs(cli.timeout);
    if let Some(proxy) = cli.proxy {
        config = config.with_proxy(proxy);
    }

    match cli.command {
        Commands::Update { kind, path } => update(config, kind, path),
        Commands::Status => status(config),
    }
}

fn update(config: RefreshConfig, kind: KindArg, path: Option<PathBuf>) -> Result<()> {
    let registry = SharedRegistry::new(config.clone());
    let updater = Updater::new(config, registry);

    let results = match kind.kind() {
        Some(kind) => vec![(kind, updater.refresh(kind, path.as_deref()))],
        None => {
            if path.is_some() {
                bail!("--path only applies to a single dataset");
            }
            updater.refresh_all()
        }
    };

    let mut failures = 0;
    for (kind, result) in results {
        match result {
            Ok(RefreshOutcome::Updated) => println!("{kind}: updated"),
            Ok(RefreshOutcome::Unchanged) => println!("{kind}: already up to date"),
            Err(err) => {
                failures += 1;
                eprintln!("{kind}: {err}");
            }
        }
    }
    if failures > 0 {
        bail!("{failures} dataset(s) failed to refresh");
    }
    Ok(())
}

fn status(config: RefreshConfig) -> Result<()> {
    let registry = SharedRegistry::new(config.clone());
    registry.load_all();

    for kind in DatasetKind::ALL {
        match registry.current(kind) {
            Some(instance) => println!("{kind}: {}", describe(&instance)),
            None => println!("{kind}: not available ({})", config.path_for(kind).display()),
        }
    }
    Ok(())
}

fn describe(instance: &DatasetInstance) -> String {
    match &instance.detail {
        InstanceDetail::Database(metadata) => format!(
            "{} ({} nodes, {}-bit records, hash {})",
            metadata.database_type, metadata.node_count, metadata.record_size, instance.hash
        ),
        InstanceDetail::List { entries } => {
            format!("{} entries, hash {}", entries, instance.hash)
        }
    }
}

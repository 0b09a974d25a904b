//! PKI setup tool for the Palisade platform
//!
//! Provisions the root CA and per-service TLS material, then moves it
//! into the runtime secrets directory through one of four commands:
//! - `generate` mints a fresh PKI and deploys it
//! - `cache` populates the PKI cache once, then deploys from it
//! - `import` deploys externally provisioned cached material
//! - `legacy` runs the raw generator for old-style callers
// Copyright 2025 Francisco F. Pinochet
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


use clap::{Parser, Subcommand};
use palisade_config::SetupConfig;
use palisade_logging::init_console_logging;
use palisade_pki_init::{PkiInit, RcgenGenerator};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

const TOOL_NAME: &str = "palisade-pki-init";

/// No subcommand was selected
const EXIT_NO_OPTION: u8 = 1;
/// A command ran and failed
const EXIT_ERROR: u8 = 2;

#[derive(Parser)]
#[command(name = TOOL_NAME, about = "Provision TLS material for Palisade services")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a fresh PKI and deploy it to the runtime secrets directory
    Generate,
    /// Populate the PKI cache on first run, then deploy the cached material
    Cache,
    /// Deploy previously cached or externally provisioned material
    Import,
    /// Run the TLS generator against a single descriptor file
    Legacy {
        /// Path to the JSON descriptor
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match SetupConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    init_console_logging(TOOL_NAME, config.log_level());

    let Some(command) = cli.command else {
        error!("no subcommand selected; expected one of generate, cache, import, legacy");
        return ExitCode::from(EXIT_NO_OPTION);
    };

    let pki_init = PkiInit::new(config, Arc::new(RcgenGenerator));

    let result = match command {
        Command::Generate => pki_init.generate().await,
        Command::Cache => pki_init.cache().await,
        Command::Import => pki_init.import().await,
        Command::Legacy { config } => pki_init.legacy(&config).await,
    };

    match result {
        Ok(()) => {
            info!("done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "command failed");
            ExitCode::from(EXIT_ERROR)
        }
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Executable that runs the warden, the dynamic-firewall reconciler service

use anyhow::{anyhow, Context};
use camino::Utf8PathBuf;
use clap::Parser;
use sg_warden::store::HttpRuleStore;
use sg_warden::Config;
use slog::o;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[clap(name = "sg-warden", about = "Dynamic-firewall reconciler service")]
struct Args {
    #[clap(long, action)]
    config_file: Utf8PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();
    let config = Config::from_file(&args.config_file).with_context(|| {
        format!("read config file {:?}", args.config_file)
    })?;

    let log = config
        .log
        .to_logger("sg-warden")
        .context("failed to create logger")?;

    let store = HttpRuleStore::new(
        &config.store,
        log.new(o!("component" => "rule-store")),
    )
    .context("initializing rule store client")?;

    let server =
        sg_warden::start_server(&config, Arc::new(store), &log).await?;
    server
        .await
        .map_err(|error_message| anyhow!("server exiting: {}", error_message))
}

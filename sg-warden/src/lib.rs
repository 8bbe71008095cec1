// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! sg-warden: a dynamic-firewall reconciler.
//!
//! Given the address of an inbound HTTP caller, rewrite a single remote
//! security group so that its TCP ingress rules allow traffic only from
//! the caller's /16. This lets one maintenance endpoint "follow" a roaming
//! administrator's network without hand-editing firewall rules.
//!
//! The pieces:
//!
//! 1. [`warden_types::address`] — pure mapping from a caller address to
//!    the /16 trust window.
//! 2. [`reconcile::Reconciler`] — the two-phase (revoke-then-authorize)
//!    replacement of the group's eligible rules against a
//!    [`store::RuleStore`].
//! 3. A dropshot server exposing the trigger endpoint (`warden-api`).
//!
//! The Rule Store is the sole source of truth for rule state; this service
//! keeps nothing across invocations.

pub mod config;
mod context;
pub mod error;
mod http_entrypoints;
pub mod reconcile;
pub mod sim;
pub mod store;

pub use config::Config;
pub use context::ServerContext;

use crate::store::RuleStore;
use anyhow::anyhow;
use slog::{info, o, Logger};
use std::sync::Arc;

/// Start the warden's dropshot server over the given Rule Store client.
pub async fn start_server(
    config: &Config,
    store: Arc<dyn RuleStore>,
    log: &Logger,
) -> Result<dropshot::HttpServer<Arc<ServerContext>>, anyhow::Error> {
    info!(
        log, "setting up warden server";
        "target_group" => %config.target_group,
    );
    let apictx = ServerContext::new(config, store, log);
    let server = dropshot::ServerBuilder::new(
        http_entrypoints::api(),
        apictx,
        log.new(o!("component" => "dropshot")),
    )
    .config(config.dropshot.clone())
    .start()
    .map_err(|error| anyhow!("setting up HTTP server: {:#}", error))?;
    Ok(server)
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP entrypoint functions for the warden service

use crate::context::ServerContext;
use crate::error::{Error, ReconcileError};
use dropshot::{
    ApiDescription, HttpError, HttpResponseOk, RequestContext,
};
use slog::info;
use std::net::IpAddr;
use std::sync::Arc;
use warden_api::{RefreshResult, WardenApi};
use warden_types::address;
use warden_types::rules::IngressRule;

type WardenApiDescription = ApiDescription<Arc<ServerContext>>;

/// Returns a description of the warden API
pub fn api() -> WardenApiDescription {
    warden_api::warden_api_mod::api_description::<WardenImpl>()
        .expect("entrypoints registered successfully")
}

enum WardenImpl {}

impl WardenApi for WardenImpl {
    type Context = Arc<ServerContext>;

    async fn ingress_refresh(
        rqctx: RequestContext<Self::Context>,
    ) -> Result<HttpResponseOk<RefreshResult>, HttpError> {
        let apictx = rqctx.context();
        let source = source_address(&rqctx)?;
        let allowed = address::coarse_network(source)
            .map_err(Error::Address)?;
        info!(
            rqctx.log, "refresh triggered";
            "group" => %apictx.target_group,
            "source" => %source,
            "allowed" => %allowed,
        );

        let outcome = apictx
            .reconciler
            .reconcile(&apictx.target_group, allowed)
            .await
            .map_err(Error::Reconcile)?;
        Ok(HttpResponseOk(RefreshResult {
            message: outcome.message(&apictx.target_group),
        }))
    }

    async fn ingress_rules_get(
        rqctx: RequestContext<Self::Context>,
    ) -> Result<HttpResponseOk<Vec<IngressRule>>, HttpError> {
        let apictx = rqctx.context();
        let rules = apictx
            .store
            .describe_rules(&apictx.target_group)
            .await
            .map_err(|err| {
                Error::Reconcile(ReconcileError::StoreRead {
                    group: apictx.target_group.clone(),
                    err,
                })
            })?;
        Ok(HttpResponseOk(rules))
    }
}

/// Determine the caller's address for this request.
///
/// The connection's remote address, unless the server is configured to
/// trust `X-Forwarded-For` (in which case the header's first entry is the
/// source the fronting proxy saw, and it must parse as an IPv4 dotted-quad).
fn source_address(
    rqctx: &RequestContext<Arc<ServerContext>>,
) -> Result<IpAddr, Error> {
    let apictx = rqctx.context();
    if apictx.trust_forwarded_for {
        if let Some(forwarded) =
            rqctx.request.headers().get("x-forwarded-for")
        {
            let first = forwarded
                .to_str()
                .ok()
                .and_then(|value| value.split(',').next())
                .unwrap_or("")
                .trim();
            let addr = address::parse_source_address(first)
                .map_err(Error::Address)?;
            return Ok(IpAddr::V4(addr));
        }
    }
    Ok(rqctx.request.remote_addr().ip())
}

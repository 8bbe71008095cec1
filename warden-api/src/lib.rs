// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP API for sg-warden, the dynamic-firewall reconciler.

use dropshot::{HttpError, HttpResponseOk, RequestContext};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use warden_types::rules::IngressRule;

#[dropshot::api_description]
pub trait WardenApi {
    type Context;

    /// Re-point the target security group's ingress rules at the caller.
    ///
    /// Replaces the source network of every eligible TCP ingress rule with
    /// the caller's /16. The caller's address is taken from the connection
    /// (or, if the server is configured to trust it, from the first
    /// `X-Forwarded-For` entry). Returns 200 with a human-readable message
    /// on every terminal outcome, including "the group has no rules to
    /// manage".
    #[endpoint {
        method = POST,
        path = "/ingress/refresh",
    }]
    async fn ingress_refresh(
        rqctx: RequestContext<Self::Context>,
    ) -> Result<HttpResponseOk<RefreshResult>, HttpError>;

    /// List the target security group's current rules.
    ///
    /// Read-only pass-through to the Rule Store, for operators checking
    /// what a refresh actually did.
    #[endpoint {
        method = GET,
        path = "/ingress/rules",
    }]
    async fn ingress_rules_get(
        rqctx: RequestContext<Self::Context>,
    ) -> Result<HttpResponseOk<Vec<IngressRule>>, HttpError>;
}

/// Result of a refresh request.
#[derive(Clone, Debug, Deserialize, JsonSchema, Serialize)]
pub struct RefreshResult {
    pub message: String,
}

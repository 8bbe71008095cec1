// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Client interface to the Rule Store, the remote service that owns the
//! security group rules.

use crate::config::StoreConfig;
use async_trait::async_trait;
use serde::Deserialize;
use slog::{debug, Logger};
use std::time::Duration;
use thiserror::Error;
use warden_types::rules::{GroupId, IngressRule, RuleSpec};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("request to rule store failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The store answered but did not acknowledge the change. Treated
    /// exactly like a transport failure: the phase is aborted.
    #[error("rule store did not acknowledge the request")]
    Unacknowledged,
}

/// The three Rule Store operations the reconciler consumes.
///
/// Revoke and authorize each take one batched list of rule tuples; the
/// store applies a batch all-or-nothing, so a single bad tuple fails the
/// whole phase.
#[async_trait]
pub trait RuleStore: Send + Sync {
    async fn describe_rules(
        &self,
        group: &GroupId,
    ) -> Result<Vec<IngressRule>, StoreError>;

    async fn revoke_ingress(
        &self,
        group: &GroupId,
        specs: &[RuleSpec],
    ) -> Result<(), StoreError>;

    async fn authorize_ingress(
        &self,
        group: &GroupId,
        specs: &[RuleSpec],
    ) -> Result<(), StoreError>;
}

/// Acknowledgment returned by the store's write operations.
#[derive(Debug, Deserialize)]
struct StoreAck {
    success: bool,
}

/// `RuleStore` implementation over the store's HTTP API.
///
/// The client handle is constructed once at startup and shared for the
/// lifetime of the process; connection reuse lives in `reqwest`, not here.
pub struct HttpRuleStore {
    client: reqwest::Client,
    base_url: String,
    log: Logger,
}

impl HttpRuleStore {
    pub fn new(
        config: &StoreConfig,
        log: Logger,
    ) -> Result<HttpRuleStore, StoreError> {
        let client = reqwest::ClientBuilder::new()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(HttpRuleStore {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            log,
        })
    }

    fn rules_url(&self, group: &GroupId, suffix: &str) -> String {
        format!("{}/groups/{}/rules{}", self.base_url, group, suffix)
    }

    async fn post_specs(
        &self,
        url: String,
        specs: &[RuleSpec],
    ) -> Result<(), StoreError> {
        let ack: StoreAck = self
            .client
            .post(&url)
            .json(specs)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if !ack.success {
            return Err(StoreError::Unacknowledged);
        }
        Ok(())
    }
}

#[async_trait]
impl RuleStore for HttpRuleStore {
    async fn describe_rules(
        &self,
        group: &GroupId,
    ) -> Result<Vec<IngressRule>, StoreError> {
        let url = self.rules_url(group, "");
        debug!(self.log, "fetching rules"; "url" => &url);
        let rules = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(rules)
    }

    async fn revoke_ingress(
        &self,
        group: &GroupId,
        specs: &[RuleSpec],
    ) -> Result<(), StoreError> {
        let url = self.rules_url(group, "/revoke");
        debug!(
            self.log, "revoking ingress rules";
            "url" => &url,
            "specs" => ?specs,
        );
        self.post_specs(url, specs).await
    }

    async fn authorize_ingress(
        &self,
        group: &GroupId,
        specs: &[RuleSpec],
    ) -> Result<(), StoreError> {
        let url = self.rules_url(group, "/authorize");
        debug!(
            self.log, "authorizing ingress rules";
            "url" => &url,
            "specs" => ?specs,
        );
        self.post_specs(url, specs).await
    }
}

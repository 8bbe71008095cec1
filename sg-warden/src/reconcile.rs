// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The rule-selection-and-replacement core.
//!
//! Each reconciliation is one linear pass: fetch the group's rules, select
//! the ones we manage, revoke them in a single batch, then authorize
//! replacements pointing at the new allowed network in a single batch. The
//! two write phases are not atomic. Between a successful revoke and a
//! completed authorize the group has zero matching ingress rules for the
//! affected ports: briefly locked out, never briefly wide open. We accept
//! that window rather than reordering the phases, which would trade it for
//! a briefly over-permissive one. Do not flip the order without a decision
//! on that trade-off.

use crate::error::ReconcileError;
use crate::store::RuleStore;
use oxnet::Ipv4Net;
use slog::{debug, info, warn, Logger};
use std::sync::Arc;
use warden_types::rules::{GroupId, IngressRule, RuleSpec};

/// Terminal states of a successful reconciliation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// The group has no rules at all; nothing to manage.
    NoRulesInGroup,
    /// The group has rules, but none of the shape we manage.
    NoEligibleRules,
    /// Every eligible rule now allows only the given network.
    Replaced { count: usize, allowed: Ipv4Net },
}

impl Outcome {
    /// Human-readable summary for the trigger's response body.
    pub fn message(&self, group: &GroupId) -> String {
        match self {
            Outcome::NoRulesInGroup => {
                format!("no rules found for security group {group}")
            }
            Outcome::NoEligibleRules => format!(
                "no eligible ingress rules found for security group {group}"
            ),
            Outcome::Replaced { count, allowed } => format!(
                "replaced {count} ingress rules for security group {group}; \
                 allowed source network is now {allowed}"
            ),
        }
    }
}

pub struct Reconciler {
    store: Arc<dyn RuleStore>,
    log: Logger,
}

impl Reconciler {
    pub fn new(store: Arc<dyn RuleStore>, log: Logger) -> Reconciler {
        Reconciler { store, log }
    }

    /// Re-point `group`'s eligible ingress rules at `allowed`.
    ///
    /// Reads the group's rules fresh from the store, revokes every eligible
    /// rule by its exact current tuple, then authorizes the same
    /// protocol/port tuples with `allowed` as the source. No retries, no
    /// rollback: a revoke failure leaves the group untouched, an authorize
    /// failure leaves it revoked (see [`ReconcileError::rules_state`]).
    ///
    /// Concurrent reconciliations of the same group are not coordinated;
    /// an overlapping writer can make our revoke miss and fail the phase.
    pub async fn reconcile(
        &self,
        group: &GroupId,
        allowed: Ipv4Net,
    ) -> Result<Outcome, ReconcileError> {
        let rules = self.store.describe_rules(group).await.map_err(|err| {
            ReconcileError::StoreRead { group: group.clone(), err }
        })?;
        if rules.is_empty() {
            info!(
                self.log, "group has no rules; nothing to do";
                "group" => %group,
            );
            return Ok(Outcome::NoRulesInGroup);
        }

        let current: Vec<RuleSpec> =
            rules.iter().filter_map(IngressRule::replacement_spec).collect();
        if current.is_empty() {
            info!(
                self.log, "group has no eligible ingress rules";
                "group" => %group,
                "total_rules" => rules.len(),
            );
            return Ok(Outcome::NoEligibleRules);
        }
        debug!(
            self.log, "selected rules for replacement";
            "group" => %group,
            "eligible" => current.len(),
            "total_rules" => rules.len(),
            "allowed" => %allowed,
        );

        // Phase A: revoke the eligible rules exactly as currently stored.
        // On failure nothing has changed yet and the authorize phase must
        // not run.
        self.store.revoke_ingress(group, &current).await.map_err(|err| {
            warn!(
                self.log, "failed to revoke ingress rules";
                "group" => %group,
                "error" => %err,
            );
            ReconcileError::Revoke {
                group: group.clone(),
                count: current.len(),
                err,
            }
        })?;

        // Phase B: authorize the same tuples with the new source network.
        let replacements: Vec<RuleSpec> =
            current.iter().map(|spec| spec.with_source(allowed)).collect();
        self.store.authorize_ingress(group, &replacements).await.map_err(
            |err| {
                warn!(
                    self.log,
                    "failed to authorize replacement rules; group is left \
                     with its eligible rules revoked";
                    "group" => %group,
                    "error" => %err,
                );
                ReconcileError::Authorize {
                    group: group.clone(),
                    count: replacements.len(),
                    err,
                }
            },
        )?;

        info!(
            self.log, "replaced ingress rules";
            "group" => %group,
            "count" => replacements.len(),
            "allowed" => %allowed,
        );
        Ok(Outcome::Replaced { count: replacements.len(), allowed })
    }
}

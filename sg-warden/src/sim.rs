// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Simulated Rule Store, for testing the reconciler and the HTTP surface
//! without a real remote service.

use crate::store::{RuleStore, StoreError};
use async_trait::async_trait;
use oxnet::IpNet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use warden_types::rules::{GroupId, IngressRule, Protocol, RuleId, RuleSpec};

/// In-memory `RuleStore` with failure injection.
///
/// Mirrors the semantics the reconciler depends on: revocation matches
/// rules by full tuple equality and applies a batch all-or-nothing, and
/// every write invalidates rule ids (authorized replacements get fresh
/// ones). Batched calls are recorded so tests can assert exactly what each
/// phase sent.
pub struct SimRuleStore {
    inner: Mutex<Inner>,
    fail_revoke: AtomicBool,
    fail_authorize: AtomicBool,
}

#[derive(Default)]
struct Inner {
    rules: Vec<IngressRule>,
    next_id: u64,
    revoke_calls: Vec<Vec<RuleSpec>>,
    authorize_calls: Vec<Vec<RuleSpec>>,
}

impl Inner {
    fn fresh_id(&mut self) -> RuleId {
        let id = RuleId(format!("sim-rule-{}", self.next_id));
        self.next_id += 1;
        id
    }
}

impl SimRuleStore {
    pub fn new() -> Arc<SimRuleStore> {
        Arc::new(SimRuleStore {
            inner: Mutex::new(Inner::default()),
            fail_revoke: AtomicBool::new(false),
            fail_authorize: AtomicBool::new(false),
        })
    }

    /// Insert a rule directly into the store, returning its id.
    pub fn seed_rule(
        &self,
        group: &GroupId,
        egress: bool,
        protocol: Protocol,
        from_port: Option<u16>,
        to_port: Option<u16>,
        source: Option<IpNet>,
    ) -> RuleId {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.fresh_id();
        inner.rules.push(IngressRule {
            id: id.clone(),
            group: group.clone(),
            egress,
            protocol,
            from_port,
            to_port,
            source,
        });
        id
    }

    /// Snapshot of every rule currently in the store.
    pub fn rules(&self) -> Vec<IngressRule> {
        self.inner.lock().unwrap().rules.clone()
    }

    /// Make revoke requests fail with a non-success acknowledgment.
    pub fn set_fail_revoke(&self, fail: bool) {
        self.fail_revoke.store(fail, Ordering::SeqCst);
    }

    /// Make authorize requests fail with a non-success acknowledgment.
    pub fn set_fail_authorize(&self, fail: bool) {
        self.fail_authorize.store(fail, Ordering::SeqCst);
    }

    /// Every batched revoke request received, in order.
    pub fn revoke_calls(&self) -> Vec<Vec<RuleSpec>> {
        self.inner.lock().unwrap().revoke_calls.clone()
    }

    /// Every batched authorize request received, in order.
    pub fn authorize_calls(&self) -> Vec<Vec<RuleSpec>> {
        self.inner.lock().unwrap().authorize_calls.clone()
    }
}

#[async_trait]
impl RuleStore for SimRuleStore {
    async fn describe_rules(
        &self,
        group: &GroupId,
    ) -> Result<Vec<IngressRule>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .rules
            .iter()
            .filter(|rule| rule.group == *group)
            .cloned()
            .collect())
    }

    async fn revoke_ingress(
        &self,
        group: &GroupId,
        specs: &[RuleSpec],
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.revoke_calls.push(specs.to_vec());
        if self.fail_revoke.load(Ordering::SeqCst) {
            return Err(StoreError::Unacknowledged);
        }

        // Match each spec to a distinct stored rule by full tuple equality.
        // Any unmatched spec fails the whole batch with nothing removed.
        let mut matched: Vec<usize> = Vec::with_capacity(specs.len());
        for spec in specs {
            let found = inner.rules.iter().enumerate().find(|(i, rule)| {
                !matched.contains(i)
                    && rule.group == *group
                    && !rule.egress
                    && rule.protocol == spec.protocol
                    && rule.from_port == Some(spec.from_port)
                    && rule.to_port == Some(spec.to_port)
                    && rule.source == Some(IpNet::V4(spec.source))
            });
            match found {
                Some((i, _)) => matched.push(i),
                None => return Err(StoreError::Unacknowledged),
            }
        }
        matched.sort_unstable();
        for i in matched.into_iter().rev() {
            inner.rules.remove(i);
        }
        Ok(())
    }

    async fn authorize_ingress(
        &self,
        group: &GroupId,
        specs: &[RuleSpec],
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.authorize_calls.push(specs.to_vec());
        if self.fail_authorize.load(Ordering::SeqCst) {
            return Err(StoreError::Unacknowledged);
        }

        for spec in specs {
            let id = inner.fresh_id();
            inner.rules.push(IngressRule {
                id,
                group: group.clone(),
                egress: false,
                protocol: spec.protocol,
                from_port: Some(spec.from_port),
                to_port: Some(spec.to_port),
                source: Some(IpNet::V4(spec.source)),
            });
        }
        Ok(())
    }
}

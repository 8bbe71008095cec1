// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error handling facilities for the warden service.

use crate::store::StoreError;
use dropshot::HttpError;
use thiserror::Error;
use warden_types::address::AddressError;
use warden_types::rules::GroupId;

/// A failed reconciliation.
///
/// The rule replacement is a two-step saga with no atomicity across steps,
/// so each variant pins down how far the saga got;
/// [`ReconcileError::rules_state`] reports what that means for the group's
/// rules.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("failed to read rules for group {group}: {err}")]
    StoreRead {
        group: GroupId,
        #[source]
        err: StoreError,
    },
    #[error("failed to revoke {count} ingress rules from group {group}: {err}")]
    Revoke {
        group: GroupId,
        count: usize,
        #[source]
        err: StoreError,
    },
    #[error(
        "failed to authorize replacement ingress rules for group {group}: \
         {err}; {count} rules were revoked and not replaced"
    )]
    Authorize {
        group: GroupId,
        count: usize,
        #[source]
        err: StoreError,
    },
}

/// What a failed reconciliation left behind in the Rule Store.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RulesState {
    /// The group's rules are exactly as they were before the invocation.
    Untouched,
    /// The eligible rules were revoked and never replaced: the affected
    /// ports are closed to everyone until an operator intervenes.
    Revoked,
}

impl ReconcileError {
    pub fn rules_state(&self) -> RulesState {
        match self {
            ReconcileError::StoreRead { .. } | ReconcileError::Revoke { .. } => {
                RulesState::Untouched
            }
            ReconcileError::Authorize { .. } => RulesState::Revoked,
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum Error {
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

impl From<Error> for HttpError {
    fn from(err: Error) -> Self {
        match err {
            Error::Address(inner) => HttpError::for_bad_request(
                Some("MalformedAddress".to_string()),
                inner.to_string(),
            ),
            Error::Reconcile(inner @ ReconcileError::StoreRead { .. }) => {
                HttpError::for_unavail(
                    Some("StoreReadError".to_string()),
                    inner.to_string(),
                )
            }
            // Nothing was changed; the caller may retry once the store is
            // reachable again.
            Error::Reconcile(inner @ ReconcileError::Revoke { .. }) => {
                HttpError::for_unavail(
                    Some("RevokeError".to_string()),
                    inner.to_string(),
                )
            }
            // The group is stuck mid-saga with its rules revoked. This is
            // the one failure that requires manual remediation, so it gets
            // the highest-severity class and the operator-facing message
            // goes in the external body, not just the server log.
            Error::Reconcile(inner @ ReconcileError::Authorize { .. }) => {
                let mut http_err =
                    HttpError::for_internal_error(inner.to_string());
                http_err.error_code = Some("AuthorizeError".to_string());
                http_err.external_message = format!(
                    "{inner}; the group requires manual remediation"
                );
                http_err
            }
        }
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::config::Config;
use crate::reconcile::Reconciler;
use crate::store::RuleStore;
use slog::{o, Logger};
use std::sync::Arc;
use warden_types::rules::GroupId;

/// Shared state used by API request handlers
pub struct ServerContext {
    pub target_group: GroupId,
    pub trust_forwarded_for: bool,
    pub reconciler: Reconciler,
    pub store: Arc<dyn RuleStore>,
}

impl ServerContext {
    pub fn new(
        config: &Config,
        store: Arc<dyn RuleStore>,
        log: &Logger,
    ) -> Arc<Self> {
        Arc::new(ServerContext {
            target_group: config.target_group.clone(),
            trust_forwarded_for: config.trust_forwarded_for,
            reconciler: Reconciler::new(
                Arc::clone(&store),
                log.new(o!("component" => "reconciler")),
            ),
            store,
        })
    }
}

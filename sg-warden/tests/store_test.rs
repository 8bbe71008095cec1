// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tests of the HTTP Rule Store client against an in-process stub store.

use dropshot::test_util::LogContext;
use dropshot::{
    endpoint, ApiDescription, ConfigDropshot, ConfigLogging,
    ConfigLoggingLevel, HttpError, HttpResponseOk, Path, RequestContext,
    ServerBuilder, TypedBody,
};
use oxnet::IpNet;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sg_warden::config::StoreConfig;
use sg_warden::store::{HttpRuleStore, RuleStore, StoreError};
use slog::o;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use warden_types::rules::{GroupId, IngressRule, Protocol, RuleId, RuleSpec};

/// Serves the store's wire API with canned data, recording every write
/// batch it receives.
struct StubStore {
    rules: Vec<IngressRule>,
    ack_success: AtomicBool,
    revoked: Mutex<Vec<Vec<RuleSpec>>>,
    authorized: Mutex<Vec<Vec<RuleSpec>>>,
}

#[derive(Deserialize, JsonSchema)]
struct GroupPath {
    group: String,
}

#[derive(Serialize, JsonSchema)]
struct Ack {
    success: bool,
}

#[endpoint {
    method = GET,
    path = "/groups/{group}/rules",
}]
async fn stub_rules_get(
    rqctx: RequestContext<Arc<StubStore>>,
    path: Path<GroupPath>,
) -> Result<HttpResponseOk<Vec<IngressRule>>, HttpError> {
    let stub = rqctx.context();
    let group = GroupId(path.into_inner().group);
    if group.0 == "sg-broken" {
        return Err(HttpError::for_internal_error(
            "stub store is down".to_string(),
        ));
    }
    Ok(HttpResponseOk(
        stub.rules.iter().filter(|rule| rule.group == group).cloned().collect(),
    ))
}

#[endpoint {
    method = POST,
    path = "/groups/{group}/rules/revoke",
}]
async fn stub_rules_revoke(
    rqctx: RequestContext<Arc<StubStore>>,
    _path: Path<GroupPath>,
    body: TypedBody<Vec<RuleSpec>>,
) -> Result<HttpResponseOk<Ack>, HttpError> {
    let stub = rqctx.context();
    stub.revoked.lock().unwrap().push(body.into_inner());
    Ok(HttpResponseOk(Ack {
        success: stub.ack_success.load(Ordering::SeqCst),
    }))
}

#[endpoint {
    method = POST,
    path = "/groups/{group}/rules/authorize",
}]
async fn stub_rules_authorize(
    rqctx: RequestContext<Arc<StubStore>>,
    _path: Path<GroupPath>,
    body: TypedBody<Vec<RuleSpec>>,
) -> Result<HttpResponseOk<Ack>, HttpError> {
    let stub = rqctx.context();
    stub.authorized.lock().unwrap().push(body.into_inner());
    Ok(HttpResponseOk(Ack {
        success: stub.ack_success.load(Ordering::SeqCst),
    }))
}

struct StoreTestContext {
    stub: Arc<StubStore>,
    server: dropshot::HttpServer<Arc<StubStore>>,
    store: HttpRuleStore,
    logctx: LogContext,
}

impl StoreTestContext {
    async fn cleanup(self) {
        self.server.close().await.expect("failed to clean up stub store");
        self.logctx.cleanup_successful();
    }
}

async fn init_stub(
    test_name: &str,
    rules: Vec<IngressRule>,
) -> StoreTestContext {
    let logging =
        ConfigLogging::StderrTerminal { level: ConfigLoggingLevel::Info };
    let logctx = LogContext::new(test_name, &logging);

    let mut api = ApiDescription::new();
    api.register(stub_rules_get).unwrap();
    api.register(stub_rules_revoke).unwrap();
    api.register(stub_rules_authorize).unwrap();

    let stub = Arc::new(StubStore {
        rules,
        ack_success: AtomicBool::new(true),
        revoked: Mutex::new(Vec::new()),
        authorized: Mutex::new(Vec::new()),
    });

    let mut dropshot = ConfigDropshot::default();
    dropshot.bind_address = "127.0.0.1:0".parse().unwrap();
    let server = ServerBuilder::new(
        api,
        stub.clone(),
        logctx.log.new(o!("component" => "stub-store")),
    )
    .config(dropshot)
    .start()
    .expect("failed to start stub store");

    let store = HttpRuleStore::new(
        &StoreConfig {
            base_url: format!("http://{}", server.local_addr()),
            request_timeout_secs: 15,
        },
        logctx.log.new(o!("component" => "store-client")),
    )
    .expect("failed to build store client");

    StoreTestContext { stub, server, store, logctx }
}

fn stub_rule(id: &str, group: &str) -> IngressRule {
    IngressRule {
        id: RuleId(id.to_string()),
        group: GroupId(group.to_string()),
        egress: false,
        protocol: Protocol::Tcp,
        from_port: Some(443),
        to_port: Some(443),
        source: Some(IpNet::V4("198.51.100.0/24".parse().unwrap())),
    }
}

fn spec(from_port: u16, to_port: u16, source: &str) -> RuleSpec {
    RuleSpec {
        protocol: Protocol::Tcp,
        from_port,
        to_port,
        source: source.parse().unwrap(),
    }
}

#[tokio::test]
async fn test_store_describe_rules() {
    let ctx = init_stub(
        "test_store_describe_rules",
        vec![
            stub_rule("rule-1", "sg-a"),
            stub_rule("rule-2", "sg-a"),
            stub_rule("rule-3", "sg-b"),
        ],
    )
    .await;

    let rules = ctx
        .store
        .describe_rules(&GroupId("sg-a".to_string()))
        .await
        .expect("failed to fetch rules");
    assert_eq!(
        rules,
        vec![stub_rule("rule-1", "sg-a"), stub_rule("rule-2", "sg-a")]
    );

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_store_writes_pass_specs_through() {
    let ctx = init_stub("test_store_writes_pass_specs_through", vec![]).await;
    let group = GroupId("sg-a".to_string());
    let specs =
        vec![spec(22, 22, "1.2.0.0/16"), spec(443, 443, "198.51.0.0/16")];

    ctx.store
        .revoke_ingress(&group, &specs)
        .await
        .expect("revoke was not acknowledged");
    ctx.store
        .authorize_ingress(&group, &specs)
        .await
        .expect("authorize was not acknowledged");

    // Each write arrives as one batch carrying the exact rule tuples.
    assert_eq!(*ctx.stub.revoked.lock().unwrap(), vec![specs.clone()]);
    assert_eq!(*ctx.stub.authorized.lock().unwrap(), vec![specs]);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_store_unacknowledged_write_is_an_error() {
    let ctx =
        init_stub("test_store_unacknowledged_write_is_an_error", vec![]).await;
    let group = GroupId("sg-a".to_string());
    let specs = vec![spec(22, 22, "1.2.0.0/16")];

    // A well-formed response whose body says `success: false` must surface
    // as a failure of the phase.
    ctx.stub.ack_success.store(false, Ordering::SeqCst);
    let err = ctx.store.revoke_ingress(&group, &specs).await.unwrap_err();
    assert!(matches!(err, StoreError::Unacknowledged), "error: {err}");
    let err = ctx.store.authorize_ingress(&group, &specs).await.unwrap_err();
    assert!(matches!(err, StoreError::Unacknowledged), "error: {err}");

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_store_error_status_is_a_transport_error() {
    let ctx =
        init_stub("test_store_error_status_is_a_transport_error", vec![])
            .await;

    let err = ctx
        .store
        .describe_rules(&GroupId("sg-broken".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Transport(_)), "error: {err}");

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_store_unreachable_is_a_transport_error() {
    let StoreTestContext { server, store, logctx, .. } =
        init_stub("test_store_unreachable_is_a_transport_error", vec![]).await;
    server.close().await.expect("failed to clean up stub store");

    let err = store
        .describe_rules(&GroupId("sg-a".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Transport(_)), "error: {err}");

    logctx.cleanup_successful();
}

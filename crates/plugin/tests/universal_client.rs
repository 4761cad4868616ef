use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use provschema_plugin::wire::{v5, v6};
use provschema_plugin::{
    ConnectionStatus, Generation, Negotiated, PluginError, PluginLauncher, ProtocolClient, SchemaRpc, UniversalClient,
};

/// What the scripted launcher does on its next launch.
enum Script {
    Fail,
    A { schema_ok: bool },
    B { schema_ok: bool },
}

#[derive(Default)]
struct Counters {
    launches: AtomicUsize,
    shutdowns: AtomicUsize,
}

struct ScriptedLauncher {
    script: Mutex<VecDeque<Script>>,
    offers: Mutex<Vec<Vec<Generation>>>,
    counters: Arc<Counters>,
}

impl ScriptedLauncher {
    fn new(script: Vec<Script>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            offers: Mutex::new(Vec::new()),
            counters: Arc::new(Counters::default()),
        }
    }

    fn offers(&self) -> Vec<Vec<Generation>> {
        self.offers.lock().unwrap().clone()
    }
}

struct MockRpc<R> {
    response: Option<R>,
    counters: Arc<Counters>,
    closed: bool,
}

impl<R: Clone + Send> SchemaRpc for MockRpc<R> {
    type Response = R;

    fn get_provider_schema(&mut self) -> Result<R, PluginError> {
        if self.closed {
            return Err(PluginError::Closed);
        }
        self.response
            .clone()
            .ok_or_else(|| PluginError::rpc(Generation::B, "Unimplemented: scripted failure"))
    }

    fn shutdown(&mut self) {
        if !self.closed {
            self.closed = true;
            self.counters.shutdowns.fetch_add(1, Ordering::SeqCst);
        }
    }
}

fn v5_response() -> v5::GetProviderSchemaResponse {
    let mut response = v5::GetProviderSchemaResponse::default();
    response.resource_schemas.insert(
        "legacy_thing".to_string(),
        v5::Schema {
            version: 3,
            block: Some(v5::Block::default()),
        },
    );
    response
}

fn v6_response() -> v6::GetProviderSchemaResponse {
    let mut response = v6::GetProviderSchemaResponse::default();
    response.resource_schemas.insert(
        "modern_thing".to_string(),
        v6::Schema {
            version: 1,
            block: Some(v6::Block::default()),
        },
    );
    response
}

impl PluginLauncher for ScriptedLauncher {
    fn launch(&self, _executable: &Path, offer: &[Generation]) -> Result<Negotiated, PluginError> {
        self.counters.launches.fetch_add(1, Ordering::SeqCst);
        self.offers.lock().unwrap().push(offer.to_vec());
        let step = self.script.lock().unwrap().pop_front().unwrap_or(Script::Fail);
        let counters = Arc::clone(&self.counters);
        match step {
            Script::Fail => Err(PluginError::transport("scripted launch failure")),
            Script::A { schema_ok } => Ok(Negotiated::GenerationA(Box::new(MockRpc {
                response: schema_ok.then(v5_response),
                counters,
                closed: false,
            }))),
            Script::B { schema_ok } => Ok(Negotiated::GenerationB(Box::new(MockRpc {
                response: schema_ok.then(v6_response),
                counters,
                closed: false,
            }))),
        }
    }
}

fn executable() -> PathBuf {
    PathBuf::from("/tmp/terraform-provider-example")
}

#[test]
fn generation_b_success_needs_one_launch() {
    let launcher = ScriptedLauncher::new(vec![Script::B { schema_ok: true }]);
    let mut client = UniversalClient::connect(&launcher, &executable()).unwrap();
    assert_eq!(client.generation(), Some(Generation::B));

    let schema = client.schema().unwrap();
    assert!(schema.resource("modern_thing").is_some());
    assert_eq!(launcher.offers(), vec![vec![Generation::B, Generation::A]]);
}

#[test]
fn generation_b_rpc_failure_falls_back_to_a() {
    let launcher = ScriptedLauncher::new(vec![Script::B { schema_ok: false }, Script::A { schema_ok: true }]);
    let mut client = UniversalClient::connect(&launcher, &executable()).unwrap();

    let schema = client.schema().unwrap();
    assert!(schema.resource("legacy_thing").is_some());
    assert_eq!(schema.resource("legacy_thing").unwrap().version, 3);
    assert_eq!(client.generation(), Some(Generation::A));
    assert_eq!(launcher.offers()[1], vec![Generation::A]);
    // The protocol 6 connection was closed before the retry.
    assert_eq!(launcher.counters.shutdowns.load(Ordering::SeqCst), 1);
}

#[test]
fn both_generations_failing_reports_each_error() {
    let launcher = ScriptedLauncher::new(vec![Script::B { schema_ok: false }, Script::Fail]);
    let mut client = UniversalClient::connect(&launcher, &executable()).unwrap();

    let err = client.schema().unwrap_err();
    match err {
        PluginError::SchemaUnavailable {
            generation_b,
            generation_a,
        } => {
            assert!(matches!(*generation_b, PluginError::Rpc { .. }));
            assert!(generation_a.is_transport_failure());
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn handshake_selecting_a_calls_a_directly() {
    let launcher = ScriptedLauncher::new(vec![Script::A { schema_ok: true }]);
    let mut client = UniversalClient::connect(&launcher, &executable()).unwrap();
    assert!(client.schema().unwrap().resource("legacy_thing").is_some());
    assert_eq!(launcher.counters.launches.load(Ordering::SeqCst), 1);
}

#[test]
fn transport_failure_retries_offering_a_only() {
    let launcher = ScriptedLauncher::new(vec![Script::Fail, Script::A { schema_ok: true }]);
    let client = UniversalClient::connect(&launcher, &executable()).unwrap();
    assert_eq!(client.generation(), Some(Generation::A));
    assert_eq!(
        launcher.offers(),
        vec![vec![Generation::B, Generation::A], vec![Generation::A]]
    );
}

#[test]
fn connect_failing_twice_is_a_combined_transport_error() {
    let launcher = ScriptedLauncher::new(vec![Script::Fail, Script::Fail]);
    let err = UniversalClient::connect(&launcher, &executable()).err().expect("connect must fail");
    assert!(matches!(err, PluginError::ConnectFailed { .. }));
    assert!(err.is_transport_failure());
}

#[test]
fn close_is_idempotent_and_runs_on_drop() {
    let launcher = ScriptedLauncher::new(vec![Script::B { schema_ok: true }, Script::B { schema_ok: true }]);

    let mut client = UniversalClient::connect(&launcher, &executable()).unwrap();
    client.close();
    client.close();
    assert_eq!(launcher.counters.shutdowns.load(Ordering::SeqCst), 1);
    assert!(matches!(client.schema(), Err(PluginError::Closed)));

    {
        let _dropped = UniversalClient::connect(&launcher, &executable()).unwrap();
    }
    assert_eq!(launcher.counters.shutdowns.load(Ordering::SeqCst), 2);
}

#[test]
fn protocol_client_state_transitions() {
    let launcher = ScriptedLauncher::new(vec![Script::B { schema_ok: true }, Script::Fail]);

    let mut client = ProtocolClient::new(executable());
    assert_eq!(client.status(), ConnectionStatus::Unconnected);
    assert!(matches!(client.schema_b(), Err(PluginError::NotConnected)));

    assert_eq!(client.connect(&launcher, &Generation::PREFERRED).unwrap(), Generation::B);
    assert_eq!(client.status(), ConnectionStatus::Connected(Generation::B));
    assert!(client.schema_a().is_err());
    assert!(client.schema_b().is_ok());

    client.close();
    assert_eq!(client.status(), ConnectionStatus::Closed);
    assert!(matches!(client.schema_b(), Err(PluginError::Closed)));

    let mut failing = ProtocolClient::new(executable());
    assert!(failing.connect(&launcher, &Generation::PREFERRED).is_err());
    assert_eq!(failing.status(), ConnectionStatus::Closed);
}

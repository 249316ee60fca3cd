#![allow(dead_code)]

use axum::http::HeaderName;
use coingate::{
    config::MatchMode,
    db::{Driver, ErrorText, Record},
    gateway::{BackendRegistry, GatewayDispatcher, GatewayState, Route, Target},
};
use std::{
    env, fmt,
    io::Write,
    net::{SocketAddr, TcpListener},
    process::{Child, Command},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tempfile::NamedTempFile;
use tokio::time::sleep;
use tokio_postgres::NoTls;
use wiremock::MockServer;

// -----------------------------------------------------------------------------
// ----- Processes and ports ---------------------------------------------------

pub fn reserve_port(host: &str) -> u16 {
    let listener = TcpListener::bind(format!("{host}:0")).expect("bind ephemeral port");
    listener.local_addr().unwrap().port()
}

pub fn spawn_coingate(config: &NamedTempFile, args: &[&str]) -> Child {
    Command::new(env!("CARGO_BIN_EXE_coingate"))
        .env("COINGATE_CONFIG_FILE", config.path())
        .env("COINGATE_LOG", "warn")
        .args(args)
        .spawn()
        .expect("spawn coingate")
}

pub async fn wait_for_listen(host: &str, port: u16) {
    let addr = format!("{host}:{port}");
    for _ in 0..100 {
        if std::net::TcpStream::connect(&addr).is_ok() {
            return;
        }
        sleep(Duration::from_millis(50)).await;
    }
    panic!("coingate did not start listening on {addr}");
}

/// Serves `app` on an ephemeral local port for the rest of the test.
pub async fn spawn_router(app: axum::Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test router");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve test router");
    });
    addr
}

pub fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp config");
    file.write_all(contents.as_bytes()).expect("write temp config");
    file
}

// -----------------------------------------------------------------------------
// ----- Gateway ---------------------------------------------------------------

/// Target pointing at a wiremock server.
pub fn target_of(server: &MockServer) -> Target {
    let addr = server.address();
    Target::new(addr.ip().to_string(), addr.port())
}

pub fn route(fragment: &str, target: Target) -> Route {
    Route {
        backend: target.to_string(),
        fragment: fragment.to_string(),
        target,
    }
}

pub fn dispatcher(routes: Vec<Route>, forward_timeout: Option<Duration>) -> GatewayDispatcher {
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    GatewayDispatcher::with_client(
        Arc::new(BackendRegistry::new(MatchMode::Contains, routes)),
        client,
        HeaderName::from_static("user-principal"),
        forward_timeout,
    )
}

pub fn gateway_state(routes: Vec<Route>, max_body_bytes: usize) -> Arc<GatewayState> {
    Arc::new(GatewayState {
        dispatcher: dispatcher(routes, None),
        max_body_bytes,
    })
}

// -----------------------------------------------------------------------------
// ----- ScriptedDriver --------------------------------------------------------

type Script = Box<dyn Fn(&[String]) -> Result<Vec<Record>, String> + Send + Sync>;

/// In-memory driver answering by SQL fragment. Records every statement and
/// counts connects and closes.
#[derive(Clone, Default)]
pub struct ScriptedDriver {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    scripts: Mutex<Vec<(String, Script)>>,
    calls: Mutex<Vec<Call>>,
    connects: AtomicUsize,
    closes: AtomicUsize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Call {
    pub sql: String,
    pub params: Vec<String>,
}

#[derive(Debug)]
pub struct ScriptError(pub String);

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl ErrorText for ScriptError {
    fn error_text(&self) -> String {
        self.0.clone()
    }
}

impl ScriptedDriver {
    pub fn on(
        self,
        fragment: &str,
        script: impl Fn(&[String]) -> Result<Vec<Record>, String> + Send + Sync + 'static,
    ) -> Self {
        self.inner
            .scripts
            .lock()
            .unwrap()
            .push((fragment.to_string(), Box::new(script)));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.calls.lock().unwrap().clone()
    }

    pub fn connects(&self) -> usize {
        self.inner.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.inner.closes.load(Ordering::SeqCst)
    }

    fn answer(&self, sql: &str, params: &[String]) -> Result<Vec<Record>, ScriptError> {
        self.inner.calls.lock().unwrap().push(Call {
            sql: sql.to_string(),
            params: params.to_vec(),
        });

        let scripts = self.inner.scripts.lock().unwrap();
        match scripts.iter().find(|(fragment, _)| sql.contains(fragment.as_str())) {
            Some((_, script)) => script(params).map_err(ScriptError),
            None => Err(ScriptError(format!("no script for: {sql}"))),
        }
    }
}

impl Driver for ScriptedDriver {
    type Conn = ();
    type Error = ScriptError;

    async fn connect(&self) -> Result<(), ScriptError> {
        self.inner.connects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn query(&self, _conn: &mut (), sql: &str) -> Result<Vec<Record>, ScriptError> {
        self.answer(sql, &[])
    }

    async fn query_with_params(
        &self,
        _conn: &mut (),
        sql: &str,
        params: &[String],
    ) -> Result<Vec<Record>, ScriptError> {
        self.answer(sql, params)
    }

    async fn close(&self, _conn: ()) {
        self.inner.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Builds a record from `json!({...})`, keeping key order.
pub fn record(value: serde_json::Value) -> Record {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

// -----------------------------------------------------------------------------
// ----- Live database ---------------------------------------------------------

/// Connection string of a scratch database, from `COINGATE_TEST_DATABASE`.
/// Tests that need it are `#[ignore]`d and run with `--ignored`.
pub fn test_database() -> tokio_postgres::Config {
    let raw = env::var("COINGATE_TEST_DATABASE")
        .expect("COINGATE_TEST_DATABASE must hold a postgres connection string");
    raw.parse().expect("valid postgres connection string")
}

pub async fn apply_schema(config: &tokio_postgres::Config, sql: &str) {
    let (client, connection) = config.connect(NoTls).await.expect("connect for schema");
    tokio::spawn(async move {
        let _ = connection.await;
    });
    client.batch_execute(sql).await.expect("apply schema");
}

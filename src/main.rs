//! Demo REST server.
//!
//! Serves a small people/pets API and, optionally, a static directory
//! under `/static`.
//!
//! ```text
//! GET    /pets                        fixed list
//! GET    /people?sort=name            list
//! POST   /people                      create (201)
//! GET    /people/{id}                 read
//! PUT    /people/{id}                 replace
//! PATCH  /people/{id}                 merge
//! DELETE /people/{id}                 remove (204)
//! POST   /people/{id}/phones/{type}   add a phone
//! POST   /sum                         {"a": 1, "b": 2} → 3
//! ```

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use clap::Parser;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use rest_server::config::load_config;
use rest_server::lifecycle::signals::shutdown_signal;
use rest_server::observability::{init_logging, metrics::init_metrics};
use rest_server::{ErrorKind, Fault, Params, RestServer, ServerConfig, ServerError};

#[derive(Parser)]
#[command(name = "rest-server")]
#[command(about = "Demo server for declarative REST endpoints", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides the configured one)
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory served under /static
    #[arg(short, long)]
    static_dir: Option<PathBuf>,
}

type Person = Map<String, Value>;
type People = Arc<Mutex<Vec<Person>>>;

fn lock(people: &People) -> MutexGuard<'_, Vec<Person>> {
    people.lock().unwrap_or_else(PoisonError::into_inner)
}

fn person_index(people: &[Person], params: &Params) -> Result<usize, ServerError> {
    let raw = params.get(0).unwrap_or_default();
    raw.parse::<usize>()
        .ok()
        .filter(|id| *id < people.len())
        .ok_or_else(|| ErrorKind::NotFound.with_info(json!({ "personId": raw })))
}

#[derive(Deserialize)]
struct Operands {
    a: i64,
    b: i64,
}

fn register(server: &RestServer, people: People) {
    server.intercept().descend("people").handle(|ctx, next| async move {
        tracing::debug!(args = ?ctx.args(), "People request");
        next.proceed();
        Ok::<_, Fault>(())
    });

    let store = people.clone();
    server.list().descend("people").handle_sync(move |ctx, _| {
        if let Some(sort) = ctx.arg("sort") {
            if sort != "name" {
                return Err(ErrorKind::BadRequest.with_info(json!({ "sort": sort })));
            }
        }
        Ok(lock(&store).clone())
    });

    let store = people.clone();
    server.get().descend("people").param("id").handle_sync(move |_, params| {
        let people = lock(&store);
        let id = person_index(&people, &params)?;
        Ok::<_, ServerError>(people[id].clone())
    });

    let store = people.clone();
    server.create().descend("people").handle(move |_, mut person: Person, _| {
        let store = store.clone();
        async move {
            let mut people = lock(&store);
            person.insert("id".to_string(), json!(people.len()));
            people.push(person.clone());
            Ok::<_, ServerError>(person)
        }
    });

    let store = people.clone();
    server
        .create()
        .at("people/$id/phones/$type")
        .handle_sync(move |_, mut phone: Person, params| {
            let mut people = lock(&store);
            let id = person_index(&people, &params)?;
            let kind = params.get(1).unwrap_or_default().to_string();
            phone.insert("id".to_string(), json!(kind));

            let phones = people[id]
                .entry("phones")
                .or_insert_with(|| json!({}));
            if let Value::Object(phones) = phones {
                phones.insert(kind, Value::Object(phone.clone()));
            }
            Ok::<_, ServerError>(phone)
        });

    let store = people.clone();
    server
        .update()
        .descend("people")
        .param("id")
        .handle_sync(move |_, changes: Person, params| {
            let mut people = lock(&store);
            let id = person_index(&people, &params)?;
            people[id].extend(changes);
            Ok::<_, ServerError>(people[id].clone())
        });

    let store = people.clone();
    server
        .replace()
        .descend("people")
        .param("id")
        .handle_sync(move |_, mut person: Person, params| {
            let mut people = lock(&store);
            let id = person_index(&people, &params)?;
            person.insert("id".to_string(), json!(id));
            people[id] = person.clone();
            Ok::<_, ServerError>(person)
        });

    let store = people;
    server.remove().descend("people").param("id").handle_sync(move |_, params| {
        let mut people = lock(&store);
        let id = person_index(&people, &params)?;
        people.remove(id);
        Ok::<_, ServerError>(())
    });

    server.list().descend("pets").value(["dog", "cat"]);

    server
        .invoke()
        .descend("sum")
        .handle_sync(|_, operands: Operands, _| Ok::<_, Fault>(operands.a + operands.b));
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };

    init_logging(&config.observability);
    tracing::info!("rest-server v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to install metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = RestServer::new(config);
    register(&server, People::default());
    if let Some(dir) = cli.static_dir {
        server.static_files().descend("static").dir(dir);
    }

    let addr = server.listen(cli.port).await?;
    tracing::info!(address = %addr, "Listening for connections");

    shutdown_signal().await;
    server.close().await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

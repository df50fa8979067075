use axum::Router;
use std::{
    env,
    net::{Ipv6Addr, SocketAddr},
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

mod errors;
mod routes;
mod storage;

pub mod logging;

pub use errors::*;
pub use storage::*;

/// The default port the server will listen on.
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Clone)]
pub struct ServerContext {
    pub storage: BoxedStorage,
}

/// Starts the eventflow server over the given storage
pub async fn run_server(storage: BoxedStorage) {
    let port = env::var("EVENTFLOW_SERVER_PORT")
        .or_else(|_| env::var("PORT"))
        .map(|x| x.parse::<u16>().expect("Port must be a number"))
        .unwrap_or(DEFAULT_PORT);

    let addr: SocketAddr = (Ipv6Addr::UNSPECIFIED, port).into();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let context = ServerContext { storage };

    let root_router = Router::new()
        .nest("/api", routes::router())
        .layer(cors)
        .with_state(context);

    let listener = TcpListener::bind(&addr).await.expect("listens on address");

    log::info!("Listening on port {}.", port);

    axum::serve(listener, root_router.into_make_service())
        .await
        .expect("server runs");
}

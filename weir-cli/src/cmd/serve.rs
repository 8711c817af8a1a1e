use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use tracing::{error, info};

use weir_core::ManifestFormat;
use weir_exec::{bind, Options, TracingEventSink};
use weir_transport::codec::JsonCodec;
use weir_transport::http::{HttpCaller, HttpListener};

use crate::exit_codes;

pub async fn serve_cmd(path: &Path, http: SocketAddr) -> i32 {
    let input = match std::fs::read_to_string(path) {
        Ok(input) => input,
        Err(e) => {
            eprintln!("error: unable to read {}: {e}", path.display());
            return exit_codes::IO_ERROR;
        }
    };

    let (manifest, _) = match weir_core::load_manifest_str(&input, ManifestFormat::Auto) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("invalid manifest: {e}");
            return exit_codes::VALIDATION_ERROR;
        }
    };

    let mut options = Options::default();
    options.callers.insert("http".to_string(), Arc::new(HttpCaller::default()));
    options.codecs.insert("json".to_string(), Arc::new(JsonCodec));
    options.listeners.insert("http".to_string(), Arc::new(HttpListener::new(http)));
    options.events = Arc::new(TracingEventSink);

    let runtime = match bind(&manifest, &options).await {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("unable to bind manifest: {e}");
            return exit_codes::VALIDATION_ERROR;
        }
    };

    info!(%http, "weir gateway serving");

    tokio::select! {
        result = runtime.serve() => {
            if let Err(e) = result {
                error!(%e, "listener terminated");
                return exit_codes::RUNTIME_ERROR;
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
            if let Err(e) = runtime.close().await {
                error!(%e, "graceful close failed");
                return exit_codes::RUNTIME_ERROR;
            }
        }
    }

    exit_codes::SUCCESS
}

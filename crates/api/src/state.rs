//! Shared handler state.

use std::sync::Arc;

use engine::Engine;
use realtime::RealtimeGateway;

/// State shared by every handler. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub gateway: Arc<RealtimeGateway>,
}

impl AppState {
    /// Wraps an engine and registers a fresh realtime gateway on its bus.
    pub fn new(engine: Arc<Engine>) -> Self {
        let gateway = Arc::new(RealtimeGateway::new());
        engine.register_sink(gateway.clone());
        Self { engine, gateway }
    }
}

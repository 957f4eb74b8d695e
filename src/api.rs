//! HTTP API for the persona chat
//!
//! A thin JSON surface over the single [`SessionController`].

mod handlers;
mod types;

pub use handlers::create_router;

use crate::llm::CompletionClient;
use crate::session::SessionController;
use std::sync::Arc;

/// Controller type the server runs with
pub type ProductionController = SessionController<Arc<dyn CompletionClient>>;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<ProductionController>,
}

impl AppState {
    pub fn new(session: ProductionController) -> Self {
        Self {
            session: Arc::new(session),
        }
    }
}

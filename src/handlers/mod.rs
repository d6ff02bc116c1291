pub mod content;

use std::sync::Arc;

use crate::content::AccessResolver;

/// Shared application state injected into the content handlers.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<AccessResolver>,
}

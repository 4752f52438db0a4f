use crate::config::RunMode;
use crate::facade::Facade;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub facade: Arc<dyn Facade>,
    pub mode: RunMode,
}

impl AppState {
    pub fn new(facade: impl Facade + 'static, mode: RunMode) -> Self {
        Self {
            facade: Arc::new(facade),
            mode,
        }
    }
}

use std::sync::Arc;

use crate::proxy::ProxyManager;
use crate::security::RequestBouncer;
use crate::store::CommandStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<CommandStore>,
    pub proxy: Arc<dyn ProxyManager>,
    pub bouncer: Arc<dyn RequestBouncer>,
    /// When false, create, update and delete answer 503.
    pub command_management: bool,
}

impl AppState {
    pub fn new(
        store: Arc<CommandStore>,
        proxy: Arc<dyn ProxyManager>,
        bouncer: Arc<dyn RequestBouncer>,
        command_management: bool,
    ) -> Self {
        Self {
            store,
            proxy,
            bouncer,
            command_management,
        }
    }

    pub(crate) fn ensure_management(&self) -> super::Result<()> {
        if self.command_management {
            Ok(())
        } else {
            Err(super::WebError::ManagementDisabled)
        }
    }
}

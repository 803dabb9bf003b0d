//! One shared `NeutrinoClient` per application id.
//!
//! The registry is an ordinary value owned by the application's composition
//! root; there is no process-wide cache. Get-or-create runs under a single
//! mutex, so two threads asking for the same unseen id still end up with the
//! same client.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::info;

use crate::client::NeutrinoClient;
use crate::config::ClientConfig;
use crate::transport::{Transport, UreqTransport};

pub struct ClientRegistry {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    clients: Mutex<HashMap<String, Arc<NeutrinoClient>>>,
}

impl ClientRegistry {
    /// Registry whose clients talk HTTP through a shared `UreqTransport`.
    pub fn new(config: ClientConfig) -> Self {
        let transport = Arc::new(UreqTransport::new(config.timeout));
        Self::with_transport(config, transport)
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Return the client for `app_id`, creating it on first use.
    pub fn get_or_create(&self, app_id: &str) -> Arc<NeutrinoClient> {
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = clients.get(app_id) {
            return Arc::clone(client);
        }
        info!(app_id, "creating client");
        let client = Arc::new(NeutrinoClient::new(&self.config, app_id, Arc::clone(&self.transport)));
        clients.insert(app_id.to_string(), Arc::clone(&client));
        client
    }

    /// The client for the empty application id, used for calls that are not
    /// scoped to an application (platform login, app management).
    pub fn unscoped(&self) -> Arc<NeutrinoClient> {
        self.get_or_create("")
    }

    pub fn len(&self) -> usize {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

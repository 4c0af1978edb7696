use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::client::{Client, ClientConfig};
use crate::Result;

/// Gateway clients keyed by account identifier, one client per account.
///
/// Owned by the application; entries are fully independent of each other.
#[derive(Debug, Default)]
pub struct Registry {
    clients: DashMap<String, Client>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The client registered for `account`, creating it from `config` if there
    /// is none. `config` is ignored when the account already has a client.
    pub fn get_or_create(&self, account: &str, config: ClientConfig) -> Result<Client> {
        match self.clients.entry(account.to_owned()) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                let client = Client::new(config)?;

                #[cfg(feature = "tracing")]
                tracing::debug!(account, "gateway client registered");

                Ok(entry.insert(client).clone())
            }
        }
    }

    #[must_use]
    pub fn get(&self, account: &str) -> Option<Client> {
        self.clients.get(account).map(|entry| entry.value().clone())
    }

    /// Unregister and disconnect the client of `account`.
    pub async fn remove(&self, account: &str) -> Option<Client> {
        let (_, client) = self.clients.remove(account)?;
        client.disconnect().await;
        Some(client)
    }

    /// Disconnect every registered client. The clients stay registered.
    pub async fn disconnect_all(&self) {
        let clients: Vec<Client> = self
            .clients
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        futures::future::join_all(clients.iter().map(Client::disconnect)).await;
    }

    #[must_use]
    pub fn accounts(&self) -> Vec<String> {
        self.clients.iter().map(|entry| entry.key().clone()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

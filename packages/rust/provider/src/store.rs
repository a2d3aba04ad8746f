//! Connection lookup and usage signaling.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;

use docbridge_shared::{Connection, ConnectionId, ConnectionStatus, DocBridgeError, Result};

/// Connection persistence collaborator.
///
/// Credential handling stays on the store side: the plain lookup returns
/// records with `credentials` stripped, the with-data lookup attaches the
/// decrypted payload.
#[async_trait]
pub trait ConnectionStore: Send + Sync {
    /// Look up a connection without credential data.
    async fn find_by_id(&self, id: &ConnectionId) -> Result<Option<Connection>>;

    /// Look up a connection with its decrypted credential payload attached.
    async fn find_by_id_with_data(&self, id: &ConnectionId) -> Result<Option<Connection>>;

    /// All connections of a workspace, optionally filtered by status.
    async fn find_by_workspace(
        &self,
        workspace_id: &str,
        status: Option<ConnectionStatus>,
    ) -> Result<Vec<Connection>>;

    /// Record that a connection served a content access. Best-effort:
    /// callers log failures and move on.
    async fn mark_used(&self, id: &ConnectionId) -> Result<()>;
}

/// In-memory store backing the CLI and tests.
#[derive(Default)]
pub struct InMemoryConnectionStore {
    connections: RwLock<HashMap<ConnectionId, Connection>>,
    mark_used_calls: AtomicUsize,
}

impl InMemoryConnectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a connection record.
    pub fn insert(&self, connection: Connection) {
        self.connections
            .write()
            .expect("connection map lock")
            .insert(connection.id.clone(), connection);
    }

    /// How many times `mark_used` has been invoked.
    pub fn mark_used_count(&self) -> usize {
        self.mark_used_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectionStore for InMemoryConnectionStore {
    async fn find_by_id(&self, id: &ConnectionId) -> Result<Option<Connection>> {
        let found = self
            .connections
            .read()
            .expect("connection map lock")
            .get(id)
            .cloned();

        // The plain lookup never exposes credential data.
        Ok(found.map(|mut conn| {
            conn.credentials = None;
            conn
        }))
    }

    async fn find_by_id_with_data(&self, id: &ConnectionId) -> Result<Option<Connection>> {
        Ok(self
            .connections
            .read()
            .expect("connection map lock")
            .get(id)
            .cloned())
    }

    async fn find_by_workspace(
        &self,
        workspace_id: &str,
        status: Option<ConnectionStatus>,
    ) -> Result<Vec<Connection>> {
        let map = self.connections.read().expect("connection map lock");
        let mut matches: Vec<Connection> = map
            .values()
            .filter(|c| c.workspace_id == workspace_id)
            .filter(|c| status.is_none_or(|s| c.status == s))
            .map(|c| {
                let mut conn = c.clone();
                conn.credentials = None;
                conn
            })
            .collect();
        matches.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(matches)
    }

    async fn mark_used(&self, id: &ConnectionId) -> Result<()> {
        self.mark_used_calls.fetch_add(1, Ordering::SeqCst);

        let mut map = self.connections.write().expect("connection map lock");
        match map.get_mut(id) {
            Some(conn) => {
                conn.last_used_at = Some(Utc::now());
                Ok(())
            }
            None => Err(DocBridgeError::connection_not_found(id.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_connection(workspace: &str, status: ConnectionStatus) -> Connection {
        Connection {
            id: ConnectionId::new(),
            provider_name: "drive-x".into(),
            workspace_id: workspace.into(),
            display_name: None,
            status,
            credentials: Some(json!({"token": "secret"})),
            created_at: Utc::now(),
            last_used_at: None,
        }
    }

    #[tokio::test]
    async fn plain_lookup_strips_credentials() {
        let store = InMemoryConnectionStore::new();
        let conn = make_connection("ws-1", ConnectionStatus::Active);
        let id = conn.id.clone();
        store.insert(conn);

        let plain = store.find_by_id(&id).await.expect("lookup").expect("found");
        assert!(plain.credentials.is_none());

        let with_data = store
            .find_by_id_with_data(&id)
            .await
            .expect("lookup")
            .expect("found");
        assert_eq!(with_data.credentials, Some(json!({"token": "secret"})));
    }

    #[tokio::test]
    async fn workspace_filter_honors_status() {
        let store = InMemoryConnectionStore::new();
        store.insert(make_connection("ws-1", ConnectionStatus::Active));
        store.insert(make_connection("ws-1", ConnectionStatus::Expired));
        store.insert(make_connection("ws-2", ConnectionStatus::Active));

        let active = store
            .find_by_workspace("ws-1", Some(ConnectionStatus::Active))
            .await
            .expect("query");
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].status, ConnectionStatus::Active);

        let all = store.find_by_workspace("ws-1", None).await.expect("query");
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn mark_used_updates_timestamp_and_counter() {
        let store = InMemoryConnectionStore::new();
        let conn = make_connection("ws-1", ConnectionStatus::Active);
        let id = conn.id.clone();
        store.insert(conn);

        store.mark_used(&id).await.expect("mark used");
        assert_eq!(store.mark_used_count(), 1);

        let updated = store.find_by_id(&id).await.expect("lookup").expect("found");
        assert!(updated.last_used_at.is_some());

        let missing = ConnectionId::new();
        assert!(store.mark_used(&missing).await.is_err());
        assert_eq!(store.mark_used_count(), 2);
    }
}

//! # HTTP Flows
//!
//! Nodes wired the way the runtime wires them: each serves a real
//! [`RpcGateway`] on an ephemeral loopback port and reaches its peers
//! through [`HttpPeerTransport`] with a shared bearer token.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::Value;
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;
    use tokio::task::JoinHandle;

    use ql_01_ledger_store::{LedgerReader, LedgerStore, MemoryLedgerStore};
    use ql_02_peer_transport::{HttpPeerTransport, PeerTransport, TransportConfig, TransportError};
    use ql_03_chain_sync::test_utils::{child, entry, genesis, FixedClock};
    use ql_03_chain_sync::{PeerRpcService, SharedLedger, SyncApi, SyncConfig, SyncCoordinator};
    use ql_04_rpc_gateway::{GatewayConfig, GatewayError, RpcGateway};
    use shared_types::{PeerInfo, RpcMethod, RpcRequest};

    const TOKEN: &str = "cluster-secret";

    struct HttpNode {
        peer: PeerInfo,
        store: Arc<MemoryLedgerStore>,
        coordinator: Arc<SyncCoordinator>,
        shutdown: oneshot::Sender<()>,
        server: JoinHandle<Result<(), GatewayError>>,
    }

    impl HttpNode {
        fn url(&self, path: &str) -> String {
            format!("http://{}{}", self.peer, path)
        }

        async fn stop(self) {
            let _ = self.shutdown.send(());
            self.server.await.unwrap().unwrap();
        }
    }

    /// `size` fully peered nodes, each behind its own gateway.
    async fn spawn_cluster(size: usize) -> Vec<HttpNode> {
        let mut listeners = Vec::with_capacity(size);
        for _ in 0..size {
            listeners.push(TcpListener::bind("127.0.0.1:0").await.unwrap());
        }
        let addresses: Vec<PeerInfo> = listeners
            .iter()
            .map(|l| PeerInfo::new("127.0.0.1", l.local_addr().unwrap().port()))
            .collect();

        let transport: Arc<dyn PeerTransport> = Arc::new(
            HttpPeerTransport::new(&TransportConfig::for_testing().with_auth_token(TOKEN))
                .unwrap(),
        );

        let mut nodes = Vec::with_capacity(size);
        for (listener, peer) in listeners.into_iter().zip(&addresses) {
            let peers: Vec<PeerInfo> = addresses.iter().filter(|p| *p != peer).cloned().collect();
            let store = Arc::new(MemoryLedgerStore::new());
            let ledger = Arc::new(SharedLedger::new(store.clone()));
            let coordinator = Arc::new(SyncCoordinator::new(
                SyncConfig::new(peers.clone()).with_local_label(peer.to_string()),
                Arc::clone(&ledger),
                Arc::clone(&transport),
                Arc::new(FixedClock::default()),
            ));
            let rpc = Arc::new(PeerRpcService::new(ledger, Arc::clone(&transport), peers));
            let gateway = RpcGateway::new(
                GatewayConfig::for_testing().with_api_key(TOKEN),
                coordinator.clone(),
                rpc,
            )
            .unwrap();

            let (shutdown, signal) = oneshot::channel::<()>();
            let server = tokio::spawn(async move {
                gateway
                    .serve(listener, async move {
                        let _ = signal.await;
                    })
                    .await
            });

            nodes.push(HttpNode {
                peer: peer.clone(),
                store,
                coordinator,
                shutdown,
                server,
            });
        }
        nodes
    }

    async fn stop_all(nodes: Vec<HttpNode>) {
        for node in nodes {
            node.stop().await;
        }
    }

    // =============================================================================
    // PEER PROTOCOL OVER HTTP
    // =============================================================================

    #[tokio::test]
    async fn test_genesis_reaches_every_node_over_http() {
        let nodes = spawn_cluster(3).await;

        let outcome = nodes[0].coordinator.create_genesis().await.unwrap();
        assert!(outcome.is_ok(), "{outcome}");

        let root = nodes[0].store.blocks().unwrap();
        assert_eq!(root.len(), 1);
        for node in &nodes[1..] {
            assert_eq!(node.store.blocks().unwrap(), root);
        }
        stop_all(nodes).await;
    }

    #[tokio::test]
    async fn test_block_diff_fetches_blocks_over_http() {
        let nodes = spawn_cluster(3).await;
        let root = genesis();
        let b1 = child(&root, vec![entry("bolt"), entry("nut")], "b1");
        for node in &nodes {
            node.store.insert_block(root.clone()).unwrap();
        }
        for node in &nodes[1..] {
            node.store.insert_block(b1.clone()).unwrap();
        }

        let outcome = nodes[0].coordinator.sync_blocks_by_majority().await.unwrap();

        assert!(outcome.is_ok(), "{outcome}");
        assert_eq!(nodes[0].store.blocks().unwrap(), vec![root, b1]);
        stop_all(nodes).await;
    }

    #[tokio::test]
    async fn test_pool_propagation_over_http() {
        let nodes = spawn_cluster(2).await;
        let order = entry("gear");
        nodes[0].store.insert_pool_entry(order.clone()).unwrap();

        let outcome = nodes[0]
            .coordinator
            .propagate_undelivered_pool()
            .await
            .unwrap();

        assert!(outcome.is_ok(), "{outcome}");
        let received = nodes[1].store.pool_entries().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].id, order.id);
        assert!(received[0].delivered);
        stop_all(nodes).await;
    }

    #[tokio::test]
    async fn test_wrong_token_is_rejected() {
        let nodes = spawn_cluster(1).await;
        let intruder =
            HttpPeerTransport::new(&TransportConfig::for_testing().with_auth_token("guess"))
                .unwrap();

        let result = intruder
            .call(&nodes[0].peer, &RpcRequest::new(RpcMethod::GetBlockCount))
            .await;

        assert!(matches!(result, Err(TransportError::Status { status: 401, .. })));
        stop_all(nodes).await;
    }

    // =============================================================================
    // OPERATOR ROUTES AND PROBES
    // =============================================================================

    #[tokio::test]
    async fn test_operator_route_over_http() {
        let nodes = spawn_cluster(2).await;
        let client = reqwest::Client::new();

        let response = client
            .post(nodes[0].url("/sync/audit"))
            .bearer_auth(TOKEN)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await.unwrap(), "OK:tamper audit: clean");

        let unauthenticated = client.post(nodes[0].url("/sync/audit")).send().await.unwrap();
        assert_eq!(unauthenticated.status(), 401);
        stop_all(nodes).await;
    }

    #[tokio::test]
    async fn test_metrics_count_served_requests() {
        ledger_telemetry::register_metrics().unwrap();
        let nodes = spawn_cluster(2).await;
        let client = reqwest::Client::new();

        nodes[0].coordinator.sync_pool().await.unwrap();

        let health: Value = client
            .get(nodes[1].url("/health"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health["status"], "healthy");

        let metrics = client
            .get(nodes[1].url("/metrics"))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(metrics.contains("lq_rpc_requests_served_total"));
        assert!(metrics.contains("lq_sync_operations_total"));
        stop_all(nodes).await;
    }

    #[tokio::test]
    async fn test_graceful_shutdown_closes_port() {
        let nodes = spawn_cluster(1).await;
        let peer = nodes[0].peer.clone();
        stop_all(nodes).await;

        let transport = HttpPeerTransport::new(&TransportConfig::for_testing()).unwrap();
        let result = transport
            .call(&peer, &RpcRequest::new(RpcMethod::GetBlockCount))
            .await;
        assert!(result.is_err());
    }
}

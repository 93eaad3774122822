//! # Cluster Flows
//!
//! Whole-cluster scenarios over the in-process loopback network: every
//! node runs the real coordinator and peer RPC service, only the wire is
//! replaced.
//!
//! ## Flows Tested
//!
//! 1. Full resync repairs a tampered block, then copies the missing tail
//! 2. Audit refuses to "repair" towards a tampered majority
//! 3. Entry lifecycle: pool → propagation → block relay → pool cleared
//! 4. Fork resolution never loses an entry (property)

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;
    use serde_json::json;
    use shared_types::{Block, Entry, RpcMethod, RpcRequest};

    use ql_01_ledger_store::{LedgerReader, LedgerStore};
    use ql_03_chain_sync::test_utils::{child, entry, genesis, TestCluster};
    use ql_03_chain_sync::{has_fork, PeerRpcApi, SyncApi};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    /// Same hash, different content.
    fn forged(block: &Block) -> Block {
        let mut copy = block.clone();
        copy.data[0].payload.insert("qty".into(), json!(9_999));
        copy
    }

    fn seed(cluster: &TestCluster, nodes: &[usize], blocks: &[Block]) {
        for &i in nodes {
            for block in blocks {
                cluster.node(i).store.insert_block(block.clone()).unwrap();
            }
        }
    }

    // =============================================================================
    // TAMPER REPAIR AND BLOCK DIFF
    // =============================================================================

    #[tokio::test]
    async fn test_full_resync_repairs_then_catches_up() {
        let cluster = TestCluster::new(3);
        let root = genesis();
        let b1 = child(&root, vec![entry("bolt")], "b1");
        let b2 = child(&b1, vec![entry("nut")], "b2");
        seed(&cluster, &[1, 2], &[root.clone(), b1.clone(), b2.clone()]);
        seed(&cluster, &[0], &[root.clone(), forged(&b1)]);

        let outcome = cluster.node(0).coordinator.full_resync().await.unwrap();

        assert!(outcome.is_ok(), "{outcome}");
        assert!(outcome.detail().contains("1 repaired"));
        assert_eq!(
            cluster.node(0).store.blocks().unwrap(),
            cluster.node(1).store.blocks().unwrap()
        );
        for block in cluster.node(0).store.blocks().unwrap() {
            assert!(block.verify_hash().unwrap());
        }
    }

    #[tokio::test]
    async fn test_audit_refuses_tampered_majority() {
        let cluster = TestCluster::new(4);
        let root = genesis();
        let b1 = child(&root, vec![entry("bolt")], "b1");
        seed(&cluster, &[0, 1, 2], &[root.clone(), forged(&b1)]);
        seed(&cluster, &[3], &[root.clone(), b1.clone()]);

        let outcome = cluster.node(0).coordinator.audit_chain().await.unwrap();

        assert!(!outcome.is_ok());
        assert!(outcome.detail().contains("unrepairable"), "{outcome}");
        let kept = cluster.node(0).store.blocks().unwrap();
        assert_eq!(kept[1], forged(&b1));
    }

    #[tokio::test]
    async fn test_in_sync_cluster_needs_no_work() {
        let cluster = TestCluster::new(3);
        let root = genesis();
        let b1 = child(&root, vec![entry("bolt")], "b1");
        seed(&cluster, &[0, 1, 2], &[root, b1]);

        let outcome = cluster.node(1).coordinator.full_resync().await.unwrap();

        assert!(outcome.is_ok(), "{outcome}");
        assert!(outcome.detail().contains("tamper audit: clean"));
        assert!(outcome.detail().contains("no diff"));
    }

    // =============================================================================
    // ENTRY LIFECYCLE
    // =============================================================================

    #[tokio::test]
    async fn test_entry_travels_from_pool_into_every_chain() {
        let cluster = TestCluster::new(3);
        let genesis_outcome = cluster.node(0).coordinator.create_genesis().await.unwrap();
        assert!(genesis_outcome.is_ok(), "{genesis_outcome}");

        let order = entry("gear");
        cluster.node(0).store.insert_pool_entry(order.clone()).unwrap();
        let propagated = cluster
            .node(0)
            .coordinator
            .propagate_undelivered_pool()
            .await
            .unwrap();
        assert!(propagated.is_ok(), "{propagated}");
        for i in 0..3 {
            let pooled = cluster.node(i).store.pool_entries().unwrap();
            assert_eq!(pooled.len(), 1);
            assert!(pooled[0].delivered);
        }

        let root = cluster.node(0).store.blocks().unwrap()[0].clone();
        let block = child(&root, vec![order.clone()], "b1");
        let request = RpcRequest::with_block(RpcMethod::ReceiveSendBlock, &block).unwrap();
        let reply = cluster.node(0).rpc.handle(request).await.unwrap();
        assert_eq!(reply, json!("OK"));

        for i in 0..3 {
            let store = &cluster.node(i).store;
            assert_eq!(store.hash_list().unwrap(), vec![root.hash.clone(), block.hash.clone()]);
            assert!(store.pool_entries().unwrap().is_empty());
            assert!(store.entry_in_chain(&order.id).unwrap().is_found());
        }
    }

    #[tokio::test]
    async fn test_lagging_node_recovers_pool_and_chain() {
        let cluster = TestCluster::new(3);
        let root = genesis();
        let b1 = child(&root, vec![entry("bolt")], "b1");
        seed(&cluster, &[0, 1, 2], &[root.clone()]);
        seed(&cluster, &[0, 1], &[b1.clone()]);
        let pending = entry("washer").into_delivered();
        for i in [0, 1] {
            cluster.node(i).store.insert_pool_entry(pending.clone()).unwrap();
        }

        let lagging = &cluster.node(2).coordinator;
        assert!(lagging.sync_pool().await.unwrap().is_ok());
        assert!(lagging.sync_blocks_by_majority().await.unwrap().is_ok());

        let store = &cluster.node(2).store;
        assert_eq!(store.hash_list().unwrap(), vec![root.hash, b1.hash]);
        assert_eq!(store.pool_entries().unwrap(), vec![pending]);
    }

    // =============================================================================
    // FORK RESOLUTION PROPERTIES
    // =============================================================================

    fn branch(from: &Block, len: usize, per_block: usize, tag: &str) -> Vec<Block> {
        let mut blocks = Vec::with_capacity(len);
        let mut parent = from.clone();
        for i in 0..len {
            let data: Vec<Entry> = (0..per_block)
                .map(|j| entry(&format!("{tag}-{i}-{j}")))
                .collect();
            let next = child(&parent, data, &format!("{tag}{i}"));
            blocks.push(next.clone());
            parent = next;
        }
        blocks
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_fork_resolution_conserves_entries(
            first_len in 1usize..5,
            second_len in 1usize..5,
            per_block in 1usize..3,
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            let cluster = TestCluster::new(3);
            let root = genesis();
            let first = branch(&root, first_len, per_block, "a");
            let second = branch(&root, second_len, per_block, "b");

            let mut chain = vec![root];
            chain.extend(first.iter().cloned());
            chain.extend(second.iter().cloned());
            seed(&cluster, &[0, 1, 2], &chain);

            let all_ids: HashSet<String> = chain
                .iter()
                .flat_map(|b| b.data.iter().map(|e| e.id.clone()))
                .collect();

            let outcome = runtime
                .block_on(cluster.node(0).coordinator.resolve_forks())
                .unwrap();
            prop_assert!(outcome.is_ok(), "{}", outcome);

            let store = &cluster.node(0).store;
            prop_assert!(!has_fork(&store.blocks().unwrap()));
            prop_assert_eq!(store.block_count().unwrap(), 1 + first_len.max(second_len));

            let surviving = if first_len < second_len { &second } else { &first };
            let chain_hashes: HashSet<String> = store.hash_list().unwrap().into_iter().collect();
            for block in surviving {
                prop_assert!(chain_hashes.contains(&block.hash));
            }

            for id in &all_ids {
                prop_assert!(store.find_entry(id).unwrap().is_found(), "lost entry {}", id);
            }
            for pooled in store.pool_entries().unwrap() {
                prop_assert!(pooled.delivered);
                prop_assert!(store.entry_in_chain(&pooled.id).unwrap().into_option().is_none());
            }
        }
    }
}

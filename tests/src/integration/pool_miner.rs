//! # Pool and miner
//!
//! Transactions submitted while the mining thread runs end up in exactly
//! one block each and leave the pool once mined.

#[cfg(test)]
mod tests {
    use crate::fixtures::{init_tracing, keys, wait_for, TestNode};
    use shared_types::Transaction;
    use std::collections::HashSet;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    fn mined_hashes(node: &TestNode) -> Vec<String> {
        node.chain
            .read()
            .blocks()
            .iter()
            .flat_map(|block| block.transactions.iter().skip(1))
            .map(|tx| tx.hash().to_string())
            .collect()
    }

    #[test]
    fn test_transactions_submitted_during_mining_are_mined_once() {
        init_tracing();
        let node = Arc::new(TestNode::new("alice"));
        for _ in 0..2 {
            node.service
                .mine_next_block(&AtomicBool::new(false))
                .unwrap();
        }
        assert!(node.service.start());

        let submitters: Vec<_> = (0..4u64)
            .map(|worker| {
                let node = node.clone();
                std::thread::spawn(move || {
                    // amounts 1..=12: two rewards cover all of them and their fees
                    (1..=3u64)
                        .map(|i| {
                            let tx = node
                                .wallet
                                .transfer_token(&keys("alice"), "bob", worker * 3 + i, 1)
                                .unwrap();
                            assert!(node.service.submit_transaction(tx.clone()));
                            tx
                        })
                        .collect::<Vec<Transaction>>()
                })
            })
            .collect();
        let submitted: Vec<Transaction> = submitters
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();

        let expected: HashSet<String> = submitted.iter().map(|tx| tx.hash().to_string()).collect();
        assert!(wait_for(|| {
            let mined: HashSet<String> = mined_hashes(&node).into_iter().collect();
            expected.is_subset(&mined)
        }));
        node.service.stop();

        let mined = mined_hashes(&node);
        let unique: HashSet<&String> = mined.iter().collect();
        assert_eq!(unique.len(), mined.len(), "a transaction was mined twice");
        assert!(node.service.pool().is_empty());
        assert!(!node.service.is_running());
    }

    #[test]
    fn test_invalid_submissions_never_reach_a_block() {
        init_tracing();
        let node = TestNode::new("miner");
        let cancel = AtomicBool::new(false);
        node.service.mine_next_block(&cancel).unwrap();

        // unfunded sender
        let overspend = node
            .wallet
            .transfer_token(&keys("carol"), "dave", 5, 1)
            .unwrap();
        assert!(!node.service.submit_transaction(overspend.clone()));

        // tampered amount keeps the old hash
        let mut tampered = node
            .wallet
            .transfer_token(&keys("miner"), "dave", 5, 1)
            .unwrap();
        if let Transaction::State(state) = &mut tampered {
            state.amount = 45;
        }
        assert!(!node.service.submit_transaction(tampered));

        let block = node.service.mine_next_block(&cancel).unwrap();
        assert_eq!(block.transactions.len(), 1);
        assert!(node.service.pool().is_empty());
    }

    #[test]
    fn test_pool_order_is_block_order() {
        init_tracing();
        let node = TestNode::new("alice");
        let cancel = AtomicBool::new(false);
        node.service.mine_next_block(&cancel).unwrap();

        let txs: Vec<Transaction> = (1..=5)
            .map(|amount| {
                node.wallet
                    .transfer_token(&keys("alice"), "bob", amount, 1)
                    .unwrap()
            })
            .collect();
        for tx in &txs {
            assert!(node.service.submit_transaction(tx.clone()));
        }

        let block = node.service.mine_next_block(&cancel).unwrap();
        assert_eq!(&block.transactions[1..], txs.as_slice());
    }
}

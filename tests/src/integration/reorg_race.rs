//! # Reorg race
//!
//! Two miners extend the same parent. Whatever order the siblings arrive
//! in, every node settles on the one with the lower hash.

#[cfg(test)]
mod tests {
    use crate::fixtures::{init_tracing, keys, TestNode};
    use lc_consensus::{codec, BlockAcceptance, BlockRejection};
    use shared_types::Block;
    use std::sync::atomic::AtomicBool;
    use std::sync::{Arc, Barrier};

    fn mine(node: &TestNode) -> Block {
        node.service
            .mine_next_block(&AtomicBool::new(false))
            .expect("block mined")
    }

    fn value(block: &Block) -> primitive_types::U256 {
        codec::hash_to_u256(block.hash()).unwrap()
    }

    /// Two nodes sharing a genesis mined by the first.
    fn connected_pair() -> (TestNode, TestNode) {
        let alpha = TestNode::new("alpha");
        let beta = TestNode::new("beta");
        let genesis = mine(&alpha);
        beta.service.submit_block(genesis).unwrap();
        (alpha, beta)
    }

    #[test]
    fn test_nodes_converge_on_lower_hash() {
        init_tracing();
        let (alpha, beta) = connected_pair();

        let from_alpha = mine(&alpha);
        let from_beta = mine(&beta);
        assert_ne!(from_alpha.hash(), from_beta.hash());
        assert_eq!(from_alpha.header.previous_hash, from_beta.header.previous_hash);

        let alpha_gets = alpha.service.submit_block(from_beta.clone());
        let beta_gets = beta.service.submit_block(from_alpha.clone());

        let winner = if value(&from_alpha) < value(&from_beta) {
            &from_alpha
        } else {
            &from_beta
        };
        assert_eq!(alpha.tip().as_ref(), Some(winner));
        assert_eq!(beta.tip().as_ref(), Some(winner));
        assert_eq!(alpha.height(), 1);
        assert_eq!(beta.height(), 1);

        // exactly one side replaced its tip; the other refused the higher hash
        let outcomes = [alpha_gets, beta_gets];
        let replaced = outcomes
            .iter()
            .filter(|r| matches!(r, Ok(BlockAcceptance::ReplacedTip { .. })))
            .count();
        assert_eq!(replaced, 1);
        let refused = outcomes.iter().find_map(|r| r.as_ref().err()).unwrap();
        assert_eq!(
            refused.block_rejection(),
            Some(&BlockRejection::HigherDifficulty {
                incumbent: winner.hash().to_string()
            })
        );
    }

    #[test]
    fn test_concurrent_siblings_resolve_by_hash() {
        init_tracing();
        for round in 0..10 {
            let node = TestNode::new("observer");
            let genesis = mine(&node);
            let a = node.seal_block(
                vec![node.coinbase(&format!("a{round}"))],
                Some(genesis.hash()),
                &format!("a{round}"),
            );
            let b = node.seal_block(
                vec![node.coinbase(&format!("b{round}"))],
                Some(genesis.hash()),
                &format!("b{round}"),
            );
            let expected = if value(&a) < value(&b) { a.clone() } else { b.clone() };

            let node = Arc::new(node);
            let start = Arc::new(Barrier::new(2));
            let handles: Vec<_> = [a, b]
                .into_iter()
                .map(|block| {
                    let node = node.clone();
                    let start = start.clone();
                    std::thread::spawn(move || {
                        start.wait();
                        node.service.submit_block(block)
                    })
                })
                .collect();
            for handle in handles {
                let _ = handle.join().unwrap();
            }

            assert_eq!(node.tip(), Some(expected), "round {round}");
            assert_eq!(node.height(), 1);
        }
    }

    #[test]
    fn test_displaced_transactions_return_to_pool() {
        init_tracing();
        let (alpha, beta) = connected_pair();
        // alpha owns the genesis reward
        let transfer = alpha
            .wallet
            .transfer_token(&keys("alpha"), "carol", 7, 1)
            .unwrap();
        assert!(alpha.service.submit_transaction(transfer.clone()));

        let from_alpha = mine(&alpha);
        assert!(from_alpha.transactions.contains(&transfer));
        assert!(alpha.service.pool().is_empty());

        let sibling = beta.seal_block(
            vec![beta.coinbase("beta")],
            from_alpha.header.previous_hash.as_deref(),
            "beta",
        );
        // whichever hash is lower decides
        match alpha.service.submit_block(sibling.clone()) {
            Ok(acceptance) => {
                assert_eq!(acceptance.displaced(), Some(&from_alpha));
                assert!(alpha.service.pool().contains(&transfer));
                assert_eq!(alpha.tip(), Some(sibling));
            }
            Err(e) => {
                assert!(matches!(
                    e.block_rejection(),
                    Some(BlockRejection::HigherDifficulty { .. })
                ));
                assert!(alpha.service.pool().is_empty());
                assert_eq!(alpha.tip(), Some(from_alpha));
            }
        }
    }

    #[test]
    fn test_siblings_across_an_epoch_boundary_converge() {
        init_tracing();
        let (alpha, beta) = connected_pair();
        // one full epoch in a single second: heights from 11 face 150
        while alpha.height() < 9 {
            let block = mine(&alpha);
            beta.service.submit_block(block).unwrap();
        }
        let parent = alpha.tip().unwrap();

        let x = alpha.seal_block(vec![alpha.coinbase("x")], Some(parent.hash()), "x");
        let y = alpha.seal_block(vec![alpha.coinbase("y")], Some(parent.hash()), "y");
        let winner = if value(&x) < value(&y) { x.clone() } else { y.clone() };

        let _ = alpha.service.submit_block(x.clone());
        let _ = alpha.service.submit_block(y.clone());
        let _ = beta.service.submit_block(y);
        let _ = beta.service.submit_block(x);

        assert_eq!(alpha.tip(), Some(winner.clone()));
        assert_eq!(beta.tip(), Some(winner));
        assert_eq!(alpha.height(), 10);
        assert_eq!(beta.height(), 10);
    }

    #[test]
    fn test_sibling_of_buried_block_is_a_split() {
        init_tracing();
        let node = TestNode::new("miner");
        let genesis = mine(&node);
        mine(&node);
        mine(&node);

        let late = node.seal_block(vec![node.coinbase("late")], Some(genesis.hash()), "late");
        let err = node.service.submit_block(late).unwrap_err();
        assert_eq!(
            err.block_rejection(),
            Some(&BlockRejection::ChainSplitNotSupported)
        );
        assert_eq!(node.height(), 2);
    }
}

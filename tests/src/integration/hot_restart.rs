//! # Hot restart
//!
//! While a nonce search is in flight the network moves two blocks ahead.
//! The miner must drop its stale candidate and finish on the new tip.

#[cfg(test)]
mod tests {
    use crate::fixtures::{easy_consensus, init_tracing, TestNode};
    use lc_block_production::{BlockCreator, BlockRequest, MinerConfig};
    use lc_consensus::adapters::PlaceholderSigner;
    use lc_consensus::{Difficulty, Signer};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Barrier};

    /// Pauses the first block signature until the test lets it continue.
    struct GateSigner {
        armed: AtomicBool,
        reached: Barrier,
        release: Barrier,
    }

    impl GateSigner {
        fn new() -> Self {
            Self {
                armed: AtomicBool::new(false),
                reached: Barrier::new(2),
                release: Barrier::new(2),
            }
        }
    }

    impl Signer for GateSigner {
        fn signature_is_valid(&self, signature: &str, hash: &str, public_key: &str) -> bool {
            PlaceholderSigner.signature_is_valid(signature, hash, public_key)
        }

        fn create_signature(&self, hash: &str, private_key: &str) -> String {
            if self.armed.swap(false, Ordering::SeqCst) {
                self.reached.wait();
                self.release.wait();
            }
            PlaceholderSigner.create_signature(hash, private_key)
        }
    }

    #[test]
    fn test_miner_moves_to_new_tip() {
        init_tracing();
        let gate = Arc::new(GateSigner::new());
        let node = Arc::new(TestNode::with_signer(
            easy_consensus(),
            MinerConfig::new("miner", "miner"),
            gate.clone(),
        ));
        let genesis = node
            .service
            .mine_next_block(&AtomicBool::new(false))
            .unwrap();

        // same validator, so the same tip watch
        let creator = BlockCreator::new(node.service.validator().clone(), gate.clone());
        let request = BlockRequest::new(
            "miner",
            node.chain.clone(),
            vec![node.coinbase("miner")],
            Difficulty::one(),
            node.consensus.maximum_target,
        );

        gate.armed.store(true, Ordering::SeqCst);
        let miner = {
            let cancel = AtomicBool::new(false);
            std::thread::spawn(move || creator.mine(request, &cancel))
        };

        // The miner is now holding a candidate built on genesis.
        gate.reached.wait();
        let first = node.seal_block(vec![node.coinbase("peer")], Some(genesis.hash()), "peer");
        node.service.submit_block(first.clone()).unwrap();
        let second = node.seal_block(vec![node.coinbase("peer")], Some(first.hash()), "peer");
        node.service.submit_block(second.clone()).unwrap();
        gate.release.wait();

        let mined = miner.join().unwrap().unwrap();
        assert!(mined.restarts >= 1);
        assert_eq!(mined.block.header.previous_hash.as_deref(), Some(second.hash()));
        assert_eq!(mined.acceptance.height(), 3);
        assert_eq!(node.tip(), Some(mined.block));
    }

    #[test]
    fn test_service_thread_follows_submitted_blocks() {
        init_tracing();
        let node = TestNode::new("miner");
        let genesis = node
            .service
            .mine_next_block(&AtomicBool::new(false))
            .unwrap();
        let external = node.seal_block(vec![node.coinbase("peer")], Some(genesis.hash()), "peer");
        node.service.submit_block(external.clone()).unwrap();

        assert!(node.service.start());
        assert!(crate::fixtures::wait_for(|| node.height() >= 3));
        node.service.stop();

        // the chain is linear and passes through the external block
        let chain = node.chain.read();
        assert_eq!(chain.block_at(1), Some(&external));
        for window in chain.blocks().windows(2) {
            assert_eq!(window[1].header.previous_hash.as_deref(), Some(window[0].hash()));
        }
    }
}

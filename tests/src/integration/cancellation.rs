//! # Cancellation
//!
//! A search that cannot succeed still stops promptly when asked to.

#[cfg(test)]
mod tests {
    use crate::fixtures::{easy_consensus, init_tracing, TestNode};
    use lc_block_production::{MinerConfig, MiningError};
    use lc_consensus::ConsensusConfig;
    use primitive_types::U256;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    /// Only an all-zero hash meets a target of one.
    fn unmineable() -> ConsensusConfig {
        ConsensusConfig {
            maximum_target: U256::one(),
            ..easy_consensus()
        }
    }

    #[test]
    fn test_stop_interrupts_endless_search() {
        init_tracing();
        let node = TestNode::with_config(unmineable(), MinerConfig::new("miner", "miner"));

        assert!(node.service.start());
        std::thread::sleep(Duration::from_millis(50));
        assert!(node.service.is_running());

        let started = Instant::now();
        node.service.stop();
        assert!(started.elapsed() < Duration::from_secs(2));

        let status = node.service.status();
        assert!(!status.active);
        assert_eq!(status.blocks_mined, 0);
        assert!(node.chain.read().is_empty());
    }

    #[test]
    fn test_mine_next_block_observes_flag() {
        init_tracing();
        let node = Arc::new(TestNode::with_config(
            unmineable(),
            MinerConfig::new("miner", "miner"),
        ));
        let cancel = Arc::new(AtomicBool::new(false));

        let handle = {
            let node = node.clone();
            let cancel = cancel.clone();
            std::thread::spawn(move || node.service.mine_next_block(&cancel))
        };
        std::thread::sleep(Duration::from_millis(20));
        cancel.store(true, Ordering::SeqCst);

        assert!(matches!(handle.join().unwrap(), Err(MiningError::Cancelled)));
        assert!(node.chain.read().is_empty());
    }

    #[test]
    fn test_pending_transactions_survive_cancellation() {
        init_tracing();
        let node = TestNode::new("miner");
        node.service
            .mine_next_block(&AtomicBool::new(false))
            .unwrap();
        let transfer = node
            .wallet
            .transfer_token(&crate::fixtures::keys("miner"), "bob", 5, 1)
            .unwrap();
        assert!(node.service.submit_transaction(transfer.clone()));

        let err = node
            .service
            .mine_next_block(&AtomicBool::new(true))
            .unwrap_err();
        assert!(matches!(err, MiningError::Cancelled));
        assert!(node.service.pool().contains(&transfer));
        assert_eq!(node.height(), 0);
    }

    #[test]
    fn test_service_can_restart_after_stop() {
        init_tracing();
        let node = TestNode::new("miner");

        assert!(node.service.start());
        assert!(crate::fixtures::wait_for(|| node.height() >= 0));
        node.service.stop();
        let height = node.height();

        assert!(node.service.start());
        assert!(crate::fixtures::wait_for(|| node.height() > height));
        node.service.stop();
        assert!(!node.service.is_running());
    }
}

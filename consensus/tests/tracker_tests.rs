use prometheus::IntCounter;
use serde_json::json;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use concord_consensus::{
    ConsensusSetEvidence, ConsensusTracker, DivergenceCause, MetaDiff, Reconciliation,
    TxDifference, CONSENSUS_CACHE_AGE, CONSENSUS_CACHE_CAPACITY,
};
use concord_ledger::{BlobLedgerLoader, Ledger, LedgerBuilder, LedgerStore, TxMeta, TxResult};
use concord_nullables::{NullClock, NullLedgerStore};
use concord_types::{CloseTime, LedgerHash, LedgerSeq, TxHash, TxSetHash};

struct Harness {
    clock: Arc<NullClock>,
    ledgers: Arc<LedgerStore>,
    tracker: ConsensusTracker,
}

fn harness() -> Harness {
    let clock = Arc::new(NullClock::new());
    let loader = Arc::new(BlobLedgerLoader::new(Arc::new(NullLedgerStore::new())));
    let ledgers = Arc::new(LedgerStore::new(
        256,
        Duration::from_secs(600),
        clock.clone(),
        loader,
    ));
    let counter = IntCounter::new("test_mismatch_total", "mismatches").unwrap();
    let tracker = ConsensusTracker::new(ledgers.clone(), clock.clone(), counter);
    Harness {
        clock,
        ledgers,
        tracker,
    }
}

fn tx(n: u8) -> TxHash {
    TxHash::new([n; 32])
}

fn parent() -> LedgerHash {
    LedgerHash::new([0x11; 32])
}

fn set(n: u8) -> TxSetHash {
    TxSetHash::new([n; 32])
}

/// A ledger at `seq` on the common parent, closing at 1000, holding the
/// given transactions with their result codes.
fn ledger_with(seq: LedgerSeq, txs: &[(u8, i32)]) -> Arc<Ledger> {
    let mut builder = LedgerBuilder::new(seq, parent()).close_time(CloseTime::new(1_000));
    for (i, (id, result)) in txs.iter().enumerate() {
        builder = builder.transaction(
            tx(*id),
            vec![*id; 8],
            Some(TxMeta::new(TxResult(*result), i as u32)),
        );
    }
    Arc::new(builder.build())
}

impl Harness {
    fn stored(&self, ledger: Arc<Ledger>) -> Arc<Ledger> {
        self.ledgers.insert(ledger.clone(), false);
        ledger
    }

    fn report(&self, outcome: Reconciliation) -> DivergenceCause {
        match outcome {
            Reconciliation::Diverged(report) => report.cause,
            other => panic!("expected a divergence, got {other:?}"),
        }
    }
}

#[test]
fn equal_hashes_never_diagnose() {
    let h = harness();
    let l = h.stored(ledger_with(100, &[(1, 0)]));

    assert_eq!(h.tracker.record_built(&l, set(1), json!({})), Reconciliation::Pending);
    assert_eq!(h.tracker.record_validated(&l, Some(set(1))), Reconciliation::Matched);
    assert_eq!(h.tracker.mismatch_count(), 0);
}

#[test]
fn late_build_matches() {
    let h = harness();
    let l = h.stored(ledger_with(100, &[(1, 0)]));

    assert_eq!(h.tracker.record_validated(&l, None), Reconciliation::Pending);
    assert_eq!(h.tracker.record_built(&l, set(1), json!({})), Reconciliation::Matched);
    assert_eq!(h.tracker.mismatch_count(), 0);
}

#[test]
fn unequal_hashes_diagnose_exactly_once() {
    let h = harness();
    let built = h.stored(ledger_with(100, &[(1, 0)]));
    let valid = h.stored(ledger_with(100, &[(1, 0), (2, 0)]));

    h.tracker.record_built(&built, set(1), json!({"proposers": 5}));
    let outcome = h.tracker.record_validated(&valid, None);
    assert!(matches!(outcome, Reconciliation::Diverged(_)));
    assert_eq!(h.tracker.mismatch_count(), 1);

    // Replays of either side never fire again.
    assert_eq!(h.tracker.record_validated(&valid, None), Reconciliation::AlreadyRecorded);
    assert_eq!(
        h.tracker.record_built(&built, set(1), json!({})),
        Reconciliation::AlreadyRecorded
    );
    assert_eq!(h.tracker.mismatch_count(), 1);
}

#[test]
fn reversed_arrival_keeps_roles() {
    let h = harness();
    let built = h.stored(ledger_with(100, &[(1, 0)]));
    let valid = h.stored(ledger_with(100, &[(1, 0), (2, 0)]));

    assert_eq!(h.tracker.record_validated(&valid, Some(set(9))), Reconciliation::Pending);
    let Reconciliation::Diverged(report) = h.tracker.record_built(&built, set(1), json!({}))
    else {
        panic!("expected a divergence");
    };
    assert_eq!(report.mismatch.built, built.hash());
    assert_eq!(report.mismatch.valid, valid.hash());
    assert_eq!(report.mismatch.built_consensus_hash, Some(set(1)));
    assert_eq!(report.mismatch.valid_consensus_hash, Some(set(9)));

    let DivergenceCause::Transactions(diff) = report.cause else {
        panic!("expected a transaction diff");
    };
    assert_eq!(diff.differences, vec![TxDifference::MissingFromBuilt(tx(2))]);
    assert_eq!(
        diff.consensus_set,
        Some(ConsensusSetEvidence::Different {
            built: set(1),
            valid: set(9)
        })
    );
    assert_eq!(h.tracker.mismatch_count(), 1);
}

#[test]
fn prior_ledger_mismatch_stops_analysis() {
    let h = harness();
    let built = h.stored(Arc::new(LedgerBuilder::new(50, LedgerHash::new([1; 32])).build()));
    let valid = h.stored(Arc::new(LedgerBuilder::new(50, LedgerHash::new([2; 32])).build()));

    h.tracker.record_built(&built, set(1), json!({}));
    let cause = h.report(h.tracker.record_validated(&valid, Some(set(1))));
    assert_eq!(
        cause,
        DivergenceCause::PriorLedger {
            built_parent: LedgerHash::new([1; 32]),
            valid_parent: LedgerHash::new([2; 32]),
        }
    );
}

#[test]
fn close_time_mismatch_stops_analysis() {
    let h = harness();
    let built = h.stored(Arc::new(
        LedgerBuilder::new(50, parent()).close_time(CloseTime::new(100)).build(),
    ));
    let valid = h.stored(Arc::new(
        LedgerBuilder::new(50, parent()).close_time(CloseTime::new(200)).build(),
    ));

    h.tracker.record_built(&built, set(1), json!({}));
    let cause = h.report(h.tracker.record_validated(&valid, None));
    assert_eq!(
        cause,
        DivergenceCause::CloseTime {
            built: CloseTime::new(100),
            valid: CloseTime::new(200),
        }
    );
}

#[test]
fn result_code_difference_lists_only_that_transaction() {
    let h = harness();
    let built = h.stored(ledger_with(70, &[(1, 0), (2, 0), (3, 0)]));
    let valid = h.stored(ledger_with(70, &[(1, 0), (2, 101), (3, 0)]));

    h.tracker.record_built(&built, set(1), json!({}));
    let DivergenceCause::Transactions(diff) =
        h.report(h.tracker.record_validated(&valid, None))
    else {
        panic!("expected a transaction diff");
    };

    assert_eq!(diff.built_count, 3);
    assert_eq!(diff.valid_count, 3);
    assert!(!diff.same_transactions);
    assert_eq!(diff.consensus_set, None);
    assert_eq!(diff.differences.len(), 1);
    match &diff.differences[0] {
        TxDifference::Metadata {
            id,
            diff: MetaDiff::Fields(fields),
        } => {
            assert_eq!(*id, tx(2));
            assert_eq!(fields.result, Some((TxResult(0), TxResult(101))));
            assert!(fields.index.is_none());
            assert!(fields.nodes.is_none());
        }
        other => panic!("unexpected difference {other:?}"),
    }
}

#[test]
fn same_consensus_set_still_diffs_transactions() {
    let h = harness();
    let built = h.stored(ledger_with(1_000, &[(1, 0), (3, 0)]));
    let valid = h.stored(ledger_with(1_000, &[(1, 0), (2, 0)]));

    h.tracker.record_built(&built, set(0xCA), json!({}));
    let DivergenceCause::Transactions(diff) =
        h.report(h.tracker.record_validated(&valid, Some(set(0xCA))))
    else {
        panic!("expected a transaction diff");
    };

    assert_eq!(diff.consensus_set, Some(ConsensusSetEvidence::Same(set(0xCA))));
    let ids: Vec<_> = diff.differences.iter().map(|d| d.id()).collect();
    assert_eq!(ids, vec![tx(2), tx(3)]);
    assert_eq!(diff.differences[0], TxDifference::MissingFromBuilt(tx(2)));
    assert_eq!(diff.differences[1], TxDifference::MissingFromValid(tx(3)));
}

#[test]
fn unavailable_ledger_is_unanalyzable_but_counted() {
    let h = harness();
    let built = h.stored(ledger_with(5, &[(1, 0)]));
    let valid = ledger_with(5, &[(2, 0)]);

    h.tracker.record_built(&built, set(1), json!({}));
    let cause = h.report(h.tracker.record_validated(&valid, None));
    assert_eq!(
        cause,
        DivergenceCause::Unanalyzable {
            built_available: true,
            valid_available: false,
        }
    );
    assert_eq!(h.tracker.mismatch_count(), 1);
}

#[test]
fn evicted_record_loses_its_diagnosis() {
    let h = harness();
    let built = h.stored(ledger_with(1, &[(1, 0)]));
    let valid = h.stored(ledger_with(1, &[(2, 0)]));

    h.tracker.record_built(&built, set(1), json!({}));
    for seq in 2..=(CONSENSUS_CACHE_CAPACITY as u32 + 1) {
        h.tracker.record_built(&ledger_with(seq, &[]), set(1), json!({}));
    }
    assert_eq!(h.tracker.cache_info().size, CONSENSUS_CACHE_CAPACITY);

    assert_eq!(h.tracker.record_validated(&valid, None), Reconciliation::Pending);
    assert_eq!(h.tracker.mismatch_count(), 0);
}

#[test]
fn expired_record_loses_its_diagnosis() {
    let h = harness();
    let built = h.stored(ledger_with(1, &[(1, 0)]));
    let valid = h.stored(ledger_with(1, &[(2, 0)]));

    h.tracker.record_built(&built, set(1), json!({}));
    h.clock.advance(CONSENSUS_CACHE_AGE + Duration::from_secs(1));
    assert_eq!(h.tracker.record_validated(&valid, None), Reconciliation::Pending);
    assert_eq!(h.tracker.mismatch_count(), 0);
}

#[test]
fn concurrent_sides_diagnose_once() {
    for seq in 1..=20 {
        let h = Arc::new(harness());
        let built = h.stored(ledger_with(seq, &[(1, 0)]));
        let valid = h.stored(ledger_with(seq, &[(2, 0)]));
        let barrier = Arc::new(Barrier::new(2));

        let a = {
            let (h, b, barrier) = (h.clone(), built.clone(), barrier.clone());
            thread::spawn(move || {
                barrier.wait();
                h.tracker.record_built(&b, set(1), json!({}))
            })
        };
        let c = {
            let (h, v, barrier) = (h.clone(), valid.clone(), barrier.clone());
            thread::spawn(move || {
                barrier.wait();
                h.tracker.record_validated(&v, None)
            })
        };

        let outcomes = [a.join().unwrap(), c.join().unwrap()];
        let diverged = outcomes
            .iter()
            .filter(|o| matches!(o, Reconciliation::Diverged(_)))
            .count();
        assert_eq!(diverged, 1);
        assert_eq!(h.tracker.mismatch_count(), 1);
    }
}

//! Per-subject isolation and linearizable belief updates under load.

use std::sync::{Arc, Barrier};
use std::thread;

use trustgate::{Evidence, Risk, SubjectId, Timestamp, Trustgate, TrustgateConfig};

const SUBJECTS: usize = 8;
const UPDATES_PER_THREAD: usize = 50;

fn config() -> TrustgateConfig {
    let mut source = String::from("[decay]\nrate = 0.0\n\n[[objects]]\nid = \"record\"\nbase_requirement = 0.5\n");
    for i in 0..SUBJECTS {
        source.push_str(&format!(
            "\n[[grants]]\nsubject = \"s{i}\"\nobject = \"record\"\n\n[[subjects]]\nid = \"s{i}\"\ninitial_trust = 0.5\n"
        ));
    }
    toml::from_str(&source).expect("valid toml")
}

#[test]
fn interleaved_positive_and_negative_evidence_commute() {
    // LR 2 and LR 0.5 cancel in odds space, so any interleaving of an equal
    // number of each returns to the prior unless an update is lost. Few
    // rounds keep the odds far from where f64 saturates p at 1.
    const ROUNDS: usize = 10;
    let gate = Arc::new(Trustgate::from_config_at(&config(), Timestamp::EPOCH).unwrap().without_audit());
    let barrier = Arc::new(Barrier::new(4));
    let up = Evidence::from_ratio(2.0).unwrap();
    let down = Evidence::from_ratio(0.5).unwrap();

    let handles: Vec<_> = [up, down, up, down]
        .into_iter()
        .map(|evidence| {
            let gate = Arc::clone(&gate);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let subject = SubjectId::new("s0");
                barrier.wait();
                for _ in 0..ROUNDS {
                    gate.observe(&subject, &evidence, Timestamp::EPOCH).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let trust = gate.effective_trust(&"s0".into(), Timestamp::EPOCH).unwrap().get();
    assert!((trust - 0.5).abs() < 1e-6, "{trust}");
}

#[test]
fn subjects_are_evaluated_independently() {
    let gate = Arc::new(Trustgate::from_config_at(&config(), Timestamp::EPOCH).unwrap().without_audit());
    let barrier = Arc::new(Barrier::new(SUBJECTS));

    let handles: Vec<_> = (0..SUBJECTS)
        .map(|i| {
            let gate = Arc::clone(&gate);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let subject = SubjectId::new(format!("s{i}"));
                barrier.wait();
                // Even subjects are pushed down, odd subjects up.
                let evidence = if i % 2 == 0 {
                    Evidence::anomalous_traffic()
                } else {
                    Evidence::mfa_success()
                };
                gate.observe(&subject, &evidence, Timestamp::EPOCH).unwrap();
                for _ in 0..UPDATES_PER_THREAD {
                    let permitted =
                        gate.authorize(&subject, &"record".into(), Some(0.0), Timestamp::EPOCH);
                    assert_eq!(permitted, i % 2 == 1, "subject s{i}");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn decisions_do_not_mutate_belief() {
    let gate = Arc::new(Trustgate::from_config_at(&config(), Timestamp::EPOCH).unwrap().without_audit());
    let subject = SubjectId::new("s1");
    let before = gate.engine().belief(&subject).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|n| {
            let gate = Arc::clone(&gate);
            thread::spawn(move || {
                for step in 0..UPDATES_PER_THREAD {
                    let now = Timestamp::from_secs((n * UPDATES_PER_THREAD + step) as u64);
                    let _ = gate.decide(&"s1".into(), &"record".into(), Some(Risk::MAX), now);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(gate.engine().belief(&subject).unwrap(), before);
}

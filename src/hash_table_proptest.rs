#![cfg(test)]

// Property tests for HashTable kept inside the crate so they can reach the
// hashing internals without widening the public surface.

use crate::hash::lookup2;
use crate::hash_table::{HashFlags, HashTable, KeyMode};
use proptest::prelude::*;
use std::rc::Rc;

#[derive(Debug)]
struct Rec {
    key: String,
    id: usize,
}

#[derive(Clone, Debug)]
enum Op {
    Insert(usize),
    Delete(usize),
    Find(usize),
    FindAll(usize),
    Miss(String),
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<Op>)> {
    proptest::collection::vec("[a-cA-C]{0,4}", 1..=6).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let op = prop_oneof![
            3 => idx.clone().prop_map(Op::Insert),
            2 => (0usize..64).prop_map(Op::Delete),
            3 => idx.clone().prop_map(Op::Find),
            1 => idx.clone().prop_map(Op::FindAll),
            1 => "[x-z]{1,3}".prop_map(Op::Miss),
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
    })
}

fn same_key(a: &str, b: &str, nocase: bool) -> bool {
    if nocase {
        a.eq_ignore_ascii_case(b)
    } else {
        a == b
    }
}

// Property: State-machine equivalence against an insertion-ordered Vec.
// Invariants exercised across random operation sequences:
// - `find` returns the newest matching record under head insertion and the
//   oldest under tail insertion.
// - `find_all` yields every matching record, in that same order.
// - `delete` is by identity and removes exactly one entry.
// - `len` tracks the model after each op; keys outside the pool never match.
proptest! {
    #![proptest_config(ProptestConfig { cases: 96, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine(
        (pool, ops) in arb_scenario(),
        capacity in 1usize..8,
        nocase in any::<bool>(),
        tail in any::<bool>(),
    ) {
        let mut flags = HashFlags::default();
        if nocase {
            flags = flags.case_insensitive();
        }
        if tail {
            flags = flags.insert_tail();
        }
        let mut sut: HashTable<Rc<Rec>> = HashTable::new(
            "prop",
            capacity,
            KeyMode::Str { max_len: 0 },
            flags,
            |r: &Rec| r.key.as_bytes(),
        )
        .unwrap();
        // Live records in insertion order.
        let mut model: Vec<Rc<Rec>> = Vec::new();
        let mut next_id = 0usize;

        for op in ops {
            match op {
                Op::Insert(i) => {
                    let r = Rc::new(Rec { key: pool[i].clone(), id: next_id });
                    next_id += 1;
                    sut.insert(r.clone());
                    model.push(r);
                }
                Op::Delete(n) => {
                    if model.is_empty() {
                        continue;
                    }
                    let r = model.remove(n % model.len());
                    let out = sut.delete(&r).expect("live record must be indexed");
                    prop_assert!(Rc::ptr_eq(&out, &r));
                    prop_assert!(sut.delete(&r).is_none());
                }
                Op::Find(i) => {
                    let key = &pool[i];
                    let mut matches = model.iter().filter(|r| same_key(&r.key, key, nocase));
                    let expected = if tail { matches.next() } else { matches.last() };
                    let got = sut.find(key.as_bytes());
                    prop_assert_eq!(got.map(|r| r.id), expected.map(|r| r.id));
                }
                Op::FindAll(i) => {
                    let key = &pool[i];
                    let mut expected: Vec<usize> = model
                        .iter()
                        .filter(|r| same_key(&r.key, key, nocase))
                        .map(|r| r.id)
                        .collect();
                    if !tail {
                        expected.reverse();
                    }
                    let got: Vec<usize> = sut.find_all(key.as_bytes()).iter().map(|r| r.id).collect();
                    prop_assert_eq!(got, expected);
                }
                Op::Miss(s) => {
                    prop_assert!(sut.find(s.as_bytes()).is_none());
                }
            }
            prop_assert_eq!(sut.len(), model.len());
            prop_assert_eq!(sut.is_empty(), model.is_empty());
        }

        let stats = sut.stats();
        prop_assert_eq!(stats.entries, model.len());
        prop_assert!(stats.empty_buckets <= capacity);
    }
}

// Property: folded hashing agrees with ASCII-lowercased hashing.
proptest! {
    #[test]
    fn prop_fold_matches_lowercase(s in "[ -~]{0,40}") {
        let lower = s.to_ascii_lowercase();
        prop_assert_eq!(lookup2(s.as_bytes(), true), lookup2(lower.as_bytes(), false));
    }
}

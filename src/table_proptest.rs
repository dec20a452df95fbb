#![cfg(test)]

// Property tests for ChainTable kept inside the crate so the chain
// invariants can be checked against internal state.

use crate::ops::{Callbacks, EntryOps};
use crate::table::ChainTable;
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::collections::{BTreeMap, HashMap};

// Pool-indexed operations so shrinking moves toward earlier keys and
// shorter scenarios.
#[derive(Clone, Debug)]
enum OpI {
    Add(usize),
    Lookup(usize),
    Probe(String),
    Export,
    Metrics,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=12).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let op = prop_oneof![
            4 => idx.clone().prop_map(OpI::Add),
            2 => idx.prop_map(OpI::Lookup),
            1 => "[a-z]{0,5}".prop_map(OpI::Probe),
            1 => Just(OpI::Export),
            1 => Just(OpI::Metrics),
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
    })
}

fn arb_schedule() -> impl Strategy<Value = Vec<usize>> {
    proptest::collection::btree_set(1usize..64, 1..=5).prop_map(|s| s.into_iter().collect())
}

// State-machine equivalence against a HashMap<String, usize> frequency model.
// Invariants checked after every step:
// - `add` returns the model's updated count.
// - `lookup` parity, and lookups never change frequencies.
// - unique/total counters equal the model's key count and count sum.
// - capacity is `schedule[stage]` and never shrinks.
// - export yields each key once with its model frequency.
// - chain lengths sum to the unique count.
fn run_scenario<O: EntryOps<String>>(
    mut sut: ChainTable<String, O>,
    pool: &[String],
    ops: Vec<OpI>,
) -> Result<(), TestCaseError> {
    let mut model: HashMap<String, usize> = HashMap::new();
    let mut last_capacity = sut.capacity();

    for op in ops {
        match op {
            OpI::Add(i) => {
                let k = pool[i].clone();
                let expected = {
                    let n = model.entry(k.clone()).or_insert(0);
                    *n += 1;
                    *n
                };
                prop_assert_eq!(sut.add(k), expected);
            }
            OpI::Lookup(i) => {
                let k = &pool[i];
                let got = sut.lookup(k).map(|e| (e.data.clone(), e.frequency));
                prop_assert_eq!(got, model.get(k).map(|&n| (k.clone(), n)));
            }
            OpI::Probe(s) => {
                prop_assert_eq!(sut.frequency(&s), model.get(&s).copied().unwrap_or(0));
            }
            OpI::Export => {
                let exported = sut.to_array();
                prop_assert_eq!(exported.len(), sut.unique_entries());
                let by_key: BTreeMap<String, usize> = exported
                    .iter()
                    .map(|e| (e.data.clone(), e.frequency))
                    .collect();
                prop_assert_eq!(by_key.len(), exported.len(), "export must not repeat keys");
                let expected: BTreeMap<String, usize> =
                    model.iter().map(|(k, &n)| (k.clone(), n)).collect();
                prop_assert_eq!(by_key, expected);
            }
            OpI::Metrics => {
                let m = sut.metrics();
                let summed = (m.avg_chain_length * m.chains as f64).round() as usize;
                prop_assert_eq!(summed, sut.unique_entries());
                prop_assert!(m.chains <= sut.capacity());
                prop_assert!(m.max_chain_length <= sut.unique_entries());
            }
        }

        prop_assert_eq!(sut.unique_entries(), model.len());
        prop_assert_eq!(sut.total_entries(), model.values().sum::<usize>());
        prop_assert_eq!(sut.capacity(), sut.schedule()[sut.stage()]);
        prop_assert!(sut.capacity() >= last_capacity);
        last_capacity = sut.capacity();
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine(
        (pool, ops) in arb_scenario(),
        schedule in arb_schedule(),
        threshold in 0.05f64..=1.0,
    ) {
        let sut: ChainTable<String> = ChainTable::new(&schedule, threshold).unwrap();
        run_scenario(sut, &pool, ops)?;
    }
}

// Same invariants with every value hashing to one slot, which stresses
// chain scanning and relocation order.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions(
        (pool, ops) in arb_scenario(),
        schedule in arb_schedule(),
        threshold in 0.05f64..=1.0,
    ) {
        let ops_const = Callbacks::new(|_: &String| 0u64, |a: &String, b: &String| a.cmp(b));
        let sut = ChainTable::with_ops(ops_const, &schedule, threshold).unwrap();
        prop_assert!(sut.metrics().chains == 0);
        run_scenario(sut, &pool, ops)?;
    }
}

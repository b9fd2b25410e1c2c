use crate::{hex_distance, pad_key, BkHammingTree, BkTree, HammingKey, KeyBits, Match};

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;

fn naive_distance(a: &[bool], b: &[bool]) -> u32 {
    a.iter().zip(b).filter(|(x, y)| x != y).count() as u32
}

fn bits_to_hex(bits: &[bool]) -> String {
    bits.chunks(4)
        .map(|nibble| {
            let v = nibble.iter().fold(0u32, |acc, &b| acc << 1 | b as u32);
            char::from_digit(v, 16).unwrap()
        })
        .collect()
}

fn hex64(v: u64) -> String {
    format!("{v:016x}")
}

fn brute_force(keys: &[u64], query: u64, radius: u32) -> BTreeSet<(u32, String)> {
    keys.iter()
        .map(|&k| ((k ^ query).count_ones(), hex64(k)))
        .filter(|(d, _)| *d <= radius)
        .collect()
}

fn assert_sorted(found: &[Match<HammingKey>]) {
    assert!(found.windows(2).all(|w| w[0].distance <= w[1].distance));
}

// Keys reached by flipping more and more random bits of a random base, so
// every distance from 0 to the full width shows up.
struct Fixture {
    bits: Vec<Vec<bool>>,
    hex: Vec<String>,
}

impl Fixture {
    fn new(width: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut order: Vec<usize> = (0..width).collect();
        order.shuffle(&mut rng);
        let mut base: Vec<bool> = (0..width).map(|_| rng.gen_bool(0.5)).collect();

        let mut bits = Vec::new();
        let mut stride = 0;
        while !order.is_empty() {
            let take = stride.min(order.len());
            for bit in order.drain(..take) {
                base[bit] = !base[bit];
            }
            bits.push(base.clone());
            stride += 1;
        }
        let hex = bits.iter().map(|b| bits_to_hex(b)).collect();
        Fixture { bits, hex }
    }

    fn query(&self, idx: usize, radius: u32) -> BTreeSet<(u32, String)> {
        self.bits
            .iter()
            .zip(&self.hex)
            .map(|(b, h)| (naive_distance(b, &self.bits[idx]), h.clone()))
            .filter(|(d, _)| *d <= radius)
            .collect()
    }
}

#[test]
fn fixture_distances_match_naive() {
    let fx = Fixture::new(512, 7);
    let tree = BkHammingTree::new(512).unwrap();
    for (a, ab) in fx.hex.iter().zip(&fx.bits) {
        for (b, bb) in fx.hex.iter().zip(&fx.bits) {
            assert_eq!(tree.distance(a, b).unwrap(), naive_distance(ab, bb));
        }
    }
}

#[test]
fn fixture_walk_visits_every_key() {
    let fx = Fixture::new(512, 11);
    let mut tree = BkHammingTree::new(512).unwrap();
    tree.add_all(&fx.hex).unwrap();

    let mut got = Vec::new();
    tree.walk(|key, _| got.push(key.to_string()));
    got.sort();
    let mut expected = fx.hex.clone();
    expected.sort();
    expected.dedup();
    assert_eq!(got, expected);
}

#[test]
fn fixture_query_matches_linear_scan_at_every_radius() {
    let fx = Fixture::new(512, 42);
    let mut tree = BkHammingTree::new(512).unwrap();
    tree.add_all(&fx.hex).unwrap();

    let mut rng = StdRng::seed_from_u64(42);
    for radius in 0..=512u32 {
        for idx in [0, rng.gen_range(0..fx.hex.len())] {
            let found = tree.find(&fx.hex[idx], radius).unwrap();
            assert_sorted(&found);
            let got: BTreeSet<_> = found
                .iter()
                .map(|m| (m.distance, m.key.to_string()))
                .collect();
            assert_eq!(got.len(), found.len());
            assert_eq!(got, fx.query(idx, radius), "radius {radius}");
        }
    }
}

proptest! {
    #[test]
    fn swar_bit_count_matches_reference(n in any::<u32>()) {
        let naive = (0..32).filter(|i| n >> i & 1 == 1).count() as u32;
        prop_assert_eq!(crate::hamming::bit_count(n), naive);
    }

    #[test]
    fn hex_distance_is_a_symmetric_xor_popcount(a in any::<u128>(), b in any::<u128>()) {
        let (ha, hb) = (format!("{a:032x}"), format!("{b:032x}"));
        let d = hex_distance(&ha, &hb).unwrap();
        prop_assert_eq!(d, (a ^ b).count_ones());
        prop_assert_eq!(d, hex_distance(&hb, &ha).unwrap());
        prop_assert_eq!(hex_distance(&ha, &ha).unwrap(), 0);
    }

    #[test]
    fn pad_key_left_fills_with_zeros(v in any::<u64>(), digits in 0usize..=16) {
        let bits = KeyBits::new(64).unwrap();
        let full = hex64(v);
        let short = &full[16 - digits..];
        let padded = pad_key(short, bits).unwrap();
        prop_assert_eq!(padded.len(), 16);
        prop_assert!(padded.ends_with(short));
        prop_assert!(padded[..16 - digits].bytes().all(|b| b == b'0'));
        prop_assert_eq!(pad_key(&full, bits).unwrap(), full);
    }

    #[test]
    fn query_matches_linear_scan(
        keys in prop::collection::vec(any::<u64>(), 0..64),
        query in any::<u64>(),
        radius in 0u32..=64,
    ) {
        let mut tree = BkHammingTree::new(64).unwrap();
        tree.add_all(keys.iter().map(|&k| hex64(k))).unwrap();

        let found = tree.find(&hex64(query), radius).unwrap();
        assert_sorted(&found);
        let got: BTreeSet<_> = found.iter().map(|m| (m.distance, m.key.to_string())).collect();
        prop_assert_eq!(got.len(), found.len());
        prop_assert_eq!(got, brute_force(&keys, query, radius));
    }

    #[test]
    fn clustered_query_matches_linear_scan(
        base in any::<u64>(),
        flips in prop::collection::vec(any::<u16>(), 1..64),
        radius in 0u32..=16,
    ) {
        // Keys differ from `base` only in the low 16 bits, giving many near neighbours.
        let keys: Vec<u64> = flips.iter().map(|&f| base ^ u64::from(f)).collect();
        let mut tree = BkHammingTree::new(64).unwrap();
        tree.add_all(keys.iter().map(|&k| hex64(k))).unwrap();

        let got: BTreeSet<_> = tree
            .find(&hex64(base), radius)
            .unwrap()
            .into_iter()
            .map(|m| (m.distance, m.key.to_string()))
            .collect();
        prop_assert_eq!(got, brute_force(&keys, base, radius));
    }

    #[test]
    fn insertion_is_idempotent(keys in prop::collection::vec(any::<u64>(), 1..32)) {
        let mut tree = BkHammingTree::new(64).unwrap();
        tree.add_all(keys.iter().map(|&k| hex64(k))).unwrap();
        let size = tree.size();
        prop_assert_eq!(size, keys.iter().collect::<BTreeSet<_>>().len());

        tree.add_all(keys.iter().map(|&k| format!("{k:x}"))).unwrap();
        prop_assert_eq!(tree.size(), size);
        for &k in &keys {
            prop_assert_eq!(tree.find(&hex64(k), 0).unwrap().len(), 1);
            prop_assert!(tree.has(&hex64(k)).unwrap());
        }
    }

    #[test]
    fn walk_visits_each_key_once_in_any_order(
        keys in prop::collection::vec(any::<u64>(), 0..48).prop_shuffle(),
    ) {
        let mut tree = BkHammingTree::new(128).unwrap();
        tree.add_all(keys.iter().map(|&k| hex64(k))).unwrap();

        let mut seen = Vec::new();
        let mut roots = 0;
        tree.walk(|key, depth| {
            if depth == 0 {
                roots += 1;
            }
            seen.push(key.to_string());
        });
        let expected: BTreeSet<_> = keys.iter().map(|&k| format!("{k:032x}")).collect();
        prop_assert_eq!(seen.len(), expected.len());
        prop_assert_eq!(seen.into_iter().collect::<BTreeSet<_>>(), expected);
        prop_assert_eq!(roots, usize::from(!keys.is_empty()));
    }

    #[test]
    fn generic_tree_matches_linear_scan(
        keys in prop::collection::vec(-500i64..500, 0..80),
        query in -600i64..600,
        radius in 0u32..200,
    ) {
        let line = |a: &i64, b: &i64| (a - b).unsigned_abs() as u32;
        let mut tree = BkTree::new(line);
        tree.add_all(keys.iter().copied()).unwrap();

        let found = tree.find(&query, radius).unwrap();
        prop_assert!(found.windows(2).all(|w| w[0].distance <= w[1].distance));
        let got: BTreeSet<_> = found.into_iter().map(|m| m.key).collect();
        let expected: BTreeSet<_> = keys
            .iter()
            .copied()
            .filter(|k| line(k, &query) <= radius)
            .collect();
        prop_assert_eq!(got, expected);
    }
}

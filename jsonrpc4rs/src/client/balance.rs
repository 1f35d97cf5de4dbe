// balance.rs
//
// Client-side load balancing (spec §4.8). HTTP uses power-of-two-choices
// over a monotone load counter per address; TCP's round robin is implicit
// in the pool's `activeTotal mod len` address selection (see
// `client::pool::dial_next`) and has no separate type here.

use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;

pub struct AddressLoad {
    pub address: String,
    load: AtomicU64,
}

impl AddressLoad {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            load: AtomicU64::new(0),
        }
    }

    pub fn load(&self) -> u64 {
        self.load.load(Ordering::Relaxed)
    }
}

/// Builds a fresh address-load list from a plain address list — called
/// whenever the client refreshes from discovery (spec §4.5: "the client
/// refreshes the address list from the discovery driver when the list
/// becomes empty").
pub fn build_address_list(addresses: &[String]) -> Vec<AddressLoad> {
    addresses.iter().map(AddressLoad::new).collect()
}

/// Power-of-two-choices: a single address returns immediately; otherwise
/// sample two distinct indices (resampling on collision, per the spec's
/// Open Question resolution — "a reimplementation should simply reject
/// equal pairs and resample" — rather than reproducing the original's
/// fresh-RNG-per-call quirk) and pick the one with the lower load,
/// incrementing its counter.
pub fn pick_power_of_two(list: &[AddressLoad]) -> Option<&AddressLoad> {
    match list.len() {
        0 => None,
        1 => {
            list[0].load.fetch_add(1, Ordering::Relaxed);
            Some(&list[0])
        }
        len => {
            let mut rng = rand::thread_rng();
            let (i, mut j) = (rng.gen_range(0..len), rng.gen_range(0..len));
            while i == j {
                j = rng.gen_range(0..len);
            }
            let (winner_idx, _) = if list[i].load() <= list[j].load() {
                (i, j)
            } else {
                (j, i)
            };
            let winner = &list[winner_idx];
            winner.load.fetch_add(1, Ordering::Relaxed);
            Some(winner)
        }
    }
}

#[cfg(test)]
mod balance_tests {
    use super::*;

    #[test]
    fn single_address_is_always_chosen() {
        let list = build_address_list(&["a:1".to_string()]);
        let picked = pick_power_of_two(&list).unwrap();
        assert_eq!(picked.address, "a:1");
        assert_eq!(list[0].load(), 1);
    }

    #[test]
    fn empty_list_returns_none() {
        let list: Vec<AddressLoad> = Vec::new();
        assert!(pick_power_of_two(&list).is_none());
    }

    #[test]
    fn no_starvation_over_many_calls() {
        let list = build_address_list(&["a:1".to_string(), "b:1".to_string(), "c:1".to_string()]);
        for _ in 0..500 {
            pick_power_of_two(&list);
        }
        assert!(list.iter().all(|a| a.load() > 0));
    }
}

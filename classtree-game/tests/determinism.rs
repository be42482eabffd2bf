use std::hash::Hasher;

use classtree_game::{Catalog, RngStreams, TreeBuilder, TreeConfig};
use twox_hash::XxHash64;

fn catalog_digest(catalog: &Catalog) -> u64 {
    let bytes = serde_json::to_vec(catalog).unwrap();
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(&bytes);
    hasher.finish()
}

fn build(seed: u64, target: usize) -> Catalog {
    let mut streams = RngStreams::from_user_seed(seed);
    TreeBuilder::new(TreeConfig::with_target(target))
        .unwrap()
        .build(streams.tree())
}

#[test]
fn same_seed_rebuilds_identical_catalog() {
    for seed in [0, 1, 0x00C0_FFEE] {
        assert_eq!(
            catalog_digest(&build(seed, 120)),
            catalog_digest(&build(seed, 120)),
            "seed {seed}"
        );
    }
}

#[test]
fn different_seeds_diverge() {
    assert_ne!(catalog_digest(&build(1, 60)), catalog_digest(&build(2, 60)));
}

#[test]
fn catalog_json_round_trips() {
    let catalog = build(5, 40);
    let json = serde_json::to_string(&catalog).unwrap();
    let back: Catalog = serde_json::from_str(&json).unwrap();
    assert_eq!(back, catalog);
    assert_eq!(catalog_digest(&back), catalog_digest(&catalog));
}

use classtree_game::{
    Aggregation, ClassTreeEngine, EventAggregate, GenerateRequest, MemoryLedger, PlayerAggregates,
    RarityTier, UnlockLedger, UnlockRule, evaluate, find_template, generate_class,
};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde_json::{Map, Value, json};
use std::collections::HashSet;

fn read_rule() -> UnlockRule {
    UnlockRule::new(
        "unlock_read_10000",
        "read_book",
        Aggregation::Count,
        10_000,
        "bookworm",
    )
}

#[test]
fn read_book_threshold_unlocks_exactly_once() {
    let rules = vec![read_rule()];
    let mut aggregates = PlayerAggregates::new();
    aggregates.insert(
        "read_book",
        EventAggregate {
            count: 10_000,
            ..EventAggregate::default()
        },
    );
    let mut rng = ChaCha20Rng::seed_from_u64(10_000);

    let first = evaluate(&rules, &aggregates, &HashSet::new(), &mut rng).unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].unlock_condition_id, "unlock_read_10000");

    let unlocked: HashSet<String> = HashSet::from(["unlock_read_10000".to_string()]);
    let second = evaluate(&rules, &aggregates, &unlocked, &mut rng).unwrap();
    assert!(second.is_empty());
}

#[test]
fn tinkerer_uncommon_keeps_dexterity_and_two_skills() {
    let template = find_template("tinkerer").unwrap();
    let mut rng = ChaCha20Rng::seed_from_u64(1);
    let class = generate_class(
        &GenerateRequest::new("tinkerer", "r1").exactly(RarityTier::Uncommon),
        &mut rng,
    )
    .unwrap();
    assert!(class.base_stats.dexterity >= template.base_stats.dexterity);
    assert_eq!(class.skills.len(), 2);
}

#[test]
fn generated_record_matches_persisted_shape() {
    let mut rng = ChaCha20Rng::seed_from_u64(4);
    let class = generate_class(&GenerateRequest::new("slayer", "r9"), &mut rng).unwrap();
    let json = serde_json::to_value(&class).unwrap();
    for key in [
        "id",
        "name",
        "rarity",
        "description",
        "base_stats",
        "growth_per_rank",
        "skills",
        "unlock_condition_id",
    ] {
        assert!(json.get(key).is_some(), "missing {key}");
    }
    assert!(json["base_stats"]["STR"].is_i64());
    let kind = json["skills"][0]["type"].as_str().unwrap();
    assert!(kind == "active" || kind == "passive");
}

fn meta(book: usize) -> Map<String, Value> {
    match json!({ "book_id": format!("book-{}", book % 37) }) {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[test]
fn engine_reads_its_way_to_a_bookworm() {
    let mut engine = ClassTreeEngine::new(MemoryLedger::new(), 77);
    let mut unlocked = Vec::new();
    for book in 0..10_000 {
        unlocked.extend(engine.ingest_event("reader", "read_book", &meta(book)).unwrap());
    }
    assert_eq!(unlocked.len(), 1);

    let aggregates = engine.ledger().load_aggregates("reader").unwrap();
    let read = aggregates.get("read_book").unwrap();
    assert_eq!(read.count, 10_000);
    assert_eq!(read.distinct_count, 37);

    let again = engine.ingest_event("reader", "read_book", &meta(1)).unwrap();
    assert!(again.is_empty());
    assert_eq!(engine.ledger().unlocked_classes("reader").unwrap().len(), 1);
}

//! End-to-end pipeline tests: ingestion, correlation, grouping, arbitrage
//! registration and the read-side surface, against one engine instance the
//! way feed adapters drive it.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, Utc};

use oddsbot_backend::{AliasTable, BetOffer, Config, Engine, NameMatcher};

fn engine() -> Engine {
    engine_with_history(1000)
}

fn engine_with_history(max_history: usize) -> Engine {
    let raw = serde_json::json!({
        "soccer": {
            "Manchester United": ["Man United", "Man Utd", "MUFC"],
            "Paris Saint-Germain": ["PSG", "Paris SG"]
        }
    });
    let entries: BTreeMap<String, BTreeMap<String, Vec<String>>> =
        serde_json::from_value(raw).unwrap();
    let aliases = Arc::new(AliasTable::from_entries(entries));

    let config = Config {
        max_history,
        ..Config::default()
    };
    Engine::new(&config, NameMatcher::new(aliases))
}

fn offer(platform: &str, id: &str, a: &str, odds_a: f64, b: &str, odds_b: f64) -> BetOffer {
    BetOffer::new(platform, id, a, odds_a, b, odds_b, None)
}

#[test]
fn ingesting_identical_record_twice_is_idempotent() {
    let engine = engine();
    let quote = offer("BookOne", "m1", "Team A", 2.0, "Team B", 2.0);
    engine.add_offer(quote.clone());
    engine.add_offer(quote);

    assert_eq!(engine.size(), 1);
    assert_eq!(engine.group_of("m1"), Some(vec!["m1".to_string()]));
}

#[test]
fn group_membership_is_order_independent() {
    let quotes = [
        offer("BookOne", "a", "Team A", 2.0, "Team B", 2.0),
        offer("BookTwo", "b", "Team A", 2.1, "Team B", 1.9),
        offer("BookThree", "c", "Team A", 1.9, "Team B", 2.1),
    ];

    let mut memberships = Vec::new();
    let orders: [[usize; 3]; 3] = [[0, 1, 2], [2, 0, 1], [1, 2, 0]];
    for order in orders {
        let engine = engine();
        for &i in &order {
            engine.add_offer(quotes[i].clone());
        }
        let mut members = engine.group_of("a").expect("a is grouped");
        members.sort();
        memberships.push(members);
    }

    assert_eq!(memberships[0], vec!["a", "b", "c"]);
    assert_eq!(memberships[0], memberships[1]);
    assert_eq!(memberships[1], memberships[2]);
}

#[test]
fn two_way_arbitrage_registers_ten_percent_profit() {
    let engine = engine();
    engine.add_offer(offer("BookOne", "m1", "Team A", 2.5, "Team B", 1.5));
    engine.add_offer(offer("BookTwo", "m2", "Team A", 1.5, "Team B", 2.0));

    // 1/2.5 + 1/2.0 = 0.9 < 1 => 10% profit
    assert_eq!(engine.arbitrage_count(), 1);
    let profit = engine.group_value("m1").expect("group has a value");
    assert!((profit - 10.0).abs() < 1e-9, "profit was {profit}");

    let opportunities = engine.active_opportunities();
    assert_eq!(opportunities.len(), 1);
    assert_eq!(opportunities[0].match_label, "Team A vs Team B");
    assert_eq!(opportunities[0].offers.len(), 2);
}

#[test]
fn fair_prices_register_no_arbitrage() {
    let engine = engine();
    engine.add_offer(offer("BookOne", "m1", "Team A", 1.8, "Team B", 1.8));
    engine.add_offer(offer("BookTwo", "m2", "Team A", 1.8, "Team B", 1.8));

    // Matched (one group) but 1/1.8 + 1/1.8 > 1: no opportunity.
    assert_eq!(engine.matches_found(), 1);
    assert_eq!(engine.arbitrage_count(), 0);
    assert!(engine.active_opportunities().is_empty());
    assert_eq!(engine.history_len(), 0);
}

#[test]
fn reversed_side_order_lands_in_one_group() {
    let engine = engine();
    engine.add_offer(offer("BookOne", "m1", "Team A", 2.5, "Team B", 1.5));
    engine.add_offer(offer("BookTwo", "m2", "Team B", 2.0, "Team A", 1.5));

    let mut group = engine.group_of("m1").expect("grouped");
    group.sort();
    assert_eq!(group, vec!["m1", "m2"]);

    // Best A = max(2.5, reversed 1.5->A) = 2.5; best B = max(1.5, 2.0) = 2.0.
    let profit = engine.group_value("m2").expect("value attached");
    assert!((profit - 10.0).abs() < 1e-9);
}

#[test]
fn alias_bridged_names_correlate() {
    let engine = engine();
    engine.add_offer(offer("BookOne", "m1", "Manchester United", 2.5, "PSG", 1.5));
    engine.add_offer(offer("BookTwo", "m2", "Man Utd", 1.5, "Paris SG", 2.0));

    assert_eq!(engine.matches_found(), 1);
    assert_eq!(engine.arbitrage_count(), 1);
}

#[test]
fn garbage_offers_never_enter_the_store() {
    let engine = engine();
    let yesterday = (Utc::now() - Duration::days(1)).date_naive();

    engine.add_offer(offer("BookOne", "g1", "Yes", 2.0, "Team B", 2.0));
    engine.add_offer(offer("BookOne", "g2", "Team A", 2.0, "team a", 2.0));
    engine.add_offer(offer("BookOne", "g3", "Team A", 0.009, "Team B", 2.0));
    engine.add_offer(offer("BookOne", "g4", "Team A", 101.0, "Team B", 2.0));
    engine.add_offer(offer("BookOne", "g5", "Team A", 2.0, "Team B", 2.0).with_event_date(yesterday));

    assert_eq!(engine.size(), 0);
    for id in ["g1", "g2", "g3", "g4", "g5"] {
        assert_eq!(engine.group_of(id), None);
    }
    // Rejections are counted, not erred.
    assert_eq!(engine.detailed_stats().error_counts["garbage_offer"], 5);
}

#[test]
fn history_is_bounded_fifo() {
    let max_history = 5;
    let engine = engine_with_history(max_history);

    // Each pair is an independent event (distinct names, far-future dates
    // not needed since undated) producing one registration.
    for i in 0..(max_history + 1) {
        let a = format!("Alpha{i} FC");
        let b = format!("Beta{i} FC");
        engine.add_offer(offer("BookOne", &format!("x{i}"), &a, 2.5, &b, 1.5));
        engine.add_offer(offer("BookTwo", &format!("y{i}"), &a, 1.5, &b, 2.0));
    }

    assert_eq!(engine.arbitrage_count(), max_history + 1);
    assert_eq!(engine.history_len(), max_history);
}

#[test]
fn group_value_lookup_is_representation_independent() {
    let engine = engine();
    engine.add_offer(offer("BookOne", "m1", "Team A", 2.5, "Team B", 1.5));
    engine.add_offer(offer("BookTwo", "m2", "Team A", 1.5, "Team B", 2.0));
    engine.add_offer(offer("BookThree", "m3", "Team A", 1.4, "Team B", 1.4));

    let by_id = engine.group_value("m1").expect("value by id");
    let by_set = engine
        .group_value_of_set(["m3", "m1", "m2"])
        .expect("value by set");
    let by_set_other_order = engine
        .group_value_of_set(["m2", "m3", "m1"])
        .expect("value by set, reordered");

    assert_eq!(by_id, by_set);
    assert_eq!(by_set, by_set_other_order);
}

#[test]
fn profit_overwrite_is_last_write_wins_even_downward() {
    let engine = engine();
    engine.add_offer(offer("BookOne", "m1", "Team A", 2.5, "Team B", 1.5));
    engine.add_offer(offer("BookTwo", "m2", "Team A", 1.5, "Team B", 2.0));
    let first = engine.group_value("m1").unwrap();
    assert!((first - 10.0).abs() < 1e-9);

    // BookTwo reprices side B down: re-ingesting m2 recomputes a smaller
    // profit and overwrites the group value, by policy.
    engine.add_offer(offer("BookTwo", "m2", "Team A", 1.5, "Team B", 1.9));
    let second = engine.group_value("m1").unwrap();
    let expected = (1.0 - (1.0 / 2.5 + 1.0 / 1.9)) * 100.0;
    assert!((second - expected).abs() < 1e-9, "got {second}");
    assert!(second < first);
}

#[test]
fn event_date_gate_blocks_distant_events() {
    let engine = engine();
    let today = Utc::now().date_naive();

    engine.add_offer(
        offer("BookOne", "m1", "Team A", 2.5, "Team B", 1.5).with_event_date(today),
    );
    engine.add_offer(
        offer("BookTwo", "m2", "Team A", 1.5, "Team B", 2.0)
            .with_event_date(today + Duration::days(3)),
    );

    assert_eq!(engine.matches_found(), 0);
    assert_eq!(engine.arbitrage_count(), 0);
}

#[test]
fn update_event_date_patches_stored_and_future_records() {
    let engine = engine();
    let today = Utc::now().date_naive();

    // Patch arrives before the record: remembered and applied on ingestion.
    engine.update_event_date("m1", today);
    engine.add_offer(offer("BookOne", "m1", "Team A", 2.5, "Team B", 1.5));

    // Patch arrives after the record: applied in place.
    engine.add_offer(offer("BookTwo", "m2", "Team A", 1.5, "Team B", 2.0));
    engine.update_event_date("m2", today);

    let opportunities = engine.active_opportunities();
    assert_eq!(opportunities.len(), 1);
    assert_eq!(opportunities[0].event_date, Some(today));
}

#[test]
fn recent_offers_are_newest_first() {
    let engine = engine();
    engine.add_offer(offer("BookOne", "m1", "Alpha FC", 2.0, "Beta FC", 2.0));
    std::thread::sleep(std::time::Duration::from_millis(5));
    engine.add_offer(offer("BookOne", "m2", "Gamma FC", 2.0, "Delta FC", 2.0));

    let recent = engine.recent_offers(10);
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].id, "m2");
    assert_eq!(recent[1].id, "m1");

    assert_eq!(engine.recent_offers(1).len(), 1);
}

#[test]
fn opportunities_sort_by_profit_descending() {
    let engine = engine();
    // ~10% profit pair.
    engine.add_offer(offer("BookOne", "a1", "Alpha FC", 2.5, "Beta FC", 1.5));
    engine.add_offer(offer("BookTwo", "a2", "Alpha FC", 1.5, "Beta FC", 2.0));
    // ~20% profit pair (1/3 + 1/2.2 ≈ 0.788).
    engine.add_offer(offer("BookOne", "b1", "Gamma FC", 3.0, "Delta FC", 1.5));
    engine.add_offer(offer("BookTwo", "b2", "Gamma FC", 1.5, "Delta FC", 2.2));

    let opportunities = engine.active_opportunities();
    assert_eq!(opportunities.len(), 2);
    assert!(opportunities[0].profit_pct > opportunities[1].profit_pct);
    assert_eq!(opportunities[0].match_label, "Gamma FC vs Delta FC");
}

#[test]
fn snapshot_writes_store_keyed_by_id() {
    let engine = engine();
    let today = Utc::now().date_naive();
    engine.add_offer(
        offer("BookOne", "m1", "Team A", 2.0, "Team B", 2.0).with_event_date(today),
    );

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snapshot.json");
    let written = engine.save_snapshot(Some(&path)).expect("snapshot written");
    assert_eq!(written, path);

    let raw = std::fs::read_to_string(&path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let record = &parsed["m1"];
    assert_eq!(record["platform"], "BookOne");
    assert_eq!(record["odds_a"], 2.0);
    // Dates render as ISO-8601 strings.
    assert_eq!(record["event_date"], today.format("%Y-%m-%d").to_string());
}

#[test]
fn snapshot_failure_reports_error_and_keeps_state() {
    let engine = engine();
    engine.add_offer(offer("BookOne", "m1", "Team A", 2.0, "Team B", 2.0));

    // A file where a directory component must go makes the write fail.
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();

    let result = engine.save_snapshot(Some(&blocker.join("snapshot.json")));
    assert!(result.is_err());
    assert_eq!(engine.size(), 1);
}

#[test]
fn concurrent_ingestion_from_many_platforms_converges() {
    let engine = Arc::new(engine());
    let mut handles = Vec::new();
    for p in 0..4 {
        let engine = Arc::clone(&engine);
        handles.push(std::thread::spawn(move || {
            for i in 0..25 {
                let platform = format!("Book{p}");
                let id = format!("p{p}-m{i}");
                let a = format!("Alpha{i} FC");
                let b = format!("Beta{i} FC");
                engine.add_offer(BetOffer::new(platform, id, a, 2.5, b, 1.5, None));
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(engine.size(), 100);
    // Every event i has 4 mutually-matching offers across platforms.
    for i in 0..25 {
        let group = engine.group_of(&format!("p0-m{i}")).expect("grouped");
        assert_eq!(group.len(), 4, "event {i} group was {group:?}");
    }
}

//! Integration tests for the SQLite session store.
//!
//! Run with:
//!   cargo test --test test_session_store

use std::thread;

use serde_json::json;
use tempfile::TempDir;

use recruitgenie::subsystems::memory::{Role, SessionStore};

// ── helpers ──────────────────────────────────────────────────────────────────

fn open_store() -> (TempDir, SessionStore) {
    let tmp = TempDir::new().expect("tempdir");
    let store = SessionStore::open(&tmp.path().join("agent_memory.db")).expect("open should succeed");
    (tmp, store)
}

fn texts(store: &SessionStore, session_id: &str) -> Vec<String> {
    store
        .list_messages(session_id)
        .unwrap()
        .into_iter()
        .map(|m| m.text)
        .collect()
}

// ── messages ─────────────────────────────────────────────────────────────────

#[test]
fn store_open_creates_db_file() {
    let (tmp, _store) = open_store();
    assert!(tmp.path().join("agent_memory.db").exists());
}

#[test]
fn interleaved_sessions_stay_separate() {
    let (_tmp, store) = open_store();
    for i in 0..4 {
        store.append_message("alpha", Role::User, &format!("a{i}")).unwrap();
        store.append_message("beta", Role::User, &format!("b{i}")).unwrap();
    }
    assert_eq!(texts(&store, "alpha"), ["a0", "a1", "a2", "a3"]);
    assert_eq!(texts(&store, "beta"), ["b0", "b1", "b2", "b3"]);
}

#[test]
fn messages_keep_role_and_session() {
    let (_tmp, store) = open_store();
    store.append_message("s1", Role::User, "need a designer").unwrap();
    store.append_message("s1", Role::Model, "where are you based?").unwrap();

    let msgs = store.list_messages("s1").unwrap();
    assert!(msgs.iter().all(|m| m.session_id == "s1"));
    assert_eq!(msgs.iter().map(|m| m.role).collect::<Vec<_>>(), [Role::User, Role::Model]);
}

#[test]
fn long_and_unicode_text_round_trips() {
    let (_tmp, store) = open_store();
    let text = format!("Chennai 🚀 {}", "x".repeat(20_000));
    store.append_message("s1", Role::User, &text).unwrap();
    assert_eq!(texts(&store, "s1"), [text]);
}

#[test]
fn concurrent_writers_on_separate_connections() {
    let (_tmp, store) = open_store();
    let handles: Vec<_> = ["p", "q", "r"]
        .into_iter()
        .map(|sid| {
            let store = store.clone();
            thread::spawn(move || {
                for i in 0..10 {
                    store.append_message(sid, Role::User, &format!("{sid}{i}")).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    for sid in ["p", "q", "r"] {
        let expected: Vec<String> = (0..10).map(|i| format!("{sid}{i}")).collect();
        assert_eq!(texts(&store, sid), expected);
    }
}

#[test]
fn concurrent_greeting_seeds_once() {
    let (_tmp, store) = open_store();
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let store = store.clone();
            thread::spawn(move || store.ensure_greeting("fresh", "hello").unwrap())
        })
        .collect();
    let inserted = handles
        .into_iter()
        .filter_map(|h| h.join().unwrap())
        .count();
    assert_eq!(inserted, 1);
    assert_eq!(texts(&store, "fresh"), ["hello"]);
}

// ── extracted data ───────────────────────────────────────────────────────────

#[test]
fn extracted_data_latest_wins_per_session() {
    let (_tmp, store) = open_store();
    store.put_extracted_data("s1", &json!({"industry": "fintech"})).unwrap();
    store.put_extracted_data("s2", &json!({"industry": "healthcare"})).unwrap();
    store.put_extracted_data("s1", &json!({"urgency": "high"})).unwrap();

    assert_eq!(store.get_extracted_data("s1").unwrap(), Some(json!({"urgency": "high"})));
    assert_eq!(store.get_extracted_data("s2").unwrap(), Some(json!({"industry": "healthcare"})));
    assert_eq!(store.get_extracted_data("s3").unwrap(), None);
}

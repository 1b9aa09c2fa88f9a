// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn record(owner: &str, principals: &[&str], version: u64) -> LeadItemRecord {
    LeadItemRecord {
        owner: owner.to_string(),
        principals: principals.iter().map(|p| p.to_string()).collect(),
        version,
    }
}

fn snapshot(record: Option<LeadItemRecord>, status: LookupStatus, generation: u64) -> LeadItemSnapshot {
    LeadItemSnapshot {
        record,
        status,
        refreshed_at: Some(Timestamp(generation * 10)),
        generation,
    }
}

#[yare::parameterized(
    plain      = { "dbsrv*security", Some(("DBSRV", "SECURITY")) },
    padded     = { "  A$1*B_2 ",     Some(("A$1", "B_2")) },
    no_star    = { "DBSRVSECURITY",  None },
    empty_name = { "DBSRV*",         None },
    too_long   = { "ABCDEFGHIJKLM*X", None },
    bad_char   = { "DB SRV*X",       None },
)]
fn resource_name_parse(text: &str, expected: Option<(&str, &str)>) {
    let parsed = ResourceName::parse(text);
    assert_eq!(parsed, expected.map(|(q, n)| ResourceName::new(q, n)));
}

#[test]
fn resource_name_displays_with_star() {
    assert_eq!(ResourceName::new("dbsrv", "security").to_string(), "DBSRV*SECURITY");
}

#[test]
fn new_buffer_is_pending() {
    let buffer = LeadItemBuffer::new();
    let current = buffer.current();
    assert_eq!(current.status, LookupStatus::PENDING);
    assert_eq!(current.generation, 0);
    assert!(current.record.is_none());
}

#[test]
fn publish_flips_index_and_returns_previous() {
    let buffer = LeadItemBuffer::new();
    assert_eq!(buffer.current_index(), 0);

    let first = snapshot(Some(record("admin", &[], 1)), LookupStatus::OK, 1);
    let previous = buffer.publish(first.clone());
    assert_eq!(previous.generation, 0);
    assert_eq!(buffer.current_index(), 1);
    assert_eq!(*buffer.current(), first);

    let second = snapshot(None, LookupStatus::NOT_FOUND, 2);
    let previous = buffer.publish(second.clone());
    assert_eq!(*previous, first);
    assert_eq!(buffer.current_index(), 0);
    assert_eq!(*buffer.current(), second);
}

#[test]
fn reader_keeps_its_snapshot_across_publishes() {
    let buffer = LeadItemBuffer::new();
    buffer.publish(snapshot(Some(record("a", &[], 1)), LookupStatus::OK, 1));
    let held = buffer.current();
    buffer.publish(snapshot(Some(record("b", &[], 2)), LookupStatus::OK, 2));
    buffer.publish(snapshot(Some(record("c", &[], 3)), LookupStatus::OK, 3));
    assert_eq!(held.generation, 1);
    assert_eq!(held.record.as_ref().map(|r| r.owner.as_str()), Some("a"));
}

#[test]
fn readers_never_see_torn_snapshots() {
    // Every published snapshot keeps generation, version and owner in step;
    // a reader seeing them disagree would have read a half-written slot.
    let buffer = LeadItemBuffer::new();
    std::thread::scope(|scope| {
        scope.spawn(|| {
            for generation in 1..=2_000u64 {
                let owner = format!("owner-{generation}");
                buffer.publish(snapshot(
                    Some(record(&owner, &["x"], generation)),
                    LookupStatus::OK,
                    generation,
                ));
            }
        });
        for _ in 0..4 {
            scope.spawn(|| {
                let mut last_seen = 0;
                for _ in 0..5_000 {
                    let current = buffer.current();
                    assert!(current.generation >= last_seen);
                    last_seen = current.generation;
                    if let Some(record) = &current.record {
                        assert_eq!(record.version, current.generation);
                        assert_eq!(record.owner, format!("owner-{}", current.generation));
                    } else {
                        assert_eq!(current.generation, 0);
                    }
                }
            });
        }
    });
    assert_eq!(buffer.current().generation, 2_000);
}

#[yare::parameterized(
    owner          = { "ADMIN",  Access::Allow },
    listed         = { "bob",    Access::Allow },
    listed_case    = { "BOB",    Access::Allow },
    unlisted       = { "mallory", Access::Deny },
)]
fn snapshot_permissions_on_good_snapshot(principal: &str, expected: Access) {
    let good = snapshot(Some(record("admin", &["bob", "carol"], 1)), LookupStatus::OK, 1);
    assert_eq!(SnapshotPermissions.validate(principal, &good), expected);
}

#[test]
fn snapshot_permissions_deny_without_good_status() {
    let stale = snapshot(Some(record("admin", &["bob"], 1)), LookupStatus::UNREADABLE, 1);
    assert_eq!(SnapshotPermissions.validate("bob", &stale), Access::Deny);
    assert_eq!(
        SnapshotPermissions.validate("admin", &LeadItemSnapshot::pending()),
        Access::Deny
    );
}

#[test]
fn record_deserializes_with_defaults() {
    let parsed: LeadItemRecord = serde_json::from_str(r#"{"owner":"admin"}"#).unwrap();
    assert_eq!(parsed, record("admin", &[], 0));
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::photo::PhotoKind;
use crate::test_support::{outbox_entry, photo_item};

#[test]
fn events_serialize_with_type_tag() {
    let event = Event::OutboxAcked { seq: 7, photo_id: None };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json, serde_json::json!({"type": "outbox:acked", "seq": 7}));
    assert_eq!(event.name(), "outbox:acked");
}

#[test]
fn enqueued_event_carries_tagged_item() {
    let event = Event::OutboxEnqueued {
        entry: outbox_entry(3, photo_item("j1", PhotoKind::After, "/spool/x.jpg")),
    };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], "outbox:enqueued");
    assert_eq!(json["entry"]["item"]["kind"], "photo");
    assert_eq!(json["entry"]["item"]["photo_kind"], "after");

    let parsed: Event = serde_json::from_value(json).unwrap();
    assert_eq!(parsed, event);
}

#[test]
fn unknown_type_fails_to_parse() {
    let result: Result<Event, _> = serde_json::from_str(r#"{"type": "outbox:exploded"}"#);
    assert!(result.is_err());
}

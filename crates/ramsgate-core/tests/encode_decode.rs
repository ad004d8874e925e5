//! End-to-end laws tying the encoder, parser and tracker together.

use std::sync::Arc;

use ramsgate_core::protocol::codec::default_table;
use ramsgate_core::protocol::device::Address;
use ramsgate_core::protocol::frame::{Code, Frame, Verb, parse_frame};
use ramsgate_core::{CommandEncoder, Message, Payload, StateTracker};
use serde_json::json;
use time::macros::datetime;

fn gateway() -> Address {
    Address::parse("18:000730").unwrap()
}

#[test]
fn encoded_command_survives_the_wire() {
    let table = Arc::new(default_table().unwrap());
    let encoder = CommandEncoder::new(Arc::clone(&table), gateway());
    let dst = Address::parse("01:145038").unwrap();
    let value = json!({"zone_idx": "02", "setpoint": 19.5});

    let frame = encoder
        .encode(Verb::Write, dst, Code::SETPOINT, &value)
        .unwrap();
    // What goes out as text must parse back to the identical frame.
    let received = parse_frame(&frame.canonical()).unwrap();
    assert_eq!(received, frame);

    let msg = Message::from_frame(received, datetime!(2021-03-14 06:30 UTC), &table).unwrap();
    assert_eq!(msg.payload, Payload::Decoded(value));
}

#[test]
fn every_builtin_code_round_trips_against_its_own_codec() {
    let table = Arc::new(default_table().unwrap());
    let encoder = CommandEncoder::new(Arc::clone(&table), gateway());
    let controller = Address::parse("01:145038").unwrap();

    let cases = vec![
        (Code::SETPOINT, json!({"zone_idx": "01", "setpoint": 21.5})),
        (Code::ZONE_TEMP, json!({"zone_idx": "00", "temperature": -2.5})),
        (Code::DHW_TEMP, json!({"dhw_idx": "00", "temperature": 51.3})),
        (Code::RELAY_DEMAND, json!({"domain_id": "FC", "relay_demand": 50.0})),
        (Code::WINDOW_STATE, json!({"zone_idx": "03", "window_open": true})),
    ];
    for (code, value) in cases {
        let frame = encoder
            .encode(Verb::Write, controller, code, &value)
            .unwrap();
        let msg = Message::from_frame(
            parse_frame(&frame.canonical()).unwrap(),
            datetime!(2021-03-14 06:30 UTC),
            &table,
        )
        .unwrap();
        assert_eq!(msg.payload, Payload::Decoded(value), "code {code}");
    }
}

#[test]
fn tracker_state_is_order_independent() {
    let table = Arc::new(default_table().unwrap());
    let src = Address::parse("01:145038").unwrap();
    let frames = [
        (
            datetime!(2021-03-14 06:30:00 UTC),
            Frame::new(None, Verb::Info, src, Address::UNSET, Code::SETPOINT, vec![0x01, 0x06, 0xA4]),
        ),
        (
            datetime!(2021-03-14 06:31:00 UTC),
            Frame::new(None, Verb::Info, src, Address::UNSET, Code::SETPOINT, vec![0x01, 0x07, 0xD0]),
        ),
        (
            datetime!(2021-03-14 06:32:00 UTC),
            Frame::new(None, Verb::Info, src, Address::UNSET, Code::SETPOINT, vec![0x01, 0x08, 0x66]),
        ),
    ];

    let final_state = |order: &[usize]| {
        let mut tracker = StateTracker::new();
        for &i in order {
            let (ts, frame) = &frames[i];
            let msg = Message::from_frame(frame.clone(), *ts, &table).unwrap();
            tracker.apply(&msg);
        }
        tracker
            .registry()
            .get(&src)
            .and_then(|d| d.value(Code::SETPOINT).cloned())
    };

    let expected = final_state(&[0, 1, 2]);
    assert!(expected.is_some());
    for order in [[0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]] {
        assert_eq!(final_state(&order), expected, "order {order:?}");
    }
}

#[test]
fn hostile_frame_text_never_panics() {
    let cases = [
        "",
        " ",
        "I",
        "--- I 01:123456 04:654321 1F09 003",
        "--- I 01:123456 04:654321 1F09 003 0004B1 02 EXTRA TOKENS HERE",
        "--- I 9999:1 04:654321 1F09 003 0004B1 02",
        "--- X 01:123456 04:654321 1F09 003 0004B1 02",
        "--- I 01:123456 04:654321 ZZZZ 003 0004B1 02",
        "--- I 01:123456 04:654321 1F09 999 0004B1 02",
        "--- I 01:123456 04:654321 1F09 003 XYZT!! 02",
        "\u{202e}gnirts lortnoc idib\u{202c}",
    ];
    for text in cases {
        assert!(parse_frame(text).is_err(), "accepted: {text:?}");
    }
}

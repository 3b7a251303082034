//! Unit tests for the line codecs.

use base64::Engine;
use rstest::rstest;
use serde_json::json;

use super::*;
use crate::envelope::{ExceptionEnvelope, StackFrame};

fn codecs() -> Vec<Box<dyn Codec>> {
    vec![Box::new(Base64Codec) as Box<dyn Codec>, Box::new(JsonCodec)]
}

fn sample_messages() -> Vec<Message> {
    vec![
        Message::echo("plain"),
        Message::echo("line one\nline two\r\n\u{0}\u{7}\u{1b}[0m"),
        Message::echo(""),
        Message::Application(json!([1, 2, 3])),
        Message::Application(json!({"progress": 0.5, "label": "a\nb", "nested": [null, true]})),
        Message::Application(json!(null)),
        Message::exception(
            ExceptionEnvelope::new("Overflow", "counter\nwrapped")
                .with_code(-3)
                .with_frames(vec![StackFrame::new("bump").at("src/counter.rs", 9)]),
        ),
    ]
}

#[test]
fn round_trip_preserves_every_message() {
    for codec in codecs() {
        for message in sample_messages() {
            let line = codec.encode(&message).expect("encode");
            let decoded = codec.decode(&line).expect("decode");
            assert_eq!(decoded, message, "codec {}", codec.name());
        }
    }
}

#[test]
fn encoded_lines_never_contain_line_breaks() {
    for codec in codecs() {
        for message in sample_messages() {
            let line = codec.encode(&message).expect("encode");
            assert!(
                !line.contains('\n') && !line.contains('\r'),
                "codec {} produced a line break: {line:?}",
                codec.name()
            );
        }
    }
}

#[test]
fn base64_lines_contain_only_alphabet_characters() {
    let line = Base64Codec
        .encode(&Message::echo("\u{0}\u{1}\u{2}\t"))
        .expect("encode");
    assert!(
        line.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '='))
    );
}

#[test]
fn decode_ignores_surrounding_whitespace() {
    let line = Base64Codec.encode(&Message::echo("hi")).expect("encode");
    let padded = format!("  {line}\r\n");
    assert_eq!(
        Base64Codec.decode(&padded).expect("decode"),
        Message::echo("hi")
    );
}

#[test]
fn json_codec_writes_readable_lines() {
    let line = JsonCodec
        .encode(&Message::Application(json!([1, 2, 3])))
        .expect("encode");
    assert_eq!(line, r#"{"type":"application","payload":[1,2,3]}"#);
}

#[rstest]
#[case::not_base64("not base64 at all!")]
#[case::truncated("eyJ0eXBl")]
fn base64_rejects_invalid_transport(#[case] line: &str) {
    let error = Base64Codec.decode(line).expect_err("should fail");
    assert!(
        matches!(
            error,
            CodecError::InvalidEncoding { .. } | CodecError::Malformed { .. }
        ),
        "unexpected error: {error}"
    );
}

#[rstest]
#[case::not_json("{type: echo")]
#[case::not_object("[1,2,3]")]
#[case::missing_payload(r#"{"type":"echo"}"#)]
#[case::wrong_payload_shape(r#"{"type":"echo","payload":[1]}"#)]
#[case::non_string_tag(r#"{"type":7,"payload":"x"}"#)]
fn json_rejects_malformed_structure(#[case] line: &str) {
    let error = JsonCodec.decode(line).expect_err("should fail");
    assert!(
        matches!(error, CodecError::Malformed { .. }),
        "unexpected error: {error}"
    );
}

#[test]
fn unknown_tags_are_reported_distinctly() {
    let json_line = r#"{"type":"heartbeat","payload":1}"#;
    let error = JsonCodec.decode(json_line).expect_err("should fail");
    assert!(matches!(error, CodecError::UnknownType { ref tag } if tag == "heartbeat"));

    let base64_line = base64::engine::general_purpose::STANDARD.encode(json_line);
    let error = Base64Codec.decode(&base64_line).expect_err("should fail");
    assert!(error.is_unknown_type());
}

#[test]
fn boxed_codecs_delegate() {
    let codec: Box<dyn Codec> = Box::new(JsonCodec);
    assert_eq!(codec.name(), "json");
    let boxed_again: Box<Box<dyn Codec>> = Box::new(codec);
    let line = boxed_again.encode(&Message::echo("x")).expect("encode");
    assert_eq!(
        boxed_again.decode(&line).expect("decode"),
        Message::echo("x")
    );
}

#[test]
fn payload_shape_errors_name_the_tag() {
    let error = JsonCodec
        .decode(r#"{"type":"echo","payload":[1]}"#)
        .expect_err("should fail");
    assert!(
        error.to_string().contains("'echo' message shape"),
        "unexpected error: {error}"
    );
}

/// Deterministic xorshift sequence of finite `f64` bit patterns.
fn finite_floats(count: usize) -> Vec<f64> {
    let mut state: u64 = 0x9e37_79b9_7f4a_7c15;
    let mut floats = Vec::with_capacity(count);
    while floats.len() < count {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        let candidate = f64::from_bits(state);
        if candidate.is_finite() {
            floats.push(candidate);
        }
    }
    floats
}

#[test]
fn float_payloads_round_trip_exactly() {
    let mut floats = finite_floats(20_000);
    floats.extend([
        f64::MIN_POSITIVE,
        f64::MAX,
        f64::MIN,
        f64::EPSILON,
        1.071_566_039_146_582_6e-75,
        -0.0,
    ]);
    for codec in codecs() {
        for value in &floats {
            let message = Message::Application(json!(value));
            let line = codec.encode(&message).expect("encode");
            let decoded = codec.decode(&line).expect("decode");
            assert_eq!(decoded, message, "codec {} lost precision", codec.name());
        }
    }
}

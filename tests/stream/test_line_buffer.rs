//! Unit tests for `LineBuffer`
//!
//! Tests line reassembly across arbitrary chunk boundaries

use agent_bridge::LineBuffer;

#[test]
fn test_splits_complete_lines() {
    let mut buffer = LineBuffer::new();
    let lines = buffer.push_chunk("one\ntwo\n");
    assert_eq!(lines, vec!["one", "two"]);
    assert!(buffer.is_empty());
}

#[test]
fn test_retains_partial_fragment_across_chunks() {
    let mut buffer = LineBuffer::new();
    assert!(buffer.push_chunk(r#"{"type":"te"#).is_empty());
    assert!(!buffer.is_empty());

    let lines = buffer.push_chunk("xt\"}\n{\"a\"");
    assert_eq!(lines, vec![r#"{"type":"text"}"#]);

    let lines = buffer.push_chunk(":1}\n");
    assert_eq!(lines, vec![r#"{"a":1}"#]);
}

#[test]
fn test_handles_crlf_split_between_chunks() {
    let mut buffer = LineBuffer::new();
    assert!(buffer.push_chunk("first\r").is_empty());
    assert_eq!(buffer.push_chunk("\nsecond\r\n"), vec!["first", "second"]);
}

#[test]
fn test_drops_empty_lines() {
    let mut buffer = LineBuffer::new();
    let lines = buffer.push_chunk("\n\na\r\n\r\n\nb\n");
    assert_eq!(lines, vec!["a", "b"]);
}

#[test]
fn test_flush_returns_unterminated_line() {
    let mut buffer = LineBuffer::new();
    assert!(buffer.push_chunk(r#"{"type":"done"}"#).is_empty());
    assert_eq!(buffer.flush().as_deref(), Some(r#"{"type":"done"}"#));
    assert_eq!(buffer.flush(), None);
    assert!(buffer.is_empty());
}

#[test]
fn test_flush_on_empty_buffer() {
    let mut buffer = LineBuffer::new();
    buffer.push_chunk("complete\n");
    assert_eq!(buffer.flush(), None);
}

#[test]
fn test_push_bytes_holds_split_utf8_sequence() {
    let mut buffer = LineBuffer::new();
    let text = "héllo\n".as_bytes();
    // Split inside the two-byte 'é'
    assert!(buffer.push_bytes(&text[..2]).is_empty());
    assert_eq!(buffer.push_bytes(&text[2..]), vec!["héllo"]);
}

#[test]
fn test_push_bytes_replaces_invalid_utf8() {
    let mut buffer = LineBuffer::new();
    let lines = buffer.push_bytes(b"a\xffb\n");
    assert_eq!(lines, vec!["a\u{FFFD}b"]);
}

#[test]
fn test_every_split_point_reconstructs_lines() {
    let text = "{\"a\":1}\r\n\n{\"b\":\"é\"}\nplain text\r\n{\"c\":3}";
    let expected = vec!["{\"a\":1}", "{\"b\":\"é\"}", "plain text", "{\"c\":3}"];

    let boundaries: Vec<usize> = (0..=text.len())
        .filter(|&i| text.is_char_boundary(i))
        .collect();
    for &first in &boundaries {
        for &second in boundaries.iter().filter(|&&b| b >= first) {
            let mut buffer = LineBuffer::new();
            let mut lines = buffer.push_chunk(&text[..first]);
            lines.extend(buffer.push_chunk(&text[first..second]));
            lines.extend(buffer.push_chunk(&text[second..]));
            lines.extend(buffer.flush());
            assert_eq!(lines, expected, "split at {first}/{second}");
        }
    }
}

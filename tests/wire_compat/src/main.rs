fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use roomshare_protocol::{ControlMessage, MessageType, decode, encode};

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    /// Loads a fixture JSON file and returns it as a `serde_json::Value`.
    fn load_fixture(name: &str) -> serde_json::Value {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
    }

    /// Decodes a fixture frame, re-encodes it, and compares the JSON values
    /// (field order does not matter).
    fn roundtrip_test(name: &str) -> ControlMessage {
        let fixture = load_fixture(name);
        let frame = fixture.to_string();
        let parsed = decode(&frame).unwrap_or_else(|e| panic!("failed to decode {name}: {e}"));
        let encoded = encode(&parsed).unwrap_or_else(|e| panic!("failed to encode {name}: {e}"));
        let reserialized: serde_json::Value = serde_json::from_str(&encoded).unwrap();

        assert_eq!(
            fixture, reserialized,
            "roundtrip mismatch for {name}:\n  web:  {fixture}\n  Rust: {reserialized}"
        );
        parsed
    }

    #[test]
    fn fixture_chat() {
        let msg = roundtrip_test("chat.json");
        assert_eq!(
            msg,
            ControlMessage::Chat {
                message: "hola, ¿me ves?".into(),
                timestamp: 1_718_000_000_123,
            }
        );
    }

    #[test]
    fn fixture_file_info() {
        let msg = roundtrip_test("file_info.json");
        assert_eq!(msg.message_type(), Some(MessageType::FileInfo));
    }

    #[test]
    fn fixture_file_chunk() {
        let msg = roundtrip_test("file_chunk.json");
        assert_eq!(
            msg,
            ControlMessage::ChunkInfo {
                chunk_index: 2,
                size: 18928,
            }
        );
    }

    #[test]
    fn fixture_file_complete() {
        let msg = roundtrip_test("file_complete.json");
        assert_eq!(
            msg,
            ControlMessage::FileComplete {
                total_chunks: 3,
                total_size: 150_000,
            }
        );
    }

    #[test]
    fn fixture_peers() {
        assert_eq!(
            roundtrip_test("peers.json"),
            ControlMessage::PeerCount { count: 2 }
        );
    }

    #[test]
    fn fixture_ping() {
        assert_eq!(roundtrip_test("ping.json"), ControlMessage::Ping);
    }

    #[test]
    fn fixture_transfer_sequence() {
        let fixture = load_fixture("transfer_sequence.json");
        let frames = fixture.as_array().expect("array of frames");

        let types: Vec<_> = frames
            .iter()
            .map(|f| ControlMessage::parse(&f.to_string()).message_type())
            .collect();
        assert_eq!(
            types,
            vec![
                Some(MessageType::FileInfo),
                Some(MessageType::FileChunk),
                Some(MessageType::FileChunk),
                Some(MessageType::FileChunk),
                Some(MessageType::FileComplete),
            ]
        );

        let chunk_total: u64 = frames
            .iter()
            .filter_map(|f| match ControlMessage::parse(&f.to_string()) {
                ControlMessage::ChunkInfo { size, .. } => Some(size),
                _ => None,
            })
            .sum();
        assert_eq!(chunk_total, 150_000);
    }

    #[test]
    fn fixture_foreign_message_is_unrecognized() {
        let fixture = load_fixture("signaling_offer.json");
        let frame = fixture.to_string();
        let msg = ControlMessage::parse(&frame);
        assert_eq!(msg, ControlMessage::Unrecognized { raw: frame.clone() });
        assert_eq!(encode(&msg).unwrap(), frame);
    }

    #[test]
    fn encoded_frames_use_wire_names() {
        let text = encode(&ControlMessage::ChunkInfo {
            chunk_index: 0,
            size: 65536,
        })
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"type": "file_chunk", "chunk_index": 0, "size": 65536})
        );
    }
}

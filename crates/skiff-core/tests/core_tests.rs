//! Core type tests — context guard, connection state, buffer pool,
//! synthetic connection, request accessors.

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::sync::Arc;

    use http::{HeaderMap, Method};
    use skiff_core::*;

    fn dummy_request(target: &str) -> Arc<ScriptRequest> {
        Arc::new(ScriptRequest {
            method: Method::GET,
            target: target.to_string(),
            headers: HeaderMap::new(),
            source: None,
            destination: None,
            transport: RequestTransport::Http,
            attachment: None,
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Context guard
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn context_guard_sets_and_clears() {
        assert!(current_request().is_none());
        {
            let _guard = ContextGuard::enter(dummy_request("/a"));
            assert_eq!(current_request().unwrap().target, "/a");
        }
        assert!(current_request().is_none());
    }

    #[test]
    fn context_guard_restores_previous_value_when_nested() {
        let _outer = ContextGuard::enter(dummy_request("/outer"));
        {
            let _inner = ContextGuard::enter(dummy_request("/inner"));
            assert_eq!(current_request().unwrap().target, "/inner");
        }
        // Inner guard must restore the outer request, not clear the slot.
        assert_eq!(current_request().unwrap().target, "/outer");
    }

    #[test]
    fn context_guard_restores_during_unwinding() {
        let _outer = ContextGuard::enter(dummy_request("/outer"));
        let result = std::panic::catch_unwind(|| {
            let _inner = ContextGuard::enter(dummy_request("/inner"));
            panic!("boom");
        });
        assert!(result.is_err());
        assert_eq!(current_request().unwrap().target, "/outer");
    }

    // ─────────────────────────────────────────────────────────────────────
    // Connection handle / state machine
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn connection_state_moves_forward_only() {
        let (conn, _rx) = ConnectionHandle::new();
        assert_eq!(conn.state(), ConnectionState::Connecting);
        conn.mark(ConnectionState::Open);
        assert!(conn.is_open());
        conn.mark(ConnectionState::Closed);
        // A late backward transition must not reopen the connection.
        conn.mark(ConnectionState::Open);
        assert_eq!(conn.state(), ConnectionState::Closed);
    }

    #[test]
    fn send_queues_frames_only_while_open() {
        let (conn, mut rx) = ConnectionHandle::new();
        assert!(!conn.send(OutboundFrame::Text("too early".into())));

        conn.mark(ConnectionState::Open);
        assert!(conn.send(OutboundFrame::Text("hello".into())));
        assert_eq!(rx.try_recv().unwrap(), OutboundFrame::Text("hello".into()));

        conn.mark(ConnectionState::Closed);
        assert!(!conn.send(OutboundFrame::Text("too late".into())));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn send_to_dropped_writer_is_a_silent_no_op() {
        let (conn, rx) = ConnectionHandle::new();
        conn.mark(ConnectionState::Open);
        drop(rx);
        assert!(!conn.send(OutboundFrame::Text("gone".into())));
    }

    // ─────────────────────────────────────────────────────────────────────
    // Buffer pool
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn buffer_pool_reuses_released_buffers() {
        let pool = BufferPool::new();
        let buf = pool.acquire();
        assert_eq!(buf.capacity(), DEFAULT_BUFFER_SIZE);
        pool.release(buf);
        assert_eq!(pool.pooled(), 1);
        let _again = pool.acquire();
        assert_eq!(pool.pooled(), 0);
    }

    #[test]
    fn buffer_pool_drops_oversized_buffers() {
        let pool = BufferPool::new();
        let big = bytes::BytesMut::with_capacity(DEFAULT_BUFFER_SIZE * 4);
        pool.release(big);
        assert_eq!(pool.pooled(), 0);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Synthetic connection
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn synthetic_connection_reports_open_and_shares_pool() {
        let pool = BufferPool::new();
        pool.release(pool.acquire());
        let synth = SyntheticConnection::new(pool.clone());
        assert!(synth.is_open());
        assert_eq!(synth.buffer_pool().pooled(), pool.pooled());
    }

    #[test]
    fn synthetic_sink_discards_everything() {
        let synth = SyntheticConnection::new(BufferPool::new());
        let mut sink = synth.sink();
        assert_eq!(sink.write(b"discarded").unwrap(), 9);
        sink.flush().unwrap();
    }

    #[test]
    fn synthetic_source_is_at_end_of_input() {
        let synth = SyntheticConnection::new(BufferPool::new());
        let mut buf = [0u8; 16];
        assert_eq!(synth.source().read(&mut buf).unwrap(), 0);
    }

    #[test]
    #[should_panic(expected = "out-of-band")]
    fn out_of_band_response_is_a_contract_violation() {
        let synth = SyntheticConnection::new(BufferPool::new());
        synth.send_out_of_band();
    }

    // ─────────────────────────────────────────────────────────────────────
    // Request accessors
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn request_path_and_query_param() {
        let req = dummy_request("/websocket?method=onProcess&eventType=Connect");
        assert_eq!(req.path(), "/websocket");
        assert_eq!(req.query_param("eventType"), Some("Connect"));
        assert_eq!(req.query_param("method"), Some("onProcess"));
        assert_eq!(req.query_param("missing"), None);
    }

    #[test]
    fn event_kind_wire_names() {
        assert_eq!(EventKind::Connect.as_str(), "Connect");
        assert_eq!(EventKind::TextMessage.as_str(), "TextMessage");
        assert_eq!(EventKind::BinaryMessage.as_str(), "BinaryMessage");
        assert_eq!(EventKind::Close.as_str(), "Close");
    }

    #[test]
    fn event_payload_accessors() {
        let text = EventPayload::Text("ping".into());
        assert_eq!(text.as_text(), Some("ping"));
        assert_eq!(text.as_bytes(), b"ping");

        let binary = EventPayload::Binary(bytes::Bytes::from_static(&[1, 2, 3]));
        assert_eq!(binary.as_text(), None);
        assert_eq!(binary.as_bytes(), &[1, 2, 3]);
    }
}

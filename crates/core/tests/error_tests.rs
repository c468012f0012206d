// ═══════════════════════════════════════════════════════════════════
// Error Tests: CoreError variants, Display formatting, From impls
// ═══════════════════════════════════════════════════════════════════

use chain_portfolio_core::errors::CoreError;

// ── Display formatting ──────────────────────────────────────────────

mod display {
    use super::*;

    #[test]
    fn http_status() {
        let err = CoreError::Http { status: 502 };
        assert_eq!(err.to_string(), "HTTP error! status: 502");
    }

    #[test]
    fn network() {
        let err = CoreError::Network("connection reset".into());
        assert_eq!(err.to_string(), "Network error: connection reset");
    }

    #[test]
    fn api() {
        let err = CoreError::api("Portfolio API", "rate limited");
        assert_eq!(err.to_string(), "API error (Portfolio API): rate limited");
    }

    #[test]
    fn missing_wallet_address() {
        assert_eq!(
            CoreError::MissingWalletAddress.to_string(),
            "No wallet address provided"
        );
    }

    #[test]
    fn configuration() {
        let err = CoreError::Configuration("no proxy".into());
        assert_eq!(err.to_string(), "Configuration error: no proxy");
    }

    #[test]
    fn validation() {
        let err = CoreError::ValidationError("bad targets".into());
        assert_eq!(err.to_string(), "Validation failed: bad targets");
    }

    #[test]
    fn serialization_and_deserialization() {
        assert_eq!(
            CoreError::Serialization("x".into()).to_string(),
            "Serialization error: x"
        );
        assert_eq!(
            CoreError::Deserialization("y".into()).to_string(),
            "Deserialization error: y"
        );
    }

    #[test]
    fn file_io() {
        let err = CoreError::FileIO("disk full".into());
        assert_eq!(err.to_string(), "File I/O error: disk full");
    }
}

// ── From conversions ────────────────────────────────────────────────

mod conversions {
    use super::*;

    #[test]
    fn from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: CoreError = io.into();
        assert!(matches!(err, CoreError::FileIO(msg) if msg.contains("denied")));
    }

    #[test]
    fn from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: CoreError = json_err.into();
        assert!(matches!(err, CoreError::Deserialization(_)));
    }

    #[tokio::test]
    async fn from_reqwest_connect_error_redacts_query() {
        // Nothing listens on port 9; the request fails before any status exists.
        let client = reqwest::Client::new();
        let reqwest_err = client
            .get("http://127.0.0.1:9/api/proxy/x?addresses=0xdeadbeef")
            .send()
            .await
            .unwrap_err();

        let err: CoreError = reqwest_err.into();
        match err {
            CoreError::Network(msg) => assert!(!msg.contains("0xdeadbeef"), "leaked: {msg}"),
            other => panic!("expected Network, got {other:?}"),
        }
    }
}

// ── Trait bounds ────────────────────────────────────────────────────

#[test]
fn core_error_is_send_sync_and_std_error() {
    fn assert_bounds<T: Send + Sync + std::error::Error + 'static>() {}
    assert_bounds::<CoreError>();
}

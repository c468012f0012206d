// ═══════════════════════════════════════════════════════════════════
// Provider Tests: proxy transport and CoinGecko logos over HTTP
// ═══════════════════════════════════════════════════════════════════

use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use chain_portfolio_core::errors::CoreError;
use chain_portfolio_core::providers::coingecko::CoinGeckoLogoProvider;
use chain_portfolio_core::providers::proxy::ProxyTransport;
use chain_portfolio_core::providers::traits::{LogoProvider, RequestParams, UpstreamTransport};

// ═══════════════════════════════════════════════════════════════════
// Proxy transport
// ═══════════════════════════════════════════════════════════════════

mod proxy {
    use super::*;

    fn transport(server: &MockServer) -> ProxyTransport {
        ProxyTransport::new(server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn endpoint_url_joins_prefix() {
        let t = ProxyTransport::with_client(reqwest::Client::new(), "http://localhost:3000/");
        assert_eq!(
            t.endpoint_url("/token/v1.2/1/token-list"),
            "http://localhost:3000/api/proxy/token/v1.2/1/token-list"
        );
        assert_eq!(t.name(), "Portfolio API proxy");
    }

    #[tokio::test]
    async fn forwards_endpoint_and_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/proxy/portfolio/portfolio/v4/overview/erc20/details"))
            .and(query_param("addresses", "0xabc"))
            .and(query_param("chain_id", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": [] })))
            .expect(1)
            .mount(&server)
            .await;

        let mut params = RequestParams::new();
        params.insert("addresses".into(), "0xabc".into());
        params.insert("chain_id".into(), "1".into());

        let body = transport(&server)
            .get("portfolio/portfolio/v4/overview/erc20/details", &params)
            .await
            .unwrap();
        assert_eq!(body, json!({ "result": [] }));
    }

    #[tokio::test]
    async fn non_success_status_is_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = transport(&server)
            .get("anything", &RequestParams::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Http { status: 429 }));
    }

    #[tokio::test]
    async fn invalid_json_is_deserialization_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = transport(&server)
            .get("anything", &RequestParams::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Deserialization(_)));
    }
}

// ═══════════════════════════════════════════════════════════════════
// CoinGecko logos
// ═══════════════════════════════════════════════════════════════════

mod coingecko {
    use super::*;

    const USDC: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";

    #[tokio::test]
    async fn contract_lookup_prefers_small_image_and_lowercases_address() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/coins/ethereum/contract/{}", USDC.to_lowercase())))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "image": {
                    "thumb": "https://img/thumb.png",
                    "small": "https://img/small.png",
                    "large": "https://img/large.png"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = CoinGeckoLogoProvider::with_base_url(server.uri(), None);
        let logo = provider.logo_by_contract("ethereum", USDC).await.unwrap();
        assert_eq!(logo.as_deref(), Some("https://img/small.png"));
    }

    #[tokio::test]
    async fn contract_without_image_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "usd-coin" })))
            .mount(&server)
            .await;

        let provider = CoinGeckoLogoProvider::with_base_url(server.uri(), None);
        assert_eq!(provider.logo_by_contract("ethereum", USDC).await.unwrap(), None);
    }

    #[tokio::test]
    async fn unknown_contract_is_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let provider = CoinGeckoLogoProvider::with_base_url(server.uri(), None);
        let err = provider.logo_by_contract("ethereum", USDC).await.unwrap_err();
        assert!(matches!(err, CoreError::Http { status: 404 }));
    }

    #[tokio::test]
    async fn api_key_is_sent_as_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("x-cg-demo-api-key", "demo-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "image": { "thumb": "https://img/thumb.png" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = CoinGeckoLogoProvider::with_base_url(server.uri(), Some("demo-key".into()));
        let logo = provider.logo_by_contract("base", USDC).await.unwrap();
        assert_eq!(logo.as_deref(), Some("https://img/thumb.png"));
    }

    #[tokio::test]
    async fn configured_timeout_applies() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "image": { "small": "https://img/small.png" } }))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let provider =
            CoinGeckoLogoProvider::with_timeout(server.uri(), None, Duration::from_millis(200)).unwrap();
        let err = provider.logo_by_contract("ethereum", USDC).await.unwrap_err();
        assert!(matches!(err, CoreError::Network(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn search_takes_first_exact_symbol_match() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("query", "usdc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "coins": [
                    { "symbol": "USDC.E", "thumb": "https://img/bridged.png" },
                    { "symbol": "USDC", "thumb": "https://img/usdc-thumb.png", "large": "https://img/usdc-large.png" },
                    { "symbol": "usdc", "thumb": "https://img/other.png" }
                ]
            })))
            .mount(&server)
            .await;

        let provider = CoinGeckoLogoProvider::with_base_url(server.uri(), None);
        let logo = provider.search_logo("usdc").await.unwrap();
        assert_eq!(logo.as_deref(), Some("https://img/usdc-thumb.png"));
    }

    #[tokio::test]
    async fn search_without_match_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "coins": [] })))
            .mount(&server)
            .await;

        let provider = CoinGeckoLogoProvider::with_base_url(server.uri(), None);
        assert_eq!(provider.search_logo("NOPE").await.unwrap(), None);
    }

    #[tokio::test]
    async fn malformed_body_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let provider = CoinGeckoLogoProvider::with_base_url(server.uri(), None);
        let err = provider.search_logo("ETH").await.unwrap_err();
        assert!(matches!(err, CoreError::Api { provider, .. } if provider == "CoinGecko"));
    }
}

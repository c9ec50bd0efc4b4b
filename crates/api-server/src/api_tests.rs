#[cfg(test)]
mod tests {
    use super::super::{app, build_state, ServerConfig};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const ATTIJARI: &str = "TN0001600154";

    async fn mock_app(name: &str) -> Router {
        let tmp = std::env::temp_dir();
        let config = ServerConfig {
            data_dir: tmp.join("bvmt_api_no_such_data"),
            news_cache: tmp.join("bvmt_api_no_such_news.json"),
            alerts_file: tmp.join(format!("bvmt_api_alerts_{}_{}.json", std::process::id(), name)),
            use_mocks: true,
            ..ServerConfig::default()
        };
        app(build_state(config).await)
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
        send(app, Request::get(uri).body(Body::empty()).unwrap()).await
    }

    async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        send(app, request).await
    }

    #[tokio::test]
    async fn test_health() {
        let app = mock_app("health").await;
        let (status, body) = get(&app, "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["module"], "decision-engine");
    }

    #[tokio::test]
    async fn test_list_stocks() {
        let app = mock_app("stocks").await;
        let (status, body) = get(&app, "/api/stocks").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        let stocks = body["data"].as_array().unwrap();
        assert_eq!(stocks.len(), 8);
        assert_eq!(stocks[0]["code"], ATTIJARI);
        assert_eq!(stocks[0]["price"], 51.5);
    }

    #[tokio::test]
    async fn test_recommend() {
        let app = mock_app("recommend").await;
        let (status, body) = get(&app, &format!("/api/recommend/{}?profile=moderate", ATTIJARI)).await;
        assert_eq!(status, StatusCode::OK);
        let data = &body["data"];
        assert_eq!(data["stock_code"], ATTIJARI);
        assert_eq!(data["recommendation"], "BUY");
        assert!(data["signals_table"].as_array().is_some_and(|rows| !rows.is_empty()));
        assert!(data["explanation_en"].as_str().is_some_and(|s| !s.is_empty()));
    }

    #[tokio::test]
    async fn test_request_id_is_echoed_or_generated() {
        let app = mock_app("request_id").await;
        let request = Request::get("/api/health")
            .header("x-request-id", "req-42")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.headers()["x-request-id"], "req-42");

        let response = app
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let generated = response.headers()["x-request-id"].to_str().unwrap();
        assert!(uuid::Uuid::parse_str(generated).is_ok());
    }

    #[tokio::test]
    async fn test_buy_updates_portfolio() {
        let app = mock_app("buy").await;
        let (status, body) = post(&app, "/api/portfolio/buy", json!({"stock_code": ATTIJARI, "quantity": 10})).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"]["message"].as_str().unwrap().starts_with("Achat reussi"));

        let (_, body) = get(&app, "/api/portfolio").await;
        assert_eq!(body["data"]["metrics"]["cash"], 9485.0);
        assert_eq!(body["data"]["metrics"]["num_positions"], 1);

        let (_, body) = get(&app, "/api/portfolio/positions").await;
        assert_eq!(body["data"][0]["quantity"], 10);

        let (status, body) = post(&app, "/api/portfolio/sell", json!({"stock_code": ATTIJARI, "quantity": 10})).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"]["message"].as_str().unwrap().starts_with("Vente reussie"));

        let (_, body) = get(&app, "/api/portfolio/transactions?limit=1").await;
        let history = body["data"].as_array().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0]["type"], "SELL");
    }

    #[tokio::test]
    async fn test_rejected_trades() {
        let app = mock_app("rejected").await;

        let (status, body) = post(&app, "/api/portfolio/buy", json!({"stock_code": ATTIJARI, "quantity": 0})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "quantity must be positive");

        let (status, body) = post(&app, "/api/portfolio/buy", json!({"stock_code": " ", "quantity": 5})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "stock_code is required");

        let (status, body) = post(&app, "/api/portfolio/buy", json!({"stock_code": "TN0001800457", "quantity": 1000})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("Fonds insuffisants"));

        let (status, body) = post(&app, "/api/portfolio/sell", json!({"stock_code": ATTIJARI, "quantity": 1})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("Vous ne possedez pas"));
    }

    #[tokio::test]
    async fn test_reset() {
        let app = mock_app("reset").await;
        post(&app, "/api/portfolio/buy", json!({"stock_code": ATTIJARI, "quantity": 10})).await;

        let (status, body) = post(&app, "/api/portfolio/reset", json!({"initial_capital": 5000.0})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["cash"], 5000.0);
        assert_eq!(body["data"]["num_transactions"], 0);

        let (status, _) = post(&app, "/api/portfolio/reset", json!({"initial_capital": 0.0})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_market_routes() {
        let app = mock_app("market").await;
        let (status, body) = get(&app, "/api/market/summary").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total_analyzed"], 8);

        let (_, body) = get(&app, "/api/market/top-buys?n=2").await;
        let buys = body["data"].as_array().unwrap();
        assert!(buys.len() <= 2);
        assert!(buys.iter().all(|r| r["recommendation"] == "BUY"));

        let (status, body) = get(&app, "/api/market/allocation?capital=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_alert_action_errors() {
        let app = mock_app("alert_action").await;
        let (status, _) = post(&app, "/api/alerts/nope/action", json!({"action": "ignored"})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = post(&app, "/api/alerts/nope/action", json!({"action": "panic"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = get(&app, "/api/alerts").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_stock_has_no_history() {
        let app = mock_app("unknown").await;
        let (status, body) = get(&app, "/api/anomalies/TN9999999999").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }
}

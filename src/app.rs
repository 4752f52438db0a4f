use crate::config::ServerConfig;
use crate::errors::normalize_errors;
use crate::handlers;
use crate::state::AppState;
use axum::{
    handler::Handler,
    middleware,
    routing::{any, get},
    Router,
};
use tower_http::{services::ServeDir, trace::TraceLayer};

/// Builds the whole application. Each route also answers for its sub-paths;
/// anything not routed is tried against the public directory and then the
/// main page.
pub fn router(config: &ServerConfig, state: AppState) -> Router {
    let catch_all = handlers::index.with_state(state.clone());
    let assets = ServeDir::new(&config.public_dir)
        .call_fallback_on_method_not_allowed(true)
        .fallback(catch_all);

    Router::new()
        .route("/verify", any(handlers::verify))
        .route("/verify/*rest", any(handlers::verify))
        .route("/auth", any(handlers::auth))
        .route("/auth/*rest", any(handlers::auth))
        .route("/logout", any(handlers::logout))
        .route("/logout/*rest", any(handlers::logout))
        .route("/company", any(handlers::company))
        .route("/company/*rest", any(handlers::company))
        .route("/stockinfo/:id", any(handlers::stock_info))
        .route("/stockinfo/:id/*rest", any(handlers::stock_info))
        .route("/resend/:id", get(handlers::resend))
        .fallback_service(assets)
        .layer(middleware::from_fn_with_state(state.clone(), normalize_errors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunMode;
    use crate::facade::{ops, testing::FakeFacade, FacadeError};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app_with(facade: Arc<FakeFacade>, mode: RunMode) -> Router {
        let state = AppState { facade, mode };
        router(&ServerConfig::default(), state)
    }

    fn get(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::COOKIE, format!("token={token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn set_cookie(response: &Response) -> String {
        response
            .headers()
            .get(header::SET_COOKIE)
            .expect("set-cookie header")
            .to_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn stock_info_renders_stock_stats_and_categories() {
        let facade = Arc::new(FakeFacade::with_token("t0k"));
        let app = app_with(facade.clone(), RunMode::Production);

        let response = app.oneshot(get("/stockinfo/42", Some("t0k"))).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains(r#"<span id="stock-id">42</span>"#));
        assert!(html.contains("Stock 42"));
        assert!(html.contains("&quot;views&quot;: 120"));
        assert!(html.contains("<li>Food</li>"));
        assert_eq!(
            facade.calls(),
            [ops::GET_STOCK_INFO, ops::GET_STATS_FOR_STOCK, ops::GET_CATEGORIES]
        );
    }

    #[tokio::test]
    async fn stock_info_stops_when_stats_fail() {
        let facade = Arc::new(FakeFacade::with_token("t0k").fail(
            ops::GET_STATS_FOR_STOCK,
            FacadeError::Rejected {
                status: 404,
                message: "no stats".into(),
            },
        ));
        let app = app_with(facade.clone(), RunMode::Production);

        let response = app.oneshot(get("/stockinfo/42", Some("t0k"))).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_text(response).await.contains("no stats"));
        assert_eq!(facade.calls(), [ops::GET_STOCK_INFO, ops::GET_STATS_FOR_STOCK]);
    }

    #[tokio::test]
    async fn company_merges_all_five_results() {
        let facade = Arc::new(FakeFacade::with_token("t0k"));
        let app = app_with(facade.clone(), RunMode::Production);

        let response = app.oneshot(get("/company", Some("t0k"))).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("<h1>Acme</h1>"));
        assert!(html.contains("Winter sale"));
        assert!(html.contains(r#"<span id="users">17</span>"#));
        assert!(html.contains(r#""2016-05-01":2"#));
        assert_eq!(
            facade.calls(),
            [
                ops::CHECK_TOKEN,
                ops::GET_STOCKS,
                ops::GET_COUNT_STOCKS_PER_DATE,
                ops::GET_NUMBER_OF_SUBSCRIPTIONS,
                ops::GET_CATEGORIES,
            ]
        );
    }

    #[tokio::test]
    async fn company_rejects_invalid_token_before_fetching() {
        let facade = Arc::new(FakeFacade::with_token("t0k"));
        let app = app_with(facade.clone(), RunMode::Production);

        let response = app.oneshot(get("/company", Some("stale"))).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(facade.calls(), [ops::CHECK_TOKEN]);
    }

    #[tokio::test]
    async fn company_stops_when_stock_counts_fail() {
        let facade = Arc::new(FakeFacade::with_token("t0k").fail(
            ops::GET_COUNT_STOCKS_PER_DATE,
            FacadeError::Rejected {
                status: 503,
                message: "stats offline".into(),
            },
        ));
        let app = app_with(facade.clone(), RunMode::Production);

        let response = app.oneshot(get("/company", Some("t0k"))).await.unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(body_text(response).await.contains("stats offline"));
        assert_eq!(
            facade.calls(),
            [ops::CHECK_TOKEN, ops::GET_STOCKS, ops::GET_COUNT_STOCKS_PER_DATE]
        );
    }

    #[tokio::test]
    async fn sub_paths_reach_their_route() {
        let cases = [
            ("/company/dashboard", ops::CHECK_TOKEN),
            ("/stockinfo/42/details", ops::GET_STOCK_INFO),
            ("/verify/x?token=t0k", ops::CHECK_TOKEN),
        ];
        for (uri, first_call) in cases {
            let facade = Arc::new(FakeFacade::with_token("t0k"));
            let app = app_with(facade.clone(), RunMode::Production);

            let response = app.oneshot(get(uri, Some("t0k"))).await.unwrap();

            assert_eq!(response.status(), StatusCode::OK, "{uri}");
            assert_eq!(facade.calls().first().map(String::as_str), Some(first_call), "{uri}");
        }
    }

    #[tokio::test]
    async fn stock_info_sub_path_keeps_stock_id() {
        let facade = Arc::new(FakeFacade::with_token("t0k"));
        let app = app_with(facade, RunMode::Production);

        let response = app.oneshot(get("/stockinfo/42/details", Some("t0k"))).await.unwrap();

        assert!(body_text(response).await.contains(r#"<span id="stock-id">42</span>"#));
    }

    #[tokio::test]
    async fn logout_sub_path_clears_cookie() {
        let facade = Arc::new(FakeFacade::with_token("t0k"));
        let app = app_with(facade, RunMode::Production);

        let response = app.oneshot(get("/logout/now", Some("t0k"))).await.unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert!(set_cookie(&response).starts_with("token=;"));
    }

    #[tokio::test]
    async fn company_without_cookie_is_unauthorized() {
        let facade = Arc::new(FakeFacade::with_token("t0k"));
        let app = app_with(facade.clone(), RunMode::Production);

        let response = app.oneshot(get("/company", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(facade.calls().is_empty());
    }

    #[tokio::test]
    async fn unreachable_facade_is_generic_500_in_production() {
        let facade = Arc::new(FakeFacade::with_token("t0k").fail(
            ops::GET_CATEGORIES,
            FacadeError::Transport("connection refused at 10.0.0.7".into()),
        ));
        let app = app_with(facade, RunMode::Production);

        let response = app.oneshot(get("/", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let html = body_text(response).await;
        assert!(html.contains("Internal Server Error"));
        assert!(!html.contains("10.0.0.7"));
    }

    #[tokio::test]
    async fn unreachable_facade_is_diagnosed_in_development() {
        let facade = Arc::new(FakeFacade::with_token("t0k").fail(
            ops::GET_CATEGORIES,
            FacadeError::Transport("connection refused at 10.0.0.7".into()),
        ));
        let app = app_with(facade, RunMode::Development);

        let response = app.oneshot(get("/anything/else", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let html = body_text(response).await;
        assert!(html.contains("Transport"));
        assert!(html.contains("10.0.0.7"));
    }

    #[tokio::test]
    async fn xhr_errors_are_json() {
        let facade = Arc::new(FakeFacade::with_token("t0k"));
        let app = app_with(facade, RunMode::Production);

        let request = Request::builder()
            .uri("/company")
            .header("x-requested-with", "XMLHttpRequest")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["status"], 401);
        assert_eq!(body["error"], "session token missing");
    }

    #[tokio::test]
    async fn catch_all_renders_main_view() {
        let facade = Arc::new(FakeFacade::with_token("t0k"));
        let app = app_with(facade.clone(), RunMode::Production);

        let response = app.oneshot(get("/main", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("<li>Food</li>"));
        assert_eq!(facade.calls(), [ops::GET_CATEGORIES]);
    }

    #[tokio::test]
    async fn logout_clears_cookie_and_redirects() {
        for token in [Some("t0k"), None] {
            let facade = Arc::new(FakeFacade::with_token("t0k"));
            let app = app_with(facade.clone(), RunMode::Production);

            let response = app.oneshot(get("/logout", token)).await.unwrap();

            assert_eq!(response.status(), StatusCode::FOUND);
            assert_eq!(response.headers()[header::LOCATION], "/main");
            let cookie = set_cookie(&response);
            assert!(cookie.starts_with("token=;"));
            assert!(cookie.contains("Max-Age=0"));
            assert!(facade.calls().is_empty());
        }
    }

    #[tokio::test]
    async fn verify_sets_cookie_for_valid_token() {
        let facade = Arc::new(FakeFacade::with_token("t0k"));
        let app = app_with(facade, RunMode::Production);

        let response = app.oneshot(get("/verify?token=t0k", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let cookie = set_cookie(&response);
        assert!(cookie.starts_with("token=t0k"));
        assert!(cookie.contains("Max-Age=100000000"));
        assert!(body_text(response).await.contains("Account confirmed"));
    }

    #[tokio::test]
    async fn verify_forwards_rejection() {
        let facade = Arc::new(FakeFacade::with_token("t0k"));
        let app = app_with(facade, RunMode::Production);

        let response = app.oneshot(get("/verify?token=nope", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn auth_sets_cookie_and_ends_empty() {
        let facade = Arc::new(FakeFacade::with_token("t0k"));
        let app = app_with(facade, RunMode::Production);

        let request = Request::builder()
            .method("POST")
            .uri("/auth")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("login=acme&password=secret"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(set_cookie(&response).starts_with("token=t0k"));
        assert!(body_text(response).await.is_empty());
    }

    #[tokio::test]
    async fn auth_failure_is_converted() {
        let facade = Arc::new(FakeFacade::with_token("t0k"));
        let app = app_with(facade, RunMode::Production);

        let request = Request::builder()
            .method("POST")
            .uri("/auth")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-requested-with", "XMLHttpRequest")
            .body(Body::from(r#"{"login":"acme","password":"guess"}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["error"], "wrong login or password");
    }

    #[tokio::test]
    async fn resend_renders_id_without_facade() {
        let facade = Arc::new(FakeFacade::with_token("t0k"));
        let app = app_with(facade.clone(), RunMode::Production);

        let response = app.oneshot(get("/resend/77", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains(r#"<span id="account">77</span>"#));
        assert!(facade.calls().is_empty());
    }
}

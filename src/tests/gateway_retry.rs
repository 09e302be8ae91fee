// Protected CJ calls:
//  - auth-expired + refresh ok -> exactly one re-issued call with the new token
//  - auth-expired + refresh failed -> zero re-issued calls, original answer returned
//  - a late rejection of an already replaced token -> retried without a second refresh
//  - any other answer -> no refresh

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        extract::State,
        http::{HeaderMap, StatusCode},
        routing::post,
        Json, Router,
    };
    use serde_json::{json, Value};

    use crate::cache::credential::Credential;
    use crate::cache::token_store::{FileTokenStore, TokenStore};
    use crate::gateway::cj::CjApi;
    use crate::gateway::ApiGateway;
    use crate::tests::common::{build_refresher, build_reqwest_client, dispatcher_of, spawn_axum, upstream_config, RecordingChannel};

    /// Fake CJ: accepts only `valid_token`, refresh answers with `refresh_answer`.
    #[derive(Clone)]
    struct FakeCj {
        valid_token: String,
        refresh_answer: Value,
        expired_status: StatusCode,
        // this page's rejection is held back, as if it crossed another caller's refresh
        slow_page: Option<u64>,
        product_calls: Arc<Mutex<Vec<String>>>,
        refresh_calls: Arc<Mutex<usize>>,
    }

    impl FakeCj {
        fn new(valid_token: &str, refresh_answer: Value) -> Self {
            Self {
                valid_token: valid_token.to_owned(),
                refresh_answer,
                expired_status: StatusCode::OK,
                slow_page: None,
                product_calls: Arc::new(Mutex::new(Vec::new())),
                refresh_calls: Arc::new(Mutex::new(0)),
            }
        }

        fn tokens_seen(&self) -> Vec<String> {
            self.product_calls.lock().unwrap().clone()
        }

        fn refreshes(&self) -> usize {
            *self.refresh_calls.lock().unwrap()
        }

        async fn serve(&self) -> (tokio::task::JoinHandle<()>, String) {
            let router = Router::new()
                .route("/product/list", post(product_list))
                .route("/token/refresh", post(token_refresh))
                .with_state(self.clone());
            let (handle, addr) = spawn_axum(router).await;
            (handle, format!("http://{}", addr))
        }
    }

    async fn product_list(State(cj): State<FakeCj>, headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
        let token = headers
            .get("CJ-Access-Token")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned();
        cj.product_calls.lock().unwrap().push(token.clone());

        if token != cj.valid_token {
            if cj.slow_page.is_some() && body["pageNum"].as_u64() == cj.slow_page {
                tokio::time::sleep(std::time::Duration::from_millis(300)).await;
            }
            // body code only signals expiry when the status does not
            let code = if cj.expired_status == StatusCode::OK { 403 } else { cj.expired_status.as_u16() };
            return (cj.expired_status, Json(json!({ "code": code, "result": false, "msg": "Access token expired" })));
        }
        (StatusCode::OK, Json(json!({ "code": 200, "data": { "list": [], "pageNum": body["pageNum"] } })))
    }

    async fn token_refresh(State(cj): State<FakeCj>) -> Json<Value> {
        *cj.refresh_calls.lock().unwrap() += 1;
        Json(cj.refresh_answer.clone())
    }

    fn cj_api(base_url: &str, store: Arc<dyn TokenStore>, alert: Arc<RecordingChannel>) -> CjApi {
        let upstream = upstream_config(base_url);
        let refresher = build_refresher(store.clone(), &upstream, dispatcher_of(&[alert]));
        CjApi::new(ApiGateway::new(build_reqwest_client(), &upstream, store, refresher))
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_and_call_retried_once() {
        let cj = FakeCj::new("AT2", json!({ "code": 200, "data": { "accessToken": "AT2", "refreshToken": "RT2" } }));
        let (handle, base_url) = cj.serve().await;

        let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::in_memory(Some(Credential::new("AT1".into(), "RT1".into()))));
        let alert = RecordingChannel::ok("telegram");
        let api = cj_api(&base_url, store.clone(), alert.clone());

        let response = api.list_products(1, 10).await.unwrap();

        assert!(response.is_success());
        assert_eq!(cj.tokens_seen(), vec!["AT1".to_string(), "AT2".to_string()]);
        assert_eq!(cj.refreshes(), 1);
        assert_eq!(store.get().await.unwrap().access_token, "AT2");
        assert_eq!(alert.attempts(), 0);

        // later calls use the refreshed token directly
        api.list_products(2, 10).await.unwrap();
        assert_eq!(cj.tokens_seen().last().map(String::as_str), Some("AT2"));
        assert_eq!(cj.refreshes(), 1);
        handle.abort();
    }

    #[tokio::test]
    async fn failed_refresh_returns_original_answer_without_retry() {
        let cj = FakeCj::new("never", json!({ "code": 403, "msg": "bad secret" }));
        let (handle, base_url) = cj.serve().await;

        let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::in_memory(Some(Credential::new("AT1".into(), "RT1".into()))));
        let alert = RecordingChannel::ok("email");
        let api = cj_api(&base_url, store.clone(), alert.clone());

        let response = api.list_products(1, 10).await.unwrap();

        assert!(!response.is_success());
        assert_eq!(response.code(), Some(403));
        assert_eq!(cj.tokens_seen(), vec!["AT1".to_string()]);
        assert_eq!(cj.refreshes(), 1);
        assert_eq!(alert.attempts(), 1);
        assert_eq!(store.get().await.unwrap().access_token, "AT1");
        handle.abort();
    }

    #[tokio::test]
    async fn retried_call_is_not_retried_again() {
        // refresh "succeeds" with a token the API still rejects
        let cj = FakeCj::new("AT-real", json!({ "code": 200, "data": { "accessToken": "AT-stale", "refreshToken": "RT2" } }));
        let (handle, base_url) = cj.serve().await;

        let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::in_memory(Some(Credential::new("AT1".into(), "RT1".into()))));
        let api = cj_api(&base_url, store, RecordingChannel::ok("telegram"));

        let response = api.list_products(1, 10).await.unwrap();

        assert!(!response.is_success());
        assert_eq!(cj.tokens_seen(), vec!["AT1".to_string(), "AT-stale".to_string()]);
        assert_eq!(cj.refreshes(), 1);
        handle.abort();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn late_rejection_of_replaced_token_does_not_refresh_again() {
        let mut cj = FakeCj::new("AT2", json!({ "code": 200, "data": { "accessToken": "AT2", "refreshToken": "RT2" } }));
        cj.slow_page = Some(2);
        let (handle, base_url) = cj.serve().await;

        let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::in_memory(Some(Credential::new("AT1".into(), "RT1".into()))));
        let alert = RecordingChannel::ok("telegram");
        let api = Arc::new(cj_api(&base_url, store.clone(), alert.clone()));

        // B goes out with AT1, its 403 arrives after A has refreshed
        let late = tokio::spawn({
            let api = api.clone();
            async move { api.list_products(2, 10).await }
        });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let first = api.list_products(1, 10).await.unwrap();
        let second = late.await.unwrap().unwrap();

        assert!(first.is_success());
        assert!(second.is_success());
        assert_eq!(cj.refreshes(), 1, "one exchange for one rejected token");
        let seen = cj.tokens_seen();
        assert_eq!(seen.iter().filter(|t| t.as_str() == "AT1").count(), 2);
        assert_eq!(seen.iter().filter(|t| t.as_str() == "AT2").count(), 2);
        assert_eq!(store.get().await.unwrap().access_token, "AT2");
        assert_eq!(alert.attempts(), 0);
        handle.abort();
    }

    #[tokio::test]
    async fn http_forbidden_status_also_triggers_refresh() {
        let mut cj = FakeCj::new("AT2", json!({ "code": 200, "data": { "accessToken": "AT2", "refreshToken": "RT2" } }));
        cj.expired_status = StatusCode::UNAUTHORIZED;
        let (handle, base_url) = cj.serve().await;

        // empty store: the first call goes out with an empty token
        let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::in_memory(None));
        let api = cj_api(&base_url, store, RecordingChannel::ok("telegram"));

        let response = api.list_products(1, 10).await.unwrap();

        assert!(response.is_success());
        assert_eq!(cj.tokens_seen(), vec!["".to_string(), "AT2".to_string()]);
        handle.abort();
    }

    #[tokio::test]
    async fn other_errors_are_returned_as_is() {
        let router = Router::new().route(
            "/order/list",
            post(|| async { (StatusCode::OK, Json(json!({ "code": 1600100, "msg": "Param error" }))) }),
        );
        let (handle, addr) = spawn_axum(router).await;
        let base_url = format!("http://{}", addr);

        let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::in_memory(Some(Credential::new("AT1".into(), "RT1".into()))));
        let alert = RecordingChannel::ok("telegram");
        let api = cj_api(&base_url, store, alert.clone());

        let response = api.list_orders("someone@example.com", 1, 5).await.unwrap();

        assert_eq!(response.code(), Some(1600100));
        assert!(!api.gateway().is_auth_expired(&response));
        // a refresh would have hit the missing route and alerted
        assert_eq!(alert.attempts(), 0);
        handle.abort();
    }

    #[tokio::test]
    async fn product_lookup_sends_pid_as_query() {
        let router = Router::new().route(
            "/product/query",
            axum::routing::get(|axum::extract::Query(q): axum::extract::Query<std::collections::HashMap<String, String>>| async move {
                Json(json!({ "code": 200, "data": { "pid": q.get("pid") } }))
            }),
        );
        let (handle, addr) = spawn_axum(router).await;

        let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::in_memory(Some(Credential::new("AT1".into(), "RT1".into()))));
        let api = cj_api(&format!("http://{}", addr), store, RecordingChannel::ok("telegram"));

        let response = api.product_by_id("P-1").await.unwrap();

        assert!(response.is_success());
        assert_eq!(response.json().unwrap()["data"]["pid"], "P-1");
        handle.abort();
    }
}

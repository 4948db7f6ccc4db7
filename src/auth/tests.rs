//! Tests for auth module
//!
//! These drive the full router the way a browser would:
//! - register / login / logout cookie handling
//! - refresh token expiry and corruption
//! - access token extraction for protected routes
//! - the OAuth redirect handshake against a fake identity provider

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{
            header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
            HeaderMap, Method, Request, StatusCode,
        },
        Router,
    };
    use chrono::{Duration as ChronoDuration, Utc};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::app::build_router;
    use crate::common::config::AppConfig;
    use crate::common::migrations::setup_test_db;
    use crate::common::AppState;
    use crate::users::models::{NewUser, Role};
    use crate::auth::oauth::{ExternalProfile, IdentityProvider, OAuthError};
    use crate::auth::tokens::{TokenClass, TokenSubject};

    // ============================================================================
    // Harness
    // ============================================================================

    struct FakeProvider {
        profile: Option<ExternalProfile>,
    }

    #[async_trait]
    impl IdentityProvider for FakeProvider {
        fn name(&self) -> &'static str {
            "google"
        }

        fn authorization_url(&self, state: &str) -> String {
            format!("https://idp.test/authorize?state={}", state)
        }

        async fn exchange_code(&self, code: &str) -> Result<ExternalProfile, OAuthError> {
            match (&self.profile, code) {
                (_, "bad-code") => Err(OAuthError::OAuthFailed("invalid_grant".to_string())),
                (Some(profile), _) => Ok(profile.clone()),
                (None, _) => Err(OAuthError::OAuthFailed("no profile".to_string())),
            }
        }
    }

    fn google_profile(id: &str, email: Option<&str>) -> ExternalProfile {
        ExternalProfile {
            id: id.to_string(),
            emails: email.into_iter().map(str::to_string).collect(),
            display_name: Some("Ann Google".to_string()),
            photos: vec!["http://img/ann.png".to_string()],
            ..Default::default()
        }
    }

    async fn test_state(profile: Option<ExternalProfile>) -> Arc<AppState> {
        let identity: Arc<dyn IdentityProvider> = Arc::new(FakeProvider { profile });
        Arc::new(
            AppState::new(setup_test_db().await, AppConfig::for_tests(), Some(identity)).unwrap(),
        )
    }

    struct TestResponse {
        status: StatusCode,
        headers: HeaderMap,
        body: Value,
    }

    impl TestResponse {
        fn set_cookies(&self) -> Vec<String> {
            self.headers
                .get_all(SET_COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .map(str::to_string)
                .collect()
        }

        fn cookie(&self, name: &str) -> Option<String> {
            let prefix = format!("{}=", name);
            self.set_cookies().iter().find_map(|c| {
                let value = c.strip_prefix(&prefix)?.split(';').next()?;
                (!value.is_empty()).then(|| value.to_string())
            })
        }

        fn cleared(&self, name: &str) -> bool {
            let prefix = format!("{}=;", name);
            self.set_cookies()
                .iter()
                .any(|c| c.starts_with(&prefix) && c.contains("Max-Age=0"))
        }

        fn error_code(&self) -> &str {
            self.body["error"]["code"].as_str().unwrap_or_default()
        }
    }

    async fn send(app: &Router, request: Request<Body>) -> TestResponse {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_with_cookie(uri: &str, cookie: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(COOKIE, cookie)
            .body(Body::empty())
            .unwrap()
    }

    fn post_with_cookie(uri: &str, cookie: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(COOKIE, cookie)
            .body(Body::empty())
            .unwrap()
    }

    async fn register(app: &Router, name: &str, email: &str, password: &str) -> TestResponse {
        send(
            app,
            json_request(
                Method::POST,
                "/api/auth/register",
                json!({ "name": name, "email": email, "password": password }),
            ),
        )
        .await
    }

    async fn login(app: &Router, email: &str, password: &str) -> TestResponse {
        send(
            app,
            json_request(
                Method::POST,
                "/api/auth/login",
                json!({ "email": email, "password": password }),
            ),
        )
        .await
    }

    async fn user_count(state: &AppState) -> usize {
        state.users.list().await.unwrap().len()
    }

    // ============================================================================
    // Register / Login
    // ============================================================================

    #[tokio::test]
    async fn test_register_then_login_scenario() {
        let state = test_state(None).await;
        let app = build_router(state.clone());

        let registered = register(&app, "Ann", "a@x.com", "Str0ng!Pass").await;
        assert_eq!(registered.status, StatusCode::CREATED);
        assert_eq!(registered.body["success"], true);
        assert_eq!(registered.body["data"]["user"]["id"], 1);
        assert_eq!(registered.body["data"]["user"]["role"], "student");
        assert!(registered.body["data"]["user"].get("password_hash").is_none());
        assert!(registered.cookie("accessToken").is_some());
        assert!(registered.cookie("refreshToken").is_some());
        assert!(registered.cookie("lms_session").is_some());
        assert!(registered
            .set_cookies()
            .iter()
            .all(|c| c.contains("HttpOnly") && c.contains("SameSite=Lax") && c.contains("Path=/")));

        let logged_in = login(&app, "a@x.com", "Str0ng!Pass").await;
        assert_eq!(logged_in.status, StatusCode::OK);
        assert_eq!(logged_in.body["data"]["user"]["id"], 1);
        assert!(logged_in.cookie("accessToken").is_some());

        let wrong = login(&app, "a@x.com", "wrong").await;
        assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong.error_code(), "INVALID_CREDENTIALS");
        assert!(wrong.cookie("accessToken").is_none());
    }

    #[tokio::test]
    async fn test_register_ignores_requested_role() {
        let app = build_router(test_state(None).await);
        let response = send(
            &app,
            json_request(
                Method::POST,
                "/api/auth/register",
                json!({ "name": "Eve", "email": "eve@x.com", "password": "Str0ng!Pass", "role": "admin" }),
            ),
        )
        .await;
        assert_eq!(response.status, StatusCode::CREATED);
        assert_eq!(response.body["data"]["user"]["role"], "student");
    }

    #[tokio::test]
    async fn test_unknown_email_and_wrong_password_are_indistinguishable() {
        let app = build_router(test_state(None).await);
        register(&app, "Ann", "a@x.com", "Str0ng!Pass").await;

        let wrong_password = login(&app, "a@x.com", "Wr0ng!Pass").await;
        let unknown_email = login(&app, "nobody@x.com", "Str0ng!Pass").await;

        assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
        assert_eq!(unknown_email.status, wrong_password.status);
        assert_eq!(unknown_email.body, wrong_password.body);
    }

    #[tokio::test]
    async fn test_register_duplicate_email_case_insensitive() {
        let app = build_router(test_state(None).await);
        register(&app, "Ann", "a@x.com", "Str0ng!Pass").await;

        let duplicate = register(&app, "Ann Two", "A@X.COM", "Str0ng!Pass").await;
        assert_eq!(duplicate.status, StatusCode::CONFLICT);
        assert_eq!(duplicate.error_code(), "EMAIL_IN_USE");
        assert!(duplicate.set_cookies().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_registration() {
        let state = test_state(None).await;
        let app = build_router(state.clone());

        let (first, second) = tokio::join!(
            register(&app, "Ann", "race@x.com", "Str0ng!Pass"),
            register(&app, "Ann", "race@x.com", "Str0ng!Pass"),
        );

        let mut statuses = vec![first.status, second.status];
        statuses.sort();
        assert_eq!(statuses, vec![StatusCode::CREATED, StatusCode::CONFLICT]);
        assert_eq!(user_count(&state).await, 1);
    }

    #[tokio::test]
    async fn test_register_validation() {
        let app = build_router(test_state(None).await);
        let response = register(&app, "A", "not-an-email", "weak").await;

        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.error_code(), "VALIDATION_FAILED");
        assert_eq!(response.body["success"], false);
        assert!(response.body["data"].is_null());
    }

    #[tokio::test]
    async fn test_undecodable_body_uses_envelope() {
        let app = build_router(test_state(None).await);

        let response = send(
            &app,
            json_request(Method::POST, "/api/auth/login", json!({ "email": "a@x.com" })),
        )
        .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.error_code(), "VALIDATION_FAILED");
        assert_eq!(response.body["success"], false);

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/auth/register")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from("not json"))
            .unwrap();
        let response = send(&app, request).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.error_code(), "VALIDATION_FAILED");
    }

    #[tokio::test]
    async fn test_oauth_only_account_password_login() {
        let state = test_state(None).await;
        state
            .users
            .insert(&NewUser {
                email: "g@x.com".to_string(),
                name: "Gee".to_string(),
                oauth_provider: Some("google".to_string()),
                oauth_id: Some("g-1".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        let app = build_router(state);

        let response = login(&app, "g@x.com", "Anything1!").await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.error_code(), "OAUTH_ONLY_ACCOUNT");
        assert_eq!(response.body["message"], "Please login with Google");
    }

    #[tokio::test]
    async fn test_login_rotates_session() {
        let state = test_state(None).await;
        let app = build_router(state.clone());
        let registered = register(&app, "Ann", "a@x.com", "Str0ng!Pass").await;
        let first_session = registered.cookie("lms_session").unwrap();

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/auth/login")
            .header(CONTENT_TYPE, "application/json")
            .header(COOKIE, format!("lms_session={}", first_session))
            .body(Body::from(
                json!({ "email": "a@x.com", "password": "Str0ng!Pass" }).to_string(),
            ))
            .unwrap();
        let logged_in = send(&app, request).await;
        let second_session = logged_in.cookie("lms_session").unwrap();

        assert_ne!(first_session, second_session);
        assert!(state.sessions.get(&first_session).await.unwrap().is_none());
        let session = state.sessions.get(&second_session).await.unwrap().unwrap();
        assert!(session.authenticated);
        assert_eq!(session.user_id, Some(1));
    }

    #[tokio::test]
    async fn test_deactivated_account_cannot_login() {
        let state = test_state(None).await;
        let app = build_router(state.clone());
        register(&app, "Ann", "a@x.com", "Str0ng!Pass").await;
        state.users.set_active(1, false).await.unwrap();

        let response = login(&app, "a@x.com", "Str0ng!Pass").await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.error_code(), "ACCOUNT_DEACTIVATED");
    }

    // ============================================================================
    // Refresh token
    // ============================================================================

    #[tokio::test]
    async fn test_refresh_issues_new_access_token_only() {
        let app = build_router(test_state(None).await);
        let registered = register(&app, "Ann", "a@x.com", "Str0ng!Pass").await;
        let refresh = registered.cookie("refreshToken").unwrap();

        let response = send(
            &app,
            post_with_cookie("/api/auth/refresh-token", &format!("refreshToken={}", refresh)),
        )
        .await;

        assert_eq!(response.status, StatusCode::OK);
        let access = response.body["data"]["accessToken"].as_str().unwrap();
        assert_eq!(response.cookie("accessToken").as_deref(), Some(access));
        assert!(response.cookie("refreshToken").is_none());
        assert_eq!(response.body["data"]["user"]["email"], "a@x.com");
    }

    #[tokio::test]
    async fn test_refresh_with_expired_token_clears_cookies() {
        let state = test_state(None).await;
        let app = build_router(state.clone());
        register(&app, "Ann", "a@x.com", "Str0ng!Pass").await;

        let subject = TokenSubject {
            id: 1,
            email: "a@x.com".to_string(),
            role: Role::Student,
        };
        let stale = state
            .tokens
            .issue_at(
                TokenClass::Refresh,
                &subject,
                Utc::now() - ChronoDuration::days(8),
            )
            .unwrap();

        let response = send(
            &app,
            post_with_cookie("/api/auth/refresh-token", &format!("refreshToken={}", stale)),
        )
        .await;

        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.error_code(), "TOKEN_EXPIRED");
        assert!(response.cleared("accessToken"));
        assert!(response.cleared("refreshToken"));
    }

    #[tokio::test]
    async fn test_refresh_with_corrupted_token() {
        let app = build_router(test_state(None).await);
        let response = send(
            &app,
            post_with_cookie("/api/auth/refresh-token", "refreshToken=not.a.jwt"),
        )
        .await;

        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.error_code(), "TOKEN_MALFORMED");
        assert!(response.cleared("accessToken"));
        assert!(response.cleared("refreshToken"));
    }

    #[tokio::test]
    async fn test_refresh_without_cookie() {
        let app = build_router(test_state(None).await);
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/auth/refresh-token")
            .body(Body::empty())
            .unwrap();
        let response = send(&app, request).await;

        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.error_code(), "MISSING_TOKEN");
    }

    #[tokio::test]
    async fn test_access_token_is_not_a_refresh_token() {
        let app = build_router(test_state(None).await);
        let registered = register(&app, "Ann", "a@x.com", "Str0ng!Pass").await;
        let access = registered.cookie("accessToken").unwrap();

        let response = send(
            &app,
            post_with_cookie("/api/auth/refresh-token", &format!("refreshToken={}", access)),
        )
        .await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert!(response.cleared("refreshToken"));
    }

    #[tokio::test]
    async fn test_refresh_for_deleted_user() {
        let state = test_state(None).await;
        let app = build_router(state.clone());
        let registered = register(&app, "Ann", "a@x.com", "Str0ng!Pass").await;
        let refresh = registered.cookie("refreshToken").unwrap();
        state.users.delete(1).await.unwrap();

        let response = send(
            &app,
            post_with_cookie("/api/auth/refresh-token", &format!("refreshToken={}", refresh)),
        )
        .await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.error_code(), "USER_NOT_FOUND");
        assert!(response.cleared("accessToken"));
    }

    // ============================================================================
    // Current user / access token
    // ============================================================================

    #[tokio::test]
    async fn test_me_with_cookie_or_bearer() {
        let app = build_router(test_state(None).await);
        let registered = register(&app, "Ann", "a@x.com", "Str0ng!Pass").await;
        let access = registered.cookie("accessToken").unwrap();

        let via_cookie = send(
            &app,
            get_with_cookie("/api/auth/me", &format!("accessToken={}", access)),
        )
        .await;
        assert_eq!(via_cookie.status, StatusCode::OK);
        assert_eq!(via_cookie.body["data"]["user"]["name"], "Ann");

        let request = Request::builder()
            .uri("/api/auth/me")
            .header(AUTHORIZATION, format!("Bearer {}", access))
            .body(Body::empty())
            .unwrap();
        let via_bearer = send(&app, request).await;
        assert_eq!(via_bearer.status, StatusCode::OK);
        assert_eq!(via_bearer.body["data"]["user"]["id"], 1);
    }

    #[tokio::test]
    async fn test_me_rejections() {
        let state = test_state(None).await;
        let app = build_router(state.clone());

        let request = Request::builder()
            .uri("/api/auth/me")
            .body(Body::empty())
            .unwrap();
        let missing = send(&app, request).await;
        assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
        assert_eq!(missing.error_code(), "MISSING_TOKEN");

        let malformed = send(&app, get_with_cookie("/api/auth/me", "accessToken=garbage")).await;
        assert_eq!(malformed.status, StatusCode::FORBIDDEN);
        assert_eq!(malformed.error_code(), "TOKEN_MALFORMED");
        assert!(malformed.cleared("accessToken"));

        let registered = register(&app, "Ann", "a@x.com", "Str0ng!Pass").await;
        let access = registered.cookie("accessToken").unwrap();
        state.users.set_active(1, false).await.unwrap();

        let deactivated = send(
            &app,
            get_with_cookie("/api/auth/me", &format!("accessToken={}", access)),
        )
        .await;
        assert_eq!(deactivated.status, StatusCode::UNAUTHORIZED);
        assert_eq!(deactivated.error_code(), "ACCOUNT_DEACTIVATED");
        assert!(deactivated.cleared("refreshToken"));
    }

    // ============================================================================
    // Logout
    // ============================================================================

    #[tokio::test]
    async fn test_logout_without_session() {
        let app = build_router(test_state(None).await);
        let request = Request::builder()
            .uri("/api/auth/logout")
            .body(Body::empty())
            .unwrap();
        let response = send(&app, request).await;

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["success"], true);
        assert!(response.cleared("accessToken"));
        assert!(response.cleared("refreshToken"));
        assert!(response.cleared("lms_session"));
    }

    #[tokio::test]
    async fn test_logout_in_production_expires_secure_cookies() {
        let config = AppConfig {
            production: true,
            ..AppConfig::for_tests()
        };
        let state = Arc::new(AppState::new(setup_test_db().await, config, None).unwrap());
        let app = build_router(state);
        let request = Request::builder()
            .uri("/api/auth/logout")
            .body(Body::empty())
            .unwrap();
        let response = send(&app, request).await;

        assert_eq!(response.status, StatusCode::OK);
        assert!(response.cleared("lms_session"));
        let cookies = response.set_cookies();
        assert_eq!(cookies.len(), 3);
        assert!(cookies.iter().all(|c| c.ends_with("; Secure")));
    }

    #[tokio::test]
    async fn test_logout_destroys_session() {
        let state = test_state(None).await;
        let app = build_router(state.clone());
        let registered = register(&app, "Ann", "a@x.com", "Str0ng!Pass").await;
        let session = registered.cookie("lms_session").unwrap();

        let response = send(
            &app,
            get_with_cookie("/api/auth/logout", &format!("lms_session={}", session)),
        )
        .await;

        assert_eq!(response.status, StatusCode::OK);
        assert!(response.cleared("accessToken"));
        assert!(response.cleared("refreshToken"));
        assert!(state.sessions.get(&session).await.unwrap().is_none());
    }

    // ============================================================================
    // OAuth
    // ============================================================================

    /// Run the redirect handshake and return the callback response.
    async fn oauth_round_trip(app: &Router, code: &str) -> TestResponse {
        let request = Request::builder()
            .uri("/api/auth/google")
            .body(Body::empty())
            .unwrap();
        let started = send(app, request).await;
        assert_eq!(started.status, StatusCode::SEE_OTHER);

        let location = started.headers.get(LOCATION).unwrap().to_str().unwrap();
        let oauth_state = location.split("state=").nth(1).unwrap().to_string();
        let session = started.cookie("lms_session").unwrap();

        send(
            app,
            get_with_cookie(
                &format!("/api/auth/google/callback?code={}&state={}", code, oauth_state),
                &format!("lms_session={}", session),
            ),
        )
        .await
    }

    #[tokio::test]
    async fn test_oauth_creates_student_and_sets_cookies() {
        let state = test_state(Some(google_profile("g-1", Some("new@x.com")))).await;
        let app = build_router(state.clone());

        let response = oauth_round_trip(&app, "code-1").await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["data"]["user"]["role"], "student");
        assert_eq!(response.body["data"]["user"]["oauth_provider"], "google");
        assert!(response.cookie("accessToken").is_some());
        assert!(response.cookie("refreshToken").is_some());

        let again = oauth_round_trip(&app, "code-2").await;
        assert_eq!(again.body["data"]["user"]["id"], response.body["data"]["user"]["id"]);
        assert_eq!(user_count(&state).await, 1);
    }

    #[tokio::test]
    async fn test_oauth_links_existing_password_account() {
        let state = test_state(Some(google_profile("g-1", Some("a@x.com")))).await;
        let app = build_router(state.clone());
        register(&app, "Ann", "a@x.com", "Str0ng!Pass").await;

        let linked = oauth_round_trip(&app, "code-1").await;
        assert_eq!(linked.status, StatusCode::OK);
        assert_eq!(linked.body["data"]["user"]["id"], 1);
        assert_eq!(linked.body["data"]["user"]["name"], "Ann");

        let again = oauth_round_trip(&app, "code-2").await;
        assert_eq!(again.body["data"]["user"]["id"], 1);
        assert_eq!(user_count(&state).await, 1);

        // The password still works after linking.
        assert_eq!(login(&app, "a@x.com", "Str0ng!Pass").await.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_oauth_without_email_creates_nothing() {
        let state = test_state(Some(google_profile("g-1", None))).await;
        let app = build_router(state.clone());

        let response = oauth_round_trip(&app, "code-1").await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.error_code(), "MISSING_EMAIL");
        assert!(response.cookie("accessToken").is_none());
        assert!(response.cookie("refreshToken").is_none());
        assert_eq!(user_count(&state).await, 0);
    }

    #[tokio::test]
    async fn test_oauth_provider_conflict() {
        let state = test_state(Some(google_profile("g-2", Some("a@x.com")))).await;
        state
            .users
            .insert(&NewUser {
                email: "a@x.com".to_string(),
                name: "Ann".to_string(),
                oauth_provider: Some("google".to_string()),
                oauth_id: Some("g-1".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        let app = build_router(state.clone());

        let response = oauth_round_trip(&app, "code-1").await;
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.error_code(), "PROVIDER_CONFLICT");
        assert!(response.cookie("accessToken").is_none());
        assert_eq!(user_count(&state).await, 1);
    }

    #[tokio::test]
    async fn test_oauth_code_exchange_failure() {
        let state = test_state(Some(google_profile("g-1", Some("a@x.com")))).await;
        let app = build_router(state.clone());

        let response = oauth_round_trip(&app, "bad-code").await;
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.body["message"], "Server error");
        assert!(response.cookie("accessToken").is_none());
        assert_eq!(user_count(&state).await, 0);
    }

    #[tokio::test]
    async fn test_oauth_callback_rejects_state_mismatch() {
        let state = test_state(Some(google_profile("g-1", Some("a@x.com")))).await;
        let app = build_router(state.clone());

        let request = Request::builder()
            .uri("/api/auth/google")
            .body(Body::empty())
            .unwrap();
        let started = send(&app, request).await;
        let session = started.cookie("lms_session").unwrap();

        let response = send(
            &app,
            get_with_cookie(
                "/api/auth/google/callback?code=code-1&state=forged",
                &format!("lms_session={}", session),
            ),
        )
        .await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.error_code(), "UNAUTHENTICATED");
        assert_eq!(user_count(&state).await, 0);

        let request = Request::builder()
            .uri("/api/auth/google/callback?code=code-1&state=anything")
            .body(Body::empty())
            .unwrap();
        let no_session = send(&app, request).await;
        assert_eq!(no_session.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_oauth_unavailable_without_provider() {
        let state = Arc::new(
            AppState::new(setup_test_db().await, AppConfig::for_tests(), None).unwrap(),
        );
        let app = build_router(state);

        let request = Request::builder()
            .uri("/api/auth/google")
            .body(Body::empty())
            .unwrap();
        let response = send(&app, request).await;
        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_health() {
        let app = build_router(test_state(None).await);
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = send(&app, request).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["status"], "ok");
    }
}

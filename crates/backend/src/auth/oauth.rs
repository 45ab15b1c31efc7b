//! Google OAuth2 authorization-code exchange.
//!
//! Two sequential calls: code -> tokens at the token endpoint, then
//! tokens -> profile at the userinfo endpoint. Provider JSON is treated as
//! untrusted: every required field is checked for presence and type, and a
//! missing or mistyped field is a hard failure.

use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use super::types::{ExternalProfile, OAuthCredential};
use crate::config::Config;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OAuthError {
    #[error("authorization code not provided")]
    MissingAuthorizationCode,

    #[error("code exchange failed: {0}")]
    CodeExchangeFailed(String),

    #[error("malformed token response: {0}")]
    MalformedTokenResponse(String),

    #[error("profile fetch failed: {0}")]
    ProfileFetchFailed(String),

    #[error("malformed profile response: {0}")]
    MalformedProfileResponse(String),
}

#[derive(Debug, Clone)]
pub struct OAuthSettings {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub timeout: Duration,
}

impl OAuthSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
            redirect_uri: config.google_redirect_uri.clone(),
            auth_url: config.google_auth_url.clone(),
            token_url: config.google_token_url.clone(),
            userinfo_url: config.google_userinfo_url.clone(),
            timeout: config.provider_timeout(),
        }
    }
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    grant_type: &'a str,
    code: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    redirect_uri: &'a str,
}

#[derive(Clone)]
pub struct GoogleOAuthClient {
    http: reqwest::Client,
    settings: OAuthSettings,
}

impl GoogleOAuthClient {
    pub fn new(settings: OAuthSettings) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;
        Ok(Self { http, settings })
    }

    /// Consent-screen URL the browser should be sent to.
    ///
    /// `state` is echoed back on the callback. It is used as a post-login
    /// path only and is not bound to the browser session, so it gives no
    /// CSRF protection.
    pub fn authorization_url(&self, state: &str) -> String {
        let scopes = ["openid", "email", "profile"].join(" ");

        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent&state={}",
            self.settings.auth_url,
            urlencoding::encode(&self.settings.client_id),
            urlencoding::encode(&self.settings.redirect_uri),
            urlencoding::encode(&scopes),
            urlencoding::encode(state),
        )
    }

    /// Exchange an authorization code for access and id tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<OAuthCredential, OAuthError> {
        if code.is_empty() {
            return Err(OAuthError::MissingAuthorizationCode);
        }

        let response = self
            .http
            .post(&self.settings.token_url)
            .form(&TokenRequest {
                grant_type: "authorization_code",
                code,
                client_id: &self.settings.client_id,
                client_secret: &self.settings.client_secret,
                redirect_uri: &self.settings.redirect_uri,
            })
            .send()
            .await
            .map_err(|e| OAuthError::CodeExchangeFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Token exchange failed: {} - {}", status, body);
            return Err(OAuthError::CodeExchangeFailed(format!(
                "token endpoint returned {}",
                status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| OAuthError::CodeExchangeFailed(e.to_string()))?;

        parse_token_response(&body).map_err(OAuthError::MalformedTokenResponse)
    }

    /// Fetch the user's profile with the credentials from `exchange_code`.
    pub async fn fetch_profile(
        &self,
        credential: &OAuthCredential,
    ) -> Result<ExternalProfile, OAuthError> {
        let response = self
            .http
            .get(&self.settings.userinfo_url)
            .query(&[
                ("alt", "json"),
                ("access_token", credential.access_token.as_str()),
            ])
            .bearer_auth(&credential.id_token)
            .send()
            .await
            .map_err(|e| OAuthError::ProfileFetchFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!("Userinfo request failed: {}", status);
            return Err(OAuthError::ProfileFetchFailed(format!(
                "userinfo endpoint returned {}",
                status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| OAuthError::ProfileFetchFailed(e.to_string()))?;

        parse_profile_response(&body).map_err(OAuthError::MalformedProfileResponse)
    }
}

fn parse_object(body: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err("response is not a JSON object".to_string()),
        Err(e) => Err(format!("invalid JSON: {}", e)),
    }
}

fn required_str(map: &Map<String, Value>, field: &str) -> Result<String, String> {
    match map.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(format!("field `{}` is not a string", field)),
        None => Err(format!("field `{}` is missing", field)),
    }
}

fn required_non_empty(map: &Map<String, Value>, field: &str) -> Result<String, String> {
    let value = required_str(map, field)?;
    if value.is_empty() {
        return Err(format!("field `{}` is empty", field));
    }
    Ok(value)
}

fn required_bool(map: &Map<String, Value>, field: &str) -> Result<bool, String> {
    match map.get(field) {
        Some(Value::Bool(b)) => Ok(*b),
        Some(_) => Err(format!("field `{}` is not a boolean", field)),
        None => Err(format!("field `{}` is missing", field)),
    }
}

fn optional_str(map: &Map<String, Value>, field: &str) -> Result<Option<String>, String> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(format!("field `{}` is not a string", field)),
    }
}

fn parse_token_response(body: &str) -> Result<OAuthCredential, String> {
    let map = parse_object(body)?;
    Ok(OAuthCredential {
        access_token: required_non_empty(&map, "access_token")?,
        id_token: required_non_empty(&map, "id_token")?,
    })
}

fn parse_profile_response(body: &str) -> Result<ExternalProfile, String> {
    let map = parse_object(body)?;
    Ok(ExternalProfile {
        id: required_non_empty(&map, "id")?,
        email: required_non_empty(&map, "email")?,
        verified_email: required_bool(&map, "verified_email")?,
        name: required_str(&map, "name")?,
        picture: required_str(&map, "picture")?,
        given_name: optional_str(&map, "given_name")?,
        family_name: optional_str(&map, "family_name")?,
        locale: optional_str(&map, "locale")?,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub(crate) fn test_settings(server: &MockServer) -> OAuthSettings {
        OAuthSettings {
            client_id: "test-client-id".to_string(),
            client_secret: "test-client-secret".to_string(),
            redirect_uri: "http://localhost:8000/api/sessions/oauth/google".to_string(),
            auth_url: "https://accounts.example.com/auth".to_string(),
            token_url: format!("{}/token", server.uri()),
            userinfo_url: format!("{}/userinfo", server.uri()),
            timeout: Duration::from_millis(500),
        }
    }

    pub(crate) fn profile_json() -> Value {
        json!({
            "id": "1234567890",
            "email": "Ada@Example.com",
            "verified_email": true,
            "name": "Ada Lovelace",
            "given_name": "Ada",
            "family_name": "Lovelace",
            "picture": "https://example.com/ada.png",
            "locale": "en"
        })
    }

    fn credential() -> OAuthCredential {
        OAuthCredential {
            access_token: "access-abc".to_string(),
            id_token: "id-xyz".to_string(),
        }
    }

    #[tokio::test]
    async fn test_exchange_code_posts_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=the-code"))
            .and(body_string_contains("client_id=test-client-id"))
            .and(body_string_contains("client_secret=test-client-secret"))
            .and(body_string_contains("redirect_uri=http"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "access-abc",
                "id_token": "id-xyz",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = GoogleOAuthClient::new(test_settings(&server)).unwrap();
        let credential = client.exchange_code("the-code").await.unwrap();
        assert_eq!(credential.access_token, "access-abc");
        assert_eq!(credential.id_token, "id-xyz");
    }

    #[tokio::test]
    async fn test_empty_code_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = GoogleOAuthClient::new(test_settings(&server)).unwrap();
        assert_eq!(
            client.exchange_code("").await,
            Err(OAuthError::MissingAuthorizationCode)
        );
    }

    #[tokio::test]
    async fn test_exchange_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})))
            .mount(&server)
            .await;

        let client = GoogleOAuthClient::new(test_settings(&server)).unwrap();
        assert!(matches!(
            client.exchange_code("stale").await,
            Err(OAuthError::CodeExchangeFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_exchange_missing_id_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "a"})))
            .mount(&server)
            .await;

        let client = GoogleOAuthClient::new(test_settings(&server)).unwrap();
        assert_eq!(
            client.exchange_code("code").await,
            Err(OAuthError::MalformedTokenResponse(
                "field `id_token` is missing".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn test_exchange_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"access_token": "a", "id_token": "b"}))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let client = GoogleOAuthClient::new(test_settings(&server)).unwrap();
        assert!(matches!(
            client.exchange_code("code").await,
            Err(OAuthError::CodeExchangeFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_profile_sends_both_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .and(query_param("alt", "json"))
            .and(query_param("access_token", "access-abc"))
            .and(header("authorization", "Bearer id-xyz"))
            .respond_with(ResponseTemplate::new(200).set_body_json(profile_json()))
            .expect(1)
            .mount(&server)
            .await;

        let client = GoogleOAuthClient::new(test_settings(&server)).unwrap();
        let profile = client.fetch_profile(&credential()).await.unwrap();
        assert_eq!(profile.id, "1234567890");
        assert_eq!(profile.email, "Ada@Example.com");
        assert!(profile.verified_email);
        assert_eq!(profile.given_name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn test_fetch_profile_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = GoogleOAuthClient::new(test_settings(&server)).unwrap();
        assert!(matches!(
            client.fetch_profile(&credential()).await,
            Err(OAuthError::ProfileFetchFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_profile_mistyped_verified_flag() {
        let mut body = profile_json();
        body["verified_email"] = json!("true");

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let client = GoogleOAuthClient::new(test_settings(&server)).unwrap();
        assert_eq!(
            client.fetch_profile(&credential()).await,
            Err(OAuthError::MalformedProfileResponse(
                "field `verified_email` is not a boolean".to_string()
            ))
        );
    }

    #[test]
    fn test_parse_token_response_rejects_wrong_types() {
        assert!(parse_token_response(r#"{"access_token": 1, "id_token": "x"}"#).is_err());
        assert!(parse_token_response(r#"{"access_token": "", "id_token": "x"}"#).is_err());
        assert!(parse_token_response(r#"["access_token"]"#).is_err());
        assert!(parse_token_response("not json").is_err());
    }

    #[test]
    fn test_parse_profile_optional_fields() {
        let mut body = profile_json();
        let map = body.as_object_mut().unwrap();
        map.remove("given_name");
        map.remove("locale");

        let profile = parse_profile_response(&body.to_string()).unwrap();
        assert_eq!(profile.given_name, None);
        assert_eq!(profile.locale, None);
        assert_eq!(profile.family_name.as_deref(), Some("Lovelace"));

        map_field_error("picture");
        map_field_error("email");
        map_field_error("name");
        map_field_error("id");
    }

    fn map_field_error(field: &str) {
        let mut body = profile_json();
        body.as_object_mut().unwrap().remove(field);
        assert_eq!(
            parse_profile_response(&body.to_string()),
            Err(format!("field `{}` is missing", field))
        );
    }

    #[test]
    fn test_authorization_url() {
        let client = GoogleOAuthClient::new(OAuthSettings {
            client_id: "cid".to_string(),
            client_secret: "secret".to_string(),
            redirect_uri: "http://localhost/cb".to_string(),
            auth_url: "https://accounts.example.com/auth".to_string(),
            token_url: String::new(),
            userinfo_url: String::new(),
            timeout: Duration::from_secs(1),
        })
        .unwrap();

        let url = client.authorization_url("/profile");
        assert!(url.starts_with("https://accounts.example.com/auth?client_id=cid&"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%2Fcb"));
        assert!(url.contains("scope=openid%20email%20profile"));
        assert!(url.contains("response_type=code"));
        assert!(url.ends_with("state=%2Fprofile"));
        assert!(!url.contains("secret"));
    }
}

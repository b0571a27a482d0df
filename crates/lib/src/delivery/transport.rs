//! One outbound HTTP attempt against the Graph API messages endpoint.

use crate::config::Credentials;
use async_trait::async_trait;
use std::time::Duration;

/// Why a single attempt failed. Both kinds are retried by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    /// Upstream answered outside [200, 300).
    Status { status: u16, body: String },
    /// No usable answer: connect error, timeout, reset.
    Network(String),
}

impl std::fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Status { status, body } => write!(f, "{} {}", status, body),
            Self::Network(message) => f.write_str(message),
        }
    }
}

/// Issues exactly one request per call. Retrying is the caller's job.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, payload: &serde_json::Value) -> Result<serde_json::Value, AttemptFailure>;
}

/// reqwest-backed transport: `POST {base}/{version}/{phone_number_id}/messages` with a bearer token.
pub struct HttpTransport {
    url: String,
    token: String,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(
        api_base_url: &str,
        credentials: &Credentials,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: messages_url(
                api_base_url,
                &credentials.api_version,
                &credentials.phone_number_id,
            ),
            token: credentials.api_token.clone(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Messages endpoint for a sender phone number id.
pub fn messages_url(api_base_url: &str, api_version: &str, phone_number_id: &str) -> String {
    format!(
        "{}/{}/{}/messages",
        api_base_url.trim_end_matches('/'),
        api_version.trim_matches('/'),
        phone_number_id
    )
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, payload: &serde_json::Value) -> Result<serde_json::Value, AttemptFailure> {
        let res = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(payload)
            .send()
            .await
            .map_err(|e| AttemptFailure::Network(e.to_string()))?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(AttemptFailure::Status {
                status: status.as_u16(),
                body,
            });
        }
        // The message is accepted at this point; a body we cannot read is not a reason to resend.
        let body = res.text().await.unwrap_or_default();
        Ok(serde_json::from_str(&body).unwrap_or(serde_json::Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn credentials() -> Credentials {
        Credentials {
            api_token: "test-token".to_string(),
            phone_number_id: "1098765".to_string(),
            api_version: "v21.0".to_string(),
        }
    }

    #[test]
    fn messages_url_joins_segments() {
        assert_eq!(
            messages_url("https://graph.facebook.com/", "v21.0", "42"),
            "https://graph.facebook.com/v21.0/42/messages"
        );
    }

    #[tokio::test]
    async fn posts_json_with_bearer_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v21.0/1098765/messages")
            .match_header("authorization", "Bearer test-token")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "messaging_product": "whatsapp",
                "to": "51900000000"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"messages":[{"id":"wamid.1"}]}"#)
            .create_async()
            .await;

        let transport =
            HttpTransport::new(&server.url(), &credentials(), Duration::from_secs(10)).unwrap();
        let payload = serde_json::json!({
            "messaging_product": "whatsapp",
            "to": "51900000000",
            "type": "text",
            "text": { "body": "hola" }
        });
        let out = transport.post(&payload).await.unwrap();
        assert_eq!(out["messages"][0]["id"], "wamid.1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_a_failed_attempt() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v21.0/1098765/messages")
            .with_status(400)
            .with_body(r#"{"error":{"message":"bad param","code":100}}"#)
            .create_async()
            .await;

        let transport =
            HttpTransport::new(&server.url(), &credentials(), Duration::from_secs(10)).unwrap();
        let err = transport
            .post(&serde_json::json!({ "to": "1", "type": "text" }))
            .await
            .unwrap_err();
        match err {
            AttemptFailure::Status { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("bad param"));
            }
            other => panic!("expected status failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn unreachable_host_is_a_network_failure() {
        let port = {
            let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            l.local_addr().unwrap().port()
        };
        let transport = HttpTransport::new(
            &format!("http://127.0.0.1:{}", port),
            &credentials(),
            Duration::from_secs(2),
        )
        .unwrap();
        let err = transport
            .post(&serde_json::json!({ "to": "1", "type": "text" }))
            .await
            .unwrap_err();
        assert!(matches!(err, AttemptFailure::Network(_)));
    }
}

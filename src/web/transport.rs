use std::future::Future;

use crate::core::AcumulusError;

/// Raw HTTP answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Posts form encoded requests. Implemented over `reqwest` when the `http`
/// feature is enabled; tests plug in their own.
pub trait Transport: Send + Sync {
    /// POST `form` as `application/x-www-form-urlencoded` to `uri`.
    ///
    /// # Errors
    ///
    /// `AcumulusError::Http` when no HTTP response was received at all.
    fn post(
        &self,
        uri: &str,
        form: &[(&str, String)],
    ) -> impl Future<Output = Result<HttpResponse, AcumulusError>> + Send;
}

#[cfg(feature = "http")]
mod reqwest_transport {
    use std::time::Duration;

    use tracing::trace;

    use super::{HttpResponse, Transport};
    use crate::config::Environment;
    use crate::core::AcumulusError;

    /// [`Transport`] over a shared `reqwest` client.
    #[derive(Debug, Clone)]
    pub struct ReqwestTransport {
        client: reqwest::Client,
    }

    impl ReqwestTransport {
        pub fn new(timeout: Duration) -> Result<Self, AcumulusError> {
            let client = reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| AcumulusError::Http(e.to_string()))?;
            Ok(Self { client })
        }

        pub fn from_environment(environment: &Environment) -> Result<Self, AcumulusError> {
            Self::new(Duration::from_secs(environment.timeout_secs))
        }
    }

    impl Transport for ReqwestTransport {
        async fn post(&self, uri: &str, form: &[(&str, String)]) -> Result<HttpResponse, AcumulusError> {
            let resp = self
                .client
                .post(uri)
                .form(form)
                .send()
                .await
                .map_err(|e| AcumulusError::Http(e.to_string()))?;

            let status = resp.status();
            let content_type = resp
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = resp
                .text()
                .await
                .map_err(|e| AcumulusError::Http(e.to_string()))?;
            trace!(%status, bytes = body.len(), "HTTP response received");

            Ok(HttpResponse {
                status: status.as_u16(),
                content_type,
                body,
            })
        }
    }

}

#[cfg(feature = "http")]
pub use reqwest_transport::ReqwestTransport;

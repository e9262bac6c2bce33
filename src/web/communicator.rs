use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{Config, WireFormat};
use crate::core::AcumulusError;
use crate::result::AcumulusResult;

use super::envelope::{build_request, masked};
use super::response::normalize;
use super::transport::{HttpResponse, Transport};
use super::xml::{value_to_xml, xml_to_value};

/// Root element of XML requests.
const XML_ROOT: &str = "myxml";

/// Form field that carries the request body.
const FORM_FIELD: &str = "xmlstring";

/// Low level access to the Acumulus API: wraps messages in the envelope,
/// encodes, posts and normalizes the answer.
pub struct ApiCommunicator<T> {
    config: Config,
    transport: T,
}

impl<T: Transport> ApiCommunicator<T> {
    pub fn new(config: Config, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn encode(&self, request: &Value) -> Result<String, AcumulusError> {
        match self.config.environment.request_format {
            WireFormat::Xml => value_to_xml(XML_ROOT, request, false),
            WireFormat::Json => Ok(serde_json::to_string(request)?),
        }
    }

    /// Send `message` to `uri`.
    ///
    /// Problems reported by Acumulus end up as messages in the result. The
    /// raw request (with the password masked) and raw response are kept on
    /// the result for logging.
    ///
    /// # Errors
    ///
    /// `Http` when nothing usable came back, `Response` when the body is not
    /// an Acumulus response, `Xml`/`Json` when encoding the request fails.
    pub async fn call_api(
        &self,
        uri: &str,
        message: Value,
        needs_contract: bool,
    ) -> Result<AcumulusResult, AcumulusError> {
        let request = build_request(&self.config, message, needs_contract);
        let body = self.encode(&request)?;
        let logged = self.encode(&masked(&request))?;
        debug!(%uri, request = %logged, "calling Acumulus");

        let response = self.transport.post(uri, &[(FORM_FIELD, body)]).await?;
        debug!(%uri, status = response.status, response = %response.body, "Acumulus answered");

        let decoded = match decode(&response) {
            Ok(value) => value,
            Err(e) if !response.is_success() => {
                warn!(%uri, status = response.status, error = %e, "HTTP error without API response");
                return Err(AcumulusError::Http(format!("HTTP {}", response.status)));
            }
            Err(e) => return Err(e),
        };

        let mut result = normalize(decoded);
        result
            .set_raw_request(logged)
            .set_raw_response(response.body)
            .set_sent(true);
        Ok(result)
    }
}

/// Decode a response body, detecting JSON or XML from its first character.
///
/// HTML is refused, whether announced by the content type or only visible
/// in the body.
pub fn decode(response: &HttpResponse) -> Result<Value, AcumulusError> {
    let body = response.body.trim_start();
    if body.is_empty() {
        return Err(AcumulusError::Response("empty response".into()));
    }
    let html_type = response
        .content_type
        .as_deref()
        .is_some_and(|t| t.trim().to_ascii_lowercase().starts_with("text/html"));
    let head: String = body.chars().take(64).collect::<String>().to_ascii_lowercase();
    if html_type || head.starts_with("<!doctype html") || head.starts_with("<html") {
        return Err(AcumulusError::Response("HTML page instead of an API response".into()));
    }
    match body.chars().next() {
        Some('{') | Some('[') => serde_json::from_str(body)
            .map_err(|e| AcumulusError::Response(format!("invalid JSON: {e}"))),
        Some('<') => xml_to_value(body).map_err(|e| AcumulusError::Response(e.to_string())),
        _ => Err(AcumulusError::Response(format!(
            "unrecognized response: {}",
            body.chars().take(80).collect::<String>()
        ))),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    use serde_json::json;

    use crate::result::{ApiStatus, Severity};

    /// Answers every call with a fixed response and records what was posted.
    pub(crate) struct FixedTransport {
        response: HttpResponse,
        posted: Mutex<Vec<(String, String)>>,
    }

    impl FixedTransport {
        pub(crate) fn new(status: u16, body: &str) -> Self {
            Self {
                response: HttpResponse {
                    status,
                    content_type: None,
                    body: body.to_string(),
                },
                posted: Mutex::new(Vec::new()),
            }
        }

        /// `(uri, form body)` of every call so far.
        pub(crate) fn posted(&self) -> Vec<(String, String)> {
            self.posted.lock().unwrap().clone()
        }
    }

    impl Transport for FixedTransport {
        async fn post(&self, uri: &str, form: &[(&str, String)]) -> Result<HttpResponse, AcumulusError> {
            let body = form.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join("&");
            self.posted.lock().unwrap().push((uri.to_string(), body));
            Ok(self.response.clone())
        }
    }

    fn config() -> Config {
        let mut config = Config::default();
        config.contract.password = "geheim".into();
        config
    }

    fn response(body: &str) -> HttpResponse {
        HttpResponse {
            status: 200,
            content_type: None,
            body: body.into(),
        }
    }

    #[tokio::test]
    async fn posts_xml_and_reads_json() {
        let transport = FixedTransport::new(200, r#"{"status": "0", "errors": "", "warnings": "", "about": {"role": "Admin"}}"#);
        let api = ApiCommunicator::new(config(), transport);
        let result = api
            .call_api("https://example.test/acumulus/stable/general/general_about.php", json!({}), true)
            .await
            .unwrap();
        assert_eq!(result.api_status(), Some(ApiStatus::Success));
        assert!(result.is_sent());
        assert!(result.raw_request().unwrap().contains("REMOVED FOR SECURITY"));
        assert!(!result.raw_request().unwrap().contains("geheim"));

        let posted = api.transport.posted();
        assert!(posted[0].1.starts_with("xmlstring=<?xml"));
        assert!(posted[0].1.contains("<password>geheim</password>"));
    }

    #[tokio::test]
    async fn http_error_without_body_is_an_error() {
        let api = ApiCommunicator::new(config(), FixedTransport::new(500, ""));
        let err = api.call_api("https://example.test/x.php", json!({}), true).await.unwrap_err();
        assert!(matches!(err, AcumulusError::Http(_)));
    }

    #[tokio::test]
    async fn http_error_with_api_body_is_normalized() {
        let body = r#"{"status": 1, "errors": {"error": {"code": "401", "message": "Unauthorized"}}}"#;
        let api = ApiCommunicator::new(config(), FixedTransport::new(401, body));
        let result = api.call_api("https://example.test/x.php", json!({}), true).await.unwrap();
        assert_eq!(result.status(), Severity::Error);
    }

    #[test]
    fn decode_detects_format() {
        assert_eq!(decode(&response(" {\"status\":0}")).unwrap()["status"], 0);
        assert_eq!(
            decode(&response("<?xml version=\"1.0\"?><myxml><status>0</status></myxml>")).unwrap()["status"],
            "0"
        );
        assert!(matches!(
            decode(&response("<!DOCTYPE html><html><body>502</body></html>")),
            Err(AcumulusError::Response(_))
        ));
        assert!(matches!(decode(&response("   ")), Err(AcumulusError::Response(_))));
        assert!(matches!(decode(&response("Service Unavailable")), Err(AcumulusError::Response(_))));
    }

    #[test]
    fn html_content_type_is_refused() {
        let mut page = response("<body><h1>Maintenance</h1></body>");
        page.content_type = Some("text/html; charset=UTF-8".into());
        assert!(matches!(decode(&page), Err(AcumulusError::Response(_))));

        let mut json = response(r#"{"status": "0"}"#);
        json.content_type = Some("application/json".into());
        assert!(decode(&json).is_ok());
    }
}

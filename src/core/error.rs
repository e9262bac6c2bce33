use thiserror::Error;

/// Errors that can occur while collecting, completing or sending an invoice.
///
/// Business problems that the shop owner has to act on (a missing VAT rate,
/// an amount mismatch, an error returned by Acumulus) are not errors in this
/// sense: they are [`Message`](crate::result::Message)s on an
/// [`AcumulusResult`](crate::result::AcumulusResult).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AcumulusError {
    /// Invalid or incomplete configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A field-mapping expression could not be parsed.
    #[error("token error: {0}")]
    Token(String),

    /// The invoice source delivered data that cannot be collected.
    #[error("collect error: {0}")]
    Collect(String),

    /// A completor pass could not run.
    #[error("complete error: {0}")]
    Complete(String),

    /// XML generation or parsing error.
    #[error("XML error: {0}")]
    Xml(String),

    /// JSON generation or parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Network or HTTP level failure.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The web service answered with something that is not a valid Acumulus
    /// response.
    #[error("unexpected response: {0}")]
    Response(String),
}

impl AcumulusError {
    /// Short machine readable tag, used as message code when an error is
    /// folded into a result.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Token(_) => "token",
            Self::Collect(_) => "collect",
            Self::Complete(_) => "complete",
            Self::Xml(_) => "xml",
            Self::Json(_) => "json",
            Self::Http(_) => "http",
            Self::Response(_) => "response",
        }
    }
}

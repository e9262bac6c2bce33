//! Result of a (local or remote) Acumulus operation.
//!
//! A result aggregates the messages produced locally (collector, completor,
//! validation, exceptions) with the status, errors and warnings returned by
//! the web service. Its overall status is the most severe of all of them.

mod message;

pub use message::{ApiStatus, Message, Severity};

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::core::AcumulusError;

/// Aggregated messages and response of an Acumulus operation.
#[derive(Debug, Clone, Default)]
pub struct AcumulusResult {
    messages: Vec<Message>,
    api_status: Option<ApiStatus>,
    response: Option<Value>,
    raw_request: Option<String>,
    raw_response: Option<String>,
    sent: bool,
}

impl AcumulusResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overall status: the most severe of all messages and the remote status.
    /// A result without messages or remote status is a success.
    pub fn status(&self) -> Severity {
        let from_messages = self.messages.iter().map(|m| m.severity).max();
        let from_api = self.api_status.map(|s| s.severity());
        from_messages
            .into_iter()
            .chain(from_api)
            .max()
            .unwrap_or(Severity::Success)
            .max(Severity::Success)
    }

    pub fn add_message(&mut self, message: Message) -> &mut Self {
        if !self.messages.contains(&message) {
            self.messages.push(message);
        }
        self
    }

    pub fn add_messages(&mut self, messages: impl IntoIterator<Item = Message>) -> &mut Self {
        for message in messages {
            self.add_message(message);
        }
        self
    }

    /// Fold a library error into this result as an exception message.
    pub fn add_exception(&mut self, error: &AcumulusError) -> &mut Self {
        self.add_message(Message::tagged(
            Severity::Exception,
            error.code(),
            error.to_string(),
        ))
    }

    /// Merge another result into this one. Messages keep their order,
    /// duplicates are dropped; response data of `other` wins when present.
    pub fn merge(&mut self, other: AcumulusResult) -> &mut Self {
        self.add_messages(other.messages);
        self.api_status = match (self.api_status, other.api_status) {
            (Some(mine), Some(theirs)) if mine.severity() > theirs.severity() => Some(mine),
            (mine, None) => mine,
            (_, theirs) => theirs,
        };
        if other.response.is_some() {
            self.response = other.response;
        }
        if other.raw_request.is_some() {
            self.raw_request = other.raw_request;
        }
        if other.raw_response.is_some() {
            self.raw_response = other.raw_response;
        }
        self.sent |= other.sent;
        self
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Messages of exactly the given severity.
    pub fn messages_of(&self, severity: Severity) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(move |m| m.severity == severity)
    }

    /// Errors and exceptions.
    pub fn errors(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.severity >= Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Message> {
        self.messages_of(Severity::Warning)
    }

    pub fn has_error(&self) -> bool {
        self.status() >= Severity::Error
    }

    /// Whether there are messages worth showing to a user (notices and up).
    pub fn has_real_messages(&self) -> bool {
        self.messages.iter().any(|m| m.severity >= Severity::Notice)
    }

    /// Whether a message with the given code tag is present.
    pub fn has_code_tag(&self, code_tag: &str) -> bool {
        self.messages
            .iter()
            .any(|m| m.code_tag.as_deref() == Some(code_tag))
    }

    pub fn api_status(&self) -> Option<ApiStatus> {
        self.api_status
    }

    pub fn set_api_status(&mut self, status: ApiStatus) -> &mut Self {
        self.api_status = Some(status);
        self
    }

    /// Main response: the part of the web service response under the key of
    /// the called API function, with errors, warnings and status removed.
    pub fn response(&self) -> Option<&Value> {
        self.response.as_ref()
    }

    pub fn set_response(&mut self, response: Value) -> &mut Self {
        self.response = Some(response);
        self
    }

    /// Deserialize the main response into a typed structure.
    ///
    /// # Errors
    ///
    /// `AcumulusError::Response` when there is no response,
    /// `AcumulusError::Json` when it does not have the shape of `T`.
    pub fn response_as<T: DeserializeOwned>(&self) -> Result<T, AcumulusError> {
        let response = self
            .response
            .as_ref()
            .ok_or_else(|| AcumulusError::Response("no response to deserialize".into()))?;
        Ok(serde_json::from_value(response.clone())?)
    }

    /// Request as sent, with the password masked.
    pub fn raw_request(&self) -> Option<&str> {
        self.raw_request.as_deref()
    }

    pub fn set_raw_request(&mut self, raw: String) -> &mut Self {
        self.raw_request = Some(raw);
        self
    }

    pub fn raw_response(&self) -> Option<&str> {
        self.raw_response.as_deref()
    }

    pub fn set_raw_response(&mut self, raw: String) -> &mut Self {
        self.raw_response = Some(raw);
        self
    }

    /// Whether a message was actually sent to the web service.
    pub fn is_sent(&self) -> bool {
        self.sent
    }

    pub fn set_sent(&mut self, sent: bool) -> &mut Self {
        self.sent = sent;
        self
    }

    /// All messages of severity notice and up, one per line.
    pub fn format_messages(&self) -> String {
        self.messages
            .iter()
            .filter(|m| m.severity >= Severity::Notice)
            .map(|m| m.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_result_is_success() {
        assert_eq!(AcumulusResult::new().status(), Severity::Success);
    }

    #[test]
    fn status_is_most_severe() {
        let mut result = AcumulusResult::new();
        result.add_message(Message::notice("n", "notice"));
        assert_eq!(result.status(), Severity::Notice);
        result.set_api_status(ApiStatus::Warnings);
        assert_eq!(result.status(), Severity::Warning);
        result.add_message(Message::error("e", "error"));
        assert_eq!(result.status(), Severity::Error);
        assert!(result.has_error());
    }

    #[test]
    fn log_messages_are_not_shown_to_users() {
        let mut result = AcumulusResult::new();
        result.add_message(Message::log("l", "detail"));
        assert_eq!(result.status(), Severity::Log);
        assert!(!result.has_real_messages());
    }

    #[test]
    fn merge_keeps_order_and_drops_duplicates() {
        let mut local = AcumulusResult::new();
        local.add_message(Message::warning("w1", "first"));
        let mut remote = AcumulusResult::new();
        remote.add_message(Message::warning("w1", "first"));
        remote.add_message(Message::error("e1", "second"));
        remote.set_api_status(ApiStatus::Errors);
        remote.set_response(json!({"invoicenumber": "1"}));
        local.merge(remote);
        assert_eq!(local.messages().len(), 2);
        assert_eq!(local.messages()[1].code_tag.as_deref(), Some("e1"));
        assert_eq!(local.api_status(), Some(ApiStatus::Errors));
        assert!(local.response().is_some());
    }

    #[test]
    fn exceptions_are_most_severe() {
        let mut result = AcumulusResult::new();
        result.add_exception(&AcumulusError::Http("connection refused".into()));
        assert_eq!(result.status(), Severity::Exception);
        assert!(result.has_code_tag("http"));
    }

    #[test]
    fn typed_response() {
        #[derive(serde::Deserialize)]
        struct Entry {
            entryid: String,
        }
        let mut result = AcumulusResult::new();
        result.set_response(json!({"entryid": "42"}));
        assert_eq!(result.response_as::<Entry>().unwrap().entryid, "42");

        result.set_response(json!({"entry": null}));
        assert!(matches!(result.response_as::<Entry>(), Err(AcumulusError::Json(_))));
        assert!(matches!(
            AcumulusResult::new().response_as::<Entry>(),
            Err(AcumulusError::Response(_))
        ));
    }
}

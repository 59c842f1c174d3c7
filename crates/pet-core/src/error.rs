use thiserror::Error;

/// Why a chat request did not produce a reply.
///
/// Every variant is terminal for its request; the dispatcher turns it into an
/// error [`crate::ResponseRecord`] and nothing is retried.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("request to {url} failed: {message}")]
    Transport {
        url: String,
        code: i32,
        message: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP request failed with code {status}. Response: {body}")]
    Protocol { status: u16, body: String },

    #[error("JSON parsing failed: {message}")]
    Decode { message: String },
}

/// The three failure buckets a completed request can land in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Transport,
    Protocol,
    Decode,
}

impl RequestError {
    pub fn kind(&self) -> FailureKind {
        match self {
            RequestError::Transport { .. } => FailureKind::Transport,
            RequestError::Protocol { .. } => FailureKind::Protocol,
            RequestError::Decode { .. } => FailureKind::Decode,
        }
    }

    /// Transport: transport error code. Protocol: HTTP status. Decode: 0.
    pub fn code(&self) -> i32 {
        match self {
            RequestError::Transport { code, .. } => *code,
            RequestError::Protocol { status, .. } => i32::from(*status),
            RequestError::Decode { .. } => 0,
        }
    }

    pub(crate) fn transport(url: &str, source: reqwest::Error) -> Self {
        // reqwest embeds the full URL, credential included, in its message.
        let source = source.without_url();
        let code = transport_code(&source);
        Self::Transport {
            url: redact_key(url),
            code,
            message: source.to_string(),
            source,
        }
    }
}

// Numbering follows libcurl's CURLcode values.
const CODE_URL_MALFORMAT: i32 = 3;
const CODE_COULDNT_CONNECT: i32 = 7;
const CODE_OPERATION_TIMEDOUT: i32 = 28;
const CODE_RECV_ERROR: i32 = 56;

fn transport_code(err: &reqwest::Error) -> i32 {
    if err.is_timeout() {
        CODE_OPERATION_TIMEDOUT
    } else if err.is_connect() {
        CODE_COULDNT_CONNECT
    } else if err.is_builder() {
        CODE_URL_MALFORMAT
    } else {
        CODE_RECV_ERROR
    }
}

/// Strip the credential from a request URL before it ends up in messages.
fn redact_key(url: &str) -> String {
    match url.split_once("?key=") {
        Some((base, _)) => format!("{base}?key=***"),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_code_is_http_status() {
        let err = RequestError::Protocol {
            status: 503,
            body: "unavailable".to_string(),
        };
        assert_eq!(err.code(), 503);
        assert_eq!(err.kind(), FailureKind::Protocol);
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn test_decode_code_is_zero() {
        let err = RequestError::Decode {
            message: "missing field `candidates`".to_string(),
        };
        assert_eq!(err.code(), 0);
        assert_eq!(err.kind(), FailureKind::Decode);
    }

    #[test]
    fn test_redact_key() {
        assert_eq!(
            redact_key("http://host/v1/models/m:generateContent?key=secret"),
            "http://host/v1/models/m:generateContent?key=***"
        );
        assert_eq!(redact_key("http://host/"), "http://host/");
    }
}

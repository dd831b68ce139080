// crates/network/src/response.rs
//! The `subsonic-response` envelope around every structured API reply

use crate::error::{NetworkError, NetworkResult};
use bytes::Bytes;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

const ROOT_ELEMENT: &[u8] = b"subsonic-response";
const ERROR_ELEMENT: &[u8] = b"error";

/// The `status` attribute of the envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    Ok,
    Failed,
}

/// A reply whose envelope reported success.
///
/// The body is kept as-is for the collaborators that map it onto catalog
/// types.
#[derive(Debug, Clone)]
pub struct SubsonicResponse {
    status: ResponseStatus,
    version: String,
    body: Bytes,
}

impl SubsonicResponse {
    /// Parses the envelope of `body`.
    ///
    /// A `status="failed"` envelope becomes [`NetworkError::Application`]
    /// carrying the server's error code and message.
    pub fn parse(body: Bytes) -> NetworkResult<Self> {
        let mut reader = Reader::from_reader(body.as_ref());
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        let mut in_failed_envelope = false;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) | Event::Empty(e) => {
                    let name = e.local_name();

                    if !in_failed_envelope {
                        if name.as_ref() != ROOT_ELEMENT {
                            return Err(NetworkError::InvalidResponse(format!(
                                "unexpected root element <{}>",
                                String::from_utf8_lossy(name.as_ref())
                            )));
                        }

                        match attribute(&e, b"status")?.as_deref() {
                            Some("ok") => {
                                let version = attribute(&e, b"version")?.unwrap_or_default();
                                drop(reader);
                                return Ok(Self {
                                    status: ResponseStatus::Ok,
                                    version,
                                    body,
                                });
                            }
                            Some("failed") => in_failed_envelope = true,
                            Some(other) => {
                                return Err(NetworkError::InvalidResponse(format!(
                                    "unknown response status '{}'",
                                    other
                                )))
                            }
                            None => {
                                return Err(NetworkError::InvalidResponse(
                                    "response has no status".to_string(),
                                ))
                            }
                        }
                    } else if name.as_ref() == ERROR_ELEMENT {
                        let code = attribute(&e, b"code")?
                            .and_then(|code| code.parse().ok())
                            .unwrap_or(0);
                        let message = attribute(&e, b"message")?
                            .unwrap_or_else(|| "Unknown error".to_string());
                        return Err(NetworkError::Application { code, message });
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if in_failed_envelope {
            Err(NetworkError::Application {
                code: 0,
                message: "Unknown error".to_string(),
            })
        } else {
            Err(NetworkError::InvalidResponse("empty response document".to_string()))
        }
    }

    pub fn status(&self) -> ResponseStatus {
        self.status
    }

    pub fn is_ok(&self) -> bool {
        self.status == ResponseStatus::Ok
    }

    /// API version the server reported
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The raw XML document
    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

fn attribute(element: &BytesStart<'_>, key: &[u8]) -> NetworkResult<Option<String>> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| NetworkError::InvalidResponse(e.to_string()))?;
        if attr.key.local_name().as_ref() == key {
            let value = attr.unescape_value()?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &'static str) -> NetworkResult<SubsonicResponse> {
        SubsonicResponse::parse(Bytes::from_static(xml.as_bytes()))
    }

    #[test]
    fn test_ok_envelope() {
        let response = parse(
            r#"<?xml version="1.0" encoding="UTF-8"?>
            <subsonic-response xmlns="http://subsonic.org/restapi" status="ok" version="1.13.0"/>"#,
        )
        .expect("ok envelope");

        assert!(response.is_ok());
        assert_eq!(response.version(), "1.13.0");
    }

    #[test]
    fn test_ok_envelope_keeps_body() {
        let xml = r#"<subsonic-response status="ok" version="1.16.1"><album id="1" name="Kind of Blue"/></subsonic-response>"#;
        let response = parse(xml).expect("ok envelope");
        assert_eq!(response.body().as_ref(), xml.as_bytes());
    }

    #[test]
    fn test_failed_envelope_is_application_error() {
        let result = parse(
            r#"<subsonic-response xmlns="http://subsonic.org/restapi" status="failed" version="1.13.0">
                <error code="40" message="Wrong username or password"/>
            </subsonic-response>"#,
        );

        match result {
            Err(NetworkError::Application { code, message }) => {
                assert_eq!(code, 40);
                assert_eq!(message, "Wrong username or password");
            }
            other => panic!("expected application error, got {:?}", other),
        }
    }

    #[test]
    fn test_failed_envelope_without_error_element() {
        let result = parse(r#"<subsonic-response status="failed" version="1.13.0"></subsonic-response>"#);
        assert!(matches!(result, Err(NetworkError::Application { code: 0, .. })));
    }

    #[test]
    fn test_wrong_root_is_invalid() {
        let result = parse("<html><body>Login</body></html>");
        assert!(matches!(result, Err(NetworkError::InvalidResponse(_))));
    }

    #[test]
    fn test_empty_document_is_invalid() {
        assert!(matches!(parse(""), Err(NetworkError::InvalidResponse(_))));
    }

    #[test]
    fn test_missing_status_is_invalid() {
        let result = parse(r#"<subsonic-response version="1.13.0"/>"#);
        assert!(matches!(result, Err(NetworkError::InvalidResponse(_))));
    }
}

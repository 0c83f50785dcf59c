//! Wire format of the responder.
//!
//! There is no request parsing: whatever the client sends is only decoded
//! for display. The reply is always the same page, sent verbatim. Note that
//! it carries no HTTP status line, only a header and the body.

use bytes::Bytes;
use std::str::Utf8Error;

/// Maximum number of request bytes read from a single connection.
pub const MAX_REQUEST_SIZE: usize = 1024;

const PAGE: &[u8] = b"Content-Type: text/html

<!DOCTYPE HTML//EN\" \"http://www.w3.org/TR/REC-html40/strict.dtd\">
<html lang=\"en\" dir=\"ltr\" >
<head>
<title>GNU cgicc v3.2.19</title>
</head>
<body>
<h1>Hello, world from GNU cgicc</h1>
</body></html>
";

/// The fixed reply sent to every client.
pub fn response_payload() -> Bytes {
    Bytes::from_static(PAGE)
}

/// Decode a received request for display.
///
/// Invalid UTF-8 is reported to the caller rather than replaced.
pub fn decode_request(input: &[u8]) -> Result<&str, Utf8Error> {
    std::str::from_utf8(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_is_verbatim_page() {
        let expected = concat!(
            "Content-Type: text/html\n",
            "\n",
            "<!DOCTYPE HTML//EN\" \"http://www.w3.org/TR/REC-html40/strict.dtd\">\n",
            "<html lang=\"en\" dir=\"ltr\" >\n",
            "<head>\n",
            "<title>GNU cgicc v3.2.19</title>\n",
            "</head>\n",
            "<body>\n",
            "<h1>Hello, world from GNU cgicc</h1>\n",
            "</body></html>\n",
        );
        let payload = response_payload();
        assert_eq!(&payload[..], expected.as_bytes());
        assert_eq!(payload.len(), 226);

        let text = std::str::from_utf8(&payload).unwrap();

        assert!(text.starts_with("Content-Type: text/html\n\n<!DOCTYPE"));
        assert!(text.ends_with("</body></html>\n"));
        assert!(text.contains("<title>GNU cgicc v3.2.19</title>\n"));
        assert!(text.contains("<h1>Hello, world from GNU cgicc</h1>\n"));
        assert!(!text.contains("HTTP/1."));
        assert!(!text.contains('\r'));
        assert_eq!(text.lines().count(), 10);
    }

    #[test]
    fn test_payload_shares_static_storage() {
        let a = response_payload();
        let b = response_payload();
        assert_eq!(a.as_ptr(), b.as_ptr());
    }

    #[test]
    fn test_decode_request() {
        assert_eq!(
            decode_request(b"GET /hello HTTP/1.1\r\n\r\n").unwrap(),
            "GET /hello HTTP/1.1\r\n\r\n"
        );
        assert_eq!(decode_request(b"").unwrap(), "");
        assert!(decode_request(&[0x66, 0xff, 0xfe]).is_err());
    }
}

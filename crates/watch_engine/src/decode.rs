use chardetng::EncodingDetector;
use encoding_rs::Encoding;

use crate::{FailureKind, FetchError};

/// Decodes a page body to UTF-8.
///
/// Order: byte order mark, then the `charset` of the Content-Type header,
/// then `chardetng` guessing.
pub(crate) fn decode_page(bytes: &[u8], content_type: Option<&str>) -> Result<String, FetchError> {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return decode_with(bytes, encoding);
    }

    let declared = content_type
        .and_then(charset_param)
        .and_then(|label| Encoding::for_label(label.as_bytes()));
    if let Some(encoding) = declared {
        return decode_with(bytes, encoding);
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    decode_with(bytes, detector.guess(None, true))
}

fn charset_param(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches(['"', '\'']).to_string())
    })
}

fn decode_with(bytes: &[u8], encoding: &'static Encoding) -> Result<String, FetchError> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(FetchError::new(
            FailureKind::Decode,
            format!("page is not valid {}", encoding.name()),
        ));
    }
    Ok(text.into_owned())
}

#[cfg(test)]
mod tests {
    use super::{charset_param, decode_page};
    use crate::FailureKind;

    #[test]
    fn charset_is_read_from_content_type() {
        assert_eq!(
            charset_param("text/html; Charset=\"ISO-8859-1\"").as_deref(),
            Some("ISO-8859-1")
        );
        assert_eq!(charset_param("text/html"), None);
    }

    #[test]
    fn declared_latin1_is_decoded() {
        let html = decode_page(b"<p>caf\xe9</p>", Some("text/html; charset=iso-8859-1")).unwrap();
        assert_eq!(html, "<p>café</p>");
    }

    #[test]
    fn invalid_utf8_under_declared_utf8_is_an_error() {
        let err = decode_page(b"<p>\xff\xfe\xfd</p>", Some("text/html; charset=utf-8"))
            .unwrap_err();
        assert_eq!(err.kind, FailureKind::Decode);
    }
}

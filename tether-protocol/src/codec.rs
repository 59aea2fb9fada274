//! Message codec for wire framing
//!
//! Frames are newline-delimited JSON objects. JSON string escaping
//! guarantees a serialized message never contains a raw newline, so the
//! delimiter is unambiguous.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::messages::{Request, Response};

/// Maximum frame size (16 MB)
const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Protocol codec error
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },
}

/// Codec for Request (encoding) and Response (decoding)
/// Used by the client side
pub struct ClientCodec;

impl ClientCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ClientCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ClientCodec {
    type Item = Response;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        decode_frame(src)
    }
}

impl Encoder<Request> for ClientCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Request, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_frame(&item, dst)
    }
}

/// Codec for Response (encoding) and Request (decoding)
/// Used by the companion side (and by mock companions in tests)
pub struct CompanionCodec;

impl CompanionCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CompanionCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for CompanionCodec {
    type Item = Request;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        decode_frame(src)
    }
}

impl Encoder<Response> for CompanionCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Response, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_frame(&item, dst)
    }
}

/// Decode one newline-delimited JSON frame
fn decode_frame<T: serde::de::DeserializeOwned>(
    src: &mut BytesMut,
) -> Result<Option<T>, CodecError> {
    let Some(newline) = src.iter().position(|&b| b == b'\n') else {
        // No complete frame yet; bound how much we are willing to buffer
        if src.len() > MAX_FRAME_SIZE {
            return Err(CodecError::FrameTooLarge {
                size: src.len(),
                max: MAX_FRAME_SIZE,
            });
        }
        return Ok(None);
    };

    if newline > MAX_FRAME_SIZE {
        return Err(CodecError::FrameTooLarge {
            size: newline,
            max: MAX_FRAME_SIZE,
        });
    }

    let frame = src.split_to(newline);
    src.advance(1); // consume the delimiter

    // Tolerate CRLF from companions on other platforms
    let frame = match frame.last() {
        Some(b'\r') => &frame[..frame.len() - 1],
        _ => &frame[..],
    };

    let msg: T = serde_json::from_slice(frame)?;
    Ok(Some(msg))
}

/// Encode one newline-delimited JSON frame
fn encode_frame<T: serde::Serialize>(item: &T, dst: &mut BytesMut) -> Result<(), CodecError> {
    let data = serde_json::to_vec(item)?;

    if data.len() > MAX_FRAME_SIZE {
        return Err(CodecError::FrameTooLarge {
            size: data.len(),
            max: MAX_FRAME_SIZE,
        });
    }

    dst.reserve(data.len() + 1);
    dst.put_slice(&data);
    dst.put_u8(b'\n');
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{methods, ErrorCode};
    use uuid::Uuid;

    // ==================== Roundtrip Tests ====================

    #[test]
    fn test_request_roundtrip_through_codecs() {
        let req = Request::new(
            methods::OPEN_DIFF,
            serde_json::json!({"filePath": "a.txt", "proposedContent": "abc"}),
        );

        let mut buf = BytesMut::new();
        ClientCodec::new().encode(req.clone(), &mut buf).unwrap();

        let decoded = CompanionCodec::new().decode(&mut buf).unwrap().unwrap();
        assert_eq!(req, decoded);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_response_roundtrip_through_codecs() {
        let resp = Response::success(Uuid::new_v4(), serde_json::json!({"message": "ok"}));

        let mut buf = BytesMut::new();
        CompanionCodec::new().encode(resp.clone(), &mut buf).unwrap();

        let decoded = ClientCodec::new().decode(&mut buf).unwrap().unwrap();
        assert_eq!(resp, decoded);
    }

    #[test]
    fn test_error_response_roundtrip() {
        let resp = Response::failure(Uuid::new_v4(), ErrorCode::DiffFailed, "no such file");

        let mut buf = BytesMut::new();
        CompanionCodec::new().encode(resp.clone(), &mut buf).unwrap();

        let decoded = ClientCodec::new().decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded.error.unwrap().message, "no such file");
    }

    // ==================== Framing Tests ====================

    #[test]
    fn test_decode_partial_frame_returns_none() {
        let mut buf = BytesMut::from(&br#"{"id":"00000000-0000-0000-"#[..]);
        let result: Option<Response> = decode_frame(&mut buf).unwrap();
        assert!(result.is_none());
        // Buffer is left untouched for the next read
        assert!(!buf.is_empty());
    }

    #[test]
    fn test_decode_two_frames_in_one_buffer() {
        let a = Response::success(Uuid::new_v4(), serde_json::json!({}));
        let b = Response::success(Uuid::new_v4(), serde_json::json!({}));

        let mut buf = BytesMut::new();
        let mut codec = CompanionCodec::new();
        codec.encode(a.clone(), &mut buf).unwrap();
        codec.encode(b.clone(), &mut buf).unwrap();

        let mut client = ClientCodec::new();
        assert_eq!(client.decode(&mut buf).unwrap().unwrap(), a);
        assert_eq!(client.decode(&mut buf).unwrap().unwrap(), b);
        assert!(client.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_decode_tolerates_crlf() {
        let id = Uuid::new_v4();
        let line = format!("{{\"id\":\"{id}\",\"result\":{{}}}}\r\n");
        let mut buf = BytesMut::from(line.as_bytes());

        let decoded = ClientCodec::new().decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded.id, id);
    }

    #[test]
    fn test_decode_invalid_json_is_error() {
        let mut buf = BytesMut::from(&b"not json at all\n"[..]);
        let result = ClientCodec::new().decode(&mut buf);
        assert!(matches!(result, Err(CodecError::Json(_))));
    }

    #[test]
    fn test_decode_unterminated_oversized_buffer_is_error() {
        let mut buf = BytesMut::new();
        buf.resize(MAX_FRAME_SIZE + 1, b'x');
        let result: Result<Option<Response>, _> = decode_frame(&mut buf);
        assert!(matches!(result, Err(CodecError::FrameTooLarge { .. })));
    }

    #[test]
    fn test_encode_appends_newline() {
        let mut buf = BytesMut::new();
        ClientCodec::new()
            .encode(Request::new(methods::INITIALIZE, serde_json::json!({})), &mut buf)
            .unwrap();
        assert_eq!(buf.last(), Some(&b'\n'));
    }

    #[test]
    fn test_encode_escapes_embedded_newlines() {
        // Proposed file content routinely contains newlines; they must be
        // escaped inside the frame, leaving exactly one delimiter.
        let req = Request::new(
            methods::OPEN_DIFF,
            serde_json::json!({"proposedContent": "line one\nline two\n"}),
        );

        let mut buf = BytesMut::new();
        ClientCodec::new().encode(req.clone(), &mut buf).unwrap();
        assert_eq!(buf.iter().filter(|&&b| b == b'\n').count(), 1);

        let decoded = CompanionCodec::new().decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, req);
    }
}

use axum::body::Bytes;
use axum::http::header;
use axum::response::{IntoResponse, Response};

/// Pre-serialized JSON body, written as-is with an `application/json` content type.
#[derive(Debug, Clone)]
pub struct JsonBytes(pub Bytes);

impl IntoResponse for JsonBytes {
    fn into_response(self) -> Response {
        ([(header::CONTENT_TYPE, "application/json")], self.0).into_response()
    }
}

impl From<Vec<u8>> for JsonBytes {
    fn from(bytes: Vec<u8>) -> Self {
        JsonBytes(Bytes::from(bytes))
    }
}

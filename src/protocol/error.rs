/// Errors raised while encoding or decoding frames and payloads.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The line does not split into status, verb and payload, or one of
    /// the numeric header fields does not parse.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// Wrong number of fields, or a field that does not parse.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("payload too long: {0} bytes")]
    PayloadTooLong(usize),

    /// A field contains a frame or payload delimiter.
    #[error("invalid field: {0:?}")]
    InvalidField(String),

    /// The status code names no message this side understands.
    #[error("unhandled status code {0}")]
    Unhandled(i16),
}

//! Response bodies.

use axum::body::Bytes;

/// A response body: fully buffered, or a lazy sequence of chunks.
pub enum Body {
    Full(Bytes),
    Stream(Box<dyn Iterator<Item = Bytes> + Send>),
}

impl Body {
    pub fn empty() -> Self {
        Body::Full(Bytes::new())
    }

    /// A lazily produced body. Chunks are pulled only when the body is emitted.
    pub fn stream<I>(chunks: I) -> Self
    where
        I: IntoIterator<Item = Bytes>,
        I::IntoIter: Send + 'static,
    {
        Body::Stream(Box::new(chunks.into_iter()))
    }

    /// Byte length, when known without consuming the body.
    pub fn len_hint(&self) -> Option<usize> {
        match self {
            Body::Full(bytes) => Some(bytes.len()),
            Body::Stream(_) => None,
        }
    }

    /// Drain the body into a single buffer.
    pub fn collect(self) -> Bytes {
        match self {
            Body::Full(bytes) => bytes,
            Body::Stream(chunks) => chunks
                .fold(Vec::new(), |mut buf, chunk| {
                    buf.extend_from_slice(&chunk);
                    buf
                })
                .into(),
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Body::empty()
    }
}

impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Body::Full(bytes) => f.debug_tuple("Full").field(bytes).finish(),
            Body::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Body::Full(bytes)
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Full(Bytes::from(text))
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Body::Full(Bytes::from_static(text.as_bytes()))
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::Full(Bytes::from(bytes))
    }
}

use serde::{Deserialize, Serialize};

/// How a scripted exchange turns out.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PresetOutcome {
    /// The backend confirms the exchange and streams the chunks.
    #[serde(rename = "stream")]
    Stream {
        /// Raw chunks, delivered one per read.
        chunks: Vec<Vec<u8>>,
        /// If set, the read after this many chunks fails.
        fail_after: Option<usize>,
    },
    /// The backend answers with a non-2xx status.
    #[serde(rename = "reject")]
    Reject {
        /// The status code.
        status: u16,
        /// The response text, possibly empty.
        body: String,
    },
    /// The backend answers 2xx without a body.
    #[serde(rename = "missing_body")]
    MissingBody,
}

/// The preset reply for one request.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresetReply {
    /// The outcome of this exchange.
    pub outcome: PresetOutcome,
}

impl PresetReply {
    /// Creates a reply that streams the given text chunks.
    #[inline]
    pub fn with_text_chunks<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::with_byte_chunks(
            chunks.into_iter().map(|s| s.as_ref().as_bytes().to_vec()),
        )
    }

    /// Creates a reply that streams the given raw chunks.
    #[inline]
    pub fn with_byte_chunks<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Vec<u8>>,
    {
        Self {
            outcome: PresetOutcome::Stream {
                chunks: chunks.into_iter().map(Into::into).collect(),
                fail_after: None,
            },
        }
    }

    /// Creates a reply that is rejected with a status and a body text.
    #[inline]
    pub fn rejected<S: Into<String>>(status: u16, body: S) -> Self {
        Self {
            outcome: PresetOutcome::Reject {
                status,
                body: body.into(),
            },
        }
    }

    /// Creates a reply without a body.
    #[inline]
    pub fn missing_body() -> Self {
        Self {
            outcome: PresetOutcome::MissingBody,
        }
    }

    /// Makes the read after `count` delivered chunks fail. Has no
    /// effect on replies that don't stream.
    #[inline]
    pub fn with_failure_after(mut self, count: usize) -> Self {
        if let PresetOutcome::Stream { fail_after, .. } = &mut self.outcome {
            *fail_after = Some(count);
        }
        self
    }
}

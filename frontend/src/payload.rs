//! Incremental decoding and classification of a `/query` response body.
//!
//! A response is either plain text or a single embedded PNG of the exact form
//! `<img src="data:image/png;base64,...">`. The classification is a literal
//! prefix match on the left-trimmed accumulated text; anything else is text,
//! including other HTML.

use crate::errors::ClientError;

/// The one markup shape rendered as HTML.
pub const IMAGE_PAYLOAD_PREFIX: &str = "<img src=\"data:image/png;base64,";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PayloadKind {
    Text,
    Image,
}

impl PayloadKind {
    pub fn classify(accumulated: &str) -> Self {
        if accumulated.trim_start().starts_with(IMAGE_PAYLOAD_PREFIX) {
            PayloadKind::Image
        } else {
            PayloadKind::Text
        }
    }
}

/// What the view should show after a chunk has been absorbed.
#[derive(Debug, PartialEq, Eq)]
pub enum StreamUpdate<'a> {
    Text(&'a str),
    Image(&'a str),
}

/// A fully received response.
#[derive(Debug, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Image(String),
}

/// Accumulates body chunks for a single interaction.
#[derive(Debug, Default)]
pub struct ResponseStream {
    text: String,
    pending: Vec<u8>,
    is_image: bool,
}

impl ResponseStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes `chunk` and appends it. A multi-byte sequence cut at the end of
    /// the chunk is held back until the next one completes it.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Result<StreamUpdate<'_>, ClientError> {
        self.pending.extend_from_slice(chunk);

        match std::str::from_utf8(&self.pending) {
            Ok(decoded) => {
                self.text.push_str(decoded);
                self.pending.clear();
            }
            Err(err) if err.error_len().is_some() => {
                return Err(ClientError::Decode(format!(
                    "invalid UTF-8 sequence after {} bytes",
                    self.text.len() + err.valid_up_to()
                )));
            }
            Err(err) => {
                let complete = err.valid_up_to();
                let decoded = std::str::from_utf8(&self.pending[..complete])
                    .map_err(|e| ClientError::Decode(e.to_string()))?;
                self.text.push_str(decoded);
                self.pending.drain(..complete);
            }
        }

        // Once an image, always an image.
        if !self.is_image {
            self.is_image = PayloadKind::classify(&self.text) == PayloadKind::Image;
        }

        Ok(if self.is_image {
            StreamUpdate::Image(&self.text)
        } else {
            StreamUpdate::Text(&self.text)
        })
    }

    /// Closes the stream, rejecting a truncated character or an image tag
    /// that never closed.
    pub fn finish(self) -> Result<Payload, ClientError> {
        if !self.pending.is_empty() {
            return Err(ClientError::Decode(format!(
                "stream ended inside a {}-byte partial character",
                self.pending.len()
            )));
        }
        if self.is_image {
            if !self.text.trim_end().ends_with('>') {
                return Err(ClientError::MalformedImage);
            }
            return Ok(Payload::Image(self.text));
        }
        Ok(Payload::Text(self.text))
    }
}

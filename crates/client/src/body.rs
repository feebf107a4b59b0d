//! Text encoding of binary payloads carried in an [`Artifact`].

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reflux_core::{Artifact, Error};

/// Base64-encode a binary payload for storage as an artifact body.
pub fn encode_binary(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Bytes to transmit for `artifact`: decoded when flagged as base64,
/// otherwise the body text verbatim.
pub fn artifact_bytes(artifact: &Artifact) -> Result<Vec<u8>, Error> {
    if artifact.is_base64() {
        STANDARD
            .decode(artifact.body.as_bytes())
            .map_err(|e| Error::HttpError(format!("corrupt base64 body: {e}")))
    } else {
        Ok(artifact.body.clone().into_bytes())
    }
}

//! The insecure `none` algorithm.

use std::borrow::Cow;

use crate::{Algorithm, AlgorithmSignature};

/// Empty signature produced by [`NoneAlg`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoSignature;

impl AlgorithmSignature for NoSignature {
    fn try_from_slice(slice: &[u8]) -> anyhow::Result<Self> {
        anyhow::ensure!(
            slice.is_empty(),
            "unsecured tokens must have an empty signature"
        );
        Ok(NoSignature)
    }

    fn as_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(&[])
    }
}

/// Unsecured JWS (`alg: none`) as per [RFC 7518]. The signature is always empty,
/// so tokens offer no integrity protection whatsoever.
///
/// A token with a non-empty signature segment never verifies with this algorithm.
///
/// [RFC 7518]: https://www.rfc-editor.org/rfc/rfc7518.html#section-3.6
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NoneAlg;

impl Algorithm for NoneAlg {
    type SigningKey = ();
    type VerifyingKey = ();
    type Signature = NoSignature;

    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("none")
    }

    fn sign(&self, _signing_key: &(), _message: &[u8]) -> anyhow::Result<NoSignature> {
        Ok(NoSignature)
    }

    fn verify_signature(
        &self,
        _signature: &NoSignature,
        _verifying_key: &(),
        _message: &[u8],
    ) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::{traits::AlgorithmExt, ValidationError};

    #[test]
    fn none_signature_must_be_empty() {
        assert!(NoneAlg.sign_bytes(&(), b"message").unwrap().is_empty());
        NoneAlg.verify_bytes(&(), b"message", &[]).unwrap();

        let err = NoneAlg.verify_bytes(&(), b"message", b"sig").unwrap_err();
        assert_matches!(err, ValidationError::MalformedSignature(_));
    }
}

// Copyright (C) 2020-2026  The Blockhouse Technology Limited (TBTL).
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// This program is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public
// License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

/// Top-level error type for the JOSE crate.
#[derive(strum_macros::Display, Debug, PartialEq)]
pub enum Error {
    /// Structural or semantic rule violation, raised eagerly at builder or
    /// construction time.
    #[strum(to_string = "Validation error: {0}")]
    Validation(ValidationError),

    /// An algorithm or critical header parameter this implementation does not
    /// understand.  Always fails closed.
    #[strum(to_string = "Unsupported: {0}")]
    Unsupported(UnsupportedError),

    /// Failure of an underlying cipher, signature or MAC operation.
    #[strum(to_string = "Cryptographic failure: {0}")]
    Crypto(CryptoError),

    /// No recipient of a JWE could be decrypted, or its integrity check
    /// failed.  The whole message is invalid.
    #[strum(to_string = "Decryption failure: {0}")]
    Decryption(DecryptionError),

    /// Malformed wire input, e.g. bad base64, bad JSON or a wrong number of
    /// compact segments.
    #[strum(to_string = "Format error: {0}")]
    Format(FormatError),
}

impl bherror::BhError for Error {}

/// Structural or semantic rule violations.
///
/// These are raised as early as possible — at field-set time in builders and
/// at parse time for wire input — so that malformed input never reaches the
/// cipher primitives.
#[derive(strum_macros::Display, Debug, PartialEq, Clone)]
pub enum ValidationError {
    /// A set-once builder field was re-assigned a different value.
    #[strum(to_string = "Field \"{0}\" is already set to a different value")]
    FieldAlreadySet(&'static str),

    /// A required field is missing at `build()` time.
    #[strum(to_string = "Missing required field \"{0}\"")]
    MissingField(&'static str),

    /// The `kid` of an attached key does not match the header `kid`.
    #[strum(to_string = "Key id mismatch: header has \"{0}\", key has \"{1}\"")]
    KeyIdMismatch(String, String),

    /// A supplied certificate thumbprint does not match the digest of the
    /// leaf certificate.
    #[strum(to_string = "Certificate {0} thumbprint mismatch")]
    ThumbprintMismatch(&'static str),

    /// The leaf certificate's public key differs from the key's public
    /// material.
    #[strum(to_string = "Certificate chain leaf does not match the public key")]
    CertificateKeyMismatch,

    /// The two halves of a key pair do not share parameters (EC curve and
    /// point, or RSA modulus).
    #[strum(to_string = "Key pair mismatch: {0}")]
    KeyPairMismatch(&'static str),

    /// The declared algorithm does not fit the key's type or use.
    #[strum(to_string = "Algorithm \"{0}\" is incompatible with the key")]
    AlgorithmKeyMismatch(String),

    /// A header parameter appears in more than one of the protected, shared
    /// and per-recipient sources.
    #[strum(to_string = "Duplicate header parameter \"{0}\"")]
    DuplicateHeaderParameter(String),

    /// An encryption-only header field was set for a signing algorithm.
    #[strum(to_string = "Parameter \"{0}\" requires an encryption algorithm")]
    EncryptionParameterOnSignature(&'static str),

    /// A JWE recipient disagrees with the first recipient on a field all
    /// recipients must share.
    #[strum(to_string = "Recipient disagrees on \"{0}\"")]
    InconsistentRecipient(&'static str),

    /// A key required for the operation is missing or of the wrong kind.
    #[strum(to_string = "Invalid key for operation: {0}")]
    InvalidKey(String),

    /// A key with the requested `kid` was not found in the key set.
    #[strum(to_string = "Key \"{0}\" not found in key set")]
    KeyNotFound(String),

    /// Two keys in one key set share a `kid`.
    #[strum(to_string = "Duplicate key id \"{0}\" in key set")]
    DuplicateKeyId(String),
}

impl bherror::BhError for ValidationError {}

/// Unknown algorithm or critical-parameter names.
#[derive(strum_macros::Display, Debug, PartialEq, Clone)]
pub enum UnsupportedError {
    /// An `alg` or `enc` value this implementation does not implement.
    #[strum(to_string = "Unsupported algorithm \"{0}\"")]
    Algorithm(String),

    /// A `crit` entry naming a parameter this implementation does not
    /// understand.
    #[strum(to_string = "Unsupported critical header parameter \"{0}\"")]
    CriticalParameter(String),
}

impl bherror::BhError for UnsupportedError {}

/// Failures of the cryptographic backend.
#[derive(strum_macros::Display, Debug, PartialEq, Clone)]
pub enum CryptoError {
    /// The cryptographic backend unexpectedly failed.
    #[strum(to_string = "Crypto backend failed")]
    CryptoBackend,

    /// Key or random-material generation failed.
    #[strum(to_string = "Key generation failed")]
    KeyGenerationFailed,

    /// A signature computation or verification failed in the backend.
    #[strum(to_string = "Signature operation failed")]
    SignatureFailed,
}

impl bherror::BhError for CryptoError {}

/// Failures while decrypting a JWE.
#[derive(strum_macros::Display, Debug, PartialEq, Clone)]
pub enum DecryptionError {
    /// No recipient's encrypted key could be recovered with the supplied
    /// key, or no recovered key produced a verifiable ciphertext.
    #[strum(to_string = "No recipient could be decrypted with the supplied key")]
    NoRecipient,

    /// The authentication tag did not verify.
    #[strum(to_string = "Integrity check failed")]
    IntegrityCheckFailed,
}

impl bherror::BhError for DecryptionError {}

/// Malformed wire input.
#[derive(strum_macros::Display, Debug, PartialEq, Clone)]
pub enum FormatError {
    /// Invalid base64url segment.
    #[strum(to_string = "Invalid base64url: {0}")]
    Base64(String),

    /// Invalid JSON, or JSON of an unexpected shape.
    #[strum(to_string = "Invalid JSON: {0}")]
    Json(String),

    /// A compact serialization with the wrong number of segments.
    #[strum(to_string = "Expected {0} compact segments, found {1}")]
    SegmentCount(usize, usize),

    /// A JWK object that cannot be interpreted as a key.
    #[strum(to_string = "JWK parsing failed: {0}")]
    JwkParsingFailed(String),

    /// A PEM stream with no recognizable blocks or a broken block.
    #[strum(to_string = "PEM parsing failed: {0}")]
    PemParsingFailed(String),

    /// An encrypted-key value whose length does not fit its key-management
    /// family.
    #[strum(to_string = "Invalid encrypted key length {0}")]
    EncryptedKeyLength(usize),

    /// A remote JWK Set document could not be fetched or parsed.
    #[strum(to_string = "Fetching remote key set from \"{0}\" failed")]
    KeySetFetch(String),

    /// A DEFLATE stream that could not be compressed or inflated.
    #[strum(to_string = "Compression failed: {0}")]
    Compression(String),
}

impl bherror::BhError for FormatError {}

impl From<ValidationError> for Error {
    fn from(error: ValidationError) -> Self {
        Self::Validation(error)
    }
}

impl From<UnsupportedError> for Error {
    fn from(error: UnsupportedError) -> Self {
        Self::Unsupported(error)
    }
}

impl From<CryptoError> for Error {
    fn from(error: CryptoError) -> Self {
        Self::Crypto(error)
    }
}

impl From<DecryptionError> for Error {
    fn from(error: DecryptionError) -> Self {
        Self::Decryption(error)
    }
}

impl From<FormatError> for Error {
    fn from(error: FormatError) -> Self {
        Self::Format(error)
    }
}

/// Result type used across the crate.
pub type Result<T, E = Error> = bherror::Result<T, E>;

/// Shorthand for raising a root [`Error`] out of one of the family enums.
pub(crate) fn root<E: Into<Error>>(error: E) -> bherror::Error<Error> {
    bherror::Error::root(error.into())
}

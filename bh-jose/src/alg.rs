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

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::UnsupportedError;

/// The elliptic curves supported by this crate, as named in [RFC 7518,
/// section 6.2.1.1][1].
///
/// [1]: https://datatracker.ietf.org/doc/html/rfc7518#section-6.2.1.1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EcCurve {
    /// NIST P-256 (secp256r1).
    #[serde(rename = "P-256")]
    P256,
    /// NIST P-384 (secp384r1).
    #[serde(rename = "P-384")]
    P384,
    /// NIST P-521 (secp521r1).
    #[serde(rename = "P-521")]
    P521,
}

impl EcCurve {
    /// The byte width of a single coordinate (and of an ECDSA `r`/`s` value)
    /// on this curve.
    pub fn coordinate_len(&self) -> usize {
        match self {
            Self::P256 => 32,
            Self::P384 => 48,
            Self::P521 => 66,
        }
    }

    /// The JOSE name of the curve.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::P256 => "P-256",
            Self::P384 => "P-384",
            Self::P521 => "P-521",
        }
    }
}

impl std::fmt::Display for EcCurve {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The kind of key material an algorithm operates on.
///
/// This is what ties an [`Algorithm`] to a
/// [`KeyType`](crate::jwk::KeyType): a key may only carry an `alg` whose
/// requirement matches its own type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// Raw symmetric bytes (JWK `"oct"`).
    Oct,
    /// An RSA key.
    Rsa,
    /// An RSA key restricted to RSASSA-PSS.
    RsaPss,
    /// An EC key on the given curve.
    Ec(EcCurve),
}

/// The intended use of a key, JWK `"use"` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyUse {
    /// Signing and verification (`"sig"`).
    #[serde(rename = "sig")]
    Sign,
    /// Encryption and decryption (`"enc"`).
    #[serde(rename = "enc")]
    Encrypt,
}

impl std::fmt::Display for KeyUse {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Sign => write!(f, "sig"),
            Self::Encrypt => write!(f, "enc"),
        }
    }
}

/// JWS signature algorithms, as specified in [RFC 7518, section 3.1][1].
///
/// [1]: https://datatracker.ietf.org/doc/html/rfc7518#section-3.1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    /// HMAC using SHA-256.
    #[serde(rename = "HS256")]
    Hs256,
    /// HMAC using SHA-384.
    #[serde(rename = "HS384")]
    Hs384,
    /// HMAC using SHA-512.
    #[serde(rename = "HS512")]
    Hs512,
    /// RSASSA-PKCS1-v1_5 using SHA-256.
    #[serde(rename = "RS256")]
    Rs256,
    /// RSASSA-PKCS1-v1_5 using SHA-384.
    #[serde(rename = "RS384")]
    Rs384,
    /// RSASSA-PKCS1-v1_5 using SHA-512.
    #[serde(rename = "RS512")]
    Rs512,
    /// RSASSA-PSS using SHA-256 and MGF1 with SHA-256.
    #[serde(rename = "PS256")]
    Ps256,
    /// RSASSA-PSS using SHA-384 and MGF1 with SHA-384.
    #[serde(rename = "PS384")]
    Ps384,
    /// RSASSA-PSS using SHA-512 and MGF1 with SHA-512.
    #[serde(rename = "PS512")]
    Ps512,
    /// ECDSA using P-256 and SHA-256.
    #[serde(rename = "ES256")]
    Es256,
    /// ECDSA using P-384 and SHA-384.
    #[serde(rename = "ES384")]
    Es384,
    /// ECDSA using P-521 and SHA-512.
    #[serde(rename = "ES512")]
    Es512,
}

impl SignatureAlgorithm {
    /// The JOSE `"alg"` name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hs256 => "HS256",
            Self::Hs384 => "HS384",
            Self::Hs512 => "HS512",
            Self::Rs256 => "RS256",
            Self::Rs384 => "RS384",
            Self::Rs512 => "RS512",
            Self::Ps256 => "PS256",
            Self::Ps384 => "PS384",
            Self::Ps512 => "PS512",
            Self::Es256 => "ES256",
            Self::Es384 => "ES384",
            Self::Es512 => "ES512",
        }
    }

    /// The kind of key this algorithm signs with.
    pub fn key_kind(&self) -> KeyKind {
        match self {
            Self::Hs256 | Self::Hs384 | Self::Hs512 => KeyKind::Oct,
            Self::Rs256 | Self::Rs384 | Self::Rs512 => KeyKind::Rsa,
            Self::Ps256 | Self::Ps384 | Self::Ps512 => KeyKind::RsaPss,
            Self::Es256 => KeyKind::Ec(EcCurve::P256),
            Self::Es384 => KeyKind::Ec(EcCurve::P384),
            Self::Es512 => KeyKind::Ec(EcCurve::P521),
        }
    }

    /// Whether this is one of the `HS*` MAC algorithms.
    pub fn is_hmac(&self) -> bool {
        matches!(self, Self::Hs256 | Self::Hs384 | Self::Hs512)
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = bherror::Error<UnsupportedError>;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(match value {
            "HS256" => Self::Hs256,
            "HS384" => Self::Hs384,
            "HS512" => Self::Hs512,
            "RS256" => Self::Rs256,
            "RS384" => Self::Rs384,
            "RS512" => Self::Rs512,
            "PS256" => Self::Ps256,
            "PS384" => Self::Ps384,
            "PS512" => Self::Ps512,
            "ES256" => Self::Es256,
            "ES384" => Self::Es384,
            "ES512" => Self::Es512,
            _ => {
                return Err(bherror::Error::root(UnsupportedError::Algorithm(
                    value.to_string(),
                )))
            }
        })
    }
}

impl std::fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// JWE key-management algorithms, as specified in [RFC 7518, section 4.1][1].
///
/// [1]: https://datatracker.ietf.org/doc/html/rfc7518#section-4.1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyManagementAlgorithm {
    /// Direct use of a shared symmetric key as the CEK.
    #[serde(rename = "dir")]
    Dir,
    /// RSAES-PKCS1-v1_5 key encryption.
    #[serde(rename = "RSA1_5")]
    Rsa1_5,
    /// RSAES-OAEP (SHA-1) key encryption.
    #[serde(rename = "RSA-OAEP")]
    RsaOaep,
    /// RSAES-OAEP using SHA-256 and MGF1 with SHA-256.
    #[serde(rename = "RSA-OAEP-256")]
    RsaOaep256,
    /// AES-128 Key Wrap.
    #[serde(rename = "A128KW")]
    A128Kw,
    /// AES-192 Key Wrap.
    #[serde(rename = "A192KW")]
    A192Kw,
    /// AES-256 Key Wrap.
    #[serde(rename = "A256KW")]
    A256Kw,
    /// Key wrapping with AES-128 GCM.
    #[serde(rename = "A128GCMKW")]
    A128GcmKw,
    /// Key wrapping with AES-192 GCM.
    #[serde(rename = "A192GCMKW")]
    A192GcmKw,
    /// Key wrapping with AES-256 GCM.
    #[serde(rename = "A256GCMKW")]
    A256GcmKw,
    /// ECDH-ES direct key agreement.
    #[serde(rename = "ECDH-ES")]
    EcdhEs,
    /// ECDH-ES key agreement wrapping the CEK with AES-128 Key Wrap.
    #[serde(rename = "ECDH-ES+A128KW")]
    EcdhEsA128Kw,
    /// ECDH-ES key agreement wrapping the CEK with AES-192 Key Wrap.
    #[serde(rename = "ECDH-ES+A192KW")]
    EcdhEsA192Kw,
    /// ECDH-ES key agreement wrapping the CEK with AES-256 Key Wrap.
    #[serde(rename = "ECDH-ES+A256KW")]
    EcdhEsA256Kw,
}

impl KeyManagementAlgorithm {
    /// The JOSE `"alg"` name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dir => "dir",
            Self::Rsa1_5 => "RSA1_5",
            Self::RsaOaep => "RSA-OAEP",
            Self::RsaOaep256 => "RSA-OAEP-256",
            Self::A128Kw => "A128KW",
            Self::A192Kw => "A192KW",
            Self::A256Kw => "A256KW",
            Self::A128GcmKw => "A128GCMKW",
            Self::A192GcmKw => "A192GCMKW",
            Self::A256GcmKw => "A256GCMKW",
            Self::EcdhEs => "ECDH-ES",
            Self::EcdhEsA128Kw => "ECDH-ES+A128KW",
            Self::EcdhEsA192Kw => "ECDH-ES+A192KW",
            Self::EcdhEsA256Kw => "ECDH-ES+A256KW",
        }
    }

    /// The kind of key-encryption key this algorithm needs.
    ///
    /// For the EC algorithms the curve is not fixed by the algorithm itself,
    /// so any supported curve is accepted; [`KeyKind::Ec`] is reported with
    /// the recipient key's own curve by the caller.
    pub fn key_kind(&self) -> Option<KeyKind> {
        match self {
            Self::Dir
            | Self::A128Kw
            | Self::A192Kw
            | Self::A256Kw
            | Self::A128GcmKw
            | Self::A192GcmKw
            | Self::A256GcmKw => Some(KeyKind::Oct),
            Self::Rsa1_5 | Self::RsaOaep | Self::RsaOaep256 => Some(KeyKind::Rsa),
            Self::EcdhEs | Self::EcdhEsA128Kw | Self::EcdhEsA192Kw | Self::EcdhEsA256Kw => None,
        }
    }

    /// Whether the CEK is established without a per-recipient encrypted key
    /// (`dir` and direct ECDH-ES agreement).
    pub fn is_direct(&self) -> bool {
        matches!(self, Self::Dir | Self::EcdhEs)
    }

    /// Whether this algorithm performs an ECDH agreement.
    pub fn is_ecdh(&self) -> bool {
        matches!(
            self,
            Self::EcdhEs | Self::EcdhEsA128Kw | Self::EcdhEsA192Kw | Self::EcdhEsA256Kw
        )
    }

    /// The AES key-wrapping key size in bytes, for the `*KW`, `*GCMKW` and
    /// `ECDH-ES+A*KW` families.
    pub fn wrap_key_len(&self) -> Option<usize> {
        match self {
            Self::A128Kw | Self::A128GcmKw | Self::EcdhEsA128Kw => Some(16),
            Self::A192Kw | Self::A192GcmKw | Self::EcdhEsA192Kw => Some(24),
            Self::A256Kw | Self::A256GcmKw | Self::EcdhEsA256Kw => Some(32),
            _ => None,
        }
    }
}

impl FromStr for KeyManagementAlgorithm {
    type Err = bherror::Error<UnsupportedError>;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(match value {
            "dir" => Self::Dir,
            "RSA1_5" => Self::Rsa1_5,
            "RSA-OAEP" => Self::RsaOaep,
            "RSA-OAEP-256" => Self::RsaOaep256,
            "A128KW" => Self::A128Kw,
            "A192KW" => Self::A192Kw,
            "A256KW" => Self::A256Kw,
            "A128GCMKW" => Self::A128GcmKw,
            "A192GCMKW" => Self::A192GcmKw,
            "A256GCMKW" => Self::A256GcmKw,
            "ECDH-ES" => Self::EcdhEs,
            "ECDH-ES+A128KW" => Self::EcdhEsA128Kw,
            "ECDH-ES+A192KW" => Self::EcdhEsA192Kw,
            "ECDH-ES+A256KW" => Self::EcdhEsA256Kw,
            _ => {
                return Err(bherror::Error::root(UnsupportedError::Algorithm(
                    value.to_string(),
                )))
            }
        })
    }
}

impl std::fmt::Display for KeyManagementAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// JWE content-encryption algorithms, as specified in [RFC 7518,
/// section 5.1][1].
///
/// [1]: https://datatracker.ietf.org/doc/html/rfc7518#section-5.1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentEncryptionAlgorithm {
    /// AES-128-CBC with a detached HMAC-SHA-256 tag.
    #[serde(rename = "A128CBC-HS256")]
    A128CbcHs256,
    /// AES-192-CBC with a detached HMAC-SHA-384 tag.
    #[serde(rename = "A192CBC-HS384")]
    A192CbcHs384,
    /// AES-256-CBC with a detached HMAC-SHA-512 tag.
    #[serde(rename = "A256CBC-HS512")]
    A256CbcHs512,
    /// AES-128 in Galois/Counter Mode.
    #[serde(rename = "A128GCM")]
    A128Gcm,
    /// AES-192 in Galois/Counter Mode.
    #[serde(rename = "A192GCM")]
    A192Gcm,
    /// AES-256 in Galois/Counter Mode.
    #[serde(rename = "A256GCM")]
    A256Gcm,
}

impl ContentEncryptionAlgorithm {
    /// The JOSE `"enc"` name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A128CbcHs256 => "A128CBC-HS256",
            Self::A192CbcHs384 => "A192CBC-HS384",
            Self::A256CbcHs512 => "A256CBC-HS512",
            Self::A128Gcm => "A128GCM",
            Self::A192Gcm => "A192GCM",
            Self::A256Gcm => "A256GCM",
        }
    }

    /// The CEK length in bytes.  For the CBC-HMAC composites this is the MAC
    /// and cipher halves combined.
    pub fn key_len(&self) -> usize {
        match self {
            Self::A128CbcHs256 => 32,
            Self::A192CbcHs384 => 48,
            Self::A256CbcHs512 => 64,
            Self::A128Gcm => 16,
            Self::A192Gcm => 24,
            Self::A256Gcm => 32,
        }
    }

    /// The IV length in bytes: 96 bits for GCM, one AES block for CBC.
    pub fn iv_len(&self) -> usize {
        if self.is_gcm() {
            12
        } else {
            16
        }
    }

    /// Whether this is one of the AES-GCM algorithms.
    pub fn is_gcm(&self) -> bool {
        matches!(self, Self::A128Gcm | Self::A192Gcm | Self::A256Gcm)
    }
}

impl FromStr for ContentEncryptionAlgorithm {
    type Err = bherror::Error<UnsupportedError>;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(match value {
            "A128CBC-HS256" => Self::A128CbcHs256,
            "A192CBC-HS384" => Self::A192CbcHs384,
            "A256CBC-HS512" => Self::A256CbcHs512,
            "A128GCM" => Self::A128Gcm,
            "A192GCM" => Self::A192Gcm,
            "A256GCM" => Self::A256Gcm,
            _ => {
                return Err(bherror::Error::root(UnsupportedError::Algorithm(
                    value.to_string(),
                )))
            }
        })
    }
}

impl std::fmt::Display for ContentEncryptionAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// JWE plaintext compression, the `"zip"` header parameter ([RFC 7516,
/// section 4.1.3][1]).
///
/// [1]: https://datatracker.ietf.org/doc/html/rfc7516#section-4.1.3
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionAlgorithm {
    /// Raw DEFLATE ([RFC 1951](https://datatracker.ietf.org/doc/html/rfc1951)).
    Deflate,
}

impl CompressionAlgorithm {
    /// The JOSE `"zip"` name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deflate => "DEF",
        }
    }
}

impl FromStr for CompressionAlgorithm {
    type Err = bherror::Error<UnsupportedError>;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "DEF" => Ok(Self::Deflate),
            _ => Err(bherror::Error::root(UnsupportedError::Algorithm(
                value.to_string(),
            ))),
        }
    }
}

impl std::fmt::Display for CompressionAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Any JOSE `"alg"` header value: either a signature algorithm or a JWE
/// key-management algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// A JWS signature algorithm.
    Signature(SignatureAlgorithm),
    /// A JWE key-management algorithm.
    KeyManagement(KeyManagementAlgorithm),
}

impl Algorithm {
    /// The JOSE `"alg"` name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Signature(alg) => alg.as_str(),
            Self::KeyManagement(alg) => alg.as_str(),
        }
    }

    /// The key use this algorithm implies.
    pub fn key_use(&self) -> KeyUse {
        match self {
            Self::Signature(_) => KeyUse::Sign,
            Self::KeyManagement(_) => KeyUse::Encrypt,
        }
    }

    /// The kind of key this algorithm requires, where fixed by the
    /// algorithm.
    pub fn key_kind(&self) -> Option<KeyKind> {
        match self {
            Self::Signature(alg) => Some(alg.key_kind()),
            Self::KeyManagement(alg) => alg.key_kind(),
        }
    }
}

impl FromStr for Algorithm {
    type Err = bherror::Error<UnsupportedError>;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if let Ok(alg) = SignatureAlgorithm::from_str(value) {
            return Ok(Self::Signature(alg));
        }
        KeyManagementAlgorithm::from_str(value).map(Self::KeyManagement)
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for Algorithm {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Algorithm {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::from_str(&value).map_err(serde::de::Error::custom)
    }
}

impl From<SignatureAlgorithm> for Algorithm {
    fn from(alg: SignatureAlgorithm) -> Self {
        Self::Signature(alg)
    }
}

impl From<KeyManagementAlgorithm> for Algorithm {
    fn from(alg: KeyManagementAlgorithm) -> Self {
        Self::KeyManagement(alg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algorithm_names_round_trip() {
        let names = [
            "HS256", "HS384", "HS512", "RS256", "RS384", "RS512", "PS256", "PS384", "PS512",
            "ES256", "ES384", "ES512", "dir", "RSA1_5", "RSA-OAEP", "RSA-OAEP-256", "A128KW",
            "A192KW", "A256KW", "A128GCMKW", "A192GCMKW", "A256GCMKW", "ECDH-ES",
            "ECDH-ES+A128KW", "ECDH-ES+A192KW", "ECDH-ES+A256KW",
        ];

        for name in names {
            let alg = Algorithm::from_str(name).unwrap();
            assert_eq!(alg.as_str(), name);

            let serialized = serde_json::to_string(&alg).unwrap();
            assert_eq!(serialized, format!("\"{name}\""));

            let deserialized: Algorithm = serde_json::from_str(&serialized).unwrap();
            assert_eq!(alg, deserialized);
        }
    }

    #[test]
    fn unknown_algorithm_fails_closed() {
        let error = Algorithm::from_str("none").unwrap_err();
        assert_eq!(error.error, UnsupportedError::Algorithm("none".to_string()));
    }

    #[test]
    fn content_encryption_parameters() {
        let cases = [
            ("A128CBC-HS256", 32, 16, false),
            ("A192CBC-HS384", 48, 16, false),
            ("A256CBC-HS512", 64, 16, false),
            ("A128GCM", 16, 12, true),
            ("A192GCM", 24, 12, true),
            ("A256GCM", 32, 12, true),
        ];

        for (name, key_len, iv_len, gcm) in cases {
            let enc = ContentEncryptionAlgorithm::from_str(name).unwrap();
            assert_eq!(enc.key_len(), key_len, "{name}");
            assert_eq!(enc.iv_len(), iv_len, "{name}");
            assert_eq!(enc.is_gcm(), gcm, "{name}");
        }
    }

    #[test]
    fn key_management_wrap_lengths() {
        use KeyManagementAlgorithm::*;

        assert_eq!(A128Kw.wrap_key_len(), Some(16));
        assert_eq!(A192GcmKw.wrap_key_len(), Some(24));
        assert_eq!(EcdhEsA256Kw.wrap_key_len(), Some(32));
        assert_eq!(Dir.wrap_key_len(), None);
        assert_eq!(Rsa1_5.wrap_key_len(), None);

        assert!(Dir.is_direct());
        assert!(EcdhEs.is_direct());
        assert!(!EcdhEsA128Kw.is_direct());
    }

    #[test]
    fn algorithm_use_classification() {
        assert_eq!(
            Algorithm::from(SignatureAlgorithm::Es256).key_use(),
            KeyUse::Sign
        );
        assert_eq!(
            Algorithm::from(KeyManagementAlgorithm::Dir).key_use(),
            KeyUse::Encrypt
        );
    }
}

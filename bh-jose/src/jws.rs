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

//! JSON Web Signature, as specified in [RFC 7515][1].
//!
//! [1]: https://datatracker.ietf.org/doc/html/rfc7515

use bherror::traits::ForeignError as _;
use openssl::{
    bn::BigNum,
    ecdsa::EcdsaSig,
    hash::MessageDigest,
    memcmp,
    pkey::{PKey, Private, Public},
    sign::{RsaPssSaltlen, Signer as OpensslSigner, Verifier as OpensslVerifier},
};
use serde_json::{Map, Value};

use crate::{
    alg::{KeyKind, SignatureAlgorithm},
    error::{CryptoError, Error, FormatError, Result, ValidationError},
    header::JoseHeader,
    jwk::WebKey,
    utils,
};

/// One signature over a [`Jws`] payload.
///
/// The protected segment is kept in its signed base64url form, so verifying
/// never depends on re-serializing JSON byte-identically.
#[derive(Debug, Clone)]
pub struct JwsSignature {
    pub(crate) protected: Option<String>,
    pub(crate) unprotected: Option<Map<String, Value>>,
    pub(crate) header: JoseHeader,
    pub(crate) signature: Vec<u8>,
}

impl JwsSignature {
    /// The merged view of the protected and unprotected header.
    pub fn header(&self) -> &JoseHeader {
        &self.header
    }

    /// The raw signature bytes.
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// The signing input of this signature over the given payload.
    fn signing_input(&self, payload: &[u8]) -> String {
        signing_input(self.protected.as_deref().unwrap_or(""), payload)
    }
}

fn signing_input(protected: &str, payload: &[u8]) -> String {
    format!("{protected}.{}", utils::base64_url_encode(payload))
}

/// A signed payload with one or more signatures, as specified in
/// [RFC 7515][1].
///
/// Produced either by [`Jws::builder`] or by parsing one of the wire forms
/// ([`from_compact`][Self::from_compact] / [`from_json`][Self::from_json]);
/// immutable afterwards.
///
/// [1]: https://datatracker.ietf.org/doc/html/rfc7515
#[derive(Debug, Clone)]
pub struct Jws {
    payload: Vec<u8>,
    signatures: Vec<JwsSignature>,
}

impl Jws {
    /// Start building a new signed payload.
    pub fn builder() -> JwsBuilder {
        JwsBuilder::new()
    }

    /// The signed payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// All signatures over the payload.
    pub fn signatures(&self) -> &[JwsSignature] {
        &self.signatures
    }

    /// Verifies the payload against the given key.
    ///
    /// Succeeds when at least one signature whose header is compatible with
    /// `key` verifies; each candidate's critical parameters must all be in
    /// `understood_critical`.  All other outcomes are errors, per the
    /// fail-closed policy of [RFC 7515, section 5.2][1].
    ///
    /// [1]: https://datatracker.ietf.org/doc/html/rfc7515#section-5.2
    pub fn verify(&self, key: &WebKey, understood_critical: &[&str]) -> Result<()> {
        let mut last_error = None;

        for signature in &self.signatures {
            match self.verify_signature(signature, key, understood_critical) {
                Ok(()) => return Ok(()),
                Err(error) => last_error = Some(error),
            }
        }

        Err(last_error
            .unwrap_or_else(|| crate::error::root(CryptoError::SignatureFailed)))
    }

    /// Verifies the payload using the keys the signature headers themselves
    /// reference (embedded `jwk` or `x5c` leaf).
    ///
    /// Succeeds when at least one signature resolves a key and verifies with
    /// it.
    pub fn verify_resolved(&self, understood_critical: &[&str]) -> Result<()> {
        let mut last_error = None;

        for signature in &self.signatures {
            let key = match signature.header.resolve_key() {
                Ok(Some(key)) => key,
                Ok(None) => continue,
                Err(error) => {
                    last_error = Some(error);
                    continue;
                }
            };
            match self.verify_signature(signature, &key, understood_critical) {
                Ok(()) => return Ok(()),
                Err(error) => last_error = Some(error),
            }
        }

        Err(last_error
            .unwrap_or_else(|| crate::error::root(CryptoError::SignatureFailed)))
    }

    fn verify_signature(
        &self,
        signature: &JwsSignature,
        key: &WebKey,
        understood_critical: &[&str],
    ) -> Result<()> {
        signature.header.check_critical(understood_critical)?;

        let algorithm = match signature.header.require_algorithm()? {
            crate::alg::Algorithm::Signature(algorithm) => algorithm,
            other => {
                return Err(crate::error::root(ValidationError::AlgorithmKeyMismatch(
                    other.to_string(),
                )))
            }
        };

        let input = signature.signing_input(&self.payload);
        if !verify_bytes(algorithm, key, input.as_bytes(), &signature.signature)? {
            return Err(crate::error::root(CryptoError::SignatureFailed));
        }
        Ok(())
    }

    /// The compact serialization ([RFC 7515, section 7.1][1]).
    ///
    /// Legal only with exactly one signature, whose header must be entirely
    /// protected.
    ///
    /// [1]: https://datatracker.ietf.org/doc/html/rfc7515#section-7.1
    pub fn to_compact(&self) -> Result<String> {
        let [signature] = self.signatures.as_slice() else {
            return Err(crate::error::root(ValidationError::InvalidKey(
                "compact serialization requires exactly one signature".to_string(),
            )));
        };
        if signature.unprotected.is_some() {
            return Err(crate::error::root(ValidationError::InvalidKey(
                "compact serialization cannot carry an unprotected header".to_string(),
            )));
        }

        Ok(format!(
            "{}.{}",
            signature.signing_input(&self.payload),
            utils::base64_url_encode(&signature.signature)
        ))
    }

    /// Parses the compact serialization.
    pub fn from_compact(input: &str) -> Result<Jws> {
        let segments = utils::split_compact(input, 3)?;

        let protected = segments[0].to_string();
        let payload = utils::base64_url_decode(segments[1])?;
        let signature = utils::base64_url_decode(segments[2])?;

        let header = parse_protected(&protected)?;
        let header = merge_signature_header(Some(&header), None)?;

        Ok(Jws {
            payload,
            signatures: vec![JwsSignature {
                protected: Some(protected),
                unprotected: None,
                header,
                signature,
            }],
        })
    }

    /// The general JSON serialization ([RFC 7515, section 7.2.1][1]).
    ///
    /// [1]: https://datatracker.ietf.org/doc/html/rfc7515#section-7.2.1
    pub fn to_json(&self) -> Result<Value> {
        let signatures = self
            .signatures
            .iter()
            .map(|signature| self.signature_json(signature))
            .collect::<Result<Vec<_>>>()?;

        Ok(Value::Object(crate::json_object!({
            "payload": utils::base64_url_encode(&self.payload),
            "signatures": signatures,
        })))
    }

    /// The flattened JSON serialization ([RFC 7515, section 7.2.2][1]);
    /// requires exactly one signature.
    ///
    /// [1]: https://datatracker.ietf.org/doc/html/rfc7515#section-7.2.2
    pub fn to_flattened_json(&self) -> Result<Value> {
        let [signature] = self.signatures.as_slice() else {
            return Err(crate::error::root(ValidationError::InvalidKey(
                "flattened serialization requires exactly one signature".to_string(),
            )));
        };

        let mut object = crate::json_object!({
            "payload": utils::base64_url_encode(&self.payload),
        });
        let Value::Object(entry) = self.signature_json(signature)? else {
            unreachable!("signature_json always returns an object");
        };
        object.extend(entry);

        Ok(Value::Object(object))
    }

    fn signature_json(&self, signature: &JwsSignature) -> Result<Value> {
        let mut entry = Map::new();
        if let Some(protected) = &signature.protected {
            entry.insert("protected".to_string(), protected.clone().into());
        }
        if let Some(unprotected) = &signature.unprotected {
            entry.insert("header".to_string(), Value::Object(unprotected.clone()));
        }
        entry.insert(
            "signature".to_string(),
            utils::base64_url_encode(&signature.signature).into(),
        );
        Ok(Value::Object(entry))
    }

    /// Parses the general or flattened JSON serialization.
    pub fn from_json(input: &Value) -> Result<Jws> {
        let object = input
            .as_object()
            .ok_or_else(|| json_error("JWS is not an object"))?;

        let payload = object
            .get("payload")
            .and_then(Value::as_str)
            .ok_or_else(|| json_error("missing \"payload\""))?;
        let payload = utils::base64_url_decode(payload)?;

        let signatures = match object.get("signatures") {
            Some(entries) => entries
                .as_array()
                .ok_or_else(|| json_error("\"signatures\" is not an array"))?
                .iter()
                .map(|entry| {
                    parse_signature_entry(
                        entry
                            .as_object()
                            .ok_or_else(|| json_error("signature entry is not an object"))?,
                    )
                })
                .collect::<Result<Vec<_>>>()?,
            // flattened form carries the single signature at top level
            None => vec![parse_signature_entry(object)?],
        };

        if signatures.is_empty() {
            return Err(json_error("JWS carries no signatures"));
        }

        Ok(Jws {
            payload,
            signatures,
        })
    }
}

fn json_error(message: &str) -> bherror::Error<Error> {
    crate::error::root(FormatError::Json(message.to_string()))
}

fn parse_protected(protected: &str) -> Result<Map<String, Value>> {
    let bytes = utils::base64_url_decode(protected)?;
    serde_json::from_slice(&bytes)
        .foreign_err(|| Error::Format(FormatError::Json("invalid protected header".to_string())))
}

/// Merges a signature's protected and unprotected header objects.
///
/// Registered parameter names must not repeat across the two.  An extended
/// parameter may appear in both only with the identical value; a protected
/// copy that disagrees with the unprotected one is treated as tampering.
fn merge_signature_header(
    protected: Option<&Map<String, Value>>,
    unprotected: Option<&Map<String, Value>>,
) -> Result<JoseHeader> {
    let mut merged = protected.cloned().unwrap_or_default();

    for (name, value) in unprotected.into_iter().flatten() {
        match merged.get(name) {
            None => {
                merged.insert(name.clone(), value.clone());
            }
            Some(existing) if existing == value && !is_registered(name) => {}
            Some(_) => {
                return Err(crate::error::root(
                    ValidationError::DuplicateHeaderParameter(name.clone()),
                ))
            }
        }
    }

    JoseHeader::from_json_object(&merged)
}

fn is_registered(name: &str) -> bool {
    matches!(
        name,
        "alg" | "enc"
            | "zip"
            | "jku"
            | "jwk"
            | "kid"
            | "x5u"
            | "x5c"
            | "x5t"
            | "x5t#S256"
            | "typ"
            | "cty"
            | "crit"
    )
}

fn parse_signature_entry(entry: &Map<String, Value>) -> Result<JwsSignature> {
    let protected = entry
        .get("protected")
        .map(|value| {
            value
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| json_error("\"protected\" is not a string"))
        })
        .transpose()?;
    let protected_object = protected.as_deref().map(parse_protected).transpose()?;

    let unprotected = entry
        .get("header")
        .map(|value| {
            value
                .as_object()
                .cloned()
                .ok_or_else(|| json_error("\"header\" is not an object"))
        })
        .transpose()?;

    let signature = entry
        .get("signature")
        .and_then(Value::as_str)
        .ok_or_else(|| json_error("missing \"signature\""))?;
    let signature = utils::base64_url_decode(signature)?;

    let header = merge_signature_header(protected_object.as_ref(), unprotected.as_ref())?;

    Ok(JwsSignature {
        protected,
        unprotected,
        header,
        signature,
    })
}

/// One pending signature of a [`JwsBuilder`].
struct PendingSignature {
    algorithm: SignatureAlgorithm,
    key: WebKey,
    header: JoseHeader,
}

/// Builder for a [`Jws`].
///
/// Accumulates a payload and one or more (algorithm, key, header) pending
/// signatures; [`sign`][Self::sign] computes all of them.  Headers of
/// produced messages are entirely protected.
#[derive(Default)]
pub struct JwsBuilder {
    payload: Option<Vec<u8>>,
    pending: Vec<PendingSignature>,
}

impl JwsBuilder {
    fn new() -> Self {
        Self::default()
    }

    /// Sets the payload to sign.
    pub fn payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Adds a pending signature with a default header (`alg` plus the key's
    /// `kid`).
    pub fn add_signature(self, algorithm: SignatureAlgorithm, key: &WebKey) -> Result<Self> {
        let mut header = JoseHeader::builder().algorithm(algorithm)?;
        if let Some(id) = key.id() {
            header = header.key_id(id.to_string())?;
        }
        self.add_signature_with_header(algorithm, key, header.build()?)
    }

    /// Adds a pending signature with an explicit header.
    ///
    /// The header's `alg` (if set) must equal `algorithm`, its `kid` (if
    /// set) must equal the key's id, and the key must be usable with the
    /// algorithm; all three are checked here, not at
    /// [`sign`][Self::sign] time.
    pub fn add_signature_with_header(
        mut self,
        algorithm: SignatureAlgorithm,
        key: &WebKey,
        header: JoseHeader,
    ) -> Result<Self> {
        if let Some(declared) = header.algorithm() {
            if declared != algorithm.into() {
                return Err(crate::error::root(ValidationError::AlgorithmKeyMismatch(
                    declared.to_string(),
                )));
            }
        }
        if let (Some(header_id), Some(key_id)) = (header.key_id(), key.id()) {
            if header_id != key_id {
                return Err(crate::error::root(ValidationError::KeyIdMismatch(
                    header_id.to_string(),
                    key_id.to_string(),
                )));
            }
        }
        key.check_algorithm(algorithm.into())?;

        // make sure the serialized header carries the algorithm
        let mut header = header;
        if header.algorithm().is_none() {
            header.algorithm = Some(algorithm.into());
        }

        self.pending.push(PendingSignature {
            algorithm,
            key: key.clone(),
            header,
        });
        Ok(self)
    }

    /// Computes all pending signatures and produces the immutable [`Jws`].
    pub fn sign(self) -> Result<Jws> {
        let payload = self
            .payload
            .ok_or_else(|| crate::error::root(ValidationError::MissingField("payload")))?;
        if self.pending.is_empty() {
            return Err(crate::error::root(ValidationError::MissingField(
                "signatures",
            )));
        }

        let mut signatures = Vec::with_capacity(self.pending.len());
        for pending in self.pending {
            let protected_json = serde_json::to_vec(&pending.header.to_json_object()?)
                .foreign_err(|| Error::Format(FormatError::Json("protected header".to_string())))?;
            let protected = utils::base64_url_encode(&protected_json);

            let input = signing_input(&protected, &payload);
            let signature = sign_bytes(pending.algorithm, &pending.key, input.as_bytes())?;

            signatures.push(JwsSignature {
                protected: Some(protected),
                unprotected: None,
                header: pending.header,
                signature,
            });
        }

        Ok(Jws {
            payload,
            signatures,
        })
    }
}

fn message_digest(algorithm: SignatureAlgorithm) -> MessageDigest {
    use SignatureAlgorithm::*;
    match algorithm {
        Hs256 | Rs256 | Ps256 | Es256 => MessageDigest::sha256(),
        Hs384 | Rs384 | Ps384 | Es384 => MessageDigest::sha384(),
        Hs512 | Rs512 | Ps512 | Es512 => MessageDigest::sha512(),
    }
}

fn is_pss(algorithm: SignatureAlgorithm) -> bool {
    matches!(
        algorithm,
        SignatureAlgorithm::Ps256 | SignatureAlgorithm::Ps384 | SignatureAlgorithm::Ps512
    )
}

fn private_rsa_pkey(key: &WebKey) -> Result<PKey<Private>> {
    let rsa = key.rsa_private().ok_or_else(|| {
        crate::error::root(ValidationError::InvalidKey(
            "an RSA private key is required".to_string(),
        ))
    })?;
    PKey::from_rsa(rsa.clone()).foreign_err(|| Error::Crypto(CryptoError::CryptoBackend))
}

fn public_rsa_pkey(key: &WebKey) -> Result<PKey<Public>> {
    let rsa = key.rsa_public().ok_or_else(|| {
        crate::error::root(ValidationError::InvalidKey(
            "an RSA public key is required".to_string(),
        ))
    })?;
    PKey::from_rsa(rsa.clone()).foreign_err(|| Error::Crypto(CryptoError::CryptoBackend))
}

/// Computes the raw signature over `input`, [RFC 7515, section 5.1][1]
/// step 5.
///
/// [1]: https://datatracker.ietf.org/doc/html/rfc7515#section-5.1
pub(crate) fn sign_bytes(
    algorithm: SignatureAlgorithm,
    key: &WebKey,
    input: &[u8],
) -> Result<Vec<u8>> {
    key.check_algorithm(algorithm.into())?;

    let failed = || Error::Crypto(CryptoError::SignatureFailed);
    let md = message_digest(algorithm);

    if algorithm.is_hmac() {
        let raw = key.raw_bytes().ok_or_else(|| {
            crate::error::root(ValidationError::InvalidKey(
                "a raw symmetric key is required".to_string(),
            ))
        })?;
        let pkey = PKey::hmac(raw).foreign_err(|| Error::Crypto(CryptoError::CryptoBackend))?;
        let mut signer = OpensslSigner::new(md, &pkey).foreign_err(failed)?;
        return signer.sign_oneshot_to_vec(input).foreign_err(failed);
    }

    if let KeyKind::Ec(curve) = algorithm.key_kind() {
        let ec = key.ec_private().ok_or_else(|| {
            crate::error::root(ValidationError::InvalidKey(
                "an EC private key is required".to_string(),
            ))
        })?;

        let digest = openssl::hash::hash(md, input).foreign_err(failed)?;
        let signature = EcdsaSig::sign(&digest, ec).foreign_err(failed)?;

        // raw r || s, both fixed-width
        let width = curve.coordinate_len() as i32;
        let mut bytes = signature.r().to_vec_padded(width).foreign_err(failed)?;
        bytes.extend(signature.s().to_vec_padded(width).foreign_err(failed)?);
        return Ok(bytes);
    }

    // RSASSA-PKCS1-v1_5 or RSASSA-PSS
    let pkey = private_rsa_pkey(key)?;
    let mut signer = OpensslSigner::new(md, &pkey).foreign_err(failed)?;
    if is_pss(algorithm) {
        signer
            .set_rsa_padding(openssl::rsa::Padding::PKCS1_PSS)
            .foreign_err(failed)?;
        signer
            .set_rsa_pss_saltlen(RsaPssSaltlen::DIGEST_LENGTH)
            .foreign_err(failed)?;
        signer.set_rsa_mgf1_md(md).foreign_err(failed)?;
    }
    signer.sign_oneshot_to_vec(input).foreign_err(failed)
}

/// Checks a raw signature over `input`; `Ok(false)` means a well-formed but
/// wrong signature.
pub(crate) fn verify_bytes(
    algorithm: SignatureAlgorithm,
    key: &WebKey,
    input: &[u8],
    signature: &[u8],
) -> Result<bool> {
    key.check_algorithm(algorithm.into())?;

    let failed = || Error::Crypto(CryptoError::SignatureFailed);
    let md = message_digest(algorithm);

    if algorithm.is_hmac() {
        // MAC equality, constant-time
        let expected = sign_bytes(algorithm, key, input)?;
        return Ok(expected.len() == signature.len() && memcmp::eq(&expected, signature));
    }

    if let KeyKind::Ec(curve) = algorithm.key_kind() {
        let ec = key.ec_public().ok_or_else(|| {
            crate::error::root(ValidationError::InvalidKey(
                "an EC public key is required".to_string(),
            ))
        })?;

        let width = curve.coordinate_len();
        if signature.len() != 2 * width {
            return Ok(false);
        }
        let (r, s) = signature.split_at(width);
        let r = BigNum::from_slice(r).foreign_err(failed)?;
        let s = BigNum::from_slice(s).foreign_err(failed)?;
        let ecdsa = EcdsaSig::from_private_components(r, s).foreign_err(failed)?;

        let digest = openssl::hash::hash(md, input).foreign_err(failed)?;
        return ecdsa.verify(&digest, ec).foreign_err(failed);
    }

    let pkey = public_rsa_pkey(key)?;
    let mut verifier = OpensslVerifier::new(md, &pkey).foreign_err(failed)?;
    if is_pss(algorithm) {
        verifier
            .set_rsa_padding(openssl::rsa::Padding::PKCS1_PSS)
            .foreign_err(failed)?;
        verifier
            .set_rsa_pss_saltlen(RsaPssSaltlen::DIGEST_LENGTH)
            .foreign_err(failed)?;
        verifier.set_rsa_mgf1_md(md).foreign_err(failed)?;
    }
    verifier
        .verify_oneshot(signature, input)
        .foreign_err(failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        alg::EcCurve,
        jwk::tests::{generate_ec_key, generate_rsa_key},
        json_object,
    };

    const PAYLOAD: &[u8] = b"Payload under test.";

    fn hmac_key(bytes: usize) -> WebKey {
        let mut raw = vec![0u8; bytes];
        openssl::rand::rand_bytes(&mut raw).unwrap();
        WebKey::builder().raw_key(raw).build().unwrap()
    }

    fn key_for(algorithm: SignatureAlgorithm) -> WebKey {
        match algorithm.key_kind() {
            KeyKind::Oct => hmac_key(64),
            KeyKind::Ec(curve) => generate_ec_key(curve),
            KeyKind::Rsa | KeyKind::RsaPss => generate_rsa_key(),
        }
    }

    #[test]
    fn sign_verify_round_trip_all_algorithms() {
        use SignatureAlgorithm::*;
        for algorithm in [
            Hs256, Hs384, Hs512, Rs256, Rs384, Rs512, Ps256, Ps384, Ps512, Es256, Es384, Es512,
        ] {
            let key = key_for(algorithm);

            let jws = Jws::builder()
                .payload(PAYLOAD.to_vec())
                .add_signature(algorithm, &key)
                .unwrap()
                .sign()
                .unwrap();

            jws.verify(&key, &[])
                .unwrap_or_else(|e| panic!("{algorithm}: {e}"));

            // a different key of the same shape must not verify
            let other = key_for(algorithm);
            assert!(jws.verify(&other, &[]).is_err(), "{algorithm}");
        }
    }

    #[test]
    fn altered_payload_fails_verification() {
        let key = generate_ec_key(EcCurve::P256);
        let jws = Jws::builder()
            .payload(PAYLOAD.to_vec())
            .add_signature(SignatureAlgorithm::Es256, &key)
            .unwrap()
            .sign()
            .unwrap();

        let compact = jws.to_compact().unwrap();
        let mut segments: Vec<&str> = compact.split('.').collect();
        let forged_payload = utils::base64_url_encode(b"Forged payload.");
        segments[1] = &forged_payload;
        let forged = segments.join(".");

        let parsed = Jws::from_compact(&forged).unwrap();
        assert!(parsed.verify(&key, &[]).is_err());
    }

    #[test]
    fn altered_protected_header_fails_verification() {
        let key = hmac_key(32);
        let jws = Jws::builder()
            .payload(PAYLOAD.to_vec())
            .add_signature(SignatureAlgorithm::Hs256, &key)
            .unwrap()
            .sign()
            .unwrap();

        let compact = jws.to_compact().unwrap();
        let mut segments: Vec<&str> = compact.split('.').collect();
        let forged_header = utils::base64_url_encode(br#"{"alg":"HS256","kid":"evil"}"#);
        segments[0] = &forged_header;
        let forged = segments.join(".");

        let parsed = Jws::from_compact(&forged).unwrap();
        assert!(parsed.verify(&key, &[]).is_err());
    }

    #[test]
    fn compact_round_trip() {
        let key = generate_rsa_key();
        let jws = Jws::builder()
            .payload(PAYLOAD.to_vec())
            .add_signature(SignatureAlgorithm::Ps256, &key)
            .unwrap()
            .sign()
            .unwrap();

        let compact = jws.to_compact().unwrap();
        let parsed = Jws::from_compact(&compact).unwrap();

        assert_eq!(parsed.payload(), PAYLOAD);
        assert_eq!(
            parsed.signatures()[0].header().key_id(),
            Some("test-rsa")
        );
        parsed.verify(&key, &[]).unwrap();
    }

    #[test]
    fn compact_requires_single_signature() {
        let first = generate_ec_key(EcCurve::P256);
        let second = generate_rsa_key();

        let jws = Jws::builder()
            .payload(PAYLOAD.to_vec())
            .add_signature(SignatureAlgorithm::Es256, &first)
            .unwrap()
            .add_signature(SignatureAlgorithm::Rs256, &second)
            .unwrap()
            .sign()
            .unwrap();

        assert!(jws.to_compact().is_err());
        assert!(jws.to_flattened_json().is_err());
    }

    #[test]
    fn multi_signature_json_round_trip() {
        let ec_key = generate_ec_key(EcCurve::P256);
        let rsa_key = generate_rsa_key();

        let jws = Jws::builder()
            .payload(PAYLOAD.to_vec())
            .add_signature(SignatureAlgorithm::Es256, &ec_key)
            .unwrap()
            .add_signature(SignatureAlgorithm::Rs256, &rsa_key)
            .unwrap()
            .sign()
            .unwrap();

        let json = jws.to_json().unwrap();
        let parsed = Jws::from_json(&json).unwrap();

        assert_eq!(parsed.signatures().len(), 2);
        // each key verifies through its own signature
        parsed.verify(&ec_key, &[]).unwrap();
        parsed.verify(&rsa_key, &[]).unwrap();
    }

    #[test]
    fn flattened_json_round_trip() {
        let key = generate_ec_key(EcCurve::P256);
        let jws = Jws::builder()
            .payload(PAYLOAD.to_vec())
            .add_signature(SignatureAlgorithm::Es256, &key)
            .unwrap()
            .sign()
            .unwrap();

        let flattened = jws.to_flattened_json().unwrap();
        assert!(flattened.get("signatures").is_none());
        assert!(flattened.get("protected").is_some());

        let parsed = Jws::from_json(&flattened).unwrap();
        parsed.verify(&key, &[]).unwrap();
    }

    #[test]
    fn verification_resolves_embedded_key() {
        let key = generate_ec_key(EcCurve::P256);
        let header = JoseHeader::builder()
            .algorithm(SignatureAlgorithm::Es256)
            .unwrap()
            .key_id("test-ec".to_string())
            .unwrap()
            .key(key.clone())
            .unwrap()
            .build()
            .unwrap();

        let jws = Jws::builder()
            .payload(PAYLOAD.to_vec())
            .add_signature_with_header(SignatureAlgorithm::Es256, &key, header)
            .unwrap()
            .sign()
            .unwrap();

        jws.verify_resolved(&[]).unwrap();
    }

    #[test]
    fn unknown_critical_parameter_fails_closed() {
        let key = hmac_key(32);
        let header = JoseHeader::builder()
            .algorithm(SignatureAlgorithm::Hs256)
            .unwrap()
            .critical(vec!["exp".to_string()])
            .unwrap()
            .additional("exp".to_string(), 1234.into())
            .unwrap()
            .build()
            .unwrap();

        let jws = Jws::builder()
            .payload(PAYLOAD.to_vec())
            .add_signature_with_header(SignatureAlgorithm::Hs256, &key, header)
            .unwrap()
            .sign()
            .unwrap();

        assert!(jws.verify(&key, &[]).is_err());
        jws.verify(&key, &["exp"]).unwrap();
    }

    #[test]
    fn conflicting_registered_duplicate_is_rejected() {
        let protected = utils::base64_url_encode(br#"{"alg":"HS256"}"#);
        let json: Value = json_object!({
            "payload": utils::base64_url_encode(PAYLOAD),
            "protected": protected,
            "header": { "alg": "HS384" },
            "signature": utils::base64_url_encode(b"junk"),
        })
        .into();

        let error = Jws::from_json(&json).unwrap_err();
        assert!(matches!(
            error.error,
            Error::Validation(ValidationError::DuplicateHeaderParameter(name)) if name == "alg"
        ));
    }

    #[test]
    fn extended_duplicate_must_match() {
        let protected = utils::base64_url_encode(br#"{"alg":"HS256","nonce":"abc"}"#);
        let matching: Value = json_object!({
            "payload": utils::base64_url_encode(PAYLOAD),
            "protected": protected,
            "header": { "nonce": "abc" },
            "signature": utils::base64_url_encode(b"junk"),
        })
        .into();
        Jws::from_json(&matching).unwrap();

        let conflicting: Value = json_object!({
            "payload": utils::base64_url_encode(PAYLOAD),
            "protected": utils::base64_url_encode(br#"{"alg":"HS256","nonce":"evil"}"#),
            "header": { "nonce": "abc" },
            "signature": utils::base64_url_encode(b"junk"),
        })
        .into();
        assert!(Jws::from_json(&conflicting).is_err());
    }

    // https://datatracker.ietf.org/doc/html/rfc7515#appendix-A.1
    #[test]
    fn rfc7515_hs256_vector() {
        let token = "eyJ0eXAiOiJKV1QiLA0KICJhbGciOiJIUzI1NiJ9\
                     .eyJpc3MiOiJqb2UiLA0KICJleHAiOjEzMDA4MTkzODAsDQogImh0dHA6Ly9leGFt\
                     cGxlLmNvbS9pc19yb290Ijp0cnVlfQ\
                     .dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        let token: String = token.split_whitespace().collect();

        let k = utils::base64_url_decode(
            "AyM1SysPpbyDfgZld3umj1qzKObwVMkoqQ-EstJQLr_T-1qS0gZH75aKtMN3Yj0iPS4hcgUuTwjAzZr1Z9CAow",
        )
        .unwrap();
        let key = WebKey::builder().raw_key(k).build().unwrap();

        let jws = Jws::from_compact(&token).unwrap();
        jws.verify(&key, &[]).unwrap();

        let claims: Value = serde_json::from_slice(jws.payload()).unwrap();
        assert_eq!(claims["iss"], "joe");
        assert_eq!(claims["http://example.com/is_root"], true);
    }
}

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

//! JSON Web Encryption, as specified in [RFC 7516][1].
//!
//! [1]: https://datatracker.ietf.org/doc/html/rfc7516

mod builder;
mod cek;
mod content;
mod key_management;

pub use builder::JweBuilder;

use bherror::traits::ForeignError as _;
use serde_json::{Map, Value};

use crate::{
    alg::{Algorithm, CompressionAlgorithm},
    error::{DecryptionError, Error, FormatError, Result, ValidationError},
    header::JoseHeader,
    jwk::WebKey,
    utils,
};

/// One recipient of a [`Jwe`]: its per-recipient header object (if any) and
/// encrypted-key segment.
#[derive(Debug, Clone)]
pub struct JweRecipient {
    pub(crate) header: Option<Map<String, Value>>,
    pub(crate) merged: JoseHeader,
    pub(crate) encrypted_key: Vec<u8>,
}

impl JweRecipient {
    /// The merged view of the protected, shared and per-recipient headers,
    /// as this recipient sees them.
    pub fn header(&self) -> &JoseHeader {
        &self.merged
    }

    /// The encrypted-key segment; empty for the direct algorithms.
    pub fn encrypted_key(&self) -> &[u8] {
        &self.encrypted_key
    }
}

/// An encrypted message with one or more recipients, as specified in
/// [RFC 7516][1].
///
/// Produced either by [`Jwe::builder`] or by parsing one of the wire forms
/// ([`from_compact`][Self::from_compact] / [`from_json`][Self::from_json]);
/// immutable afterwards.
///
/// [1]: https://datatracker.ietf.org/doc/html/rfc7516
#[derive(Debug, Clone)]
pub struct Jwe {
    pub(crate) protected: Option<String>,
    pub(crate) unprotected: Option<Map<String, Value>>,
    pub(crate) recipients: Vec<JweRecipient>,
    pub(crate) iv: Vec<u8>,
    pub(crate) ciphertext: Vec<u8>,
    pub(crate) tag: Vec<u8>,
    pub(crate) aad: Option<Vec<u8>>,
}

impl Jwe {
    /// Start building a new encrypted message.
    pub fn builder() -> JweBuilder {
        JweBuilder::new()
    }

    /// All recipients of the message.
    pub fn recipients(&self) -> &[JweRecipient] {
        &self.recipients
    }

    /// The explicit additional authenticated data, if any.
    pub fn additional_authenticated_data(&self) -> Option<&[u8]> {
        self.aad.as_deref()
    }

    /// The authenticated-data input of the content encryption
    /// ([RFC 7516, section 5.1][1], step 14): the ASCII form of the
    /// protected segment, extended with the explicit AAD when present.
    ///
    /// [1]: https://datatracker.ietf.org/doc/html/rfc7516#section-5.1
    pub(crate) fn authenticated_data(protected: &str, aad: Option<&[u8]>) -> String {
        match aad {
            Some(aad) => format!("{protected}.{}", utils::base64_url_encode(aad)),
            None => protected.to_string(),
        }
    }

    /// Decrypts the message with the given key, per [RFC 7516,
    /// section 5.2][1]: every recipient is tried, and the whole message is
    /// rejected if none of them yields an authenticated plaintext.
    ///
    /// Each attempted recipient's critical parameters must all be in
    /// `understood_critical`.
    ///
    /// [1]: https://datatracker.ietf.org/doc/html/rfc7516#section-5.2
    pub fn decrypt(&self, key: &WebKey, understood_critical: &[&str]) -> Result<Vec<u8>> {
        let aad = Self::authenticated_data(
            self.protected.as_deref().unwrap_or(""),
            self.aad.as_deref(),
        );

        let mut last_error = None;
        for recipient in &self.recipients {
            match self.decrypt_recipient(recipient, key, understood_critical, aad.as_bytes()) {
                Ok(plaintext) => return Ok(plaintext),
                Err(error) => last_error = Some(error),
            }
        }

        // a sole recipient's failure is diagnostic; with several, which one
        // was "ours" is unknowable
        match last_error {
            Some(error) if self.recipients.len() == 1 => Err(error),
            _ => Err(crate::error::root(DecryptionError::NoRecipient)),
        }
    }

    fn decrypt_recipient(
        &self,
        recipient: &JweRecipient,
        key: &WebKey,
        understood_critical: &[&str],
        aad: &[u8],
    ) -> Result<Vec<u8>> {
        let header = &recipient.merged;
        header.check_critical(understood_critical)?;

        let algorithm = match header.require_algorithm()? {
            Algorithm::KeyManagement(algorithm) => algorithm,
            other => {
                return Err(crate::error::root(ValidationError::AlgorithmKeyMismatch(
                    other.to_string(),
                )))
            }
        };
        let encryption = header
            .encryption()
            .ok_or_else(|| crate::error::root(ValidationError::MissingField("enc")))?;

        let cek = key_management::decrypt_cek(
            algorithm,
            encryption,
            key,
            &recipient.encrypted_key,
            header,
        )?;

        let plaintext = content::decrypt(
            encryption,
            &cek,
            &self.iv,
            &self.ciphertext,
            &self.tag,
            aad,
        )?;

        match header.compression() {
            Some(CompressionAlgorithm::Deflate) => utils::deflate_decompress(&plaintext)
                .foreign_err(|| Error::Format(FormatError::Compression("inflate".to_string()))),
            None => Ok(plaintext),
        }
    }

    /// The compact serialization ([RFC 7516, section 7.1][1]).
    ///
    /// Legal only with exactly one recipient whose header is entirely
    /// protected, and without explicit AAD.
    ///
    /// [1]: https://datatracker.ietf.org/doc/html/rfc7516#section-7.1
    pub fn to_compact(&self) -> Result<String> {
        let [recipient] = self.recipients.as_slice() else {
            return Err(crate::error::root(ValidationError::InvalidKey(
                "compact serialization requires exactly one recipient".to_string(),
            )));
        };
        if recipient.header.is_some() || self.unprotected.is_some() || self.aad.is_some() {
            return Err(crate::error::root(ValidationError::InvalidKey(
                "compact serialization requires a fully protected header".to_string(),
            )));
        }
        let protected = self.protected.as_deref().ok_or_else(|| {
            crate::error::root(ValidationError::MissingField("protected"))
        })?;

        Ok(format!(
            "{protected}.{}.{}.{}.{}",
            utils::base64_url_encode(&recipient.encrypted_key),
            utils::base64_url_encode(&self.iv),
            utils::base64_url_encode(&self.ciphertext),
            utils::base64_url_encode(&self.tag),
        ))
    }

    /// Parses the compact serialization.
    pub fn from_compact(input: &str) -> Result<Jwe> {
        let segments = utils::split_compact(input, 5)?;

        let protected = segments[0].to_string();
        let encrypted_key = utils::base64_url_decode(segments[1])?;
        let iv = utils::base64_url_decode(segments[2])?;
        let ciphertext = utils::base64_url_decode(segments[3])?;
        let tag = utils::base64_url_decode(segments[4])?;

        let protected_object = parse_protected(&protected)?;
        let merged = JoseHeader::from_json_object(&protected_object)?;

        Ok(Jwe {
            protected: Some(protected),
            unprotected: None,
            recipients: vec![JweRecipient {
                header: None,
                merged,
                encrypted_key,
            }],
            iv,
            ciphertext,
            tag,
            aad: None,
        })
    }

    /// The general JSON serialization ([RFC 7516, section 7.2.1][1]).
    ///
    /// [1]: https://datatracker.ietf.org/doc/html/rfc7516#section-7.2.1
    pub fn to_json(&self) -> Result<Value> {
        let mut object = self.shared_json();

        let recipients: Vec<Value> = self
            .recipients
            .iter()
            .map(|recipient| Value::Object(recipient_json(recipient)))
            .collect();
        object.insert("recipients".to_string(), recipients.into());

        Ok(Value::Object(object))
    }

    /// The flattened JSON serialization ([RFC 7516, section 7.2.2][1]);
    /// requires exactly one recipient.
    ///
    /// [1]: https://datatracker.ietf.org/doc/html/rfc7516#section-7.2.2
    pub fn to_flattened_json(&self) -> Result<Value> {
        let [recipient] = self.recipients.as_slice() else {
            return Err(crate::error::root(ValidationError::InvalidKey(
                "flattened serialization requires exactly one recipient".to_string(),
            )));
        };

        let mut object = self.shared_json();
        object.extend(recipient_json(recipient));

        Ok(Value::Object(object))
    }

    fn shared_json(&self) -> Map<String, Value> {
        let mut object = Map::new();
        if let Some(protected) = &self.protected {
            object.insert("protected".to_string(), protected.clone().into());
        }
        if let Some(unprotected) = &self.unprotected {
            object.insert(
                "unprotected".to_string(),
                Value::Object(unprotected.clone()),
            );
        }
        object.insert("iv".to_string(), utils::base64_url_encode(&self.iv).into());
        object.insert(
            "ciphertext".to_string(),
            utils::base64_url_encode(&self.ciphertext).into(),
        );
        object.insert(
            "tag".to_string(),
            utils::base64_url_encode(&self.tag).into(),
        );
        if let Some(aad) = &self.aad {
            object.insert("aad".to_string(), utils::base64_url_encode(aad).into());
        }
        object
    }

    /// Parses the general or flattened JSON serialization.
    pub fn from_json(input: &Value) -> Result<Jwe> {
        let object = input
            .as_object()
            .ok_or_else(|| json_error("JWE is not an object"))?;

        let protected = object
            .get("protected")
            .map(|value| {
                value
                    .as_str()
                    .map(str::to_string)
                    .ok_or_else(|| json_error("\"protected\" is not a string"))
            })
            .transpose()?;
        let protected_object = protected.as_deref().map(parse_protected).transpose()?;

        let unprotected = object
            .get("unprotected")
            .map(|value| {
                value
                    .as_object()
                    .cloned()
                    .ok_or_else(|| json_error("\"unprotected\" is not an object"))
            })
            .transpose()?;

        let iv = decode_field(object, "iv")?;
        let ciphertext = decode_field(object, "ciphertext")?;
        let tag = decode_field(object, "tag")?;
        let aad = object
            .get("aad")
            .map(|value| {
                value
                    .as_str()
                    .ok_or_else(|| json_error("\"aad\" is not a string"))
                    .and_then(utils::base64_url_decode)
            })
            .transpose()?;

        let parse_recipient = |entry: &Map<String, Value>| -> Result<JweRecipient> {
            let header = entry
                .get("header")
                .map(|value| {
                    value
                        .as_object()
                        .cloned()
                        .ok_or_else(|| json_error("\"header\" is not an object"))
                })
                .transpose()?;
            let encrypted_key = match entry.get("encrypted_key") {
                Some(value) => utils::base64_url_decode(
                    value
                        .as_str()
                        .ok_or_else(|| json_error("\"encrypted_key\" is not a string"))?,
                )?,
                None => Vec::new(),
            };

            let merged_object = JoseHeader::merge_json_objects(&[
                protected_object.as_ref(),
                unprotected.as_ref(),
                header.as_ref(),
            ])?;

            Ok(JweRecipient {
                header,
                merged: JoseHeader::from_json_object(&merged_object)?,
                encrypted_key,
            })
        };

        let recipients = match object.get("recipients") {
            Some(entries) => entries
                .as_array()
                .ok_or_else(|| json_error("\"recipients\" is not an array"))?
                .iter()
                .map(|entry| {
                    parse_recipient(
                        entry
                            .as_object()
                            .ok_or_else(|| json_error("recipient entry is not an object"))?,
                    )
                })
                .collect::<Result<Vec<_>>>()?,
            // flattened form carries the single recipient at top level
            None => vec![parse_recipient(object)?],
        };

        if recipients.is_empty() {
            return Err(json_error("JWE carries no recipients"));
        }

        Ok(Jwe {
            protected,
            unprotected,
            recipients,
            iv,
            ciphertext,
            tag,
            aad,
        })
    }
}

fn recipient_json(recipient: &JweRecipient) -> Map<String, Value> {
    let mut entry = Map::new();
    if let Some(header) = &recipient.header {
        entry.insert("header".to_string(), Value::Object(header.clone()));
    }
    if !recipient.encrypted_key.is_empty() {
        entry.insert(
            "encrypted_key".to_string(),
            utils::base64_url_encode(&recipient.encrypted_key).into(),
        );
    }
    entry
}

fn json_error(message: &str) -> bherror::Error<Error> {
    crate::error::root(FormatError::Json(message.to_string()))
}

fn parse_protected(protected: &str) -> Result<Map<String, Value>> {
    let bytes = utils::base64_url_decode(protected)?;
    serde_json::from_slice(&bytes)
        .foreign_err(|| Error::Format(FormatError::Json("invalid protected header".to_string())))
}

fn decode_field(object: &Map<String, Value>, name: &str) -> Result<Vec<u8>> {
    let value = object
        .get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| json_error(&format!("missing \"{name}\"")))?;
    utils::base64_url_decode(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        alg::{ContentEncryptionAlgorithm, EcCurve, KeyManagementAlgorithm},
        jwk::tests::{generate_ec_key, generate_rsa_key},
    };

    const PLAINTEXT: &[u8] = b"Live long and prosper.";

    fn oct_key(bytes: usize) -> WebKey {
        let mut raw = vec![0u8; bytes];
        openssl::rand::rand_bytes(&mut raw).unwrap();
        WebKey::builder().raw_key(raw).build().unwrap()
    }

    fn key_for(
        algorithm: KeyManagementAlgorithm,
        encryption: ContentEncryptionAlgorithm,
        rsa: &WebKey,
    ) -> WebKey {
        use KeyManagementAlgorithm::*;
        match algorithm {
            Dir => oct_key(encryption.key_len()),
            Rsa1_5 | RsaOaep | RsaOaep256 => rsa.clone(),
            EcdhEs | EcdhEsA128Kw | EcdhEsA192Kw | EcdhEsA256Kw => generate_ec_key(EcCurve::P256),
            wrapping => oct_key(wrapping.wrap_key_len().unwrap()),
        }
    }

    #[test]
    fn round_trip_every_algorithm_pair() {
        use ContentEncryptionAlgorithm::*;
        use KeyManagementAlgorithm::*;

        let rsa = generate_rsa_key();

        for algorithm in [
            Dir, Rsa1_5, RsaOaep, RsaOaep256, A128Kw, A192Kw, A256Kw, A128GcmKw, A192GcmKw,
            A256GcmKw, EcdhEs, EcdhEsA128Kw, EcdhEsA192Kw, EcdhEsA256Kw,
        ] {
            for encryption in [A128CbcHs256, A192CbcHs384, A256CbcHs512, A128Gcm, A192Gcm, A256Gcm]
            {
                let key = key_for(algorithm, encryption, &rsa);

                let jwe = Jwe::builder()
                    .plaintext(PLAINTEXT.to_vec())
                    .encryption(encryption)
                    .unwrap()
                    .add_recipient(algorithm, &key)
                    .unwrap()
                    .encrypt()
                    .unwrap_or_else(|e| panic!("{algorithm}/{encryption}: {e}"));

                let json = jwe.to_json().unwrap();
                let parsed = Jwe::from_json(&json).unwrap();

                let decrypted = parsed
                    .decrypt(&key, &[])
                    .unwrap_or_else(|e| panic!("{algorithm}/{encryption}: {e}"));
                assert_eq!(decrypted, PLAINTEXT, "{algorithm}/{encryption}");
            }
        }
    }

    #[test]
    fn compact_round_trip() {
        let key = generate_rsa_key();
        let jwe = Jwe::builder()
            .plaintext(PLAINTEXT.to_vec())
            .encryption(ContentEncryptionAlgorithm::A256Gcm)
            .unwrap()
            .add_recipient(KeyManagementAlgorithm::RsaOaep, &key)
            .unwrap()
            .encrypt()
            .unwrap();

        let compact = jwe.to_compact().unwrap();
        assert_eq!(compact.split('.').count(), 5);

        let parsed = Jwe::from_compact(&compact).unwrap();
        assert_eq!(parsed.decrypt(&key, &[]).unwrap(), PLAINTEXT);
        assert_eq!(
            parsed.recipients()[0].header().key_id(),
            Some("test-rsa")
        );
    }

    #[test]
    fn flattened_round_trip() {
        let key = generate_ec_key(EcCurve::P256);
        let jwe = Jwe::builder()
            .plaintext(PLAINTEXT.to_vec())
            .encryption(ContentEncryptionAlgorithm::A128CbcHs256)
            .unwrap()
            .add_recipient(KeyManagementAlgorithm::EcdhEs, &key.to_public().unwrap())
            .unwrap()
            .encrypt()
            .unwrap();

        let flattened = jwe.to_flattened_json().unwrap();
        assert!(flattened.get("recipients").is_none());
        // ECDH-ES establishes the CEK directly, no encrypted key travels
        assert!(flattened.get("encrypted_key").is_none());

        let parsed = Jwe::from_json(&flattened).unwrap();
        assert_eq!(parsed.decrypt(&key, &[]).unwrap(), PLAINTEXT);
    }

    #[test]
    fn multi_recipient_message_opens_for_each() {
        let rsa = generate_rsa_key();
        let wrapping = oct_key(16);

        let jwe = Jwe::builder()
            .plaintext(PLAINTEXT.to_vec())
            .encryption(ContentEncryptionAlgorithm::A128Gcm)
            .unwrap()
            .add_recipient(KeyManagementAlgorithm::RsaOaep, &rsa)
            .unwrap()
            .add_recipient(KeyManagementAlgorithm::A128Kw, &wrapping)
            .unwrap()
            .encrypt()
            .unwrap();

        let json = jwe.to_json().unwrap();
        let parsed = Jwe::from_json(&json).unwrap();

        assert_eq!(parsed.recipients().len(), 2);
        assert_eq!(parsed.decrypt(&rsa, &[]).unwrap(), PLAINTEXT);
        assert_eq!(parsed.decrypt(&wrapping, &[]).unwrap(), PLAINTEXT);

        // multi-recipient messages cannot flatten
        assert!(parsed.to_compact().is_err());
        assert!(parsed.to_flattened_json().is_err());

        let stranger = oct_key(16);
        let error = parsed.decrypt(&stranger, &[]).unwrap_err();
        assert!(matches!(
            error.error,
            Error::Decryption(DecryptionError::NoRecipient)
        ));
    }

    #[test]
    fn explicit_aad_is_authenticated() {
        let key = oct_key(32);
        let jwe = Jwe::builder()
            .plaintext(PLAINTEXT.to_vec())
            .encryption(ContentEncryptionAlgorithm::A256Gcm)
            .unwrap()
            .additional_authenticated_data(b"transaction-42".to_vec())
            .unwrap()
            .add_recipient(KeyManagementAlgorithm::Dir, &key)
            .unwrap()
            .encrypt()
            .unwrap();

        // AAD rules out the compact form
        assert!(jwe.to_compact().is_err());

        let mut json = jwe.to_flattened_json().unwrap();
        let parsed = Jwe::from_json(&json).unwrap();
        assert_eq!(
            parsed.additional_authenticated_data(),
            Some(b"transaction-42".as_slice())
        );
        assert_eq!(parsed.decrypt(&key, &[]).unwrap(), PLAINTEXT);

        // altering the aad breaks authentication
        json["aad"] = utils::base64_url_encode(b"transaction-43").into();
        let altered = Jwe::from_json(&json).unwrap();
        let error = altered.decrypt(&key, &[]).unwrap_err();
        assert!(matches!(
            error.error,
            Error::Decryption(DecryptionError::IntegrityCheckFailed)
        ));
    }

    #[test]
    fn compressed_plaintext_round_trip() {
        let plaintext = vec![b'a'; 4096];
        let key = oct_key(16);

        let jwe = Jwe::builder()
            .plaintext(plaintext.clone())
            .encryption(ContentEncryptionAlgorithm::A128Gcm)
            .unwrap()
            .compression(crate::alg::CompressionAlgorithm::Deflate)
            .unwrap()
            .add_recipient(KeyManagementAlgorithm::A128Kw, &key)
            .unwrap()
            .encrypt()
            .unwrap();

        // the ciphertext is of the compressed plaintext
        assert!(jwe.ciphertext.len() < plaintext.len() / 2);

        let compact = jwe.to_compact().unwrap();
        let parsed = Jwe::from_compact(&compact).unwrap();
        assert_eq!(
            parsed.recipients()[0].header().compression(),
            Some(CompressionAlgorithm::Deflate)
        );
        assert_eq!(parsed.decrypt(&key, &[]).unwrap(), plaintext);
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let key = oct_key(32);
        let jwe = Jwe::builder()
            .plaintext(PLAINTEXT.to_vec())
            .encryption(ContentEncryptionAlgorithm::A256Gcm)
            .unwrap()
            .add_recipient(KeyManagementAlgorithm::Dir, &key)
            .unwrap()
            .encrypt()
            .unwrap();

        let compact = jwe.to_compact().unwrap();
        let mut segments: Vec<String> = compact.split('.').map(str::to_string).collect();
        let mut ciphertext = utils::base64_url_decode(&segments[3]).unwrap();
        ciphertext[0] ^= 0x01;
        segments[3] = utils::base64_url_encode(&ciphertext);

        let forged = Jwe::from_compact(&segments.join(".")).unwrap();
        let error = forged.decrypt(&key, &[]).unwrap_err();
        assert!(matches!(
            error.error,
            Error::Decryption(DecryptionError::IntegrityCheckFailed)
        ));
    }

    #[test]
    fn tampered_protected_header_is_rejected() {
        let key = oct_key(32);
        let jwe = Jwe::builder()
            .plaintext(PLAINTEXT.to_vec())
            .encryption(ContentEncryptionAlgorithm::A256Gcm)
            .unwrap()
            .add_recipient(KeyManagementAlgorithm::Dir, &key)
            .unwrap()
            .encrypt()
            .unwrap();

        let compact = jwe.to_compact().unwrap();
        let mut segments: Vec<String> = compact.split('.').map(str::to_string).collect();
        segments[0] =
            utils::base64_url_encode(br#"{"alg":"dir","enc":"A256GCM","kid":"evil"}"#);

        let forged = Jwe::from_compact(&segments.join(".")).unwrap();
        assert!(forged.decrypt(&key, &[]).is_err());
    }

    #[test]
    fn unknown_critical_parameter_fails_closed() {
        let key = oct_key(32);
        let header = JoseHeader::builder()
            .critical(vec!["exp".to_string()])
            .unwrap()
            .additional("exp".to_string(), 1234.into())
            .unwrap()
            .build()
            .unwrap();

        let jwe = Jwe::builder()
            .plaintext(PLAINTEXT.to_vec())
            .encryption(ContentEncryptionAlgorithm::A256Gcm)
            .unwrap()
            .add_recipient_with_header(KeyManagementAlgorithm::Dir, &key, header)
            .unwrap()
            .encrypt()
            .unwrap();

        assert!(jwe.decrypt(&key, &[]).is_err());
        assert_eq!(jwe.decrypt(&key, &["exp"]).unwrap(), PLAINTEXT);
    }

    #[test]
    fn wrong_segment_count_is_rejected() {
        let error = Jwe::from_compact("a.b.c").unwrap_err();
        assert!(matches!(
            error.error,
            Error::Format(FormatError::SegmentCount(5, 3))
        ));
    }
}

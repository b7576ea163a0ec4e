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

use bherror::traits::ForeignError as _;
use serde_json::{Map, Value};

use super::{cek::Cek, content, key_management, Jwe, JweRecipient};
use crate::{
    alg::{CompressionAlgorithm, ContentEncryptionAlgorithm, KeyManagementAlgorithm},
    error::{Error, FormatError, Result, ValidationError},
    header::JoseHeader,
    jwk::WebKey,
    utils,
};

#[derive(Debug)]
struct PendingRecipient {
    algorithm: KeyManagementAlgorithm,
    key: WebKey,
    header: JoseHeader,
}

/// Builder for a [`Jwe`].
///
/// Accumulates the plaintext, content-encryption parameters and one or more
/// recipients; [`encrypt`][Self::encrypt] establishes the CEK, encrypts it
/// per recipient and encrypts the content exactly once.
///
/// Recipient headers must agree on everything that protects the shared
/// content: a recipient whose header contradicts the builder's `enc`, `zip`
/// or `crit` is rejected when added; `enc` and `zip` are checked again by
/// [`encrypt`][Self::encrypt], since a recipient can be added before the
/// builder learns them.
#[derive(Debug, Default)]
pub struct JweBuilder {
    plaintext: Option<Vec<u8>>,
    encryption: Option<ContentEncryptionAlgorithm>,
    compression: Option<CompressionAlgorithm>,
    shared_header: Option<JoseHeader>,
    aad: Option<Vec<u8>>,
    recipients: Vec<PendingRecipient>,
}

impl JweBuilder {
    pub(super) fn new() -> Self {
        Self::default()
    }

    /// Sets the plaintext to encrypt.
    pub fn plaintext(mut self, plaintext: Vec<u8>) -> Self {
        self.plaintext = Some(plaintext);
        self
    }

    /// Sets the content-encryption algorithm (`enc`).
    pub fn encryption(mut self, encryption: ContentEncryptionAlgorithm) -> Result<Self> {
        set_once(&mut self.encryption, encryption, "enc")?;
        Ok(self)
    }

    /// Enables plaintext compression (`zip`).
    pub fn compression(mut self, compression: CompressionAlgorithm) -> Result<Self> {
        set_once(&mut self.compression, compression, "zip")?;
        Ok(self)
    }

    /// Sets additional shared header parameters (for instance `typ` or
    /// `cty`); they end up in the protected header.
    ///
    /// `alg`, `enc` and `zip` must not come through here.
    pub fn protected_header(mut self, header: JoseHeader) -> Result<Self> {
        if header.algorithm().is_some() {
            return Err(crate::error::root(ValidationError::FieldAlreadySet("alg")));
        }
        if header.encryption().is_some() {
            return Err(crate::error::root(ValidationError::FieldAlreadySet("enc")));
        }
        if header.compression().is_some() {
            return Err(crate::error::root(ValidationError::FieldAlreadySet("zip")));
        }
        set_once(&mut self.shared_header, header, "protected header")?;
        Ok(self)
    }

    /// Sets explicit additional authenticated data; forces the JSON
    /// serialization.
    pub fn additional_authenticated_data(mut self, aad: Vec<u8>) -> Result<Self> {
        set_once(&mut self.aad, aad, "aad")?;
        Ok(self)
    }

    /// Adds a recipient with a default per-recipient header (`alg` plus the
    /// key's `kid`).
    pub fn add_recipient(self, algorithm: KeyManagementAlgorithm, key: &WebKey) -> Result<Self> {
        let mut header = JoseHeader::builder().algorithm(algorithm)?;
        if let Some(id) = key.id() {
            header = header.key_id(id.to_string())?;
        }
        self.add_recipient_with_header(algorithm, key, header.build()?)
    }

    /// Adds a recipient with an explicit per-recipient header.
    ///
    /// The header's `alg` (if set) must equal `algorithm` and its `kid` (if
    /// set) must equal the key's id.  A `dir` or `ECDH-ES` recipient
    /// determines the CEK itself, so it must remain the sole recipient.
    pub fn add_recipient_with_header(
        mut self,
        algorithm: KeyManagementAlgorithm,
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

        self.check_consistency(algorithm, &header)?;

        let mut header = header;
        if header.algorithm().is_none() {
            header.algorithm = Some(algorithm.into());
        }

        self.recipients.push(PendingRecipient {
            algorithm,
            key: key.clone(),
            header,
        });
        Ok(self)
    }

    fn check_consistency(
        &self,
        algorithm: KeyManagementAlgorithm,
        header: &JoseHeader,
    ) -> Result<()> {
        let inconsistent = |name: &'static str| {
            crate::error::root(ValidationError::InconsistentRecipient(name))
        };

        if let (Some(declared), Some(shared)) = (header.encryption(), self.encryption) {
            if declared != shared {
                return Err(inconsistent("enc"));
            }
        }
        if let (Some(declared), Some(shared)) = (header.compression(), self.compression) {
            if declared != shared {
                return Err(inconsistent("zip"));
            }
        }
        if let Some(first) = self.recipients.first() {
            if header.critical() != first.header.critical() {
                return Err(inconsistent("crit"));
            }
        }

        // a CEK-determining recipient cannot share the message
        let any_direct =
            algorithm.is_direct() || self.recipients.iter().any(|r| r.algorithm.is_direct());
        if any_direct && !self.recipients.is_empty() {
            return Err(inconsistent("alg"));
        }

        Ok(())
    }

    /// Establishes the CEK, encrypts it for every recipient and encrypts the
    /// content, producing the immutable [`Jwe`].
    pub fn encrypt(self) -> Result<Jwe> {
        let plaintext = self
            .plaintext
            .ok_or_else(|| crate::error::root(ValidationError::MissingField("plaintext")))?;
        let encryption = self
            .encryption
            .ok_or_else(|| crate::error::root(ValidationError::MissingField("enc")))?;
        if self.recipients.is_empty() {
            return Err(crate::error::root(ValidationError::MissingField(
                "recipients",
            )));
        }

        // one CEK for the whole message, however many recipients share it
        let sole_direct = self.recipients.len() == 1 && self.recipients[0].algorithm.is_direct();
        let (cek, mut encrypted_keys) = if sole_direct {
            let recipient = &self.recipients[0];
            let (cek, result) = key_management::establish_direct_cek(
                recipient.algorithm,
                &recipient.key,
                encryption,
                recipient.header.agreement_party_u_info(),
                recipient.header.agreement_party_v_info(),
            )?;
            (cek, vec![result])
        } else {
            let cek = Cek::generate(encryption)?;
            let results = self
                .recipients
                .iter()
                .map(|recipient| {
                    key_management::encrypt_cek(
                        recipient.algorithm,
                        &recipient.key,
                        &cek,
                        recipient.header.agreement_party_u_info(),
                        recipient.header.agreement_party_v_info(),
                    )
                })
                .collect::<Result<Vec<_>>>()?;
            (cek, results)
        };

        // fold the algorithm-contributed parameters into each header; a
        // recipient may declare `enc`/`zip` itself, but only in agreement
        // with the builder, and the shared header is their sole carrier on
        // the wire
        let mut recipient_headers = Vec::with_capacity(self.recipients.len());
        for (recipient, result) in self.recipients.iter().zip(encrypted_keys.iter_mut()) {
            if let Some(declared) = recipient.header.encryption() {
                if declared != encryption {
                    return Err(crate::error::root(ValidationError::InconsistentRecipient(
                        "enc",
                    )));
                }
            }
            if let Some(declared) = recipient.header.compression() {
                if Some(declared) != self.compression {
                    return Err(crate::error::root(ValidationError::InconsistentRecipient(
                        "zip",
                    )));
                }
            }

            let mut header = recipient.header.clone();
            header.encryption = None;
            header.compression = None;
            if let Some(ephemeral) = result.ephemeral_key.take() {
                header.ephemeral_key = Some(ephemeral);
            }
            if let Some(iv) = result.initialization_vector.take() {
                header.initialization_vector = Some(iv);
            }
            if let Some(tag) = result.authentication_tag.take() {
                header.authentication_tag = Some(tag);
            }
            recipient_headers.push(header);
        }

        let plaintext = match self.compression {
            Some(CompressionAlgorithm::Deflate) => utils::deflate_compress(&plaintext)
                .foreign_err(|| Error::Format(FormatError::Compression("deflate".to_string())))?,
            None => plaintext,
        };

        let mut shared = self.shared_header.unwrap_or_default();
        shared.encryption = Some(encryption);
        shared.compression = self.compression;

        // a single recipient's parameters can all live in the protected
        // header; multiple recipients keep theirs per recipient
        let (protected_object, per_recipient): (Map<String, Value>, Vec<Option<Map<String, Value>>>) =
            if recipient_headers.len() == 1 {
                let merged = JoseHeader::merge_json_objects(&[
                    Some(&shared.to_json_object()?),
                    Some(&recipient_headers[0].to_json_object()?),
                ])?;
                (merged, vec![None])
            } else {
                let headers = recipient_headers
                    .iter()
                    .map(|header| header.to_json_object().map(Some))
                    .collect::<Result<Vec<_>>>()?;
                (shared.to_json_object()?, headers)
            };

        let protected_json = serde_json::to_vec(&protected_object)
            .foreign_err(|| Error::Format(FormatError::Json("protected header".to_string())))?;
        let protected = utils::base64_url_encode(&protected_json);

        let aad = Jwe::authenticated_data(&protected, self.aad.as_deref());
        let encrypted = content::encrypt(&cek, &plaintext, aad.as_bytes())?;

        // the merged view is re-read from the wire objects, so it is exactly
        // what a parsing recipient will see
        let recipients = per_recipient
            .into_iter()
            .zip(encrypted_keys)
            .map(|(header, result)| {
                let merged_object = JoseHeader::merge_json_objects(&[
                    Some(&protected_object),
                    header.as_ref(),
                ])?;
                Ok(JweRecipient {
                    header,
                    merged: JoseHeader::from_json_object(&merged_object)?,
                    encrypted_key: result.encrypted_key,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Jwe {
            protected: Some(protected),
            unprotected: None,
            recipients,
            iv: encrypted.iv,
            ciphertext: encrypted.ciphertext,
            tag: encrypted.tag,
            aad: self.aad,
        })
    }
}

fn set_once<T: PartialEq>(slot: &mut Option<T>, value: T, name: &'static str) -> Result<()> {
    match slot {
        Some(existing) if *existing == value => Ok(()),
        Some(_) => Err(crate::error::root(ValidationError::FieldAlreadySet(name))),
        None => {
            *slot = Some(value);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        alg::EcCurve,
        jwk::tests::{generate_ec_key, generate_rsa_key},
    };

    fn oct_key(bytes: usize) -> WebKey {
        let mut raw = vec![0u8; bytes];
        openssl::rand::rand_bytes(&mut raw).unwrap();
        WebKey::builder().raw_key(raw).build().unwrap()
    }

    #[test]
    fn direct_recipient_must_be_sole() {
        let enc = ContentEncryptionAlgorithm::A128Gcm;
        let direct = oct_key(enc.key_len());
        let wrapping = oct_key(16);

        let error = Jwe::builder()
            .encryption(enc)
            .unwrap()
            .add_recipient(KeyManagementAlgorithm::Dir, &direct)
            .unwrap()
            .add_recipient(KeyManagementAlgorithm::A128Kw, &wrapping)
            .unwrap_err();
        assert!(matches!(
            error.error,
            Error::Validation(ValidationError::InconsistentRecipient("alg"))
        ));

        let error = Jwe::builder()
            .encryption(enc)
            .unwrap()
            .add_recipient(KeyManagementAlgorithm::A128Kw, &wrapping)
            .unwrap()
            .add_recipient(KeyManagementAlgorithm::Dir, &direct)
            .unwrap_err();
        assert!(matches!(
            error.error,
            Error::Validation(ValidationError::InconsistentRecipient("alg"))
        ));
    }

    #[test]
    fn recipient_disagreeing_on_enc_is_rejected() {
        let key = oct_key(16);
        let header = JoseHeader::builder()
            .encryption(ContentEncryptionAlgorithm::A256Gcm)
            .unwrap()
            .build()
            .unwrap();

        let error = Jwe::builder()
            .encryption(ContentEncryptionAlgorithm::A128Gcm)
            .unwrap()
            .add_recipient_with_header(KeyManagementAlgorithm::A128Kw, &key, header)
            .unwrap_err();
        assert!(matches!(
            error.error,
            Error::Validation(ValidationError::InconsistentRecipient("enc"))
        ));
    }

    #[test]
    fn recipient_declaring_the_agreed_enc_encrypts_fine() {
        let enc = ContentEncryptionAlgorithm::A128Gcm;
        let key = oct_key(16);
        let header = JoseHeader::builder().encryption(enc).unwrap().build().unwrap();

        let jwe = Jwe::builder()
            .encryption(enc)
            .unwrap()
            .plaintext(b"shared enc".to_vec())
            .add_recipient_with_header(KeyManagementAlgorithm::A128Kw, &key, header)
            .unwrap()
            .encrypt()
            .unwrap();

        assert_eq!(jwe.decrypt(&key, &[]).unwrap(), b"shared enc");
    }

    #[test]
    fn recipient_enc_added_before_the_builder_learns_it_is_still_checked() {
        let key = oct_key(16);
        let header = JoseHeader::builder()
            .encryption(ContentEncryptionAlgorithm::A256Gcm)
            .unwrap()
            .build()
            .unwrap();

        // the recipient goes in first, so nothing contradicts it yet
        let error = Jwe::builder()
            .add_recipient_with_header(KeyManagementAlgorithm::A128Kw, &key, header)
            .unwrap()
            .encryption(ContentEncryptionAlgorithm::A128Gcm)
            .unwrap()
            .plaintext(b"x".to_vec())
            .encrypt()
            .unwrap_err();
        assert!(matches!(
            error.error,
            Error::Validation(ValidationError::InconsistentRecipient("enc"))
        ));
    }

    #[test]
    fn recipient_declaring_zip_without_the_builder_is_rejected() {
        let key = oct_key(16);
        let header = JoseHeader::builder()
            .compression(CompressionAlgorithm::Deflate)
            .unwrap()
            .build()
            .unwrap();

        let error = Jwe::builder()
            .add_recipient_with_header(KeyManagementAlgorithm::A128Kw, &key, header)
            .unwrap()
            .encryption(ContentEncryptionAlgorithm::A128Gcm)
            .unwrap()
            .plaintext(b"x".to_vec())
            .encrypt()
            .unwrap_err();
        assert!(matches!(
            error.error,
            Error::Validation(ValidationError::InconsistentRecipient("zip"))
        ));
    }

    #[test]
    fn recipients_disagreeing_on_crit_are_rejected() {
        let key = oct_key(16);
        let header = JoseHeader::builder()
            .critical(vec!["hint".to_string()])
            .unwrap()
            .additional("hint".to_string(), "value".into())
            .unwrap()
            .build()
            .unwrap();

        let error = Jwe::builder()
            .encryption(ContentEncryptionAlgorithm::A128Gcm)
            .unwrap()
            .add_recipient(KeyManagementAlgorithm::A128Kw, &oct_key(16))
            .unwrap()
            .add_recipient_with_header(KeyManagementAlgorithm::A128Kw, &key, header)
            .unwrap_err();
        assert!(matches!(
            error.error,
            Error::Validation(ValidationError::InconsistentRecipient("crit"))
        ));
    }

    #[test]
    fn kid_mismatch_is_rejected() {
        let key = generate_rsa_key();
        let header = JoseHeader::builder()
            .key_id("somebody-else".to_string())
            .unwrap()
            .build()
            .unwrap();

        let error = Jwe::builder()
            .encryption(ContentEncryptionAlgorithm::A128Gcm)
            .unwrap()
            .add_recipient_with_header(KeyManagementAlgorithm::RsaOaep, &key, header)
            .unwrap_err();
        assert!(matches!(
            error.error,
            Error::Validation(ValidationError::KeyIdMismatch(_, _))
        ));
    }

    #[test]
    fn wrong_key_kind_is_rejected() {
        let ec = generate_ec_key(EcCurve::P256);

        let error = Jwe::builder()
            .encryption(ContentEncryptionAlgorithm::A128Gcm)
            .unwrap()
            .add_recipient(KeyManagementAlgorithm::RsaOaep, &ec)
            .unwrap_err();
        assert!(matches!(error.error, Error::Validation(_)));
    }

    #[test]
    fn missing_pieces_are_reported() {
        let error = Jwe::builder().encrypt().unwrap_err();
        assert!(matches!(
            error.error,
            Error::Validation(ValidationError::MissingField("plaintext"))
        ));

        let error = Jwe::builder().plaintext(b"x".to_vec()).encrypt().unwrap_err();
        assert!(matches!(
            error.error,
            Error::Validation(ValidationError::MissingField("enc"))
        ));

        let error = Jwe::builder()
            .plaintext(b"x".to_vec())
            .encryption(ContentEncryptionAlgorithm::A128Gcm)
            .unwrap()
            .encrypt()
            .unwrap_err();
        assert!(matches!(
            error.error,
            Error::Validation(ValidationError::MissingField("recipients"))
        ));
    }
}

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

//! The JOSE header, shared between JWS and JWE.

use std::str::FromStr;

use bherror::traits::{ForeignError as _, PropagateError as _};
use bhx5chain::{JwtX5Chain, X5Chain};
use iref::UriBuf;
use serde_json::{Map, Value};

use crate::{
    alg::{Algorithm, CompressionAlgorithm, ContentEncryptionAlgorithm},
    error::{Error, FormatError, Result, UnsupportedError, ValidationError},
    jwk::{KeySetClient, RemoteKeySets, WebKey},
    utils,
};

/// Header parameter names registered by RFC 7515 and RFC 7516 that this
/// implementation understands; everything else is an extended parameter.
const REGISTERED: &[&str] = &[
    "alg", "enc", "zip", "jku", "jwk", "kid", "x5u", "x5c", "x5t", "x5t#S256", "typ", "cty",
    "crit", "epk", "apu", "apv", "iv", "tag",
];

/// A JOSE header, as specified in [RFC 7515, section 4][1] and [RFC 7516,
/// section 4][2].
///
/// One `JoseHeader` is the *merged* view of a signature's or recipient's
/// header; how its parameters are split between the protected, shared and
/// per-recipient JSON objects on the wire is decided by the JWS/JWE engines
/// through [`JoseHeader::to_json_object_filtered`].
///
/// [1]: https://datatracker.ietf.org/doc/html/rfc7515#section-4
/// [2]: https://datatracker.ietf.org/doc/html/rfc7516#section-4
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoseHeader {
    pub(crate) algorithm: Option<Algorithm>,
    pub(crate) encryption: Option<ContentEncryptionAlgorithm>,
    pub(crate) compression: Option<CompressionAlgorithm>,
    pub(crate) key_id: Option<String>,
    pub(crate) key: Option<WebKey>,
    pub(crate) key_set_uri: Option<UriBuf>,
    pub(crate) object_type: Option<String>,
    pub(crate) content_type: Option<String>,
    pub(crate) certificate_uri: Option<UriBuf>,
    pub(crate) certificate_chain: Option<X5Chain>,
    pub(crate) certificate_thumbprint: Option<Vec<u8>>,
    pub(crate) certificate_sha256_thumbprint: Option<Vec<u8>>,
    pub(crate) critical: Option<Vec<String>>,
    pub(crate) ephemeral_key: Option<WebKey>,
    pub(crate) agreement_party_u_info: Option<Vec<u8>>,
    pub(crate) agreement_party_v_info: Option<Vec<u8>>,
    pub(crate) initialization_vector: Option<Vec<u8>>,
    pub(crate) authentication_tag: Option<Vec<u8>>,
    pub(crate) additional: Map<String, Value>,
}

impl JoseHeader {
    /// Start building a new header.
    pub fn builder() -> JoseHeaderBuilder {
        JoseHeaderBuilder::new()
    }

    /// The `alg` parameter, if present.
    pub fn algorithm(&self) -> Option<Algorithm> {
        self.algorithm
    }

    /// The `alg` parameter, required.
    pub(crate) fn require_algorithm(&self) -> Result<Algorithm> {
        self.algorithm
            .ok_or_else(|| crate::error::root(ValidationError::MissingField("alg")))
    }

    /// The `enc` parameter, if present.
    pub fn encryption(&self) -> Option<ContentEncryptionAlgorithm> {
        self.encryption
    }

    /// The `zip` parameter, if present.
    pub fn compression(&self) -> Option<CompressionAlgorithm> {
        self.compression
    }

    /// The `kid` parameter, if present.
    pub fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }

    /// The embedded public key (`jwk`), if present.
    pub fn key(&self) -> Option<&WebKey> {
        self.key.as_ref()
    }

    /// The JWK Set URI (`jku`), if present.
    pub fn key_set_uri(&self) -> Option<&iref::Uri> {
        self.key_set_uri.as_deref()
    }

    /// The `typ` parameter, if present.
    pub fn object_type(&self) -> Option<&str> {
        self.object_type.as_deref()
    }

    /// The `cty` parameter, if present.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// The certificate chain (`x5c`), if present.
    pub fn certificate_chain(&self) -> Option<&X5Chain> {
        self.certificate_chain.as_ref()
    }

    /// The critical parameter names (`crit`), if present.
    pub fn critical(&self) -> Option<&[String]> {
        self.critical.as_deref()
    }

    /// The ephemeral public key (`epk`) of an ECDH exchange, if present.
    pub fn ephemeral_key(&self) -> Option<&WebKey> {
        self.ephemeral_key.as_ref()
    }

    /// The decoded agreement PartyUInfo (`apu`), if present.
    pub fn agreement_party_u_info(&self) -> Option<&[u8]> {
        self.agreement_party_u_info.as_deref()
    }

    /// The decoded agreement PartyVInfo (`apv`), if present.
    pub fn agreement_party_v_info(&self) -> Option<&[u8]> {
        self.agreement_party_v_info.as_deref()
    }

    /// The decoded key-wrapping IV (`iv`) of the AES GCM key-wrap
    /// algorithms, if present.
    pub fn initialization_vector(&self) -> Option<&[u8]> {
        self.initialization_vector.as_deref()
    }

    /// The decoded key-wrapping authentication tag (`tag`) of the AES GCM
    /// key-wrap algorithms, if present.
    pub fn authentication_tag(&self) -> Option<&[u8]> {
        self.authentication_tag.as_deref()
    }

    /// The extended (non-registered) parameters.
    pub fn additional(&self) -> &Map<String, Value> {
        &self.additional
    }

    /// Fails unless every `crit` entry is named in `understood`.
    ///
    /// With no understood set supplied by the caller this rejects any header
    /// carrying `crit` at all, per [RFC 7515, section 4.1.11][1].
    ///
    /// [1]: https://datatracker.ietf.org/doc/html/rfc7515#section-4.1.11
    pub fn check_critical(&self, understood: &[&str]) -> Result<()> {
        for name in self.critical.iter().flatten() {
            if !understood.contains(&name.as_str()) {
                return Err(crate::error::root(UnsupportedError::CriticalParameter(
                    name.clone(),
                )));
            }
        }
        Ok(())
    }

    /// Resolves the key this header references, without network access.
    ///
    /// Sources, in order: the embedded `jwk` (checked against `kid` when both
    /// are present), then the leaf of the `x5c` chain (checked against any
    /// thumbprints).  Returns `Ok(None)` when the header names no key at all,
    /// so the caller can supply one out-of-band.
    pub fn resolve_key(&self) -> Result<Option<WebKey>> {
        if let Some(key) = &self.key {
            if let (Some(header_id), Some(key_id)) = (&self.key_id, key.id()) {
                if header_id != key_id {
                    return Err(crate::error::root(ValidationError::KeyIdMismatch(
                        header_id.clone(),
                        key_id.to_string(),
                    )));
                }
            }
            return Ok(Some(key.clone()));
        }

        if let Some(chain) = &self.certificate_chain {
            let mut builder = WebKey::builder().certificate_chain(chain.clone())?;
            if let Some(thumbprint) = &self.certificate_thumbprint {
                builder = builder.certificate_thumbprint(thumbprint.clone())?;
            }
            if let Some(thumbprint) = &self.certificate_sha256_thumbprint {
                builder = builder.certificate_sha256_thumbprint(thumbprint.clone())?;
            }
            if let Some(id) = &self.key_id {
                builder = builder.id(id.clone())?;
            }
            return builder.build().map(Some);
        }

        Ok(None)
    }

    /// Like [`resolve_key`][Self::resolve_key], but additionally tries a
    /// `kid` lookup against the `jku` key set, fetched through `remote`.
    pub fn resolve_key_with<C: KeySetClient>(
        &self,
        remote: &RemoteKeySets<C>,
    ) -> Result<Option<WebKey>> {
        if self.key.is_some() {
            return self.resolve_key();
        }

        if let (Some(uri), Some(id)) = (&self.key_set_uri, &self.key_id) {
            return remote.key_by_id(uri, id).map(Some);
        }

        self.resolve_key()
    }

    /// Serializes the full header as a JSON object.
    pub fn to_json_object(&self) -> Result<Map<String, Value>> {
        self.to_json_object_filtered(|_| true)
    }

    /// Serializes the parameters whose names satisfy `include`.
    ///
    /// This filter is how one logical header is split into the protected,
    /// shared and per-recipient objects of a JSON serialization.
    pub(crate) fn to_json_object_filtered(
        &self,
        include: impl Fn(&str) -> bool,
    ) -> Result<Map<String, Value>> {
        let mut object = Map::new();

        let mut put = |name: &str, value: Value| {
            if include(name) {
                object.insert(name.to_string(), value);
            }
        };

        if let Some(algorithm) = &self.algorithm {
            put("alg", algorithm.as_str().into());
        }
        if let Some(encryption) = &self.encryption {
            put("enc", encryption.as_str().into());
        }
        if let Some(compression) = &self.compression {
            put("zip", compression.as_str().into());
        }
        if let Some(uri) = &self.key_set_uri {
            put("jku", uri.to_string().into());
        }
        if let Some(key) = &self.key {
            put("jwk", Value::Object(key.to_json_object()?));
        }
        if let Some(id) = &self.key_id {
            put("kid", id.clone().into());
        }
        if let Some(uri) = &self.certificate_uri {
            put("x5u", uri.to_string().into());
        }
        if let Some(chain) = &self.certificate_chain {
            let jwt_chain = JwtX5Chain::try_from(chain.clone())
                .with_err(|| Error::Format(FormatError::Json("x5c".to_string())))?;
            let certs = serde_json::to_value(jwt_chain)
                .foreign_err(|| Error::Format(FormatError::Json("x5c".to_string())))?;
            put("x5c", certs);
        }
        if let Some(thumbprint) = &self.certificate_thumbprint {
            put("x5t", utils::base64_url_encode(thumbprint).into());
        }
        if let Some(thumbprint) = &self.certificate_sha256_thumbprint {
            put("x5t#S256", utils::base64_url_encode(thumbprint).into());
        }
        if let Some(object_type) = &self.object_type {
            put("typ", object_type.clone().into());
        }
        if let Some(content_type) = &self.content_type {
            put("cty", content_type.clone().into());
        }
        if let Some(critical) = &self.critical {
            let names: Vec<Value> = critical.iter().map(|name| name.clone().into()).collect();
            put("crit", Value::Array(names));
        }
        if let Some(key) = &self.ephemeral_key {
            put("epk", Value::Object(key.to_json_object()?));
        }
        if let Some(info) = &self.agreement_party_u_info {
            put("apu", utils::base64_url_encode(info).into());
        }
        if let Some(info) = &self.agreement_party_v_info {
            put("apv", utils::base64_url_encode(info).into());
        }
        if let Some(iv) = &self.initialization_vector {
            put("iv", utils::base64_url_encode(iv).into());
        }
        if let Some(tag) = &self.authentication_tag {
            put("tag", utils::base64_url_encode(tag).into());
        }

        for (name, value) in &self.additional {
            if include(name) {
                object.insert(name.clone(), value.clone());
            }
        }

        Ok(object)
    }

    /// Parses a JSON object into a header, with full validation.
    pub fn from_json_object(object: &Map<String, Value>) -> Result<JoseHeader> {
        let mut builder = JoseHeader::builder();

        for (name, value) in object {
            builder = match name.as_str() {
                "alg" => builder.algorithm(parse_with(name, value, Algorithm::from_str)?)?,
                "enc" => builder
                    .encryption(parse_with(name, value, ContentEncryptionAlgorithm::from_str)?)?,
                "zip" => builder
                    .compression(parse_with(name, value, CompressionAlgorithm::from_str)?)?,
                "jku" => builder.key_set_uri(parse_uri(name, value)?)?,
                "jwk" => builder.key(parse_key(name, value)?)?,
                "kid" => builder.key_id(parse_string(name, value)?)?,
                "x5u" => builder.certificate_uri(parse_uri(name, value)?)?,
                "x5c" => {
                    let jwt_chain: JwtX5Chain = serde_json::from_value(value.clone())
                        .foreign_err(|| value_error(name))?;
                    let chain: X5Chain = jwt_chain.try_into().with_err(|| value_error(name))?;
                    builder.certificate_chain(chain)?
                }
                "x5t" => builder
                    .certificate_thumbprint(utils::base64_url_decode(parse_str(name, value)?)?)?,
                "x5t#S256" => builder.certificate_sha256_thumbprint(utils::base64_url_decode(
                    parse_str(name, value)?,
                )?)?,
                "typ" => builder.object_type(parse_string(name, value)?)?,
                "cty" => builder.content_type(parse_string(name, value)?)?,
                "crit" => builder.critical(parse_critical(value)?)?,
                "epk" => builder.ephemeral_key(parse_key(name, value)?)?,
                "apu" => builder.agreement_party_u_info(utils::base64_url_decode(parse_str(
                    name, value,
                )?)?)?,
                "apv" => builder.agreement_party_v_info(utils::base64_url_decode(parse_str(
                    name, value,
                )?)?)?,
                "iv" => builder
                    .initialization_vector(utils::base64_url_decode(parse_str(name, value)?)?),
                "tag" => builder
                    .authentication_tag(utils::base64_url_decode(parse_str(name, value)?)?),
                _ => builder.additional(name.clone(), value.clone())?,
            };
        }

        builder.build()
    }

    /// Merges the protected, shared and per-recipient header objects of a
    /// JSON serialization into one object.
    ///
    /// A parameter name appearing in more than one source is an error, per
    /// [RFC 7516, section 5.2][1] step 4.
    ///
    /// [1]: https://datatracker.ietf.org/doc/html/rfc7516#section-5.2
    pub(crate) fn merge_json_objects(
        sources: &[Option<&Map<String, Value>>],
    ) -> Result<Map<String, Value>> {
        let mut merged = Map::new();

        for source in sources.iter().flatten() {
            for (name, value) in *source {
                if merged.insert(name.clone(), value.clone()).is_some() {
                    return Err(crate::error::root(
                        ValidationError::DuplicateHeaderParameter(name.clone()),
                    ));
                }
            }
        }

        Ok(merged)
    }
}

fn value_error(name: &str) -> Error {
    Error::Format(FormatError::Json(format!("invalid \"{name}\" value")))
}

fn parse_str<'a>(name: &str, value: &'a Value) -> Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| bherror::Error::root(value_error(name)))
}

fn parse_string(name: &str, value: &Value) -> Result<String> {
    parse_str(name, value).map(str::to_string)
}

fn parse_with<T, E: bherror::BhError>(
    name: &str,
    value: &Value,
    parse: impl FnOnce(&str) -> bherror::Result<T, E>,
) -> Result<T> {
    let text = parse_str(name, value)?;
    parse(text).with_err(|| value_error(name))
}

fn parse_uri(name: &str, value: &Value) -> Result<UriBuf> {
    let text = parse_str(name, value)?;
    UriBuf::new(text.as_bytes().to_vec())
        .map_err(|_| bherror::Error::root(value_error(name)))
}

fn parse_key(name: &str, value: &Value) -> Result<WebKey> {
    let object = value
        .as_object()
        .ok_or_else(|| bherror::Error::root(value_error(name)))?;
    WebKey::from_json_object(object)
}

fn parse_critical(value: &Value) -> Result<Vec<String>> {
    let entries = value
        .as_array()
        .ok_or_else(|| bherror::Error::root(value_error("crit")))?;

    // RFC 7515 forbids an empty crit array
    if entries.is_empty() {
        return Err(bherror::Error::root(value_error("crit")));
    }

    entries
        .iter()
        .map(|entry| parse_string("crit", entry))
        .collect()
}

/// Builder for a [`JoseHeader`].
///
/// All setters are set-once; a conflicting re-assignment fails immediately.
/// Cross-parameter rules are enforced in [`build`][JoseHeaderBuilder::build].
#[derive(Default)]
pub struct JoseHeaderBuilder {
    algorithm: Option<Algorithm>,
    encryption: Option<ContentEncryptionAlgorithm>,
    compression: Option<CompressionAlgorithm>,
    key_id: Option<String>,
    key: Option<WebKey>,
    key_set_uri: Option<UriBuf>,
    object_type: Option<String>,
    content_type: Option<String>,
    certificate_uri: Option<UriBuf>,
    certificate_chain: Option<X5Chain>,
    certificate_thumbprint: Option<Vec<u8>>,
    certificate_sha256_thumbprint: Option<Vec<u8>>,
    critical: Option<Vec<String>>,
    ephemeral_key: Option<WebKey>,
    agreement_party_u_info: Option<Vec<u8>>,
    agreement_party_v_info: Option<Vec<u8>>,
    initialization_vector: Option<Vec<u8>>,
    authentication_tag: Option<Vec<u8>>,
    additional: Map<String, Value>,
}

fn set_once<T: PartialEq>(slot: &mut Option<T>, value: T, name: &'static str) -> Result<()> {
    match slot {
        Some(existing) if *existing != value => {
            Err(crate::error::root(ValidationError::FieldAlreadySet(name)))
        }
        _ => {
            *slot = Some(value);
            Ok(())
        }
    }
}

impl JoseHeaderBuilder {
    fn new() -> Self {
        Self::default()
    }

    /// Sets the `alg` parameter.
    pub fn algorithm(mut self, algorithm: impl Into<Algorithm>) -> Result<Self> {
        set_once(&mut self.algorithm, algorithm.into(), "alg")?;
        Ok(self)
    }

    /// Sets the `enc` parameter.
    pub fn encryption(mut self, encryption: ContentEncryptionAlgorithm) -> Result<Self> {
        set_once(&mut self.encryption, encryption, "enc")?;
        Ok(self)
    }

    /// Sets the `zip` parameter.
    pub fn compression(mut self, compression: CompressionAlgorithm) -> Result<Self> {
        set_once(&mut self.compression, compression, "zip")?;
        Ok(self)
    }

    /// Sets the `kid` parameter.
    pub fn key_id(mut self, id: String) -> Result<Self> {
        set_once(&mut self.key_id, id, "kid")?;
        Ok(self)
    }

    /// Embeds the public projection of `key` as the `jwk` parameter.
    ///
    /// Raw symmetric keys are refused, since they have no public projection.
    pub fn key(mut self, key: WebKey) -> Result<Self> {
        let key = if key.has_private_key() { key.to_public()? } else { key };
        set_once(&mut self.key, key, "jwk")?;
        Ok(self)
    }

    /// Sets the `jku` parameter.
    pub fn key_set_uri(mut self, uri: UriBuf) -> Result<Self> {
        set_once(&mut self.key_set_uri, uri, "jku")?;
        Ok(self)
    }

    /// Sets the `typ` parameter.
    pub fn object_type(mut self, object_type: String) -> Result<Self> {
        set_once(&mut self.object_type, object_type, "typ")?;
        Ok(self)
    }

    /// Sets the `cty` parameter.
    pub fn content_type(mut self, content_type: String) -> Result<Self> {
        set_once(&mut self.content_type, content_type, "cty")?;
        Ok(self)
    }

    /// Sets the `x5u` parameter.
    pub fn certificate_uri(mut self, uri: UriBuf) -> Result<Self> {
        set_once(&mut self.certificate_uri, uri, "x5u")?;
        Ok(self)
    }

    /// Sets the `x5c` parameter.
    pub fn certificate_chain(mut self, chain: X5Chain) -> Result<Self> {
        set_once(&mut self.certificate_chain, chain, "x5c")?;
        Ok(self)
    }

    /// Sets the `x5t` parameter.
    pub fn certificate_thumbprint(mut self, thumbprint: Vec<u8>) -> Result<Self> {
        set_once(&mut self.certificate_thumbprint, thumbprint, "x5t")?;
        Ok(self)
    }

    /// Sets the `x5t#S256` parameter.
    pub fn certificate_sha256_thumbprint(mut self, thumbprint: Vec<u8>) -> Result<Self> {
        set_once(
            &mut self.certificate_sha256_thumbprint,
            thumbprint,
            "x5t#S256",
        )?;
        Ok(self)
    }

    /// Sets the `crit` parameter.
    pub fn critical(mut self, names: Vec<String>) -> Result<Self> {
        set_once(&mut self.critical, names, "crit")?;
        Ok(self)
    }

    /// Sets the `epk` parameter to the public projection of `key`.
    pub fn ephemeral_key(mut self, key: WebKey) -> Result<Self> {
        let key = if key.has_private_key() { key.to_public()? } else { key };
        set_once(&mut self.ephemeral_key, key, "epk")?;
        Ok(self)
    }

    /// Sets the `apu` parameter (raw, not yet base64url-encoded).
    pub fn agreement_party_u_info(mut self, info: Vec<u8>) -> Result<Self> {
        set_once(&mut self.agreement_party_u_info, info, "apu")?;
        Ok(self)
    }

    /// Sets the `apv` parameter (raw, not yet base64url-encoded).
    pub fn agreement_party_v_info(mut self, info: Vec<u8>) -> Result<Self> {
        set_once(&mut self.agreement_party_v_info, info, "apv")?;
        Ok(self)
    }

    /// Sets the per-recipient `iv` of an AES-GCM key wrap.
    pub(crate) fn initialization_vector(mut self, iv: Vec<u8>) -> Self {
        self.initialization_vector = Some(iv);
        self
    }

    /// Sets the per-recipient `tag` of an AES-GCM key wrap.
    pub(crate) fn authentication_tag(mut self, tag: Vec<u8>) -> Self {
        self.authentication_tag = Some(tag);
        self
    }

    /// Adds an extended parameter; registered names are refused.
    pub fn additional(mut self, name: String, value: Value) -> Result<Self> {
        if REGISTERED.contains(&name.as_str()) {
            return Err(crate::error::root(ValidationError::FieldAlreadySet(
                "registered parameter passed as additional",
            )));
        }
        match self.additional.get(&name) {
            Some(existing) if *existing != value => {
                return Err(crate::error::root(ValidationError::FieldAlreadySet(
                    "additional parameter",
                )))
            }
            _ => {
                self.additional.insert(name, value);
            }
        }
        Ok(self)
    }

    /// Validates all cross-parameter rules and produces the header.
    pub fn build(self) -> Result<JoseHeader> {
        // encryption-only parameters require an encryption algorithm
        if matches!(self.algorithm, Some(Algorithm::Signature(_))) {
            let encryption_only: [(&'static str, bool); 7] = [
                ("enc", self.encryption.is_some()),
                ("zip", self.compression.is_some()),
                ("epk", self.ephemeral_key.is_some()),
                ("apu", self.agreement_party_u_info.is_some()),
                ("apv", self.agreement_party_v_info.is_some()),
                ("iv", self.initialization_vector.is_some()),
                ("tag", self.authentication_tag.is_some()),
            ];
            for (name, present) in encryption_only {
                if present {
                    return Err(crate::error::root(
                        ValidationError::EncryptionParameterOnSignature(name),
                    ));
                }
            }
        }

        // kid and an embedded key must agree
        if let (Some(header_id), Some(key)) = (&self.key_id, &self.key) {
            if let Some(key_id) = key.id() {
                if header_id != key_id {
                    return Err(crate::error::root(ValidationError::KeyIdMismatch(
                        header_id.clone(),
                        key_id.to_string(),
                    )));
                }
            }
        }

        // crit entries must be extension names actually present
        for name in self.critical.iter().flatten() {
            if REGISTERED.contains(&name.as_str()) {
                return Err(crate::error::root(
                    ValidationError::DuplicateHeaderParameter(name.clone()),
                ));
            }
            if !self.additional.contains_key(name) {
                return Err(crate::error::root(ValidationError::MissingField("crit")));
            }
        }

        Ok(JoseHeader {
            algorithm: self.algorithm,
            encryption: self.encryption,
            compression: self.compression,
            key_id: self.key_id,
            key: self.key,
            key_set_uri: self.key_set_uri,
            object_type: self.object_type,
            content_type: self.content_type,
            certificate_uri: self.certificate_uri,
            certificate_chain: self.certificate_chain,
            certificate_thumbprint: self.certificate_thumbprint,
            certificate_sha256_thumbprint: self.certificate_sha256_thumbprint,
            critical: self.critical,
            ephemeral_key: self.ephemeral_key,
            agreement_party_u_info: self.agreement_party_u_info,
            agreement_party_v_info: self.agreement_party_v_info,
            initialization_vector: self.initialization_vector,
            authentication_tag: self.authentication_tag,
            additional: self.additional,
        })
    }
}

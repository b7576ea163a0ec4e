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

mod builder;
mod pem;
mod set;

pub use builder::WebKeyBuilder;
pub use set::*;

use std::str::FromStr;

use bherror::traits::{ForeignError as _, PropagateError as _};
use bhx5chain::{JwtX5Chain, X5Chain};
use iref::UriBuf;
use openssl::{
    bn::{BigNum, BigNumContext},
    ec::{EcGroup, EcKey},
    nid::Nid,
    pkey::{PKey, Private, Public},
    rsa::Rsa,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    alg::{Algorithm, EcCurve, KeyKind, KeyUse},
    error::{CryptoError, Error, FormatError, Result, ValidationError},
    utils::{self, digest},
};

/// A JWK as a plain JSON object, the shape keys travel in on the wire.
pub type JwkObject = Map<String, Value>;

/// The type of key material a [`WebKey`] carries, JWK `"kty"` (plus the
/// curve for EC keys).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    /// An elliptic-curve key on the given curve.
    Ec(EcCurve),
    /// An RSA key.
    Rsa,
    /// An RSA key restricted to RSASSA-PSS signatures.
    RsaPss,
    /// Raw symmetric bytes.
    Oct,
}

impl KeyType {
    /// The JWK `"kty"` value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ec(_) => "EC",
            Self::Rsa => "RSA",
            Self::RsaPss => "RSASSA-PSS",
            Self::Oct => "oct",
        }
    }

    /// The [`KeyKind`] this type satisfies when matched against an
    /// algorithm's requirement.
    pub(crate) fn kind(&self) -> KeyKind {
        match self {
            Self::Ec(curve) => KeyKind::Ec(*curve),
            Self::Rsa => KeyKind::Rsa,
            Self::RsaPss => KeyKind::RsaPss,
            Self::Oct => KeyKind::Oct,
        }
    }
}

impl std::fmt::Display for KeyType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Ec(curve) => write!(f, "EC ({curve})"),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

/// JWK `"key_ops"` values, as specified in [RFC 7517, section 4.3][1].
///
/// [1]: https://datatracker.ietf.org/doc/html/rfc7517#section-4.3
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyOperation {
    /// Compute a digital signature or MAC.
    Sign,
    /// Verify a digital signature or MAC.
    Verify,
    /// Encrypt content.
    Encrypt,
    /// Decrypt content.
    Decrypt,
    /// Encrypt a key.
    WrapKey,
    /// Decrypt a key.
    UnwrapKey,
    /// Derive a key.
    DeriveKey,
    /// Derive bits not to be used as a key.
    DeriveBits,
}

/// The key material behind a [`WebKey`].
#[derive(Clone)]
pub(crate) enum KeyMaterial {
    /// Raw symmetric bytes.
    Raw(Vec<u8>),
    /// An RSA key; the private half is optional.
    Rsa {
        pss: bool,
        public: Rsa<Public>,
        private: Option<Rsa<Private>>,
    },
    /// An EC key; the private half is optional.
    Ec {
        curve: EcCurve,
        public: EcKey<Public>,
        private: Option<EcKey<Private>>,
    },
}

impl KeyMaterial {
    pub(crate) fn key_type(&self) -> KeyType {
        match self {
            Self::Raw(_) => KeyType::Oct,
            Self::Rsa { pss: false, .. } => KeyType::Rsa,
            Self::Rsa { pss: true, .. } => KeyType::RsaPss,
            Self::Ec { curve, .. } => KeyType::Ec(*curve),
        }
    }

    fn has_private(&self) -> bool {
        match self {
            Self::Raw(_) => true,
            Self::Rsa { private, .. } => private.is_some(),
            Self::Ec { private, .. } => private.is_some(),
        }
    }

    /// The SubjectPublicKeyInfo DER of the public half, used for equality
    /// checks against certificates and between pair halves.
    pub(crate) fn public_der(&self) -> Result<Option<Vec<u8>>> {
        let backend = || Error::Crypto(CryptoError::CryptoBackend);
        let pkey = match self {
            Self::Raw(_) => return Ok(None),
            Self::Rsa { public, .. } => PKey::from_rsa(public.clone()).foreign_err(backend)?,
            Self::Ec { public, .. } => PKey::from_ec_key(public.clone()).foreign_err(backend)?,
        };
        let der = pkey.public_key_to_der().foreign_err(backend)?;
        Ok(Some(der))
    }
}

// openssl key types do not implement Debug; print only the shape.
impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Raw(bytes) => write!(f, "Raw({} bytes)", bytes.len()),
            Self::Rsa { pss, private, .. } => {
                write!(f, "Rsa {{ pss: {pss}, private: {} }}", private.is_some())
            }
            Self::Ec { curve, private, .. } => {
                write!(f, "Ec {{ curve: {curve}, private: {} }}", private.is_some())
            }
        }
    }
}

/// An immutable JSON Web Key, as specified in [RFC 7517][1].
///
/// A `WebKey` is only ever produced by a [`WebKeyBuilder`] (or parsed off the
/// wire, which routes through the same builder and therefore the same
/// validation); once built it cannot be mutated.  The JWK wire form is
/// available through [`serde`] or [`WebKey::to_json_object`], and a
/// public-only projection for embedding in outbound headers through
/// [`WebKey::to_public`].
///
/// [1]: https://datatracker.ietf.org/doc/html/rfc7517
#[derive(Debug, Clone)]
pub struct WebKey {
    pub(crate) id: Option<String>,
    pub(crate) key_use: Option<KeyUse>,
    pub(crate) algorithm: Option<Algorithm>,
    pub(crate) key_operations: Option<Vec<KeyOperation>>,
    pub(crate) material: KeyMaterial,
    pub(crate) certificate_uri: Option<UriBuf>,
    pub(crate) certificate_chain: Option<X5Chain>,
    pub(crate) certificate_thumbprint: Option<Vec<u8>>,
    pub(crate) certificate_sha256_thumbprint: Option<Vec<u8>>,
}

impl WebKey {
    /// Start building a new key.
    pub fn builder() -> WebKeyBuilder {
        WebKeyBuilder::new()
    }

    /// The key id (`kid`), if any.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// The key type.
    pub fn key_type(&self) -> KeyType {
        self.material.key_type()
    }

    /// The intended use (`use`), if declared.
    pub fn key_use(&self) -> Option<KeyUse> {
        self.key_use
    }

    /// The declared algorithm (`alg`), if any.
    pub fn algorithm(&self) -> Option<Algorithm> {
        self.algorithm
    }

    /// The permitted operations (`key_ops`), if declared.
    pub fn key_operations(&self) -> Option<&[KeyOperation]> {
        self.key_operations.as_deref()
    }

    /// The certificate chain (`x5c`), if any.
    pub fn certificate_chain(&self) -> Option<&X5Chain> {
        self.certificate_chain.as_ref()
    }

    /// The certificate chain URI (`x5u`), if any.
    pub fn certificate_uri(&self) -> Option<&iref::Uri> {
        self.certificate_uri.as_deref()
    }

    /// Whether private key material is present (always `true` for raw keys).
    pub fn has_private_key(&self) -> bool {
        self.material.has_private()
    }

    /// Whether this key may be used with the given algorithm.
    ///
    /// Checks the declared `alg` (if any) for equality and the key's type
    /// against the algorithm's key requirement.
    pub(crate) fn check_algorithm(&self, algorithm: Algorithm) -> Result<()> {
        let mismatch =
            || crate::error::root(ValidationError::AlgorithmKeyMismatch(algorithm.to_string()));

        if let Some(declared) = self.algorithm {
            if declared != algorithm {
                return Err(mismatch());
            }
        }
        if let Some(declared_use) = self.key_use {
            if declared_use != algorithm.key_use() {
                return Err(mismatch());
            }
        }
        if let Some(kind) = algorithm.key_kind() {
            // A plain RSA key may serve a PSS algorithm; an RSASSA-PSS
            // restricted key never serves a PKCS#1 v1.5 one.
            let actual = self.key_type().kind();
            let compatible = match (kind, actual) {
                (KeyKind::Rsa, KeyKind::RsaPss) => false,
                (KeyKind::RsaPss, KeyKind::Rsa) => true,
                (expected, actual) => expected == actual,
            };
            if !compatible {
                return Err(mismatch());
            }
        }
        Ok(())
    }

    /// Raw symmetric bytes, for `oct` keys.
    pub(crate) fn raw_bytes(&self) -> Option<&[u8]> {
        match &self.material {
            KeyMaterial::Raw(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// The EC curve, for EC keys.
    pub(crate) fn ec_curve(&self) -> Option<EcCurve> {
        match &self.material {
            KeyMaterial::Ec { curve, .. } => Some(*curve),
            _ => None,
        }
    }

    pub(crate) fn ec_public(&self) -> Option<&EcKey<Public>> {
        match &self.material {
            KeyMaterial::Ec { public, .. } => Some(public),
            _ => None,
        }
    }

    pub(crate) fn ec_private(&self) -> Option<&EcKey<Private>> {
        match &self.material {
            KeyMaterial::Ec { private, .. } => private.as_ref(),
            _ => None,
        }
    }

    pub(crate) fn rsa_public(&self) -> Option<&Rsa<Public>> {
        match &self.material {
            KeyMaterial::Rsa { public, .. } => Some(public),
            _ => None,
        }
    }

    pub(crate) fn rsa_private(&self) -> Option<&Rsa<Private>> {
        match &self.material {
            KeyMaterial::Rsa { private, .. } => private.as_ref(),
            _ => None,
        }
    }

    /// The public-only projection of this key, safe for embedding in an
    /// outbound header.
    ///
    /// Strips the private RSA/EC parameters; raw symmetric keys have no
    /// public part and are refused outright.
    pub fn to_public(&self) -> Result<WebKey> {
        let material = match &self.material {
            KeyMaterial::Raw(_) => {
                return Err(crate::error::root(ValidationError::InvalidKey(
                    "raw keys have no public projection".to_string(),
                )))
            }
            KeyMaterial::Rsa { pss, public, .. } => KeyMaterial::Rsa {
                pss: *pss,
                public: public.clone(),
                private: None,
            },
            KeyMaterial::Ec { curve, public, .. } => KeyMaterial::Ec {
                curve: *curve,
                public: public.clone(),
                private: None,
            },
        };

        Ok(WebKey {
            material,
            ..self.clone()
        })
    }

    /// Serializes the key as a JWK JSON object, private parameters included
    /// when present.
    pub fn to_json_object(&self) -> Result<JwkObject> {
        let mut jwk = JwkObject::new();

        jwk.insert("kty".to_string(), self.key_type().as_str().into());

        match &self.material {
            KeyMaterial::Raw(bytes) => {
                jwk.insert("k".to_string(), utils::base64_url_encode(bytes).into());
            }
            KeyMaterial::Rsa { public, private, .. } => {
                jwk.insert("n".to_string(), utils::base64_url_uint(public.n()).into());
                jwk.insert("e".to_string(), utils::base64_url_uint(public.e()).into());

                if let Some(private) = private {
                    jwk.insert("d".to_string(), utils::base64_url_uint(private.d()).into());
                    let crt = [
                        ("p", private.p()),
                        ("q", private.q()),
                        ("dp", private.dmp1()),
                        ("dq", private.dmq1()),
                        ("qi", private.iqmp()),
                    ];
                    for (name, value) in crt {
                        if let Some(value) = value {
                            jwk.insert(name.to_string(), utils::base64_url_uint(value).into());
                        }
                    }
                }
            }
            KeyMaterial::Ec {
                curve,
                public,
                private,
            } => {
                let (x, y) = ec_affine_coordinates(public, *curve)?;
                jwk.insert("crv".to_string(), curve.as_str().into());
                jwk.insert("x".to_string(), utils::base64_url_encode(&x).into());
                jwk.insert("y".to_string(), utils::base64_url_encode(&y).into());

                if let Some(private) = private {
                    let d = private
                        .private_key()
                        .to_vec_padded(curve.coordinate_len() as i32)
                        .foreign_err(|| Error::Crypto(CryptoError::CryptoBackend))?;
                    jwk.insert("d".to_string(), utils::base64_url_encode(&d).into());
                }
            }
        }

        if let Some(key_use) = &self.key_use {
            jwk.insert("use".to_string(), key_use.to_string().into());
        }
        if let Some(algorithm) = &self.algorithm {
            jwk.insert("alg".to_string(), algorithm.as_str().into());
        }
        if let Some(key_ops) = &self.key_operations {
            let ops = serde_json::to_value(key_ops)
                .foreign_err(|| Error::Format(FormatError::Json("key_ops".to_string())))?;
            jwk.insert("key_ops".to_string(), ops);
        }
        if let Some(id) = &self.id {
            jwk.insert("kid".to_string(), id.clone().into());
        }
        if let Some(uri) = &self.certificate_uri {
            jwk.insert("x5u".to_string(), uri.to_string().into());
        }
        if let Some(chain) = &self.certificate_chain {
            let jwt_chain = JwtX5Chain::try_from(chain.clone())
                .with_err(|| Error::Format(FormatError::Json("x5c".to_string())))?;
            let certs = serde_json::to_value(jwt_chain)
                .foreign_err(|| Error::Format(FormatError::Json("x5c".to_string())))?;
            jwk.insert("x5c".to_string(), certs);
        }
        if let Some(thumbprint) = &self.certificate_thumbprint {
            jwk.insert("x5t".to_string(), utils::base64_url_encode(thumbprint).into());
        }
        if let Some(thumbprint) = &self.certificate_sha256_thumbprint {
            jwk.insert(
                "x5t#S256".to_string(),
                utils::base64_url_encode(thumbprint).into(),
            );
        }

        Ok(jwk)
    }

    /// Parses a JWK JSON object into a key.
    ///
    /// The resulting key passes through [`WebKeyBuilder::build`], so all
    /// cross-field invariants are enforced on parsed input too.
    pub fn from_json_object(jwk: &JwkObject) -> Result<WebKey> {
        let mut builder = WebKey::builder();

        let kty = string_field(jwk, "kty")?
            .ok_or_else(|| crate::error::root(FormatError::JwkParsingFailed(
                "missing \"kty\" field".to_string(),
            )))?;

        match kty {
            "oct" => {
                let k = required_string_field(jwk, "k")?;
                builder = builder.raw_key(utils::base64_url_decode(k)?);
            }
            "RSA" | "RSASSA-PSS" => {
                let n = utils::base64_url_uint_decode(required_string_field(jwk, "n")?)?;
                let e = utils::base64_url_uint_decode(required_string_field(jwk, "e")?)?;

                if let Some(d) = string_field(jwk, "d")? {
                    let d = utils::base64_url_uint_decode(d)?;
                    let private = rsa_private_from_params(jwk, n, e, d)?;
                    builder = builder.rsa_private_key(private);
                } else {
                    let public = Rsa::from_public_components(n, e)
                        .foreign_err(|| Error::Crypto(CryptoError::CryptoBackend))?;
                    builder = builder.rsa_public_key(public);
                }
                if kty == "RSASSA-PSS" {
                    builder = builder.rsa_pss();
                }
            }
            "EC" => {
                let curve = match required_string_field(jwk, "crv")? {
                    "P-256" => EcCurve::P256,
                    "P-384" => EcCurve::P384,
                    "P-521" => EcCurve::P521,
                    other => {
                        return Err(crate::error::root(FormatError::JwkParsingFailed(format!(
                            "unsupported curve \"{other}\""
                        ))))
                    }
                };
                let x = utils::base64_url_uint_decode(required_string_field(jwk, "x")?)?;
                let y = utils::base64_url_uint_decode(required_string_field(jwk, "y")?)?;

                let group = curve_group(curve)?;
                let public = EcKey::from_public_key_affine_coordinates(&group, &x, &y)
                    .foreign_err(|| {
                        Error::Format(FormatError::JwkParsingFailed(
                            "invalid EC coordinates".to_string(),
                        ))
                    })?;

                // the private scalar, when present, is checked against the
                // declared coordinates at build() time
                if let Some(d) = string_field(jwk, "d")? {
                    let d = utils::base64_url_uint_decode(d)?;
                    let private =
                        EcKey::from_private_components(&group, &d, public.public_key())
                            .foreign_err(|| {
                                Error::Format(FormatError::JwkParsingFailed(
                                    "invalid EC private key".to_string(),
                                ))
                            })?;
                    builder = builder.ec_private_key(private)?;
                }
                builder = builder.ec_public_key(public)?;
            }
            other => {
                return Err(crate::error::root(FormatError::JwkParsingFailed(format!(
                    "unsupported key type \"{other}\""
                ))))
            }
        }

        if let Some(id) = string_field(jwk, "kid")? {
            builder = builder.id(id.to_string())?;
        }
        if let Some(key_use) = jwk.get("use") {
            let key_use: KeyUse = serde_json::from_value(key_use.clone())
                .foreign_err(|| Error::Format(FormatError::JwkParsingFailed(
                    "invalid \"use\" value".to_string(),
                )))?;
            builder = builder.key_use(key_use)?;
        }
        if let Some(alg) = string_field(jwk, "alg")? {
            builder = builder.algorithm(Algorithm::from_str(alg).with_err(|| {
                Error::Unsupported(crate::error::UnsupportedError::Algorithm(alg.to_string()))
            })?)?;
        }
        if let Some(key_ops) = jwk.get("key_ops") {
            let key_ops: Vec<KeyOperation> = serde_json::from_value(key_ops.clone())
                .foreign_err(|| Error::Format(FormatError::JwkParsingFailed(
                    "invalid \"key_ops\" value".to_string(),
                )))?;
            builder = builder.key_operations(key_ops)?;
        }
        if let Some(uri) = string_field(jwk, "x5u")? {
            let uri = UriBuf::new(uri.as_bytes().to_vec()).map_err(|_| {
                crate::error::root(FormatError::JwkParsingFailed("invalid \"x5u\" URI".to_string()))
            })?;
            builder = builder.certificate_uri(uri)?;
        }
        if let Some(x5c) = jwk.get("x5c") {
            let jwt_chain: JwtX5Chain = serde_json::from_value(x5c.clone())
                .foreign_err(|| Error::Format(FormatError::JwkParsingFailed(
                    "invalid \"x5c\" value".to_string(),
                )))?;
            let chain: X5Chain = jwt_chain.try_into().with_err(|| {
                Error::Format(FormatError::JwkParsingFailed("invalid \"x5c\" chain".to_string()))
            })?;
            builder = builder.certificate_chain(chain)?;
        }
        if let Some(thumbprint) = string_field(jwk, "x5t")? {
            builder = builder.certificate_thumbprint(utils::base64_url_decode(thumbprint)?)?;
        }
        if let Some(thumbprint) = string_field(jwk, "x5t#S256")? {
            builder =
                builder.certificate_sha256_thumbprint(utils::base64_url_decode(thumbprint)?)?;
        }

        builder.build()
    }

    /// SHA-1 thumbprint over the DER encoding of the first chain element.
    pub fn leaf_thumbprint_sha1(&self) -> Result<Option<[u8; 20]>> {
        Ok(self.leaf_der()?.map(digest::sha1))
    }

    /// SHA-256 thumbprint over the DER encoding of the first chain element.
    pub fn leaf_thumbprint_sha256(&self) -> Result<Option<[u8; 32]>> {
        Ok(self.leaf_der()?.map(digest::sha256))
    }

    fn leaf_der(&self) -> Result<Option<Vec<u8>>> {
        self.certificate_chain
            .as_ref()
            .map(|chain| {
                chain
                    .leaf_certificate()
                    .to_der()
                    .foreign_err(|| Error::Crypto(CryptoError::CryptoBackend))
            })
            .transpose()
    }
}

impl PartialEq for WebKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_json_object().ok() == other.to_json_object().ok()
    }
}

impl Serialize for WebKey {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        self.to_json_object()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for WebKey {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let jwk = JwkObject::deserialize(deserializer)?;
        Self::from_json_object(&jwk).map_err(serde::de::Error::custom)
    }
}

/// Maps a supported curve to its openssl group.
pub(crate) fn curve_group(curve: EcCurve) -> Result<EcGroup> {
    // X9_62_PRIME256V1 is an alias for secp256r1 / NIST P-256
    let nid = match curve {
        EcCurve::P256 => Nid::X9_62_PRIME256V1,
        EcCurve::P384 => Nid::SECP384R1,
        EcCurve::P521 => Nid::SECP521R1,
    };
    EcGroup::from_curve_name(nid).foreign_err(|| Error::Crypto(CryptoError::CryptoBackend))
}

/// Maps an openssl group back to a supported curve.
pub(crate) fn curve_of_group(group: &openssl::ec::EcGroupRef) -> Option<EcCurve> {
    match group.curve_name()? {
        Nid::X9_62_PRIME256V1 => Some(EcCurve::P256),
        Nid::SECP384R1 => Some(EcCurve::P384),
        Nid::SECP521R1 => Some(EcCurve::P521),
        _ => None,
    }
}

/// Returns the fixed-width affine coordinates of an EC public key.
pub(crate) fn ec_affine_coordinates(
    key: &EcKey<Public>,
    curve: EcCurve,
) -> Result<(Vec<u8>, Vec<u8>)> {
    let backend = || Error::Crypto(CryptoError::CryptoBackend);

    let mut x = BigNum::new().foreign_err(backend)?;
    let mut y = BigNum::new().foreign_err(backend)?;
    let mut ctx = BigNumContext::new().foreign_err(backend)?;

    key.public_key()
        .affine_coordinates(key.group(), &mut x, &mut y, &mut ctx)
        .foreign_err(backend)?;

    let width = curve.coordinate_len() as i32;
    let x = x.to_vec_padded(width).foreign_err(backend)?;
    let y = y.to_vec_padded(width).foreign_err(backend)?;
    Ok((x, y))
}

fn rsa_private_from_params(
    jwk: &JwkObject,
    n: BigNum,
    e: BigNum,
    d: BigNum,
) -> Result<Rsa<Private>> {
    use openssl::rsa::RsaPrivateKeyBuilder;

    let backend = || Error::Crypto(CryptoError::CryptoBackend);

    let mut rsa_builder =
        RsaPrivateKeyBuilder::new(n, e, d).foreign_err(backend)?;

    let p = string_field(jwk, "p")?;
    let q = string_field(jwk, "q")?;
    if let (Some(p), Some(q)) = (p, q) {
        rsa_builder = rsa_builder
            .set_factors(
                utils::base64_url_uint_decode(p)?,
                utils::base64_url_uint_decode(q)?,
            )
            .foreign_err(backend)?;

        let dp = string_field(jwk, "dp")?;
        let dq = string_field(jwk, "dq")?;
        let qi = string_field(jwk, "qi")?;
        if let (Some(dp), Some(dq), Some(qi)) = (dp, dq, qi) {
            rsa_builder = rsa_builder
                .set_crt_params(
                    utils::base64_url_uint_decode(dp)?,
                    utils::base64_url_uint_decode(dq)?,
                    utils::base64_url_uint_decode(qi)?,
                )
                .foreign_err(backend)?;
        }
    }

    Ok(rsa_builder.build())
}

fn string_field<'a>(jwk: &'a JwkObject, name: &str) -> Result<Option<&'a str>> {
    jwk.get(name)
        .map(|value| {
            value.as_str().ok_or_else(|| {
                crate::error::root(FormatError::JwkParsingFailed(format!(
                    "field \"{name}\" is not a string"
                )))
            })
        })
        .transpose()
}

fn required_string_field<'a>(jwk: &'a JwkObject, name: &str) -> Result<&'a str> {
    string_field(jwk, name)?.ok_or_else(|| {
        crate::error::root(FormatError::JwkParsingFailed(format!(
            "missing \"{name}\" field"
        )))
    })
}

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

use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, Instant},
};

use bherror::traits::ForeignError as _;
use iref::Uri;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, FormatError, Result, ValidationError},
    jwk::WebKey,
};

/// A JWK Set, as specified in [RFC 7517, section 5][1].
///
/// Unlike the RFC, which merely discourages duplicate `kid` values, a
/// `WebKeySet` rejects them outright, both when constructed and when
/// deserialized, so a `kid` lookup is never ambiguous.
///
/// [1]: https://datatracker.ietf.org/doc/html/rfc7517#section-5
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WebKeySetShadow")]
pub struct WebKeySet {
    keys: Vec<WebKey>,
}

/// Deserialization target for [`WebKeySet`]; converting performs the
/// duplicate-`kid` validation.
#[derive(Deserialize)]
struct WebKeySetShadow {
    keys: Vec<WebKey>,
}

impl TryFrom<WebKeySetShadow> for WebKeySet {
    type Error = bherror::Error<Error>;

    fn try_from(shadow: WebKeySetShadow) -> Result<Self> {
        Self::new(shadow.keys)
    }
}

impl WebKeySet {
    /// Creates a key set, rejecting duplicate key ids.
    pub fn new(keys: Vec<WebKey>) -> Result<Self> {
        let mut seen = std::collections::HashSet::new();
        for key in &keys {
            if let Some(id) = key.id() {
                if !seen.insert(id.to_string()) {
                    return Err(crate::error::root(ValidationError::DuplicateKeyId(
                        id.to_string(),
                    )));
                }
            }
        }
        Ok(Self { keys })
    }

    /// All keys, in their original order.
    pub fn keys(&self) -> &[WebKey] {
        &self.keys
    }

    /// Looks a key up by its `kid`.
    pub fn key_by_id(&self, id: &str) -> Option<&WebKey> {
        self.keys.iter().find(|key| key.id() == Some(id))
    }

    /// The number of keys in the set.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the set holds no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Fetches a remote JWK Set document.
///
/// The transport is pluggable so that verification code stays testable; a
/// plain HTTPS implementation is provided behind the `reqwest` feature as
/// [`HttpKeySetClient`].
pub trait KeySetClient {
    /// The error type returned by the client.
    type Err: std::error::Error + Send + Sync + 'static;

    /// Fetches and parses the JWK Set published at `uri`.
    fn fetch(&self, uri: &Uri) -> std::result::Result<WebKeySet, Self::Err>;
}

/// Default time a fetched JWK Set stays fresh.
const DEFAULT_TTL: Duration = Duration::from_secs(15 * 60);

struct CacheEntry {
    key_set: WebKeySet,
    fetched_at: Instant,
}

/// A cache of remote JWK Sets keyed by their URI.
///
/// Each set is refetched through the wrapped [`KeySetClient`] once it is
/// older than the time-to-live (15 minutes unless overridden); until then
/// lookups are served from memory.  A failed refetch is propagated, not
/// papered over with stale data.
pub struct RemoteKeySets<C> {
    client: C,
    ttl: Duration,
    cache: Mutex<HashMap<String, CacheEntry>>,
}

impl<C: KeySetClient> RemoteKeySets<C> {
    /// Wraps a client with the default 15-minute time-to-live.
    pub fn new(client: C) -> Self {
        Self::with_ttl(client, DEFAULT_TTL)
    }

    /// Wraps a client with an explicit time-to-live.
    pub fn with_ttl(client: C, ttl: Duration) -> Self {
        Self {
            client,
            ttl,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// The JWK Set published at `uri`, fetched at most once per
    /// time-to-live window.
    pub fn key_set(&self, uri: &Uri) -> Result<WebKeySet> {
        let mut cache = self.cache.lock().unwrap_or_else(|poison| poison.into_inner());

        if let Some(entry) = cache.get(uri.as_str()) {
            if entry.fetched_at.elapsed() < self.ttl {
                return Ok(entry.key_set.clone());
            }
        }

        let key_set = self
            .client
            .fetch(uri)
            .foreign_err(|| Error::Format(FormatError::KeySetFetch(uri.to_string())))?;

        cache.insert(
            uri.as_str().to_owned(),
            CacheEntry {
                key_set: key_set.clone(),
                fetched_at: Instant::now(),
            },
        );

        Ok(key_set)
    }

    /// Looks up the key with the given `kid` in the set published at `uri`.
    pub fn key_by_id(&self, uri: &Uri, id: &str) -> Result<WebKey> {
        let key_set = self.key_set(uri)?;
        key_set
            .key_by_id(id)
            .cloned()
            .ok_or_else(|| crate::error::root(ValidationError::KeyNotFound(id.to_string())))
    }
}

/// [`KeySetClient`] over plain HTTPS.
#[cfg(feature = "reqwest")]
pub struct HttpKeySetClient {
    client: reqwest::blocking::Client,
}

#[cfg(feature = "reqwest")]
impl HttpKeySetClient {
    /// Creates a client with default transport settings.
    pub fn new() -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
        }
    }
}

#[cfg(feature = "reqwest")]
impl Default for HttpKeySetClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "reqwest")]
impl KeySetClient for HttpKeySetClient {
    type Err = reqwest::Error;

    fn fetch(&self, uri: &Uri) -> std::result::Result<WebKeySet, Self::Err> {
        self.client
            .get(uri.as_str())
            .send()?
            .error_for_status()?
            .json()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::{alg::EcCurve, jwk::tests::generate_ec_key, json_object};

    fn key_with_id(id: &str) -> WebKey {
        let key = generate_ec_key(EcCurve::P256);
        WebKey {
            id: Some(id.to_string()),
            ..key
        }
    }

    #[test]
    fn duplicate_kid_is_rejected() {
        let error = WebKeySet::new(vec![key_with_id("a"), key_with_id("a")]).unwrap_err();
        assert!(matches!(
            error.error,
            Error::Validation(ValidationError::DuplicateKeyId(id)) if id == "a"
        ));

        // keys without an id never collide
        let key = generate_ec_key(EcCurve::P256);
        let anonymous = WebKey { id: None, ..key };
        WebKeySet::new(vec![anonymous.clone(), anonymous]).unwrap();
    }

    #[test]
    fn duplicate_kid_is_rejected_on_deserialization() {
        let set = WebKeySet::new(vec![key_with_id("a"), key_with_id("b")]).unwrap();
        let mut json = serde_json::to_value(&set).unwrap();

        // round trip is fine
        let parsed: WebKeySet = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(parsed, set);

        // forging a duplicate id is not
        json["keys"][1]["kid"] = "a".into();
        assert!(serde_json::from_value::<WebKeySet>(json).is_err());
    }

    #[test]
    fn lookup_by_id() {
        let set = WebKeySet::new(vec![key_with_id("a"), key_with_id("b")]).unwrap();

        assert_eq!(set.key_by_id("b").unwrap().id(), Some("b"));
        assert!(set.key_by_id("c").is_none());
    }

    /// Client that serves a fixed set and counts fetches.
    struct CountingClient {
        key_set: WebKeySet,
        fetches: AtomicUsize,
    }

    impl KeySetClient for &CountingClient {
        type Err = std::convert::Infallible;

        fn fetch(&self, _uri: &Uri) -> std::result::Result<WebKeySet, Self::Err> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.key_set.clone())
        }
    }

    fn counting_client() -> CountingClient {
        CountingClient {
            key_set: WebKeySet::new(vec![key_with_id("a")]).unwrap(),
            fetches: AtomicUsize::new(0),
        }
    }

    #[test]
    fn fresh_sets_are_served_from_cache() {
        let client = counting_client();
        let remote = RemoteKeySets::new(&client);
        let uri = Uri::new("https://example.com/jwks.json").unwrap();

        remote.key_by_id(uri, "a").unwrap();
        remote.key_by_id(uri, "a").unwrap();

        assert_eq!(client.fetches.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn expired_sets_are_refetched() {
        let client = counting_client();
        let remote = RemoteKeySets::with_ttl(&client, Duration::ZERO);
        let uri = Uri::new("https://example.com/jwks.json").unwrap();

        remote.key_set(uri).unwrap();
        remote.key_set(uri).unwrap();

        assert_eq!(client.fetches.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn missing_kid_is_an_error() {
        let client = counting_client();
        let remote = RemoteKeySets::new(&client);
        let uri = Uri::new("https://example.com/jwks.json").unwrap();

        let error = remote.key_by_id(uri, "nope").unwrap_err();
        assert!(matches!(
            error.error,
            Error::Validation(ValidationError::KeyNotFound(_))
        ));
    }

    #[test]
    fn key_set_wire_shape() {
        let set = WebKeySet::new(vec![key_with_id("a")]).unwrap();
        let json = serde_json::to_value(&set).unwrap();

        assert!(json.get("keys").unwrap().is_array());

        let empty: WebKeySet = serde_json::from_value(json_object!({ "keys": [] }).into()).unwrap();
        assert!(empty.is_empty());
    }
}

use crate::{QueryError, QueryResult};
use sha2::{Digest, Sha256};
use std::fmt;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Separator used in place of any run of non-alphanumeric characters
const SEPARATOR: char = '_';

/// Longest identity; longer slugs are cut and given a fingerprint suffix
const MAX_SLUG_LEN: usize = 96;

/// Number of digest bytes used for fingerprint suffixes
const FINGERPRINT_BYTES: usize = 5;

/// Stable, filesystem-safe identifier derived from a raw query
///
/// Only ASCII lowercase letters, digits and `_` ever appear in an identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryIdentity(String);

impl QueryIdentity {
    /// Returns the identity as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wraps an identity read back from persisted state
    pub(crate) fn from_stored(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for QueryIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for QueryIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A raw query together with the identity it resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedQuery {
    /// Query text as submitted, with surrounding whitespace trimmed
    pub raw: String,

    /// Storage key for this query
    pub identity: QueryIdentity,
}

impl ResolvedQuery {
    /// Resolves a raw query, keeping its trimmed text alongside the identity
    pub fn new(raw: &str) -> QueryResult<Self> {
        let identity = resolve(raw)?;
        Ok(Self {
            raw: raw.trim().to_string(),
            identity,
        })
    }
}

/// Resolves a raw query into its `QueryIdentity`
///
/// # Normalization Steps
///
/// 1. Trim and lowercase; reject if nothing is left
/// 2. Decompose (NFD) and drop combining marks, so `quận` becomes `quan`
/// 3. Fold `đ` to `d`
/// 4. Keep ASCII letters and digits; collapse every other run into `_`
/// 5. Trim separators
/// 6. If letters were dropped that have no ASCII form (or nothing survived),
///    append a short SHA-256 fingerprint of the folded text
/// 7. If the slug is longer than 96 characters, cut it and append a
///    fingerprint of the full slug
///
/// Queries that differ only by case or diacritics resolve to the same identity.
///
/// # Examples
///
/// ```
/// use mapsweep::query::resolve;
///
/// let identity = resolve("Nha Khoa Quận 1").unwrap();
/// assert_eq!(identity.as_str(), "nha_khoa_quan_1");
/// ```
pub fn resolve(raw: &str) -> QueryResult<QueryIdentity> {
    let folded = raw.trim().to_lowercase();
    if folded.is_empty() {
        return Err(QueryError::Empty);
    }

    let mut slug = String::with_capacity(folded.len());
    let mut untransliterated = false;

    for c in folded.nfd() {
        if is_combining_mark(c) {
            continue;
        }

        let c = match c {
            'đ' => 'd',
            other => other,
        };

        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else {
            if c.is_alphanumeric() {
                untransliterated = true;
            }
            if !slug.is_empty() && !slug.ends_with(SEPARATOR) {
                slug.push(SEPARATOR);
            }
        }
    }

    trim_separators(&mut slug);

    let suffix = if untransliterated || slug.is_empty() {
        fingerprint(&folded)
    } else if slug.len() > MAX_SLUG_LEN {
        // Distinct long slugs must stay distinct once cut
        fingerprint(&slug)
    } else {
        return Ok(QueryIdentity(slug));
    };

    slug.truncate(MAX_SLUG_LEN - 1 - suffix.len());
    trim_separators(&mut slug);
    if !slug.is_empty() {
        slug.push(SEPARATOR);
    }
    slug.push_str(&suffix);

    Ok(QueryIdentity(slug))
}

fn trim_separators(slug: &mut String) {
    while slug.ends_with(SEPARATOR) {
        slug.pop();
    }
}

/// Short hex digest of the whitespace-collapsed query text
fn fingerprint(folded: &str) -> String {
    let collapsed = folded.split_whitespace().collect::<Vec<_>>().join(" ");
    let digest = Sha256::digest(collapsed.nfc().collect::<String>().as_bytes());
    hex::encode(&digest[..FINGERPRINT_BYTES])
}

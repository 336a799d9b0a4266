//! Display names for classes and properties
//!
//! A name is the resource title with its compact prefix moved into a
//! parenthetical: `ex:Person` becomes `Person (ex:)`. Inverse properties get a
//! leading arrow so forward and reverse traversal read differently.

use super::prefixes::PrefixTable;
use crate::error::{Result, ShapesError};
use crate::iri::split_iri;
use crate::store::{Title, TitleService};
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Marker put in front of inverse property names.
pub const INVERSE_ARROW: &str = "← ";

const DEFAULT_CACHE_CAPACITY: usize = 4096;

pub struct NameResolver<'a> {
    titles: &'a dyn TitleService,
    prefixes: &'a PrefixTable,
    cache: Mutex<LruCache<String, Title>>,
    lookups: AtomicU64,
    hits: AtomicU64,
}

impl<'a> NameResolver<'a> {
    pub fn new(titles: &'a dyn TitleService, prefixes: &'a PrefixTable) -> Self {
        Self::with_capacity(titles, prefixes, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(
        titles: &'a dyn TitleService,
        prefixes: &'a PrefixTable,
        capacity: usize,
    ) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            titles,
            prefixes,
            cache: Mutex::new(LruCache::new(capacity)),
            lookups: AtomicU64::new(0),
            hits: AtomicU64::new(0),
        }
    }

    pub async fn resolve(&self, iri: &str, inverse: bool) -> Result<String> {
        let title = self.title(iri).await?;
        compose_name(iri, &title, self.prefixes, inverse)
    }

    /// `(lookups, cache hits)` so far.
    pub fn stats(&self) -> (u64, u64) {
        (
            self.lookups.load(Ordering::Relaxed),
            self.hits.load(Ordering::Relaxed),
        )
    }

    async fn title(&self, iri: &str) -> Result<Title> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        let cached = self.cache.lock().get(iri).cloned();
        if let Some(title) = cached {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(title);
        }
        let title = self.titles.title(iri).await?;
        tracing::trace!(iri, title = %title.title, from_iri = title.from_iri, "title fetched");
        self.cache.lock().put(iri.to_string(), title.clone());
        Ok(title)
    }
}

/// Builds the display name of `iri` from its title.
pub fn compose_name(
    iri: &str,
    title: &Title,
    prefixes: &PrefixTable,
    inverse: bool,
) -> Result<String> {
    let (namespace, _) =
        split_iri(iri).ok_or_else(|| ShapesError::InvalidIdentifier(iri.to_string()))?;
    let arrow = if inverse { INVERSE_ARROW } else { "" };

    let Some(candidates) = prefixes.candidates(namespace) else {
        return Ok(format!("{arrow}{}", title.title));
    };

    let (body, prefix) = if title.from_iri {
        let matched = candidates
            .iter()
            .filter(|candidate| title.title.starts_with(candidate.as_str()))
            .max_by_key(|candidate| candidate.len());
        match matched {
            Some(candidate) => (&title.title[candidate.len()..], candidate.clone()),
            None => match title.title.split_once('_') {
                Some((prefix, body)) => (body, format!("{prefix}:")),
                None => {
                    return Err(ShapesError::MalformedTitle {
                        iri: iri.to_string(),
                        title: title.title.clone(),
                    });
                }
            },
        }
    } else {
        let preferred = prefixes
            .preferred(namespace)
            .unwrap_or(candidates[0].as_str());
        (title.title.as_str(), preferred.to_string())
    };

    Ok(format!("{arrow}{body} ({prefix})"))
}

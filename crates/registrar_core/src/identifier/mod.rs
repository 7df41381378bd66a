//! Collision-free slug allocation.
//!
//! # Responsibility
//! - Derive a URL-safe slug from a human label.
//! - Probe the target collection for the first free `base`, `base-1`, ...
//! - Re-enter allocation when the unique index rejects a write that raced
//!   with another allocator.
//!
//! # Invariants
//! - Output only contains `[a-z0-9-]`, never starts/ends with `-`, and never
//!   contains `--`.
//! - Probing is deterministic: the same label over the same collection
//!   yields the same slug.
//! - The unique index on `slug` is the authority; probing is advisory.

use crate::repo::{RepoError, RepoResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));
static DASH_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"-{2,}").expect("valid dash regex"));

/// Suffixes tried per allocation before giving up.
pub const MAX_SLUG_PROBES: u32 = 10_000;
/// Write attempts when the unique index keeps rejecting the chosen slug.
pub const MAX_SLUG_WRITE_ATTEMPTS: u32 = 5;

const SLUG_COLUMNS: &[&str] = &["slug"];

/// Collection that can answer "is this slug taken?".
pub trait SlugStore {
    /// Whether `slug` is used by any record other than `exclude_id`.
    fn slug_exists(&self, slug: &str, exclude_id: Option<Uuid>) -> RepoResult<bool>;
}

/// Slug allocation failure.
#[derive(Debug)]
pub enum SlugError {
    /// The label normalizes to nothing.
    EmptyLabel,
    /// No free candidate within the probe/attempt bounds.
    Exhausted { base: String },
    Repo(RepoError),
}

impl Display for SlugError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyLabel => write!(f, "label produces an empty slug"),
            Self::Exhausted { base } => write!(f, "no free slug for base `{base}`"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SlugError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for SlugError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Normalizes a label into slug form.
///
/// Lowercases, strips diacritics, drops characters outside `[a-z0-9\s-]`,
/// turns whitespace runs into `-`, collapses repeated `-` and trims `-`.
pub fn normalize_slug(label: &str) -> Result<String, SlugError> {
    let stripped: String = label
        .to_lowercase()
        .nfd()
        .filter(|ch| !is_combining_mark(*ch))
        .filter(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch.is_whitespace() || *ch == '-')
        .collect();
    let dashed = WHITESPACE_RE.replace_all(stripped.trim(), "-");
    let collapsed = DASH_RUN_RE.replace_all(&dashed, "-");
    let slug = collapsed.trim_matches('-').to_string();
    if slug.is_empty() {
        return Err(SlugError::EmptyLabel);
    }
    Ok(slug)
}

/// Returns the first free slug for `label` in `store`.
///
/// `exclude_id` lets a record keep its own slug on rename.
pub fn allocate_slug<S: SlugStore + ?Sized>(
    store: &S,
    label: &str,
    exclude_id: Option<Uuid>,
) -> Result<String, SlugError> {
    let base = normalize_slug(label)?;
    if !store.slug_exists(&base, exclude_id)? {
        return Ok(base);
    }
    for suffix in 1..=MAX_SLUG_PROBES {
        let candidate = format!("{base}-{suffix}");
        if !store.slug_exists(&candidate, exclude_id)? {
            return Ok(candidate);
        }
    }
    Err(SlugError::Exhausted { base })
}

/// Allocates a slug and runs `write` with it, re-allocating when `table`'s
/// slug index rejects the write.
///
/// Returns the slug actually persisted alongside `write`'s value.
pub fn write_with_unique_slug<S, T, F>(
    store: &S,
    table: &str,
    label: &str,
    exclude_id: Option<Uuid>,
    mut write: F,
) -> Result<(String, T), SlugError>
where
    S: SlugStore + ?Sized,
    F: FnMut(&str) -> RepoResult<T>,
{
    let mut last_slug = None;
    for _ in 0..MAX_SLUG_WRITE_ATTEMPTS {
        let slug = allocate_slug(store, label, exclude_id)?;
        match write(&slug) {
            Ok(value) => return Ok((slug, value)),
            Err(err) if err.is_unique_violation(table, SLUG_COLUMNS) => {
                last_slug = Some(slug);
            }
            Err(err) => return Err(err.into()),
        }
    }
    Err(SlugError::Exhausted {
        base: last_slug.unwrap_or_default(),
    })
}

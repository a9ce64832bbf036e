//! The child-ordering contract.
//!
//! Every subject keeps an explicit order of its topic ids and every topic an
//! explicit order of its note ids. That order is independent of creation time
//! or primary-key order: it is persisted as a JSON array and rewritten
//! wholesale whenever it changes (child created, child deleted, child moved,
//! or an explicit reorder submitted by the owner).

use std::{
  collections::{BTreeMap, BTreeSet},
  fmt,
};

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{Error, Result};

// ─── Policy ──────────────────────────────────────────────────────────────────

/// How an explicitly submitted order is checked before it is stored.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OrderPolicy {
  /// The submitted ids must be exactly the parent's current children, each
  /// listed once.
  #[default]
  Strict,
  /// The submitted ids are stored verbatim.
  Trusted,
}

// ─── ChildOrder ──────────────────────────────────────────────────────────────

/// The ordered ids of a parent's direct children.
///
/// Serialises transparently as a JSON array, which is also the column format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChildOrder<I>(Vec<I>);

impl<I> Default for ChildOrder<I> {
  fn default() -> Self { Self(Vec::new()) }
}

impl<I> From<Vec<I>> for ChildOrder<I> {
  fn from(ids: Vec<I>) -> Self { Self(ids) }
}

impl<I> FromIterator<I> for ChildOrder<I> {
  fn from_iter<T: IntoIterator<Item = I>>(iter: T) -> Self {
    Self(iter.into_iter().collect())
  }
}

impl<I: Copy + Ord> ChildOrder<I> {
  pub fn new() -> Self { Self::default() }

  pub fn ids(&self) -> &[I] { &self.0 }

  pub fn into_ids(self) -> Vec<I> { self.0 }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn contains(&self, id: I) -> bool { self.0.contains(&id) }

  /// Put `id` at the front. Newly created children are shown first.
  pub fn prepend(&mut self, id: I) { self.insert_at(id, 0) }

  /// Drop every occurrence of `id`, keeping the rest in place.
  ///
  /// Returns `true` if anything was removed.
  pub fn remove(&mut self, id: I) -> bool {
    let before = self.0.len();
    self.0.retain(|x| *x != id);
    self.0.len() != before
  }

  /// Insert `id` at `position` (clamped to the end). An existing occurrence
  /// is removed first, so the id appears exactly once afterwards.
  pub fn insert_at(&mut self, id: I, position: usize) {
    self.remove(id);
    let at = position.min(self.0.len());
    self.0.insert(at, id);
  }

  /// Check that this order lists each of `children` exactly once and
  /// nothing else.
  pub fn check_permutation(
    &self,
    children: &[I],
  ) -> std::result::Result<(), OrderMismatch<I>> {
    let expected: BTreeSet<I> = children.iter().copied().collect();
    let mut seen = BTreeSet::new();
    let mut mismatch = OrderMismatch::default();

    for &id in &self.0 {
      if !seen.insert(id) {
        if !mismatch.duplicated.contains(&id) {
          mismatch.duplicated.push(id);
        }
      } else if !expected.contains(&id) {
        mismatch.unknown.push(id);
      }
    }
    mismatch.missing = expected.difference(&seen).copied().collect();

    if mismatch.is_empty() { Ok(()) } else { Err(mismatch) }
  }

  /// Sort `items` by their position in this order.
  ///
  /// Items whose id is not listed go to the end in their incoming order;
  /// listed ids with no matching item are skipped.
  pub fn arrange<T>(&self, mut items: Vec<T>, key: impl Fn(&T) -> I) -> Vec<T> {
    let mut rank = BTreeMap::new();
    for (i, id) in self.0.iter().enumerate() {
      rank.entry(*id).or_insert(i);
    }
    items.sort_by_key(|item| rank.get(&key(item)).copied().unwrap_or(usize::MAX));
    items
  }
}

impl<I: Serialize> ChildOrder<I> {
  /// Encode for the order column.
  pub fn to_json(&self) -> Result<String> { Ok(serde_json::to_string(&self.0)?) }
}

impl<I: DeserializeOwned> ChildOrder<I> {
  /// Decode from the order column (or a legacy string-encoded request body).
  pub fn from_json(s: &str) -> Result<Self> {
    serde_json::from_str(s).map(Self).map_err(Error::MalformedOrder)
  }
}

// ─── Mismatch ────────────────────────────────────────────────────────────────

/// Why a submitted order is not a permutation of the current children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderMismatch<I> {
  /// Ids listed more than once.
  pub duplicated: Vec<I>,
  /// Ids that are not children of the parent.
  pub unknown:    Vec<I>,
  /// Children the submitted order left out.
  pub missing:    Vec<I>,
}

impl<I> Default for OrderMismatch<I> {
  fn default() -> Self {
    Self { duplicated: Vec::new(), unknown: Vec::new(), missing: Vec::new() }
  }
}

impl<I> OrderMismatch<I> {
  pub fn is_empty(&self) -> bool {
    self.duplicated.is_empty() && self.unknown.is_empty() && self.missing.is_empty()
  }
}

impl<I: fmt::Display> fmt::Display for OrderMismatch<I> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("Order must list every child exactly once")?;
    for (label, ids) in [
      ("duplicated", &self.duplicated),
      ("unknown", &self.unknown),
      ("missing", &self.missing),
    ] {
      if ids.is_empty() {
        continue;
      }
      let joined = ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
      write!(f, "; {label}: [{joined}]")?;
    }
    Ok(())
  }
}

impl<I: fmt::Debug + fmt::Display> std::error::Error for OrderMismatch<I> {}

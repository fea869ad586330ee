//! Geographic scoping — the hierarchy quotas are keyed on.
//!
//! A [`GeoScope`] is an ordered tuple of levels from broadest to narrowest:
//! country, state, district, taluk, village. A `None` level is a wildcard
//! for anything narrower, so a quota scoped to `(India, Tamil Nadu, None,
//! None, None)` covers every district, taluk, and village in the state.
//! Matching is an explicit typed walk over the levels, never ad hoc
//! field-by-field comparison at call sites.

use serde::{Deserialize, Serialize};

/// The ordered levels of the hierarchy, broadest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeLevel {
  Country,
  State,
  District,
  Taluk,
  Village,
}

impl ScopeLevel {
  /// Broadest to narrowest.
  pub const ALL: [ScopeLevel; 5] = [
    Self::Country,
    Self::State,
    Self::District,
    Self::Taluk,
    Self::Village,
  ];
}

/// The scope a quota applies to. Any suffix of levels may be `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoScope {
  pub country:  Option<String>,
  pub state:    Option<String>,
  pub district: Option<String>,
  pub taluk:    Option<String>,
  pub village:  Option<String>,
}

/// Where a cultivation request comes from. Same shape as [`GeoScope`], but
/// here `None` means the farmer did not report that level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
  pub country:  Option<String>,
  pub state:    Option<String>,
  pub district: Option<String>,
  pub taluk:    Option<String>,
  pub village:  Option<String>,
}

impl Location {
  fn level(&self, level: ScopeLevel) -> Option<&str> {
    match level {
      ScopeLevel::Country => self.country.as_deref(),
      ScopeLevel::State => self.state.as_deref(),
      ScopeLevel::District => self.district.as_deref(),
      ScopeLevel::Taluk => self.taluk.as_deref(),
      ScopeLevel::Village => self.village.as_deref(),
    }
  }
}

impl GeoScope {
  pub fn level(&self, level: ScopeLevel) -> Option<&str> {
    match level {
      ScopeLevel::Country => self.country.as_deref(),
      ScopeLevel::State => self.state.as_deref(),
      ScopeLevel::District => self.district.as_deref(),
      ScopeLevel::Taluk => self.taluk.as_deref(),
      ScopeLevel::Village => self.village.as_deref(),
    }
  }

  /// The number of specified levels. A village-level quota has specificity
  /// 5; a country-wide quota has specificity 1.
  pub fn specificity(&self) -> usize {
    ScopeLevel::ALL
      .iter()
      .filter(|l| self.level(**l).is_some())
      .count()
  }

  /// Whether this scope covers `location`: every specified level must match
  /// the location's value at that level (case-insensitive). Unspecified
  /// levels are wildcards.
  pub fn covers(&self, location: &Location) -> bool {
    ScopeLevel::ALL.iter().all(|l| match self.level(*l) {
      None => true,
      Some(want) => location
        .level(*l)
        .is_some_and(|have| have.eq_ignore_ascii_case(want)),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn scope(
    country: Option<&str>,
    state: Option<&str>,
    district: Option<&str>,
  ) -> GeoScope {
    GeoScope {
      country:  country.map(str::to_owned),
      state:    state.map(str::to_owned),
      district: district.map(str::to_owned),
      ..GeoScope::default()
    }
  }

  fn location() -> Location {
    Location {
      country:  Some("India".into()),
      state:    Some("Tamil Nadu".into()),
      district: Some("Madurai".into()),
      taluk:    Some("Melur".into()),
      village:  Some("Keelavalavu".into()),
    }
  }

  #[test]
  fn wildcard_suffix_covers_narrower_levels() {
    let s = scope(Some("India"), Some("Tamil Nadu"), None);
    assert!(s.covers(&location()));
  }

  #[test]
  fn mismatch_at_a_specified_level_rejects() {
    let s = scope(Some("India"), Some("Kerala"), None);
    assert!(!s.covers(&location()));
  }

  #[test]
  fn matching_is_case_insensitive() {
    let s = scope(Some("india"), Some("tamil nadu"), Some("MADURAI"));
    assert!(s.covers(&location()));
  }

  #[test]
  fn specified_level_missing_from_location_rejects() {
    let s = scope(Some("India"), Some("Tamil Nadu"), Some("Madurai"));
    let sparse = Location {
      country: Some("India".into()),
      ..Location::default()
    };
    assert!(!s.covers(&sparse));
  }

  #[test]
  fn specificity_counts_specified_levels() {
    assert_eq!(scope(Some("India"), None, None).specificity(), 1);
    assert_eq!(scope(Some("India"), Some("Tamil Nadu"), Some("Madurai")).specificity(), 3);
    assert_eq!(GeoScope::default().specificity(), 0);
  }
}

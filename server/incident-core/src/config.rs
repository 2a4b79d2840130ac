//! Query tunables with sane defaults.

/// Pagination limits applied to every listing.
#[derive(Debug, Clone)]
pub struct Config {
  /// Page size used when the caller gives none (or a non-positive one).
  pub default_per_page: u64,
  /// Upper bound on page size. Larger requests are clamped, never rejected.
  pub max_per_page: u64,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      default_per_page: 20,
      max_per_page: 100,
    }
  }
}

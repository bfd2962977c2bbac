//! mixtree-util - helpers shared by the mixtree crates.
//!
//! - [`FactoryCache`]: memoizes factory results so equal arguments share one instance.
//! - [`to_decimal_places`] / [`to_significant_digits`]: fixed-width number formatting
//!   used when rendering scaled values.

pub mod factory_cache;
pub mod format;

pub use factory_cache::FactoryCache;
pub use format::{to_decimal_places, to_significant_digits};

//! Listing URL canonicalization
//!
//! Detail links are the primary vehicle identity, so they are reduced to a
//! canonical form before hashing or storing.

mod normalize;

pub use normalize::canonical_listing_url;

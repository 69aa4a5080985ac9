//! Sub-quadratic matching of CTPH (ssdeep-style) fuzzy hashes.
//!
//! A [`engine::MatchEngine`] ingests signatures of the textual form
//! `BLOCKSIZE:S1:S2,"FILENAME"`, indexes every 7-byte window of both
//! components in an inverted map, and answers queries by scoring only the
//! known signatures that share at least one window with the query;
//! sharing such a substring is a necessary condition for a non-zero
//! CTPH similarity. Scoring itself is delegated to an external
//! [`scorer::Scorer`]; accepted matches go to a caller-supplied handler
//! or, in cluster mode, into transitive [`cluster::ClusterManager`]
//! equivalence classes.
//!
//! [`loader`] streams known-hashes files (ssdeep 1.0/1.1 format) into the
//! engine, surviving bad lines and reporting them per line number.

pub mod cluster;
pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod loader;
pub mod scorer;
pub mod signature;

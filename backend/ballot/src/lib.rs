//! Shared poll and vote types.
//!
//! Everything here is pure: no storage, no clock. Callers pass `now` in, so
//! the lifecycle rules can be checked against any instant.
pub mod fingerprint;
pub mod polls;
pub mod results;
pub mod tokens;
pub mod votes;

pub use polls::{Poll, PollChanges, PollContent, PollError, RecordError};
pub use results::{NormalizedResults, OptionCount, ResultRow, normalize_results, tally};
pub use tokens::{TokenError, TokenSigner, TokenVerifier};
pub use votes::{UniquenessScope, Vote, VoteError, VoteForm, validate_poll_for_voting};

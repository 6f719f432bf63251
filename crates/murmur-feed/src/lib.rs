//! Feed assembly and discovery ranking.
//!
//! Everything in this crate is pure, in-memory logic: the raw-count
//! normalizer, the self-share filter and deduplicator, the balanced
//! interleaver, pagination, and the discovery scorers. No I/O happens
//! here — callers fetch rows, hand them in as plain values, and get the
//! assembled result back. Repeating a call with unchanged inputs yields
//! an identical result.

pub mod assemble;
pub mod counts;
pub mod discovery;
pub mod interleave;

pub use assemble::{ShareCandidate, assemble_feed, dedup_against_originals, filter_self_shares};
pub use counts::{RawCount, RawPost};
pub use discovery::{
    CreatorStats, LikedNote, TasteProfile, rank_creators, rank_posts, rank_posts_by_engagement,
};
pub use interleave::{DEFAULT_ORIGINAL_RATIO, interleave, paginate};

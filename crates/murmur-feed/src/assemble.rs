use std::collections::HashSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use murmur_types::models::{FeedItem, UserIdentity, VoiceNote};

use crate::interleave;

/// A repost pulled from the share table: the underlying note, when it was
/// reshared, and who reshared it.
#[derive(Debug, Clone)]
pub struct ShareCandidate {
    pub note: VoiceNote,
    pub shared_at: DateTime<Utc>,
    pub shared_by: UserIdentity,
}

/// Drop shares where the sharer is the note's own author. The original
/// listing already covers those notes, so letting them through would show
/// the same post twice. Hard filter — downstream stages never see these.
pub fn filter_self_shares(candidates: Vec<ShareCandidate>) -> Vec<ShareCandidate> {
    candidates
        .into_iter()
        .filter(|c| c.shared_by.id != c.note.user_id)
        .collect()
}

/// Drop shared candidates whose note id already appears among the
/// originals, so no note id shows up twice across the original/shared
/// boundary of one response.
pub fn dedup_against_originals(
    candidates: Vec<ShareCandidate>,
    original_ids: &HashSet<Uuid>,
) -> Vec<ShareCandidate> {
    candidates
        .into_iter()
        .filter(|c| !original_ids.contains(&c.note.id))
        .collect()
}

pub fn original_item(note: VoiceNote) -> FeedItem {
    FeedItem {
        note,
        is_shared: false,
        shared_at: None,
        shared_by: None,
    }
}

pub fn shared_item(candidate: ShareCandidate) -> FeedItem {
    FeedItem {
        note: candidate.note,
        is_shared: true,
        shared_at: Some(candidate.shared_at),
        shared_by: Some(candidate.shared_by),
    }
}

/// Full pre-pagination pipeline: self-share filter, dedup, then the
/// balanced merge. `originals` must arrive sorted descending by
/// `created_at` and `shares` descending by `shared_at`; no re-sorting
/// happens here.
pub fn assemble_feed(
    originals: Vec<VoiceNote>,
    shares: Vec<ShareCandidate>,
    target_ratio: f64,
) -> Vec<FeedItem> {
    let original_ids: HashSet<Uuid> = originals.iter().map(|n| n.id).collect();

    let shared = dedup_against_originals(filter_self_shares(shares), &original_ids);

    let original_items: Vec<FeedItem> = originals.into_iter().map(original_item).collect();
    let shared_items: Vec<FeedItem> = shared.into_iter().map(shared_item).collect();

    interleave::interleave(original_items, shared_items, target_ratio)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn note(id: u128, author: u128) -> VoiceNote {
        VoiceNote {
            id: Uuid::from_u128(id),
            user_id: Uuid::from_u128(author),
            title: format!("note {id}"),
            duration_seconds: 30,
            audio_url: format!("https://cdn.example/{id}.m4a"),
            background_image_url: None,
            created_at: Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap(),
            likes: 0,
            comments: 0,
            plays: 0,
            shares: 0,
            tags: vec![],
        }
    }

    fn identity(id: u128) -> UserIdentity {
        UserIdentity {
            id: Uuid::from_u128(id),
            username: format!("user{id}"),
            display_name: None,
            avatar_url: None,
        }
    }

    fn candidate(note_id: u128, author: u128, sharer: u128) -> ShareCandidate {
        ShareCandidate {
            note: note(note_id, author),
            shared_at: Utc.with_ymd_and_hms(2026, 5, 2, 9, 0, 0).unwrap(),
            shared_by: identity(sharer),
        }
    }

    #[test]
    fn self_shares_are_dropped() {
        let kept = filter_self_shares(vec![
            candidate(1, 10, 10), // author resharing themselves
            candidate(2, 10, 20),
        ]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].note.id, Uuid::from_u128(2));
    }

    #[test]
    fn self_share_dropped_regardless_of_other_fields() {
        let mut c = candidate(3, 7, 7);
        c.note.likes = 999;
        c.note.tags = vec!["music".into()];
        assert!(filter_self_shares(vec![c]).is_empty());
    }

    #[test]
    fn dedup_removes_ids_present_in_originals() {
        let original_ids: HashSet<Uuid> = [Uuid::from_u128(1)].into_iter().collect();
        let kept = dedup_against_originals(
            vec![candidate(1, 10, 20), candidate(2, 11, 20)],
            &original_ids,
        );
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].note.id, Uuid::from_u128(2));
    }

    #[test]
    fn assembled_feed_has_no_duplicate_ids() {
        let originals = vec![note(1, 10), note(2, 10), note(3, 11)];
        let shares = vec![
            candidate(2, 10, 20), // dup of an original
            candidate(4, 12, 20),
            candidate(5, 12, 12), // self-share
        ];

        let items = assemble_feed(originals, shares, 0.6);

        let mut seen = HashSet::new();
        for item in &items {
            assert!(seen.insert(item.note.id), "duplicate id {}", item.note.id);
        }
        assert_eq!(items.len(), 4);
        assert_eq!(items.iter().filter(|i| i.is_shared).count(), 1);
    }

    #[test]
    fn shared_items_carry_attribution() {
        let items = assemble_feed(vec![], vec![candidate(1, 10, 20)], 0.6);
        assert_eq!(items.len(), 1);
        assert!(items[0].is_shared);
        assert!(items[0].shared_at.is_some());
        assert_eq!(items[0].shared_by.as_ref().unwrap().id, Uuid::from_u128(20));
    }
}

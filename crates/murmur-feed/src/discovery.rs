use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use murmur_types::models::{CreatorCandidate, DiscoveryPost, UserIdentity, VoiceNote};

// Post scoring weights.
const BASE_SCORE: f64 = 1.0;
const TAG_MATCH_WEIGHT: f64 = 2.0;
const LIKED_CREATOR_BONUS: f64 = 3.0;
const LIKE_WEIGHT: f64 = 0.3;
const COMMENT_WEIGHT: f64 = 0.5;
const PLAY_WEIGHT: f64 = 0.1;

// Creator scoring weights.
const CREATOR_POST_WEIGHT: f64 = 2.0;
const VERIFIED_BONUS: f64 = 10.0;

/// A note the user recently liked, reduced to the signals discovery needs.
#[derive(Debug, Clone)]
pub struct LikedNote {
    pub note_id: Uuid,
    pub author_id: Uuid,
    pub tags: Vec<String>,
}

/// Personalization signals derived from a user's recent likes: a tag
/// multiset and the set of creators they have liked.
#[derive(Debug, Default)]
pub struct TasteProfile {
    preferred_tags: HashMap<String, u32>,
    liked_creators: HashSet<Uuid>,
}

impl TasteProfile {
    pub fn from_recent_likes(likes: &[LikedNote]) -> Self {
        let mut profile = TasteProfile::default();
        for liked in likes {
            for tag in &liked.tags {
                *profile.preferred_tags.entry(tag.clone()).or_insert(0) += 1;
            }
            profile.liked_creators.insert(liked.author_id);
        }
        profile
    }

    pub fn likes_creator(&self, author_id: &Uuid) -> bool {
        self.liked_creators.contains(author_id)
    }

    pub fn tag_matches(&self, tags: &[String]) -> usize {
        tags.iter()
            .filter(|t| self.preferred_tags.contains_key(t.as_str()))
            .count()
    }
}

fn engagement_score(note: &VoiceNote) -> f64 {
    LIKE_WEIGHT * note.likes as f64
        + COMMENT_WEIGHT * note.comments as f64
        + PLAY_WEIGHT * note.plays as f64
}

/// Personalized relevance of one candidate note.
pub fn score_post(note: &VoiceNote, profile: &TasteProfile) -> f64 {
    let affinity = if profile.likes_creator(&note.user_id) {
        LIKED_CREATOR_BONUS
    } else {
        0.0
    };

    BASE_SCORE
        + TAG_MATCH_WEIGHT * profile.tag_matches(&note.tags) as f64
        + affinity
        + engagement_score(note)
}

/// Score and rank a personalized candidate set, highest first. The sort
/// is stable, so equal scores keep their fetch order — nothing stronger
/// is promised for ties.
pub fn rank_posts(notes: Vec<VoiceNote>, profile: &TasteProfile) -> Vec<DiscoveryPost> {
    let mut ranked: Vec<DiscoveryPost> = notes
        .into_iter()
        .map(|note| {
            let discovery_score = score_post(&note, profile);
            DiscoveryPost { note, discovery_score }
        })
        .collect();
    sort_by_score_desc(&mut ranked, |p| p.discovery_score);
    ranked
}

/// Fallback ranking when no personalization signal exists: engagement
/// terms only, no base, tag, or creator contribution.
pub fn rank_posts_by_engagement(notes: Vec<VoiceNote>) -> Vec<DiscoveryPost> {
    let mut ranked: Vec<DiscoveryPost> = notes
        .into_iter()
        .map(|note| {
            let discovery_score = engagement_score(&note);
            DiscoveryPost { note, discovery_score }
        })
        .collect();
    sort_by_score_desc(&mut ranked, |p| p.discovery_score);
    ranked
}

/// Aggregate stats for one candidate creator across all of their notes.
#[derive(Debug, Clone)]
pub struct CreatorStats {
    pub identity: UserIdentity,
    pub verified: bool,
    pub post_count: u64,
    pub total_likes: u64,
    pub total_comments: u64,
    pub total_plays: u64,
}

pub fn score_creator(stats: &CreatorStats) -> f64 {
    let verified = if stats.verified { VERIFIED_BONUS } else { 0.0 };

    BASE_SCORE
        + LIKE_WEIGHT * stats.total_likes as f64
        + COMMENT_WEIGHT * stats.total_comments as f64
        + PLAY_WEIGHT * stats.total_plays as f64
        + CREATOR_POST_WEIGHT * stats.post_count as f64
        + verified
}

pub fn rank_creators(candidates: Vec<CreatorStats>) -> Vec<CreatorCandidate> {
    let mut ranked: Vec<CreatorCandidate> = candidates
        .into_iter()
        .map(|stats| {
            let discovery_score = score_creator(&stats);
            CreatorCandidate {
                identity: stats.identity,
                verified: stats.verified,
                post_count: stats.post_count,
                total_likes: stats.total_likes,
                total_comments: stats.total_comments,
                total_plays: stats.total_plays,
                discovery_score,
            }
        })
        .collect();
    sort_by_score_desc(&mut ranked, |c| c.discovery_score);
    ranked
}

fn sort_by_score_desc<T, F: Fn(&T) -> f64>(items: &mut [T], score: F) {
    items.sort_by(|a, b| score(b).partial_cmp(&score(a)).unwrap_or(Ordering::Equal));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn note(id: u128, author: u128, likes: u64, comments: u64, plays: u64) -> VoiceNote {
        VoiceNote {
            id: Uuid::from_u128(id),
            user_id: Uuid::from_u128(author),
            title: String::new(),
            duration_seconds: 20,
            audio_url: String::new(),
            background_image_url: None,
            created_at: Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap(),
            likes,
            comments,
            plays,
            shares: 0,
            tags: vec![],
        }
    }

    fn profile(tags: &[&str], creators: &[u128]) -> TasteProfile {
        let likes: Vec<LikedNote> = creators
            .iter()
            .enumerate()
            .map(|(i, author)| LikedNote {
                note_id: Uuid::from_u128(5000 + i as u128),
                author_id: Uuid::from_u128(*author),
                tags: tags.iter().map(|t| t.to_string()).collect(),
            })
            .collect();
        TasteProfile::from_recent_likes(&likes)
    }

    #[test]
    fn tag_and_engagement_scoring() {
        // 1 + 2*2 + 0.3*10 + 0.5*4 + 0.1*50 = 15
        let mut n = note(1, 99, 10, 4, 50);
        n.tags = vec!["music".into(), "jazz".into(), "unrelated".into()];
        let p = profile(&["music", "jazz"], &[42]);
        assert!((score_post(&n, &p) - 15.0).abs() < 1e-9);
    }

    #[test]
    fn liked_creator_adds_three() {
        let mut n = note(1, 42, 10, 4, 50);
        n.tags = vec!["music".into(), "jazz".into()];
        let p = profile(&["music", "jazz"], &[42]);
        assert!((score_post(&n, &p) - 18.0).abs() < 1e-9);
    }

    #[test]
    fn engagement_fallback_omits_base_and_affinity() {
        let n = note(1, 42, 10, 4, 50);
        let ranked = rank_posts_by_engagement(vec![n]);
        // 0.3*10 + 0.5*4 + 0.1*50 = 10
        assert!((ranked[0].discovery_score - 10.0).abs() < 1e-9);
    }

    #[test]
    fn ranking_is_descending() {
        let quiet = note(1, 10, 0, 0, 0);
        let loud = note(2, 11, 100, 0, 0);
        let p = TasteProfile::default();
        let ranked = rank_posts(vec![quiet, loud], &p);
        assert_eq!(ranked[0].note.id, Uuid::from_u128(2));
    }

    #[test]
    fn ties_keep_fetch_order() {
        let a = note(1, 10, 5, 0, 0);
        let b = note(2, 11, 5, 0, 0);
        let ranked = rank_posts(vec![a, b], &TasteProfile::default());
        assert_eq!(ranked[0].note.id, Uuid::from_u128(1));
        assert_eq!(ranked[1].note.id, Uuid::from_u128(2));
    }

    #[test]
    fn creator_formula() {
        let stats = CreatorStats {
            identity: UserIdentity {
                id: Uuid::from_u128(7),
                username: "ana".into(),
                display_name: None,
                avatar_url: None,
            },
            verified: true,
            post_count: 3,
            total_likes: 10,
            total_comments: 2,
            total_plays: 40,
        };
        // 1 + 0.3*10 + 0.5*2 + 0.1*40 + 2*3 + 10 = 25
        assert!((score_creator(&stats) - 25.0).abs() < 1e-9);
    }

    #[test]
    fn empty_profile_scores_engagement_plus_base() {
        let n = note(1, 42, 10, 4, 50);
        let p = TasteProfile::default();
        assert!((score_post(&n, &p) - 11.0).abs() < 1e-9);
    }
}

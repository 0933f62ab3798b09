//! Cross-strategy result merging.
//!
//! The merge:
//! 1. Keeps one hit per attachment id, the highest scoring one
//!    (on equal scores the first hit seen stays)
//! 2. Sorts the survivors by score descending with a stable sort, so equal
//!    scores keep their input order

use std::cmp::Ordering;
use std::collections::HashMap;

use lumen_core::SearchHit;
use uuid::Uuid;

/// Deduplicate hits by attachment and rank them by relevance.
pub fn merge_hits(hits: Vec<SearchHit>) -> Vec<SearchHit> {
    let mut positions: HashMap<Uuid, usize> = HashMap::with_capacity(hits.len());
    let mut merged: Vec<SearchHit> = Vec::with_capacity(hits.len());

    for hit in hits {
        match positions.get(&hit.attachment_id()) {
            Some(&idx) => {
                if hit.score > merged[idx].score {
                    merged[idx] = hit;
                }
            }
            None => {
                positions.insert(hit.attachment_id(), merged.len());
                merged.push(hit);
            }
        }
    }

    merged.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::{Attachment, ImageSearchContext, MatchType, Note};
    use std::sync::Arc;

    fn create_test_hit(attachment: &Attachment, score: f32, match_type: MatchType) -> SearchHit {
        SearchHit {
            note: Arc::new(Note::new("test", "")),
            attachment: attachment.clone(),
            score,
            match_type,
            snippet: "test snippet".to_string(),
            context: ImageSearchContext::default(),
        }
    }

    #[test]
    fn test_merge_keeps_best_score_per_attachment() {
        let a = Attachment::image("a.png", "a.png");
        let b = Attachment::image("b.png", "b.png");

        let merged = merge_hits(vec![
            create_test_hit(&a, 0.24, MatchType::NoteContent),
            create_test_hit(&b, 0.5, MatchType::Filename),
            create_test_hit(&a, 0.9, MatchType::OcrText),
        ]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].attachment_id(), a.id);
        assert_eq!(merged[0].match_type, MatchType::OcrText);
        assert_eq!(merged[1].attachment_id(), b.id);
    }

    #[test]
    fn test_merge_tie_keeps_first() {
        let a = Attachment::image("a.png", "a.png");

        let merged = merge_hits(vec![
            create_test_hit(&a, 0.7, MatchType::ObjectDetection),
            create_test_hit(&a, 0.7, MatchType::SemanticContent),
        ]);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].match_type, MatchType::ObjectDetection);
    }

    #[test]
    fn test_merge_equal_scores_keep_input_order() {
        let attachments: Vec<Attachment> = (0..4)
            .map(|i| Attachment::image(format!("{}.png", i), format!("{}.png", i)))
            .collect();
        let hits = attachments
            .iter()
            .map(|a| create_test_hit(a, 0.8, MatchType::Filename))
            .collect();

        let merged = merge_hits(hits);
        let ids: Vec<Uuid> = merged.iter().map(|h| h.attachment_id()).collect();
        let expected: Vec<Uuid> = attachments.iter().map(|a| a.id).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_merge_empty() {
        assert!(merge_hits(Vec::new()).is_empty());
    }
}

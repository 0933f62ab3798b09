//! Category decision rules.
//!
//! Rules are evaluated in a fixed priority order and the first match wins.
//! The thresholds were tuned together; change them as a set or not at all.

use lumen_core::defaults::{
    BASE_CLASSIFICATION_CONFIDENCE, BUSINESS_CARD_ASPECT_BOOST, BUSINESS_CARD_REGION_BOOST,
    PHOTO_CONFIDENCE, STRONG_EVIDENCE_BOOST, WEAK_EVIDENCE_BOOST,
};
use lumen_core::DocumentCategory;

use crate::features::{ColorProfile, ImageProperties, TextMetrics};

// Screenshots: outside the ordinary page/photo shape range.
const SCREENSHOT_ASPECT_MIN: f32 = 0.7;
const SCREENSHOT_ASPECT_MAX: f32 = 2.0;

// Business cards: 3.5" x 2" and friends.
const CARD_ASPECT_MIN: f32 = 1.5;
const CARD_ASPECT_MAX: f32 = 1.8;
const CARD_ASPECT_CORE_MIN: f32 = 1.55;
const CARD_ASPECT_CORE_MAX: f32 = 1.75;
const CARD_REGIONS_MIN: usize = 3;
const CARD_REGIONS_MAX: usize = 15;
const CARD_REGIONS_TYPICAL_MIN: usize = 5;
const CARD_REGIONS_TYPICAL_MAX: usize = 12;
const CARD_DENSITY_MIN: f32 = 0.05;
const CARD_DENSITY_MAX: f32 = 0.3;

// Receipts: long strips in either orientation.
const RECEIPT_ASPECT_MIN: f32 = 2.5;
const RECEIPT_ASPECT_MAX: f32 = 4.0;
const RECEIPT_TALL_ASPECT_MAX: f32 = 0.5;
const RECEIPT_TYPICAL_REGIONS: usize = 5;

const INVOICE_REGIONS_MIN: usize = 20;
const INVOICE_DENSITY_MIN: f32 = 0.3;
const INVOICE_DENSE_REGIONS: usize = 40;

const HANDWRITTEN_TEXT_SIZE_MIN: f32 = 0.05;
const HANDWRITTEN_LARGE_TEXT_SIZE: f32 = 0.1;
const HANDWRITTEN_DENSITY_MAX: f32 = 0.2;

const WHITEBOARD_DENSITY_MAX: f32 = 0.2;
const WHITEBOARD_REGIONS_MAX: usize = 10;

const PRINTED_MANY_REGIONS: usize = 10;

/// Everything the decision rules look at.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClassificationFeatures {
    pub aspect_ratio: f32,
    pub text_region_count: usize,
    pub has_text: bool,
    pub text_density: f32,
    pub average_text_size: f32,
    pub is_monochrome: bool,
    pub has_high_contrast: bool,
    pub light_background: bool,
}

impl ClassificationFeatures {
    pub fn new(properties: &ImageProperties, text: &TextMetrics, colors: &ColorProfile) -> Self {
        Self {
            aspect_ratio: properties.aspect_ratio,
            text_region_count: text.region_count,
            has_text: text.has_text,
            text_density: text.density,
            average_text_size: text.average_text_size,
            is_monochrome: colors.is_monochrome,
            has_high_contrast: colors.has_high_contrast,
            light_background: colors.has_light_background(),
        }
    }
}

/// Pick a category and a confidence in `[0, 1]`.
pub fn decide(f: &ClassificationFeatures) -> (DocumentCategory, f32) {
    let aspect = f.aspect_ratio;
    let count = f.text_region_count;

    if !f.has_text && !f.is_monochrome {
        return (DocumentCategory::Photo, PHOTO_CONFIDENCE);
    }

    let category = if !(SCREENSHOT_ASPECT_MIN..=SCREENSHOT_ASPECT_MAX).contains(&aspect)
        && f.has_text
        && f.has_high_contrast
    {
        DocumentCategory::Screenshot
    } else if (CARD_ASPECT_MIN..=CARD_ASPECT_MAX).contains(&aspect)
        && (CARD_REGIONS_MIN..=CARD_REGIONS_MAX).contains(&count)
        && f.text_density > CARD_DENSITY_MIN
        && f.text_density < CARD_DENSITY_MAX
    {
        DocumentCategory::BusinessCard
    } else if ((RECEIPT_ASPECT_MIN..=RECEIPT_ASPECT_MAX).contains(&aspect)
        || aspect < RECEIPT_TALL_ASPECT_MAX)
        && f.has_text
        && f.is_monochrome
    {
        DocumentCategory::Receipt
    } else if count > INVOICE_REGIONS_MIN && f.text_density > INVOICE_DENSITY_MIN {
        DocumentCategory::Invoice
    } else if f.has_text
        && f.average_text_size > HANDWRITTEN_TEXT_SIZE_MIN
        && (!f.is_monochrome || f.text_density < HANDWRITTEN_DENSITY_MAX)
    {
        DocumentCategory::Handwritten
    } else if f.light_background
        && f.has_text
        && f.text_density < WHITEBOARD_DENSITY_MAX
        && count < WHITEBOARD_REGIONS_MAX
    {
        DocumentCategory::Whiteboard
    } else if f.has_text {
        DocumentCategory::PrintedDocument
    } else {
        DocumentCategory::Unknown
    };

    let confidence = BASE_CLASSIFICATION_CONFIDENCE + evidence_boost(category, f);
    (category, confidence.min(1.0))
}

fn evidence_boost(category: DocumentCategory, f: &ClassificationFeatures) -> f32 {
    let aspect = f.aspect_ratio;
    let count = f.text_region_count;
    let boost_if = |cond: bool, amount: f32| if cond { amount } else { 0.0 };

    match category {
        DocumentCategory::BusinessCard => {
            boost_if(
                (CARD_ASPECT_CORE_MIN..=CARD_ASPECT_CORE_MAX).contains(&aspect),
                BUSINESS_CARD_ASPECT_BOOST,
            ) + boost_if(
                (CARD_REGIONS_TYPICAL_MIN..=CARD_REGIONS_TYPICAL_MAX).contains(&count),
                BUSINESS_CARD_REGION_BOOST,
            )
        }
        DocumentCategory::Screenshot => {
            boost_if(f.has_high_contrast, STRONG_EVIDENCE_BOOST)
                + boost_if(!f.is_monochrome, WEAK_EVIDENCE_BOOST)
        }
        DocumentCategory::Receipt => {
            boost_if(
                (RECEIPT_ASPECT_MIN..=RECEIPT_ASPECT_MAX).contains(&aspect)
                    || aspect < RECEIPT_TALL_ASPECT_MAX,
                STRONG_EVIDENCE_BOOST,
            ) + boost_if(count >= RECEIPT_TYPICAL_REGIONS, WEAK_EVIDENCE_BOOST)
        }
        DocumentCategory::Invoice => {
            STRONG_EVIDENCE_BOOST + boost_if(count > INVOICE_DENSE_REGIONS, WEAK_EVIDENCE_BOOST)
        }
        DocumentCategory::Handwritten => {
            boost_if(
                f.average_text_size > HANDWRITTEN_LARGE_TEXT_SIZE,
                STRONG_EVIDENCE_BOOST,
            ) + boost_if(!f.is_monochrome, WEAK_EVIDENCE_BOOST)
        }
        DocumentCategory::Whiteboard => STRONG_EVIDENCE_BOOST,
        DocumentCategory::PrintedDocument => {
            boost_if(f.is_monochrome, STRONG_EVIDENCE_BOOST)
                + boost_if(count >= PRINTED_MANY_REGIONS, WEAK_EVIDENCE_BOOST)
        }
        DocumentCategory::Photo | DocumentCategory::Unknown => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_features(aspect_ratio: f32, count: usize, density: f32) -> ClassificationFeatures {
        ClassificationFeatures {
            aspect_ratio,
            text_region_count: count,
            has_text: count > 0,
            text_density: density,
            ..Default::default()
        }
    }

    #[test]
    fn test_no_text_colorful_is_photo() {
        let f = ClassificationFeatures {
            aspect_ratio: 1.33,
            ..Default::default()
        };
        assert_eq!(decide(&f), (DocumentCategory::Photo, PHOTO_CONFIDENCE));
    }

    #[test]
    fn test_no_text_monochrome_is_unknown() {
        let f = ClassificationFeatures {
            aspect_ratio: 1.0,
            is_monochrome: true,
            ..Default::default()
        };
        let (category, confidence) = decide(&f);
        assert_eq!(category, DocumentCategory::Unknown);
        assert_eq!(confidence, BASE_CLASSIFICATION_CONFIDENCE);
    }

    #[test]
    fn test_business_card() {
        let (category, confidence) = decide(&text_features(1.65, 7, 0.15));
        assert_eq!(category, DocumentCategory::BusinessCard);
        assert!((confidence - 1.0).abs() < 1e-6);

        // Edge of the card range, few lines: no boosts.
        let (category, confidence) = decide(&text_features(1.8, 3, 0.1));
        assert_eq!(category, DocumentCategory::BusinessCard);
        assert_eq!(confidence, BASE_CLASSIFICATION_CONFIDENCE);
    }

    #[test]
    fn test_receipt_wide_and_tall() {
        for aspect in [3.2, 0.3] {
            let f = ClassificationFeatures {
                is_monochrome: true,
                ..text_features(aspect, 6, 0.2)
            };
            let (category, confidence) = decide(&f);
            assert_eq!(category, DocumentCategory::Receipt);
            assert!((confidence - 0.8).abs() < 1e-6);
        }
    }

    #[test]
    fn test_wide_high_contrast_text_is_screenshot() {
        // Same shape as a receipt, but screenshot outranks it.
        let f = ClassificationFeatures {
            is_monochrome: true,
            has_high_contrast: true,
            ..text_features(3.2, 6, 0.2)
        };
        assert_eq!(decide(&f).0, DocumentCategory::Screenshot);
    }

    #[test]
    fn test_invoice() {
        let f = ClassificationFeatures {
            is_monochrome: true,
            ..text_features(0.77, 25, 0.45)
        };
        let (category, confidence) = decide(&f);
        assert_eq!(category, DocumentCategory::Invoice);
        assert!((confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_handwritten() {
        let f = ClassificationFeatures {
            average_text_size: 0.08,
            ..text_features(1.33, 6, 0.25)
        };
        assert_eq!(decide(&f).0, DocumentCategory::Handwritten);
    }

    #[test]
    fn test_whiteboard() {
        let f = ClassificationFeatures {
            is_monochrome: true,
            light_background: true,
            average_text_size: 0.03,
            ..text_features(1.33, 4, 0.1)
        };
        assert_eq!(decide(&f).0, DocumentCategory::Whiteboard);
    }

    #[test]
    fn test_printed_document_fallback() {
        let f = ClassificationFeatures {
            is_monochrome: true,
            average_text_size: 0.02,
            ..text_features(0.77, 18, 0.25)
        };
        let (category, confidence) = decide(&f);
        assert_eq!(category, DocumentCategory::PrintedDocument);
        assert!((confidence - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_confidence_never_exceeds_one() {
        for count in 0..50 {
            for aspect in [0.3, 0.7, 1.0, 1.65, 2.0, 3.2, 5.0] {
                for mono in [false, true] {
                    let f = ClassificationFeatures {
                        is_monochrome: mono,
                        has_high_contrast: !mono,
                        light_background: mono,
                        average_text_size: 0.12,
                        ..text_features(aspect, count, count as f32 * 0.02)
                    };
                    let (_, confidence) = decide(&f);
                    assert!((0.0..=1.0).contains(&confidence));
                }
            }
        }
    }
}

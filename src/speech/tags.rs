//! SenseVoice emotion tag parsing.
//!
//! SenseVoice embeds special tokens such as `<|en|><|ANGRY|><|Speech|>` in its
//! transcription. Only the four emotion tokens are counted; every other token
//! is ignored.

use regex::Regex;
use std::sync::OnceLock;

use crate::emotion::{EmotionDistribution, Modality};

static TAG_PATTERN: OnceLock<Regex> = OnceLock::new();

fn tag_pattern() -> &'static Regex {
    TAG_PATTERN.get_or_init(|| Regex::new(r"<\|(\w+)\|>").expect("tag pattern is valid"))
}

/// Map an upper-cased SenseVoice tag to its speech label
fn tag_to_label(tag: &str) -> Option<&'static str> {
    match tag {
        "HAPPY" => Some("happy"),
        "ANGRY" => Some("angry"),
        "SAD" => Some("sad"),
        "NEUTRAL" => Some("neutral"),
        _ => None,
    }
}

/// Recognized emotion labels in order of appearance
pub fn emotion_tags(text: &str) -> Vec<&'static str> {
    let upper = text.to_uppercase();
    tag_pattern()
        .captures_iter(&upper)
        .filter_map(|caps| caps.get(1).and_then(|m| tag_to_label(m.as_str())))
        .collect()
}

/// Occurrence histogram of the emotion tags in `text`, normalized to sum 1.0.
///
/// Text without any recognized tag is fully neutral.
pub fn parse_emotion_tags(text: &str) -> EmotionDistribution {
    let tags = emotion_tags(text);

    if tags.is_empty() {
        return EmotionDistribution::from_pairs(Modality::Speech, [("neutral", 1.0)]);
    }

    let total = tags.len() as f32;
    let mut dist = EmotionDistribution::zeros(Modality::Speech);
    for label in Modality::Speech.labels() {
        let count = tags.iter().filter(|t| *t == label).count();
        dist.set(label, count as f32 / total);
    }
    dist
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_happy_tag() {
        let emotions = parse_emotion_tags("hello <|HAPPY|> world");
        assert_eq!(emotions.get("happy"), 1.0);
        assert_eq!(emotions.get("angry"), 0.0);
    }

    #[test]
    fn test_angry_tag() {
        let emotions = parse_emotion_tags("<|ANGRY|> some text");
        assert_eq!(emotions.get("angry"), 1.0);
        assert_eq!(emotions.argmax(), "angry");
    }

    #[test]
    fn test_no_tags_returns_neutral() {
        let emotions = parse_emotion_tags("just some plain text");
        assert_eq!(emotions.get("neutral"), 1.0);
        assert_eq!(emotions.get("angry"), 0.0);
        assert_eq!(emotions.get("happy"), 0.0);
        assert_eq!(emotions.get("sad"), 0.0);
    }

    #[test]
    fn test_multiple_tags() {
        let emotions = parse_emotion_tags("<|ANGRY|> <|ANGRY|> <|SAD|>");
        assert!((emotions.get("angry") - 2.0 / 3.0).abs() < 1e-6);
        assert!((emotions.get("sad") - 1.0 / 3.0).abs() < 1e-6);
        assert_eq!(emotions.get("happy"), 0.0);
        assert_eq!(emotions.get("neutral"), 0.0);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(parse_emotion_tags("<|happy|>").get("happy"), 1.0);
        assert_eq!(parse_emotion_tags("<|Angry|>").get("angry"), 1.0);
    }

    #[test]
    fn test_unrecognized_tags_are_ignored() {
        let emotions = parse_emotion_tags("<|en|><|SAD|><|Speech|><|woitn|>I lost it");
        assert_eq!(emotions.get("sad"), 1.0);

        let emotions = parse_emotion_tags("<|en|><|EMO_UNKNOWN|><|Speech|>");
        assert_eq!(emotions.get("neutral"), 1.0);
    }

    #[test]
    fn test_tie_break_follows_label_order() {
        let emotions = parse_emotion_tags("<|SAD|><|HAPPY|>");
        assert_eq!(emotions.argmax(), "happy");

        let emotions = parse_emotion_tags("<|NEUTRAL|><|ANGRY|>");
        assert_eq!(emotions.argmax(), "angry");
    }

    #[test]
    fn test_emotion_tags_in_order() {
        assert_eq!(
            emotion_tags("<|sad|> a <|HAPPY|> b <|xyz|> <|angry|>"),
            vec!["sad", "happy", "angry"]
        );
    }

    proptest! {
        #[test]
        fn prop_distribution_sums_to_one(
            tags in proptest::collection::vec(
                prop_oneof![
                    Just("<|HAPPY|>"), Just("<|ANGRY|>"), Just("<|SAD|>"),
                    Just("<|NEUTRAL|>"), Just("<|en|>"), Just("word ")
                ],
                0..40
            )
        ) {
            let text: String = tags.concat();
            let dist = parse_emotion_tags(&text);
            prop_assert!((dist.sum() - 1.0).abs() < 1e-5);
            prop_assert_eq!(dist.iter().count(), 4);
        }
    }
}

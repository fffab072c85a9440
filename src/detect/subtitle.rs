//! Profanity detection over subtitle text.

use super::srt::Cue;
use crate::config::ProfanityFilter;
use anyhow::{Context, Result};
use cleanmedia_timeline::{Detection, Payload};
use regex::Regex;

/// Case-insensitive whole-word matcher for a word list.
#[derive(Debug, Clone)]
pub struct Lexicon {
    pattern: Regex,
    replacement: String,
}

impl Lexicon {
    /// Build a matcher. Returns `None` for an empty word list.
    pub fn new(words: &[String], replacement: &str) -> Result<Option<Self>> {
        let mut words: Vec<&str> = words
            .iter()
            .map(|w| w.trim())
            .filter(|w| !w.is_empty())
            .collect();
        if words.is_empty() {
            return Ok(None);
        }

        // Longest first so that e.g. "asshole" wins over "ass"
        words.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
        words.dedup();

        let alternation = words
            .iter()
            .map(|w| regex::escape(w))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!(r"(?i)\b(?:{})\b", alternation))
            .with_context(|| "Failed to compile profanity word list")?;

        Ok(Some(Self {
            pattern,
            replacement: replacement.to_string(),
        }))
    }

    /// Matched words in order of appearance, as written in the text.
    pub fn find<'t>(&self, text: &'t str) -> Vec<&'t str> {
        self.pattern.find_iter(text).map(|m| m.as_str()).collect()
    }

    /// Replace every match with the replacement token.
    pub fn censor(&self, text: &str) -> String {
        self.pattern
            .replace_all(text, regex::NoExpand(&self.replacement))
            .into_owned()
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }
}

/// Emits one profanity detection per matched word.
#[derive(Debug, Clone)]
pub struct SubtitleDetector {
    lexicon: Lexicon,
    raw_action: String,
}

impl SubtitleDetector {
    /// Build from the profanity filter settings. `None` when the filter is
    /// disabled or has no words.
    pub fn from_config(filter: &ProfanityFilter) -> Result<Option<Self>> {
        if !filter.enabled {
            return Ok(None);
        }
        Ok(
            Lexicon::new(&filter.word_list, &filter.replace_with)?.map(|lexicon| Self {
                lexicon,
                raw_action: filter.action.clone(),
            }),
        )
    }

    pub fn detect(&self, cues: &[Cue]) -> Vec<Detection> {
        let mut detections = Vec::new();

        for cue in cues {
            for word in self.lexicon.find(&cue.text) {
                let payload = Payload {
                    original_text: Some(cue.text.clone()),
                    replacement: Some(self.lexicon.replacement.clone()),
                    matched_words: vec![word.to_lowercase()],
                };
                detections.push(
                    Detection::new(
                        cue.start,
                        cue.end,
                        "profanity",
                        &self.raw_action,
                        1.0,
                        "subtitle",
                    )
                    .with_payload(payload),
                );
            }
        }

        tracing::debug!(cues = cues.len(), detections = detections.len(), "Scanned subtitles");
        detections
    }

    /// Copies of the cues with every match censored.
    pub fn filter_cues(&self, cues: &[Cue]) -> Vec<Cue> {
        cues.iter()
            .map(|cue| Cue {
                text: self.lexicon.censor(&cue.text),
                ..cue.clone()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cue(start: f64, end: f64, text: &str) -> Cue {
        Cue {
            index: 1,
            start,
            end,
            text: text.to_string(),
        }
    }

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_whole_word_case_insensitive() {
        let lexicon = Lexicon::new(&words(&["hell", "ass"]), "[censored]")
            .unwrap()
            .unwrap();
        assert_eq!(lexicon.find("What the HELL, hello"), vec!["HELL"]);
        assert!(lexicon.find("a classic assessment").is_empty());
        assert_eq!(lexicon.censor("Hell no, ass."), "[censored] no, [censored].");
    }

    #[test]
    fn test_longest_word_wins() {
        let lexicon = Lexicon::new(&words(&["damn", "goddamn"]), "***")
            .unwrap()
            .unwrap();
        assert_eq!(lexicon.find("goddamn it"), vec!["goddamn"]);
    }

    #[test]
    fn test_words_are_escaped() {
        let lexicon = Lexicon::new(&words(&["a.b"]), "x").unwrap().unwrap();
        assert!(lexicon.find("acb").is_empty());
        assert_eq!(lexicon.find("a.b"), vec!["a.b"]);
    }

    #[test]
    fn test_replacement_is_literal() {
        let lexicon = Lexicon::new(&words(&["heck"]), "$1").unwrap().unwrap();
        assert_eq!(lexicon.censor("heck"), "$1");
    }

    #[test]
    fn test_empty_word_list() {
        assert!(Lexicon::new(&words(&["", "  "]), "x").unwrap().is_none());
    }

    #[test]
    fn test_detect_one_per_match() {
        let detector = SubtitleDetector::from_config(&ProfanityFilter::default())
            .unwrap()
            .unwrap();
        let detections = detector.detect(&[
            cue(10.0, 12.0, "Damn, what the hell"),
            cue(13.0, 14.0, "All clean"),
        ]);

        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].start, 10.0);
        assert_eq!(detections[0].category, "profanity");
        assert_eq!(detections[0].raw_action, "mute_audio");
        assert_eq!(detections[0].source_tag, "subtitle");
        let payload = detections[0].payload.as_ref().unwrap();
        assert_eq!(payload.matched_words, vec!["damn"]);
        assert_eq!(payload.replacement.as_deref(), Some("[censored]"));
        assert_eq!(payload.original_text.as_deref(), Some("Damn, what the hell"));
    }

    #[test]
    fn test_disabled_filter() {
        let filter = ProfanityFilter {
            enabled: false,
            ..Default::default()
        };
        assert!(SubtitleDetector::from_config(&filter).unwrap().is_none());
    }

    #[test]
    fn test_filter_cues() {
        let detector = SubtitleDetector::from_config(&ProfanityFilter::default())
            .unwrap()
            .unwrap();
        let filtered = detector.filter_cues(&[cue(1.0, 2.0, "Oh hell")]);
        assert_eq!(filtered[0].text, "Oh [censored]");
        assert_eq!(filtered[0].start, 1.0);
    }
}

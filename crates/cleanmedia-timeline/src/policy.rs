//! Injected filter policy.
//!
//! The builder never reads global configuration. Everything that decides how
//! a raw detection becomes a segment lives in a [`Policy`] value handed to
//! [`TimelineBuilder::new`](crate::TimelineBuilder::new), so a build is a pure
//! function of its inputs.

use crate::segment::{Action, Category, Source};
use crate::{Error, Result};
use std::collections::BTreeMap;

/// Per-category action rules.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryRule {
    /// Action used when the detector does not suggest a recognizable one.
    pub default_action: Action,
    /// Actions that are valid for this category.
    pub allowed: Vec<Action>,
    /// Category-specific raw action spellings, checked before the global table.
    pub aliases: BTreeMap<String, Action>,
}

impl CategoryRule {
    /// Rule with a default action and an allowed set, no aliases.
    pub fn new(default_action: Action, allowed: &[Action]) -> Self {
        Self {
            default_action,
            allowed: allowed.to_vec(),
            aliases: BTreeMap::new(),
        }
    }

    /// Add a category-specific alias.
    pub fn alias(mut self, raw: &str, action: Action) -> Self {
        self.aliases.insert(raw.to_lowercase(), action);
        self
    }
}

/// Rules for normalizing and merging detections.
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    /// Rules per category. A category without a rule is rejected.
    pub rules: BTreeMap<Category, CategoryRule>,
    /// Raw action spellings shared by all categories.
    pub aliases: BTreeMap<String, Action>,
    /// Actions ordered most restrictive first.
    pub restrictiveness: Vec<Action>,
    /// Sources ordered by precedence for identical intervals.
    pub source_priority: Vec<Source>,
    /// Abort the whole build on the first invalid detection.
    pub strict: bool,
    /// Same-category segments separated by at most this gap are merged.
    pub merge_gap_secs: f64,
    /// Media duration, used to clamp segment ends.
    pub media_duration: Option<f64>,
}

impl Default for Policy {
    fn default() -> Self {
        let mut rules = BTreeMap::new();
        rules.insert(
            Category::Profanity,
            CategoryRule::new(
                Action::Mute,
                &[Action::Mute, Action::Replace, Action::Skip, Action::None],
            ),
        );
        rules.insert(
            Category::Nudity,
            CategoryRule::new(Action::Skip, &[Action::Skip, Action::Mute, Action::None]),
        );
        rules.insert(
            Category::Violence,
            CategoryRule::new(Action::Skip, &[Action::Skip, Action::Mute, Action::None]),
        );

        let aliases = [
            ("mute_audio", Action::Mute),
            ("silence", Action::Mute),
            ("skip_scene", Action::Skip),
            ("jump_to_end", Action::Skip),
            // Region blurring is not available to the player; skipping is
            // the closest remediation it can perform.
            ("blur_region", Action::Skip),
            ("blur", Action::Skip),
            ("replace_text", Action::Replace),
            ("bleep", Action::Replace),
            ("flag", Action::None),
            ("log", Action::None),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            rules,
            aliases,
            restrictiveness: Action::ALL.to_vec(),
            source_priority: vec![Source::Subtitle, Source::Video, Source::Multiple],
            strict: false,
            merge_gap_secs: 0.0,
            media_duration: None,
        }
    }
}

impl Policy {
    /// Set strict mode.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Set the media duration used for clamping.
    pub fn media_duration(mut self, duration: Option<f64>) -> Self {
        self.media_duration = duration;
        self
    }

    /// Set the same-category merge gap.
    pub fn merge_gap(mut self, secs: f64) -> Self {
        self.merge_gap_secs = secs;
        self
    }

    /// Replace the rule for one category.
    pub fn rule(mut self, category: Category, rule: CategoryRule) -> Self {
        self.rules.insert(category, rule);
        self
    }

    /// Check that the policy itself is coherent.
    pub fn validate(&self) -> Result<()> {
        for action in Action::ALL {
            let count = self.restrictiveness.iter().filter(|a| **a == action).count();
            if count != 1 {
                return Err(Error::validation(format!(
                    "restrictiveness order must list '{}' exactly once",
                    action
                )));
            }
        }

        if !self.merge_gap_secs.is_finite() || self.merge_gap_secs < 0.0 {
            return Err(Error::validation(format!(
                "merge gap must be finite and non-negative (got {})",
                self.merge_gap_secs
            )));
        }

        if let Some(d) = self.media_duration {
            if !d.is_finite() || d <= 0.0 {
                return Err(Error::validation(format!(
                    "media duration must be positive (got {})",
                    d
                )));
            }
        }

        for (category, rule) in &self.rules {
            if !rule.allowed.contains(&rule.default_action) {
                return Err(Error::validation(format!(
                    "default action '{}' for {} is not in its allowed set",
                    rule.default_action, category
                )));
            }
        }

        Ok(())
    }

    /// Restrictiveness rank; higher is more restrictive.
    pub fn rank(&self, action: Action) -> usize {
        self.restrictiveness
            .iter()
            .position(|a| *a == action)
            .map(|pos| self.restrictiveness.len() - pos)
            .unwrap_or(0)
    }

    /// The more restrictive of two actions.
    pub fn most_restrictive(&self, a: Action, b: Action) -> Action {
        if self.rank(b) > self.rank(a) {
            b
        } else {
            a
        }
    }

    /// Precedence of a source for identical intervals; lower sorts first.
    pub fn source_rank(&self, source: Source) -> usize {
        self.source_priority
            .iter()
            .position(|s| *s == source)
            .unwrap_or(self.source_priority.len())
    }

    /// Infer the action for a raw suggestion in the given category.
    ///
    /// Resolution order: canonical action names, category aliases, global
    /// aliases, then the category default.
    pub fn resolve_action(
        &self,
        category: Category,
        raw: &str,
    ) -> std::result::Result<Action, String> {
        let rule = self
            .rules
            .get(&category)
            .ok_or_else(|| format!("no policy rule for category '{}'", category))?;

        let key = raw.trim().to_lowercase();
        if key.is_empty() {
            return Ok(rule.default_action);
        }

        if let Ok(action) = key.parse::<Action>() {
            return Ok(action);
        }

        if let Some(action) = rule.aliases.get(&key).or_else(|| self.aliases.get(&key)) {
            return Ok(*action);
        }

        tracing::debug!(
            category = %category,
            raw_action = %raw,
            fallback = %rule.default_action,
            "Unrecognized action suggestion, using category default"
        );
        Ok(rule.default_action)
    }

    /// Check that `action` is valid for `category`.
    pub fn check_allowed(
        &self,
        category: Category,
        action: Action,
    ) -> std::result::Result<(), String> {
        let rule = self
            .rules
            .get(&category)
            .ok_or_else(|| format!("no policy rule for category '{}'", category))?;

        if rule.allowed.contains(&action) {
            Ok(())
        } else {
            Err(format!(
                "action '{}' is not allowed for category '{}'",
                action, category
            ))
        }
    }
}

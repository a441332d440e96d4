//! Autoload rules and mapping selection.
//!
//! A mapping may declare three regex patterns matched against the focused
//! process name, its window title and the controller name. Patterns must
//! match the whole field. Specificity is the count of non-wildcard patterns
//! and is only used to rank candidates, never to reject them.

use super::config::ConfigError;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const WILDCARD: &str = ".*";

/// Raw autoload rule as written in a mapping document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AutoloadRule {
    #[serde(default = "default_wildcard")]
    pub exe: String,
    #[serde(default = "default_wildcard")]
    pub window: String,
    #[serde(default = "default_wildcard")]
    pub controller: String,
}

impl Default for AutoloadRule {
    fn default() -> Self {
        Self {
            exe: default_wildcard(),
            window: default_wildcard(),
            controller: default_wildcard(),
        }
    }
}

impl AutoloadRule {
    /// Count of patterns narrower than "match anything".
    pub fn specificity(&self) -> usize {
        [&self.exe, &self.window, &self.controller]
            .into_iter()
            .filter(|pattern| pattern.as_str() != WILDCARD)
            .count()
    }
}

fn default_wildcard() -> String {
    WILDCARD.to_string()
}

/// An autoload rule with its patterns validated and anchored for full-match
/// semantics, tied to the mapping it would load.
#[derive(Debug, Clone)]
pub struct CompiledAutoload {
    pub mapping_name: String,
    pub rule: AutoloadRule,
    exe: Regex,
    window: Regex,
    controller: Regex,
}

impl CompiledAutoload {
    pub fn compile(mapping_name: &str, rule: AutoloadRule) -> Result<Self, ConfigError> {
        Ok(Self {
            exe: full_match(&rule.exe)?,
            window: full_match(&rule.window)?,
            controller: full_match(&rule.controller)?,
            mapping_name: mapping_name.to_string(),
            rule,
        })
    }

    pub fn matches(&self, ctx: &FocusContext) -> bool {
        self.exe.is_match(&ctx.exe)
            && self.window.is_match(&ctx.window_title)
            && self.controller.is_match(&ctx.controller)
    }

    pub fn specificity(&self) -> usize {
        self.rule.specificity()
    }
}

fn full_match(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|source| ConfigError::InvalidRegex {
        pattern: pattern.to_string(),
        source,
    })
}

/// What the autoload selector matches against.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FocusContext {
    pub exe: String,
    pub window_title: String,
    pub controller: String,
}

/// Pick the mapping to load for the current focus, if any.
///
/// The currently-loaded mapping is excluded so a selection is always a
/// change. A single full match wins outright; among several, the uniquely
/// most specific rule wins; a specificity tie selects nothing.
pub fn select_autoload<'a>(
    candidates: &'a [CompiledAutoload],
    ctx: &FocusContext,
    current_mapping: Option<&str>,
) -> Option<&'a CompiledAutoload> {
    let matches: Vec<&CompiledAutoload> = candidates
        .iter()
        .filter(|candidate| Some(candidate.mapping_name.as_str()) != current_mapping)
        .filter(|candidate| candidate.matches(ctx))
        .collect();

    match matches.as_slice() {
        [] => None,
        [only] => Some(only),
        several => {
            let top = several.iter().map(|m| m.specificity()).max()?;
            let mut best = several.iter().filter(|m| m.specificity() == top);
            let winner = best.next()?;
            if best.next().is_some() {
                None
            } else {
                Some(winner)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compiled(name: &str, exe: &str, window: &str, controller: &str) -> CompiledAutoload {
        CompiledAutoload::compile(
            name,
            AutoloadRule {
                exe: exe.into(),
                window: window.into(),
                controller: controller.into(),
            },
        )
        .unwrap()
    }

    fn ctx() -> FocusContext {
        FocusContext {
            exe: "game.exe".into(),
            window_title: "Game - Level 3".into(),
            controller: "DualSense Wireless Controller".into(),
        }
    }

    #[test]
    fn patterns_must_match_the_whole_field() {
        let rule = compiled("m", "game", ".*", ".*");
        assert!(!rule.matches(&ctx()));
        let rule = compiled("m", "game\\.exe", ".*", ".*");
        assert!(rule.matches(&ctx()));
    }

    #[test]
    fn higher_specificity_wins() {
        let broad = compiled("broad", "game\\.exe", ".*", ".*");
        let narrow = compiled("narrow", "game\\.exe", "Game.*", ".*");
        let rules = [broad, narrow];
        let selected = select_autoload(&rules, &ctx(), None).unwrap();
        assert_eq!(selected.mapping_name, "narrow");
    }

    #[test]
    fn specificity_tie_selects_nothing() {
        let a = compiled("a", "game\\.exe", "Game.*", ".*");
        let b = compiled("b", ".*\\.exe", "Game.*", ".*");
        assert!(select_autoload(&[a, b], &ctx(), None).is_none());
    }

    #[test]
    fn current_mapping_is_excluded() {
        let only = compiled("only", "game\\.exe", ".*", ".*");
        assert!(select_autoload(&[only.clone()], &ctx(), Some("only")).is_none());
        assert!(select_autoload(&[only], &ctx(), Some("other")).is_some());
    }

    #[test]
    fn all_wildcards_still_match_but_score_zero() {
        let rule = compiled("default", ".*", ".*", ".*");
        assert!(rule.matches(&ctx()));
        assert_eq!(rule.specificity(), 0);
    }

    #[test]
    fn invalid_pattern_is_a_config_error() {
        let result = CompiledAutoload::compile(
            "broken",
            AutoloadRule {
                exe: "(".into(),
                ..AutoloadRule::default()
            },
        );
        assert!(matches!(result, Err(ConfigError::InvalidRegex { .. })));
    }
}

//! Default tent for quick-add
//!
//! Word overlap between a tent's name and an entity's display name and id.
//! The result is only a default; callers always let the user pick another.

use std::sync::OnceLock;

use regex::Regex;
use tent_config::TentConfig;
use tent_core::Entity;

const DISPLAY_NAME_WEIGHT: u32 = 2;
const ENTITY_ID_WEIGHT: u32 = 1;

fn word_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[\p{L}\p{N}]+").expect("static pattern"))
}

/// Lowercase word tokens of `text`, keeping only those longer than two characters
///
/// Words are runs of letters and digits in any script; `_`, `.` and other
/// punctuation separate them.
pub fn tokens(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    word_pattern()
        .find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|t| t.chars().count() > 2)
        .map(str::to_string)
        .collect()
}

/// Score of one tent for one entity
pub fn tent_score(tent: &TentConfig, entity: &Entity) -> u32 {
    let name_tokens = tokens(entity.display_name());
    let id_tokens = tokens(entity.entity_id.as_str());

    tokens(&tent.name)
        .iter()
        .map(|word| {
            let mut score = 0;
            if name_tokens.contains(word) {
                score += DISPLAY_NAME_WEIGHT;
            }
            if id_tokens.contains(word) {
                score += ENTITY_ID_WEIGHT;
            }
            score
        })
        .sum()
}

/// Every tent with its score, in declaration order
pub fn tent_scores<'t>(tents: &'t [TentConfig], entity: &Entity) -> Vec<(&'t TentConfig, u32)> {
    tents.iter().map(|t| (t, tent_score(t, entity))).collect()
}

/// The highest-scoring tent; ties go to the first declared
pub fn guess_tent<'t>(tents: &'t [TentConfig], entity: &Entity) -> Option<&'t TentConfig> {
    let mut best: Option<(&TentConfig, u32)> = None;
    for (tent, score) in tent_scores(tents, entity) {
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((tent, score)),
        }
    }
    best.map(|(tent, _)| tent)
}

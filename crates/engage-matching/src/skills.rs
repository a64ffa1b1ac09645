use std::collections::BTreeSet;

use crate::model::{ProfileSkill, RequiredSkill};

/// Outcome of comparing required skills against a profile.
#[derive(Debug, Clone, PartialEq)]
pub struct SkillMatch {
    /// Fraction of required skills the profile covers (0.0..=1.0).
    pub match_percentage: f64,
    /// Normalized names present on both sides, sorted.
    pub matched_skills: Vec<String>,
    /// Normalized required names the profile lacks, sorted.
    pub missing_skills: Vec<String>,
}

/// Trim and lowercase a skill name so "React " and "react" compare equal.
pub fn normalize_skill(name: &str) -> String {
    name.trim().to_lowercase()
}

fn normalize_set<'a>(names: impl Iterator<Item = &'a str>) -> BTreeSet<String> {
    names
        .map(normalize_skill)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Share of required skills covered by the profile.
///
/// An empty requirement list matches everyone with 1.0.
pub fn match_skills(required: &[RequiredSkill], offered: &[ProfileSkill]) -> SkillMatch {
    let req = normalize_set(required.iter().map(|s| s.name.as_str()));
    if req.is_empty() {
        return SkillMatch {
            match_percentage: 1.0,
            matched_skills: Vec::new(),
            missing_skills: Vec::new(),
        };
    }

    let have = normalize_set(offered.iter().map(|s| s.name.as_str()));
    let (matched, missing): (Vec<String>, Vec<String>) =
        req.iter().cloned().partition(|s| have.contains(s));

    SkillMatch {
        match_percentage: matched.len() as f64 / req.len() as f64,
        matched_skills: matched,
        missing_skills: missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SkillLevel;

    fn req(names: &[&str]) -> Vec<RequiredSkill> {
        names
            .iter()
            .map(|n| RequiredSkill::new(*n, SkillLevel::Advanced))
            .collect()
    }

    fn has(names: &[&str]) -> Vec<ProfileSkill> {
        names
            .iter()
            .map(|n| ProfileSkill::new(*n, SkillLevel::Advanced, 3))
            .collect()
    }

    #[test]
    fn full_match() {
        let m = match_skills(&req(&["React", "TypeScript"]), &has(&["typescript", "react", "go"]));
        assert_eq!(m.match_percentage, 1.0);
        assert_eq!(m.matched_skills, vec!["react", "typescript"]);
        assert!(m.missing_skills.is_empty());
    }

    #[test]
    fn half_match_lists_missing() {
        let m = match_skills(&req(&["React", "TypeScript"]), &has(&["React"]));
        assert_eq!(m.match_percentage, 0.5);
        assert_eq!(m.missing_skills, vec!["typescript"]);
    }

    #[test]
    fn empty_requirements_match_everyone() {
        let m = match_skills(&[], &has(&["Rust"]));
        assert_eq!(m.match_percentage, 1.0);
    }

    #[test]
    fn duplicate_required_names_count_once() {
        let m = match_skills(&req(&["Rust", " rust ", "SQL"]), &has(&["Rust"]));
        assert_eq!(m.match_percentage, 0.5);
    }
}

//! Checks configured field paths against real data.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{DetectedFields, FieldDetector};
use crate::text::{fold, keywords};
use world_bible::{Entity, FieldPath};

/// A declared path absent from real data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidField {
    pub path: FieldPath,
    /// Closest observed path, when one looks plausible.
    pub suggestion: Option<FieldPath>,
}

/// Outcome of validating a list of paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: Vec<FieldPath>,
    pub invalid: Vec<InvalidField>,
}

impl ValidationReport {
    /// Whether every path was found.
    pub fn is_clean(&self) -> bool {
        self.invalid.is_empty()
    }
}

/// Flags config-declared paths that do not exist in real data.
///
/// Never a hard failure: without data there is simply no report, and a
/// path without a plausible neighbour gets no suggestion.
#[derive(Debug, Clone, Default)]
pub struct FieldValidator {
    detector: FieldDetector,
}

impl FieldValidator {
    /// Create a validator using the given detector.
    pub fn new(detector: FieldDetector) -> Self {
        Self { detector }
    }

    /// Validate `paths` against a sample of `entities`.
    ///
    /// Returns `None` when there is no data to validate against. Paths
    /// resolving in any entity of the full list are also accepted, so
    /// indexed paths outside the sample still count.
    pub fn validate(&self, paths: &[FieldPath], entities: &[Entity]) -> Option<ValidationReport> {
        if entities.is_empty() {
            return None;
        }
        let detected = self.detector.detect(entities);
        let mut report = ValidationReport::default();

        for path in paths {
            let exists = detected.contains(path) || entities.iter().any(|e| path.resolve(e).is_some());
            if exists {
                report.valid.push(path.clone());
            } else {
                let suggestion = suggest(path, &detected);
                debug!(path = %path, suggestion = ?suggestion.as_ref().map(FieldPath::as_str), "Field path not found in data");
                report.invalid.push(InvalidField {
                    path: path.clone(),
                    suggestion,
                });
            }
        }

        Some(report)
    }

    /// Observed paths of `entities`.
    pub fn detect(&self, entities: &[Entity]) -> DetectedFields {
        self.detector.detect(entities)
    }
}

/// Suggest the observed path closest to `path`.
///
/// Scores keyword overlap (one point per shared keyword) plus a bonus when
/// the last segments match exactly (3) or one ends with the other (1).
/// Ties prefer the shorter path, then the lexicographically first.
pub fn suggest(path: &FieldPath, detected: &DetectedFields) -> Option<FieldPath> {
    let wanted_words = keywords(path.as_str(), 3);
    let wanted_leaf = fold(path.leaf());
    if wanted_words.is_empty() && wanted_leaf.is_empty() {
        return None;
    }

    let mut best: Option<(usize, &FieldPath)> = None;
    for candidate in detected.paths() {
        let words = keywords(candidate.as_str(), 3);
        let overlap = wanted_words.iter().filter(|w| words.contains(w)).count();
        let leaf = fold(candidate.leaf());
        let suffix = if !leaf.is_empty() && leaf == wanted_leaf {
            3
        } else if !leaf.is_empty()
            && !wanted_leaf.is_empty()
            && (leaf.ends_with(&wanted_leaf) || wanted_leaf.ends_with(&leaf))
        {
            1
        } else {
            0
        };
        let score = overlap + suffix;
        if score == 0 {
            continue;
        }

        let better = match best {
            None => true,
            Some((best_score, best_path)) => {
                score > best_score
                    || (score == best_score
                        && (candidate.as_str().len(), candidate.as_str())
                            < (best_path.as_str().len(), best_path.as_str()))
            }
        };
        if better {
            best = Some((score, candidate));
        }
    }

    best.map(|(_, p)| p.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entities() -> Vec<Entity> {
        vec![json!({
            "Nom": "Aria",
            "Background": {"Relations": "Bob", "Histoire": "..."},
            "Caractérisation": {"Désir": "Liberté"}
        })]
    }

    #[test]
    fn test_valid_and_invalid() {
        let validator = FieldValidator::default();
        let paths = vec![
            FieldPath::new("Nom"),
            FieldPath::new("Background.Relations"),
            FieldPath::new("Relations"),
        ];
        let report = validator.validate(&paths, &entities()).unwrap();

        assert_eq!(report.valid.len(), 2);
        assert_eq!(report.invalid.len(), 1);
        assert_eq!(report.invalid[0].path, FieldPath::new("Relations"));
        assert_eq!(
            report.invalid[0].suggestion,
            Some(FieldPath::new("Background.Relations"))
        );
    }

    #[test]
    fn test_no_data_no_report() {
        let validator = FieldValidator::default();
        assert!(validator.validate(&[FieldPath::new("Nom")], &[]).is_none());
    }

    #[test]
    fn test_suggestion_ignores_accents() {
        let detected = FieldDetector::default().detect(&entities());
        assert_eq!(
            suggest(&FieldPath::new("Caracterisation.Desir"), &detected),
            Some(FieldPath::new("Caractérisation.Désir"))
        );
    }

    #[test]
    fn test_no_plausible_suggestion() {
        let detected = FieldDetector::default().detect(&entities());
        assert_eq!(suggest(&FieldPath::new("Zzz.Qqq"), &detected), None);
    }
}

//! Entity-level budget fitting for markup output.
//!
//! Cutting rendered markup would break it, so the tree itself is trimmed:
//! whole items are kept while the rendering fits, the first item that does
//! not fit keeps as many field values as fit (the last one cut), and every
//! later item is dropped.

use serde_json::Value;
use tracing::warn;

use crate::extract::ExtractedField;
use crate::serializer::ContextSerializer;
use crate::tree::{ContextTree, Subsection, SubsectionContent, TreeItem, TreeSection};
use crate::truncator::Truncator;
use world_bible::value_to_text;

/// Outcome of fitting a tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FitReport {
    /// Whether any content was cut or dropped.
    pub truncated: bool,
    /// Names of dropped items.
    pub dropped: Vec<String>,
}

/// Trim `tree` so its rendering costs at most `budget`.
pub fn fit_tree(
    tree: ContextTree,
    budget: usize,
    serializer: &dyn ContextSerializer,
    truncator: &Truncator,
) -> (ContextTree, FitReport) {
    let fits = |t: &ContextTree| truncator.fits(&serializer.serialize(t), budget);
    if fits(&tree) {
        return (tree, FitReport::default());
    }

    let mut report = FitReport {
        truncated: true,
        dropped: Vec::new(),
    };
    let mut fitted = ContextTree::new();
    let mut full = false;

    for section in tree.sections {
        fitted.sections.push(TreeSection {
            title: section.title,
            categories: Vec::new(),
        });
        let section_idx = fitted.sections.len() - 1;

        for category in section.categories {
            for item in category.items {
                if full {
                    report.dropped.push(item.name);
                    continue;
                }

                let mut trial = fitted.clone();
                trial.sections[section_idx].category_mut(category.category).push(item.clone());
                if fits(&trial) {
                    fitted = trial;
                    continue;
                }

                full = true;
                match partial_item(&fitted, section_idx, category.category, &item, budget, serializer, truncator) {
                    Some(partial) => fitted.sections[section_idx].category_mut(category.category).push(partial),
                    None => report.dropped.push(item.name),
                }
            }
        }
    }
    fitted.sections.retain(|s| !s.is_empty());

    if !report.dropped.is_empty() {
        warn!(budget, dropped = ?report.dropped, "Entities dropped to fit the token budget");
    }
    (fitted, report)
}

/// Largest prefix of `item`'s content that fits next to `base`.
fn partial_item(
    base: &ContextTree,
    section_idx: usize,
    category: world_bible::Category,
    item: &TreeItem,
    budget: usize,
    serializer: &dyn ContextSerializer,
    truncator: &Truncator,
) -> Option<TreeItem> {
    let render = |subsections: Vec<Subsection>| -> (TreeItem, bool) {
        let candidate = TreeItem::new(item.name.clone(), item.index, subsections);
        let mut trial = base.clone();
        trial.sections[section_idx].category_mut(category).push(candidate.clone());
        let fits = truncator.fits(&serializer.serialize(&trial), budget);
        (candidate, fits)
    };

    let mut kept: Vec<Subsection> = Vec::new();
    'outer: for subsection in &item.subsections {
        let units = units_of(subsection);
        let mut taken: Vec<Unit> = Vec::new();
        for unit in units {
            let mut trial_units = taken.clone();
            trial_units.push(unit.clone());
            let (_, fits) = render(with_units(&kept, subsection, &trial_units));
            if fits {
                taken = trial_units;
                continue;
            }

            let text = unit.text();
            let mut allowance = truncator.cost(&text);
            while allowance > 0 {
                allowance -= 1;
                let cut = truncator.truncate(&text, allowance);
                if cut.is_empty() {
                    break;
                }
                let mut trial_units = taken.clone();
                trial_units.push(unit.with_text(cut));
                let (_, fits) = render(with_units(&kept, subsection, &trial_units));
                if fits {
                    taken = trial_units;
                    break;
                }
            }
            if !taken.is_empty() {
                kept = with_units(&kept, subsection, &taken);
            }
            break 'outer;
        }
        kept = with_units(&kept, subsection, &taken);
    }

    let (candidate, fits) = render(kept);
    (fits && !candidate.subsections.is_empty()).then_some(candidate)
}

/// Smallest piece of a subsection that can be kept or cut.
#[derive(Debug, Clone)]
enum Unit {
    Field(ExtractedField),
    Text(String),
}

impl Unit {
    fn text(&self) -> String {
        match self {
            Unit::Field(field) => value_to_text(&field.value),
            Unit::Text(text) => text.clone(),
        }
    }

    fn with_text(&self, text: String) -> Unit {
        match self {
            Unit::Field(field) => Unit::Field(ExtractedField {
                value: Value::String(text),
                ..field.clone()
            }),
            Unit::Text(_) => Unit::Text(text),
        }
    }
}

fn units_of(subsection: &Subsection) -> Vec<Unit> {
    match &subsection.content {
        SubsectionContent::Fields(fields) => fields.iter().cloned().map(Unit::Field).collect(),
        SubsectionContent::Text(text) => vec![Unit::Text(text.clone())],
    }
}

fn with_units(kept: &[Subsection], subsection: &Subsection, units: &[Unit]) -> Vec<Subsection> {
    let mut out = kept.to_vec();
    if units.is_empty() {
        return out;
    }
    let content = match &subsection.content {
        SubsectionContent::Fields(_) => SubsectionContent::Fields(
            units
                .iter()
                .filter_map(|u| match u {
                    Unit::Field(field) => Some(field.clone()),
                    Unit::Text(_) => None,
                })
                .collect(),
        ),
        SubsectionContent::Text(_) => SubsectionContent::Text(
            units
                .iter()
                .map(Unit::text)
                .collect::<Vec<_>>()
                .join("\n"),
        ),
    };
    out.push(Subsection {
        title: subsection.title.clone(),
        content,
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializer::TagTreeSerializer;
    use crate::truncator::TRUNCATION_MARKER;
    use serde_json::json;
    use world_bible::Category;

    // Word costs of the tag rendering: 4 for the context and category
    // wrappers, then 6 + words(bio) per character.
    fn tree() -> ContextTree {
        let mut main = TreeSection::main();
        let characters = main.category_mut(Category::Characters);
        for (name, bio) in [
            ("Aria", "un deux trois quatre cinq six sept huit"),
            ("Bob", "neuf dix onze"),
            ("Cleo", "douze"),
        ] {
            characters.push(TreeItem::new(
                name,
                0,
                vec![Subsection::fields(
                    "Informations",
                    vec![ExtractedField::new("Bio", "Bio", json!(bio))],
                )],
            ));
        }
        let mut tree = ContextTree::new();
        tree.push_section(main);
        tree
    }

    fn bios(tree: &ContextTree) -> Vec<(String, String)> {
        tree.items()
            .map(|i| (i.name.clone(), i.fields().map(|f| f.text()).collect::<Vec<_>>().join("|")))
            .collect()
    }

    #[test]
    fn test_fitting_tree_unchanged() {
        let serializer = TagTreeSerializer::new();
        let truncator = Truncator::default();
        assert_eq!(truncator.cost(&serializer.serialize(&tree())), 34);

        let (fitted, report) = fit_tree(tree(), 34, &serializer, &truncator);
        assert_eq!(fitted, tree());
        assert!(!report.truncated);
    }

    #[test]
    fn test_first_overflowing_item_is_cut() {
        let serializer = TagTreeSerializer::new();
        let truncator = Truncator::default();
        let (fitted, report) = fit_tree(tree(), 26, &serializer, &truncator);

        assert!(report.truncated);
        assert_eq!(report.dropped, vec!["Cleo".to_string()]);
        assert_eq!(
            bios(&fitted),
            vec![
                ("Aria".to_string(), "un deux trois quatre cinq six sept huit".to_string()),
                ("Bob".to_string(), format!("neuf {TRUNCATION_MARKER}")),
            ]
        );
        assert!(truncator.cost(&serializer.serialize(&fitted)) <= 26);
    }

    #[test]
    fn test_first_item_cut() {
        let serializer = TagTreeSerializer::new();
        let truncator = Truncator::default();
        let (fitted, report) = fit_tree(tree(), 17, &serializer, &truncator);

        assert_eq!(report.dropped, vec!["Bob".to_string(), "Cleo".to_string()]);
        assert_eq!(
            bios(&fitted),
            vec![("Aria".to_string(), format!("un deux trois quatre cinq six {TRUNCATION_MARKER}"))]
        );
    }

    #[test]
    fn test_nothing_fits() {
        let serializer = TagTreeSerializer::new();
        let truncator = Truncator::default();
        let (fitted, report) = fit_tree(tree(), 3, &serializer, &truncator);
        assert!(fitted.is_empty());
        assert_eq!(report.dropped.len(), 3);
        assert_eq!(serializer.serialize(&fitted), "");
    }
}

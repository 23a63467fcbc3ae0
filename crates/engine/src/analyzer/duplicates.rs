//! Batch-level duplicate detection, run after every index has been analyzed.

use std::collections::HashMap;

use lorekeep_domain::{EntityAnalysisReport, GeneratedEntity};

const UNIQUE_SCORE: f64 = 1.0;
const DUPLICATE_SCORE: f64 = 0.1;

/// Flag reports sharing a `static_id`, and reports sharing a localized
/// name/title string in any language. `entities` is aligned with `reports`;
/// `None` marks indices whose parse or match failed.
pub(super) fn check(reports: &mut [EntityAnalysisReport], entities: &[Option<GeneratedEntity>]) {
    let mut by_static_id: HashMap<&str, Vec<usize>> = HashMap::new();
    let mut by_name: HashMap<(&str, &str), Vec<usize>> = HashMap::new();

    for (i, entity) in entities.iter().enumerate() {
        let Some(entity) = entity else { continue };
        if let Some(static_id) = entity.static_id() {
            by_static_id.entry(static_id).or_default().push(i);
        }
        if let Some(name) = entity.name_map() {
            for (lang, value) in name.iter() {
                by_name.entry((lang, value)).or_default().push(i);
            }
        }
    }

    for (i, entity) in entities.iter().enumerate() {
        let Some(entity) = entity else { continue };

        if let Some(static_id) = entity.static_id() {
            let group = &by_static_id[static_id];
            if group.len() > 1 {
                reports[i].add_issue(format!(
                    "Duplicate static_id '{}' also used by report(s) {:?}",
                    static_id,
                    group.iter().filter(|&&j| j != i).collect::<Vec<_>>()
                ));
                reports[i].set_quality_component("uniqueness.static_id", DUPLICATE_SCORE);
            } else {
                reports[i].set_quality_component("uniqueness.static_id", UNIQUE_SCORE);
            }
        }

        if let Some(name) = entity.name_map() {
            let mut unique = true;
            for (lang, value) in name.iter() {
                let group = &by_name[&(lang, value)];
                if group.len() > 1 {
                    unique = false;
                    reports[i].add_issue(format!(
                        "Duplicate name \"{}\" ('{}') also used by report(s) {:?}",
                        value,
                        lang,
                        group.iter().filter(|&&j| j != i).collect::<Vec<_>>()
                    ));
                }
            }
            reports[i].set_quality_component(
                "uniqueness.name",
                if unique { UNIQUE_SCORE } else { DUPLICATE_SCORE },
            );
        }
    }
}

//! Numeric balance heuristics per entity type.
//!
//! The formulas here are a contract with game tuning, not suggestions:
//! moderators rely on the issue strings citing the exact computed bounds.

use lorekeep_domain::{
    EntityAnalysisReport, GeneratedEntity, GeneratedItem, GeneratedNpc, GeneratedQuest, ItemType,
};

use crate::rules::AnalyzerConfig;

pub(super) fn check(
    report: &mut EntityAnalysisReport,
    entity: &GeneratedEntity,
    config: &AnalyzerConfig,
) {
    match entity {
        GeneratedEntity::Item(item) => check_item(report, item, config),
        GeneratedEntity::Npc(npc) => check_npc(report, npc, config),
        GeneratedEntity::Quest(quest) => check_quest(report, quest, config),
        _ => {}
    }
}

/// `expected_value = rarity_multiplier * (weapon factor + armor factor)`.
/// Items with neither profile have no expected value; the range check is
/// skipped for them.
fn check_item(report: &mut EntityAnalysisReport, item: &GeneratedItem, config: &AnalyzerConfig) {
    let mut factor_sum = 0.0;
    if let Some(weapon) = &item.weapon {
        factor_sum +=
            weapon.dice_count as f64 * (weapon.dice_faces as f64 / 6.0) * config.damage_factor;
    }
    if let Some(armor) = &item.armor {
        factor_sum += armor.armor_value as f64 * config.ac_factor;
    }

    if factor_sum > 0.0 {
        let expected = config.rarity_multiplier(item.rarity) * factor_sum;
        let spread = expected * config.variance_pct / 100.0;
        let low = expected - spread;
        let high = expected + spread;
        if (item.base_value as f64) < low || (item.base_value as f64) > high {
            report.add_issue(format!(
                "Item base_value {} outside expected range [{:.0}, {:.0}]",
                item.base_value, low, high
            ));
            report.add_suggestion(format!(
                "Set base_value near {:.0} for a {} {}",
                expected,
                item.rarity.as_str(),
                item.item_type.as_str()
            ));
            report.set_balance_component("base_value", 0.2);
        } else {
            report.set_balance_component("base_value", 1.0);
        }
    }

    if let Some(weapon) = &item.weapon {
        if weapon.dice_count > config.max_weapon_dice {
            report.add_issue(format!(
                "Weapon rolls {} dice, above the cap of {}",
                weapon.dice_count, config.max_weapon_dice
            ));
            report.set_balance_component("weapon_dice", 0.3);
        } else {
            report.set_balance_component("weapon_dice", 1.0);
        }
    }

    // The too-strong markers only police consumable heals; a healing
    // enchantment on gear is priced by the value band above.
    if item.item_type != ItemType::Consumable {
        return;
    }
    for (i, effect) in item.effects.iter().enumerate() {
        if !effect.kind.to_lowercase().contains("heal") {
            continue;
        }
        let description = effect.description.to_lowercase();
        if let Some(marker) = config
            .heal_too_strong_markers
            .iter()
            .find(|m| description.contains(&m.to_lowercase()))
        {
            report.add_issue(format!(
                "Heal effect {} looks too strong (matched \"{}\")",
                i, marker
            ));
            report.set_balance_component("heal_effects", 0.2);
        }
    }
}

fn check_npc(report: &mut EntityAnalysisReport, npc: &GeneratedNpc, config: &AnalyzerConfig) {
    let (Some(level), Some(stats)) = (npc.level, &npc.stats) else {
        return;
    };
    if level == 0 {
        return;
    }

    let expected_hp = config.avg_hp_per_level * level as f64;
    let hp_spread = expected_hp * config.variance_pct / 100.0;
    if (stats.health as f64) < expected_hp - hp_spread
        || (stats.health as f64) > expected_hp + hp_spread
    {
        report.add_issue(format!(
            "NPC health {} outside expected range [{:.0}, {:.0}] for level {}",
            stats.health,
            expected_hp - hp_spread,
            expected_hp + hp_spread,
            level
        ));
        report.set_balance_component("health", 0.2);
    } else {
        report.set_balance_component("health", 1.0);
    }

    // Attack tolerance is fixed at 50%, wider than the value variance.
    let expected_attack = config.avg_attack_per_level * level as f64;
    if expected_attack > 0.0 {
        let deviation = (stats.attack as f64 - expected_attack).abs() / expected_attack;
        if deviation > 0.5 {
            report.add_issue(format!(
                "NPC attack {} deviates {:.0}% from expected {:.0} for level {}",
                stats.attack,
                deviation * 100.0,
                expected_attack,
                level
            ));
            report.set_balance_component("attack", 0.2);
        } else {
            report.set_balance_component("attack", 1.0);
        }
    }
}

fn check_quest(report: &mut EntityAnalysisReport, quest: &GeneratedQuest, config: &AnalyzerConfig) {
    if quest.min_level > 0 {
        let expected_xp = config.xp_per_level_point * quest.min_level as f64;
        let spread = expected_xp * config.variance_pct / 100.0;
        if (quest.xp_reward as f64) < expected_xp - spread
            || (quest.xp_reward as f64) > expected_xp + spread
        {
            report.add_issue(format!(
                "Quest xp_reward {} outside expected range [{:.0}, {:.0}] for min_level {}",
                quest.xp_reward,
                expected_xp - spread,
                expected_xp + spread,
                quest.min_level
            ));
            report.set_balance_component("xp_reward", 0.2);
        } else {
            report.set_balance_component("xp_reward", 1.0);
        }
    }

    let reward_cap = config.reward_cap_for_level(quest.min_level);
    if quest.item_rewards.len() > reward_cap {
        report.add_issue(format!(
            "Quest grants {} item rewards, above the cap of {} for min_level {}",
            quest.item_rewards.len(),
            reward_cap,
            quest.min_level
        ));
        report.set_balance_component("item_rewards", 0.3);
    } else {
        report.set_balance_component("item_rewards", 1.0);
    }

    // Zero steps is a hard issue at any level; the step cap only applies
    // above that floor.
    if quest.steps.is_empty() {
        report.add_issue("Quest has no steps");
        report.set_balance_component("step_count", 0.1);
    } else {
        let step_cap =
            config.quest_step_cap_base + config.quest_step_cap_per_level * quest.min_level as f64;
        if quest.steps.len() as f64 > step_cap {
            report.add_issue(format!(
                "Quest has {} steps, above the cap of {:.0} for min_level {}",
                quest.steps.len(),
                step_cap,
                quest.min_level
            ));
            report.set_balance_component("step_count", 0.4);
        } else {
            report.set_balance_component("step_count", 1.0);
        }
    }
}

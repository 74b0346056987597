use std::fmt::Write as _;

use engine::{DefDatabase, InputSnapshot, SimTime, SKILL_SLOT_COUNT};

use super::player::Player;
use super::SKILL_BAR;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SkillSlotView {
    /// 1-based, as printed on the hotbar.
    pub(crate) slot_number: usize,
    pub(crate) skill_key: Option<String>,
    pub(crate) label_initial: Option<char>,
    pub(crate) pressed: bool,
    pub(crate) cooldown_remaining_ms: Option<f64>,
}

/// Read-only view of the player's pools and hotbar, captured after a tick.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct HudSnapshot {
    pub(crate) health: f32,
    pub(crate) max_health: f32,
    pub(crate) mana: f32,
    pub(crate) max_mana: f32,
    pub(crate) slots: Vec<SkillSlotView>,
}

impl HudSnapshot {
    pub(crate) fn capture(
        player: &Player,
        defs: &DefDatabase,
        input: &InputSnapshot,
        now: SimTime,
    ) -> Self {
        let slots = (0..SKILL_SLOT_COUNT)
            .map(|slot| {
                let skill = SKILL_BAR[slot].and_then(|key| defs.skill_by_key(key));
                SkillSlotView {
                    slot_number: slot + 1,
                    skill_key: skill.map(|skill| skill.def_name.clone()),
                    label_initial: skill.and_then(|skill| skill.label.chars().next()),
                    pressed: input.is_skill_slot_down(slot),
                    cooldown_remaining_ms: skill
                        .and_then(|skill| player.cooldown_remaining_ms(skill, now)),
                }
            })
            .collect();
        Self {
            health: player.health(),
            max_health: player.max_health(),
            mana: player.mana(),
            max_mana: player.max_mana(),
            slots,
        }
    }

    /// One-line text form, e.g. `HP 150/150 MP 80/100 [1:B] [2:H 11.2s] [3:-]`.
    pub(crate) fn render_line(&self) -> String {
        let mut line = format!(
            "HP {:.0}/{:.0} MP {:.0}/{:.0}",
            self.health, self.max_health, self.mana, self.max_mana
        );
        for slot in &self.slots {
            let initial = slot.label_initial.unwrap_or('-');
            let _ = write!(line, " [{}:{}", slot.slot_number, initial);
            if let Some(remaining) = slot.cooldown_remaining_ms {
                let _ = write!(line, " {:.1}s", remaining / 1000.0);
            }
            if slot.pressed {
                line.push('*');
            }
            line.push(']');
        }
        line
    }
}

pub const SKILL_SLOT_COUNT: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    Run,
    SkillSlot1,
    SkillSlot2,
    SkillSlot3,
    SkillSlot4,
    SkillSlot5,
    SkillSlot6,
    Quit,
}

const ACTION_COUNT: usize = 12;

impl InputAction {
    pub const ALL: [InputAction; ACTION_COUNT] = [
        InputAction::MoveUp,
        InputAction::MoveDown,
        InputAction::MoveLeft,
        InputAction::MoveRight,
        InputAction::Run,
        InputAction::SkillSlot1,
        InputAction::SkillSlot2,
        InputAction::SkillSlot3,
        InputAction::SkillSlot4,
        InputAction::SkillSlot5,
        InputAction::SkillSlot6,
        InputAction::Quit,
    ];

    const fn index(self) -> usize {
        match self {
            InputAction::MoveUp => 0,
            InputAction::MoveDown => 1,
            InputAction::MoveLeft => 2,
            InputAction::MoveRight => 3,
            InputAction::Run => 4,
            InputAction::SkillSlot1 => 5,
            InputAction::SkillSlot2 => 6,
            InputAction::SkillSlot3 => 7,
            InputAction::SkillSlot4 => 8,
            InputAction::SkillSlot5 => 9,
            InputAction::SkillSlot6 => 10,
            InputAction::Quit => 11,
        }
    }

    fn direction(self) -> Option<Direction> {
        match self {
            InputAction::MoveUp => Some(Direction::Up),
            InputAction::MoveDown => Some(Direction::Down),
            InputAction::MoveLeft => Some(Direction::Left),
            InputAction::MoveRight => Some(Direction::Right),
            _ => None,
        }
    }

    fn skill_slot(self) -> Option<usize> {
        match self {
            InputAction::SkillSlot1 => Some(0),
            InputAction::SkillSlot2 => Some(1),
            InputAction::SkillSlot3 => Some(2),
            InputAction::SkillSlot4 => Some(3),
            InputAction::SkillSlot5 => Some(4),
            InputAction::SkillSlot6 => Some(5),
            _ => None,
        }
    }
}

/// Cardinal direction; doubles as the discrete facing of an entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    #[default]
    Down,
    Left,
    Right,
    Up,
}

impl Direction {
    /// Unit vector in map space (+y is down).
    pub fn unit_vector(self) -> (f32, f32) {
        match self {
            Direction::Down => (0.0, 1.0),
            Direction::Left => (-1.0, 0.0),
            Direction::Right => (1.0, 0.0),
            Direction::Up => (0.0, -1.0),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }

    fn clear(&mut self) {
        self.down = [false; ACTION_COUNT];
    }
}

/// Logical intents for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    direction: Option<Direction>,
    running: bool,
    skill_slots: [bool; SKILL_SLOT_COUNT],
    quit_requested: bool,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_direction(mut self, direction: Option<Direction>) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_running(mut self, running: bool) -> Self {
        self.running = running;
        self
    }

    pub fn with_skill_slot_down(mut self, slot: usize, is_down: bool) -> Self {
        if let Some(held) = self.skill_slots.get_mut(slot) {
            *held = is_down;
        }
        self
    }

    pub fn with_quit_requested(mut self, quit_requested: bool) -> Self {
        self.quit_requested = quit_requested;
        self
    }

    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_skill_slot_down(&self, slot: usize) -> bool {
        self.skill_slots.get(slot).copied().unwrap_or(false)
    }

    /// Held slots in ascending order.
    pub fn held_skill_slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.skill_slots
            .iter()
            .enumerate()
            .filter(|(_, held)| **held)
            .map(|(slot, _)| slot)
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }
}

/// Turns raw press/release events into per-frame snapshots. The reported
/// direction is the most recently pressed direction that is still held.
#[derive(Debug, Default)]
pub struct InputCollector {
    actions: ActionStates,
    direction_order: Vec<Direction>,
}

impl InputCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, action: InputAction) {
        self.actions.set(action, true);
        if let Some(direction) = action.direction() {
            if !self.direction_order.contains(&direction) {
                self.direction_order.push(direction);
            }
        }
    }

    pub fn release(&mut self, action: InputAction) {
        self.actions.set(action, false);
        if let Some(direction) = action.direction() {
            self.direction_order.retain(|held| *held != direction);
        }
    }

    /// Focus loss: everything counts as released.
    pub fn clear(&mut self) {
        self.actions.clear();
        self.direction_order.clear();
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn snapshot(&self) -> InputSnapshot {
        let mut skill_slots = [false; SKILL_SLOT_COUNT];
        for action in [
            InputAction::SkillSlot1,
            InputAction::SkillSlot2,
            InputAction::SkillSlot3,
            InputAction::SkillSlot4,
            InputAction::SkillSlot5,
            InputAction::SkillSlot6,
        ] {
            if let Some(slot) = action.skill_slot() {
                skill_slots[slot] = self.actions.is_down(action);
            }
        }
        InputSnapshot {
            direction: self.direction_order.last().copied(),
            running: self.actions.is_down(InputAction::Run),
            skill_slots,
            quit_requested: self.actions.is_down(InputAction::Quit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_held_direction_wins() {
        let mut collector = InputCollector::new();
        collector.press(InputAction::MoveLeft);
        collector.press(InputAction::MoveUp);
        assert_eq!(collector.snapshot().direction(), Some(Direction::Up));

        collector.release(InputAction::MoveUp);
        assert_eq!(collector.snapshot().direction(), Some(Direction::Left));

        collector.release(InputAction::MoveLeft);
        assert_eq!(collector.snapshot().direction(), None);
    }

    #[test]
    fn repeated_press_does_not_duplicate_direction() {
        let mut collector = InputCollector::new();
        collector.press(InputAction::MoveRight);
        collector.press(InputAction::MoveDown);
        collector.press(InputAction::MoveRight);
        collector.release(InputAction::MoveRight);
        assert_eq!(collector.snapshot().direction(), Some(Direction::Down));
    }

    #[test]
    fn run_and_skill_slots_are_reported() {
        let mut collector = InputCollector::new();
        collector.press(InputAction::Run);
        collector.press(InputAction::SkillSlot4);
        collector.press(InputAction::SkillSlot2);
        let snapshot = collector.snapshot();
        assert!(snapshot.is_running());
        assert_eq!(snapshot.held_skill_slots().collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn clear_releases_everything() {
        let mut collector = InputCollector::new();
        collector.press(InputAction::MoveDown);
        collector.press(InputAction::Run);
        collector.press(InputAction::SkillSlot1);
        collector.clear();
        assert_eq!(collector.snapshot(), InputSnapshot::empty());
    }

    #[test]
    fn builder_ignores_out_of_range_slot() {
        let snapshot = InputSnapshot::empty().with_skill_slot_down(SKILL_SLOT_COUNT, true);
        assert_eq!(snapshot.held_skill_slots().count(), 0);
        assert!(!snapshot.is_skill_slot_down(SKILL_SLOT_COUNT));
    }
}

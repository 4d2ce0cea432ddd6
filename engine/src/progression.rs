use serde::{Deserialize, Serialize};

/// Total experience needed to reach a character level.
pub fn exp_to_level(level: u32) -> u32 {
    100 * level + 50 * level * level
}

/// Experience awarded for a kill, scaled by the level gap.
pub fn exp_reward(enemy_level: u32, player_level: u32) -> u32 {
    let base = (50 + enemy_level * 10) as f32;
    let gap = enemy_level as f32 - player_level as f32;
    let multiplier = (1.0 + 0.2 * gap).max(0.1);
    (base * multiplier).round() as u32
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Progression {
    pub level: u32,
    pub exp: u32,
}

impl Default for Progression {
    fn default() -> Self {
        Progression { level: 1, exp: 0 }
    }
}

impl Progression {
    /// Add experience and resolve any level-ups. Advancing from level L
    /// costs `exp_to_level(L)`; surplus carries over. Returns how many
    /// levels were gained.
    pub fn grant(&mut self, exp: u32) -> u32 {
        self.exp += exp;
        let mut gained = 0;
        while self.exp >= exp_to_level(self.level) {
            self.exp -= exp_to_level(self.level);
            self.level += 1;
            gained += 1;
        }
        gained
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn exp_curve_is_strictly_increasing() {
        for level in 1..100 {
            assert!(exp_to_level(level) < exp_to_level(level + 1));
        }
        assert_eq!(exp_to_level(1), 150);
        assert_eq!(exp_to_level(2), 400);
    }

    #[test]
    fn reward_scales_with_level_gap() {
        // Even match.
        assert_eq!(exp_reward(3, 3), 80);
        // Outleveled enemies bottom out at the 0.1 multiplier.
        assert_eq!(exp_reward(1, 20), 6);
        // Punching up pays more.
        assert!(exp_reward(5, 1) > exp_reward(5, 5));
    }

    #[test]
    fn grant_resolves_multiple_level_ups() {
        let mut p = Progression::default();
        assert_eq!(p.grant(100), 0);
        assert_eq!(p.level, 1);

        // 150 total covers the level 1 cost exactly.
        assert_eq!(p.grant(50), 1);
        assert_eq!(p.level, 2);

        assert_eq!(p.grant(2000), 2);
        assert_eq!(p.level, 4);
    }
}

//! Guest registration prompt.
//!
//! Guests are nudged to register when the cart reaches a milestone: the
//! first line, the third line, or a high-value cart of two or more lines.
//! Each trigger fires at most once per session, and only while no prompt is
//! showing; dismissing hides the current prompt so a later milestone can
//! show. Never fires for a signed-in user. State lives with the session,
//! not the identity, so an identity switch does not reset it.

use emporium_core::{Identity, Money};
use serde::{Deserialize, Serialize};

/// Why the registration prompt fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptTrigger {
    FirstItem,
    ThirdItem,
    HighValueCart,
}

impl PromptTrigger {
    const fn bit(self) -> u8 {
        match self {
            Self::FirstItem => 1,
            Self::ThirdItem => 1 << 1,
            Self::HighValueCart => 1 << 2,
        }
    }
}

/// Cart shape after a successful add, as seen by the prompt.
#[derive(Debug, Clone, Copy)]
pub struct CartMilestone {
    pub lines_before: usize,
    pub lines_after: usize,
    pub total: Money,
}

/// Session-scoped registration prompt tracker.
#[derive(Debug, Clone, Copy)]
pub struct RegistrationPrompt {
    showing: Option<PromptTrigger>,
    // One bit per trigger already shown this session
    fired: u8,
    high_value_threshold: Money,
}

impl RegistrationPrompt {
    #[must_use]
    pub const fn new(high_value_threshold: Money) -> Self {
        Self {
            showing: None,
            fired: 0,
            high_value_threshold,
        }
    }

    /// The trigger currently showing, if any.
    #[must_use]
    pub const fn showing(&self) -> Option<PromptTrigger> {
        self.showing
    }

    /// Whether `trigger` has already fired this session.
    #[must_use]
    pub const fn has_fired(&self, trigger: PromptTrigger) -> bool {
        self.fired & trigger.bit() != 0
    }

    /// Evaluate an add. Returns the trigger if the prompt starts showing.
    pub fn observe(
        &mut self,
        identity: &Identity,
        milestone: CartMilestone,
    ) -> Option<PromptTrigger> {
        if !identity.is_guest() || self.showing.is_some() {
            return None;
        }

        let candidates = [
            (
                PromptTrigger::FirstItem,
                milestone.lines_before == 0 && milestone.lines_after >= 1,
            ),
            (
                PromptTrigger::ThirdItem,
                milestone.lines_before < 3 && milestone.lines_after >= 3,
            ),
            (
                PromptTrigger::HighValueCart,
                milestone.total > self.high_value_threshold && milestone.lines_after >= 2,
            ),
        ];
        let trigger = candidates
            .into_iter()
            .find(|&(trigger, reached)| reached && !self.has_fired(trigger))
            .map(|(trigger, _)| trigger)?;

        self.fired |= trigger.bit();
        self.showing = Some(trigger);
        Some(trigger)
    }

    /// Hide the prompt currently showing. Triggers that already fired stay
    /// spent.
    pub const fn dismiss(&mut self) {
        self.showing = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emporium_core::UserId;

    fn milestone(before: usize, after: usize, total: i64) -> CartMilestone {
        CartMilestone {
            lines_before: before,
            lines_after: after,
            total: Money::from_major(total),
        }
    }

    #[test]
    fn test_first_item_fires_once() {
        let mut prompt = RegistrationPrompt::new(Money::from_major(10_000));
        assert_eq!(
            prompt.observe(&Identity::Guest, milestone(0, 1, 100)),
            Some(PromptTrigger::FirstItem)
        );
        assert_eq!(prompt.observe(&Identity::Guest, milestone(2, 3, 300)), None);
        assert_eq!(prompt.showing(), Some(PromptTrigger::FirstItem));
    }

    #[test]
    fn test_never_fires_for_users() {
        let mut prompt = RegistrationPrompt::new(Money::from_major(10_000));
        let user = Identity::User(UserId::new("u1"));
        assert_eq!(prompt.observe(&user, milestone(0, 1, 100)), None);
        assert_eq!(prompt.showing(), None);
    }

    #[test]
    fn test_third_item_and_high_value() {
        let mut prompt = RegistrationPrompt::new(Money::from_major(10_000));
        assert_eq!(
            prompt.observe(&Identity::Guest, milestone(2, 3, 300)),
            Some(PromptTrigger::ThirdItem)
        );

        let mut prompt = RegistrationPrompt::new(Money::from_major(10_000));
        assert_eq!(prompt.observe(&Identity::Guest, milestone(1, 1, 20_000)), None);
        assert_eq!(
            prompt.observe(&Identity::Guest, milestone(1, 2, 10_001)),
            Some(PromptTrigger::HighValueCart)
        );
    }

    #[test]
    fn test_dismiss_hides_without_rearming() {
        let mut prompt = RegistrationPrompt::new(Money::from_major(10_000));
        assert_eq!(
            prompt.observe(&Identity::Guest, milestone(0, 1, 100)),
            Some(PromptTrigger::FirstItem)
        );
        prompt.dismiss();
        assert_eq!(prompt.showing(), None);
        assert!(prompt.has_fired(PromptTrigger::FirstItem));

        // Cart emptied and refilled: the first line does not prompt again
        assert_eq!(prompt.observe(&Identity::Guest, milestone(0, 1, 100)), None);
    }

    #[test]
    fn test_later_triggers_fire_after_dismiss() {
        let mut prompt = RegistrationPrompt::new(Money::from_major(10_000));
        prompt.observe(&Identity::Guest, milestone(0, 1, 6_000));
        prompt.dismiss();

        assert_eq!(
            prompt.observe(&Identity::Guest, milestone(1, 2, 12_000)),
            Some(PromptTrigger::HighValueCart)
        );
        prompt.dismiss();
        assert_eq!(
            prompt.observe(&Identity::Guest, milestone(2, 3, 12_100)),
            Some(PromptTrigger::ThirdItem)
        );
        prompt.dismiss();
        assert_eq!(prompt.observe(&Identity::Guest, milestone(3, 4, 20_000)), None);
    }
}

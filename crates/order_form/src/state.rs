use shared::protocol::FormState;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("form cannot move from {from:?} to {to:?}")]
pub struct InvalidTransition {
    pub from: FormState,
    pub to: FormState,
}

/// Tracks one pass through the form:
/// `Idle -> SelectionChanged -> NutritionDisplayed* -> SubmitRequested -> Inserted | InsertFailed`.
///
/// Changing the selection after a submission starts a fresh cycle.
#[derive(Debug, Default)]
pub struct FormMachine {
    state: FormState,
}

impl FormMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> FormState {
        self.state
    }

    pub fn can_advance(&self, to: FormState) -> bool {
        use FormState::*;
        matches!(
            (self.state, to),
            (Idle, SelectionChanged)
                | (SelectionChanged, SelectionChanged)
                | (SelectionChanged, NutritionDisplayed)
                | (SelectionChanged, SubmitRequested)
                | (NutritionDisplayed, NutritionDisplayed)
                | (NutritionDisplayed, SelectionChanged)
                | (NutritionDisplayed, SubmitRequested)
                | (SubmitRequested, Inserted)
                | (SubmitRequested, InsertFailed)
                | (Inserted, SelectionChanged)
                | (InsertFailed, SelectionChanged)
        )
    }

    pub fn advance(&mut self, to: FormState) -> Result<(), InvalidTransition> {
        if !self.can_advance(to) {
            return Err(InvalidTransition {
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_the_happy_path() {
        let mut machine = FormMachine::new();
        for next in [
            FormState::SelectionChanged,
            FormState::NutritionDisplayed,
            FormState::NutritionDisplayed,
            FormState::SubmitRequested,
            FormState::Inserted,
        ] {
            machine.advance(next).expect("transition");
        }
        assert_eq!(machine.state(), FormState::Inserted);
    }

    #[test]
    fn cannot_insert_without_a_submit_request() {
        let mut machine = FormMachine::new();
        machine
            .advance(FormState::SelectionChanged)
            .expect("selection");
        let err = machine.advance(FormState::Inserted).expect_err("skip");
        assert_eq!(err.from, FormState::SelectionChanged);
        assert_eq!(machine.state(), FormState::SelectionChanged);
    }

    #[test]
    fn idle_form_cannot_submit() {
        let mut machine = FormMachine::new();
        assert!(machine.advance(FormState::SubmitRequested).is_err());
    }

    #[test]
    fn reselecting_after_failure_restarts_the_cycle() {
        let mut machine = FormMachine::new();
        machine.advance(FormState::SelectionChanged).expect("a");
        machine.advance(FormState::SubmitRequested).expect("b");
        machine.advance(FormState::InsertFailed).expect("c");
        machine.advance(FormState::SelectionChanged).expect("d");
        assert_eq!(machine.state(), FormState::SelectionChanged);
    }
}

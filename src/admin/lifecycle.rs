/// Finite-state status machines
///
/// Each status enum owns its adjacency list; callers never compare status
/// strings to decide what is legal.
use crate::error::{AdminError, AdminResult};

pub trait Lifecycle: Copy + Eq + std::fmt::Debug + 'static {
    /// Entity name used in error messages
    const ENTITY: &'static str;

    /// States reachable from `self` in one step
    fn successors(self) -> &'static [Self];

    fn as_str(&self) -> &'static str;

    fn can_transition_to(self, next: Self) -> bool {
        self.successors().contains(&next)
    }

    fn is_terminal(self) -> bool {
        self.successors().is_empty()
    }

    /// Validate `self -> next`, returning `next` on success
    fn transition(self, next: Self) -> AdminResult<Self> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(AdminError::InvalidTransition {
                entity: Self::ENTITY,
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            })
        }
    }
}

//! Round-robin courier selection.

use crate::engine::state::SelectionState;
use crate::models::courier::Courier;

/// Picks `roster[last_index % len]` and advances the cursor. Returns `None`
/// on an empty roster.
///
/// Selection is index-based, not identity-based: when the roster changes
/// between calls the next pick may skip or repeat a courier. That skew is
/// the documented behavior, the cursor is just a position.
pub fn select_next<'a>(
    roster: &'a [Courier],
    state: &mut SelectionState,
) -> Option<&'a Courier> {
    if roster.is_empty() {
        return None;
    }

    let pick = &roster[state.last_index % roster.len()];
    state.last_index = (state.last_index + 1) % roster.len();
    Some(pick)
}

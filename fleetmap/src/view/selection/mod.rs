//! Equipment selection: the id set, box/lasso gestures and their outline.

mod engine;
mod overlay;
mod set;

pub use engine::{
    GestureOutcome, GesturePhase, GestureState, PointerButton, SelectionEngine, SelectionMode,
};
pub use overlay::SelectionOverlay;
pub use set::SelectionSet;

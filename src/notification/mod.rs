pub mod emitter;
pub mod gate;

pub use emitter::{EmitOutcome, EventEmitter};
pub use gate::PreferenceGate;

//! Shared handler state.

use dinein_engine::Engine;

/// State every handler receives; cheap to clone.
pub struct AppState<S> {
    pub engine: Engine<S>,
}

impl<S> AppState<S> {
    pub fn new(engine: Engine<S>) -> Self {
        AppState { engine }
    }
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        AppState {
            engine: self.engine.clone(),
        }
    }
}

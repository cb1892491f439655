/// Command and time-input handlers
pub mod handlers;
/// User state and dialogue management
pub mod state;

// Discord commands module.
// Each feature gets its own command file.

pub mod quote;

pub mod setchannel;

// Bot presence management
pub mod presence;

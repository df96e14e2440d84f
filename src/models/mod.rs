pub mod events;
pub mod fleet;
pub mod location;
pub mod order;

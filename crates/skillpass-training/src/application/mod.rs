//! Application layer for the training player.

pub mod countdown;
pub mod narration;
pub mod outbox;
pub mod ports;
pub mod query_handlers;
pub mod session;
pub mod variations;

#[cfg(test)]
pub(crate) mod test_doubles;

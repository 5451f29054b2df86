//! Skillpass Core — shared domain abstractions.
//!
//! This crate defines the traits and types every bounded context depends on:
//! event-sourced aggregates, the event repository, the clock, the domain
//! error taxonomy and the collaborator ports of the training player that do
//! not depend on scene content. It contains no infrastructure code.

pub mod aggregate;
pub mod clock;
pub mod error;
pub mod event;
pub mod ports;
pub mod repository;

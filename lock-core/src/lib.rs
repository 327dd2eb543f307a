#![no_std]

// Shared logic for the bolt-lock endpoint feature set.
//
// This crate stays portable across MCU firmware and host tooling by avoiding the
// Rust standard library and keeping every state machine generic over the
// monotonic instant type supplied by the embedding target.

pub mod button;
pub mod config;
pub mod event;
pub mod function;
pub mod indicator;
pub mod lock;

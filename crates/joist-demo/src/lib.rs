#![forbid(unsafe_code)]

//! Ramp simulation booted through the joist shell.

pub mod app;
pub mod cli;
pub mod sim;

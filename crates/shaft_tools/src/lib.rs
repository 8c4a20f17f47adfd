#![forbid(unsafe_code)]

pub mod selection_cli;

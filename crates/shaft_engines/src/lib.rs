#![forbid(unsafe_code)]

pub mod catalog_gateway;
pub mod constraint_table;
pub mod display_message;
pub mod normalizer;
pub mod payload_codec;

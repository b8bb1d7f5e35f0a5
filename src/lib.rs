pub mod config;
pub mod controller;
pub mod journal;
pub mod link;
pub mod messages;
pub mod motor;
pub mod runtime;

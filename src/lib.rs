pub mod backdrop;
pub mod config;
pub mod control;
pub mod daemon;
pub mod grab;
pub mod launch;
pub mod menu;
pub mod platform;
pub mod session;
pub mod windowlist;

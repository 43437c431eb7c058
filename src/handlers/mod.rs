// src/handlers/mod.rs

pub mod admin;
pub mod catalog;
pub mod dashboard;
pub mod session;

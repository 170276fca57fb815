// src/handlers/mod.rs

pub mod admin;
pub mod auth;
pub mod exam;
pub mod feedback;
pub mod notes;
pub mod profile;
pub mod results;

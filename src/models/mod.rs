// src/models/mod.rs

pub mod exam_result;
pub mod feedback;
pub mod progress;
pub mod question;
pub mod user;

// src/tests/mod.rs
//! End-to-end checks of limiters, stores and responses working together

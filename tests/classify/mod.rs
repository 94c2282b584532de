//! Integration tests for the classification pipeline and its subsystems.

mod callgraph;
mod metadata;
mod voting;

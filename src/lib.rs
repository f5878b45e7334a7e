//! Counterfactual regret minimization for abstracted heads-up poker
//!
//! Card information comes from the `information_abstraction` crate as bucket
//! rows, betting is reduced to fold, check/call and bet/raise. Fixed limit
//! texas holdem and Kuhn poker are supported.

pub mod action;
pub mod agents;
pub mod constants;
pub mod deal;
pub mod error;
pub mod game_node;
pub mod grid;
pub mod info_matrix;
pub mod rules;
pub mod solver;
pub mod tree;
pub mod tree_builder;
pub mod walker;

pub use error::SolverError;
pub use solver::{GameOptions, Solver, SolverOptions};

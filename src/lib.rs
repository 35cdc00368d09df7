//! `flagwar` - territory conquest engine
//!
//! Players plant flags in enemy territory; each flag starts a timed
//! contest that, when it runs out, captures or liberates the cell or
//! the whole territory it stands on. This library provides the map
//! model, the contest engine, its collaborator traits and the scenario
//! runner behind the `flagwar` binary.

pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod observability;
pub mod services;
pub mod war;

//! Elevator Fleet Simulation Library
//!
//! A multi-car elevator simulation with LOOK-style per-car scheduling and
//! pluggable fleet dispatch policies. Runs headless via the demo binary or
//! embedded through [`fleet::FleetController`].

pub mod fleet;

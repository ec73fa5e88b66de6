//! A minimal LP layer for the polytope contractor (spec §4.5, §6): just
//! enough of a linear-programming interface to build a Taylor/McCormick
//! relaxation over a box and bound each variable against it.
//!
//! [`oracle`] defines the `LpOracle` trait the contractor depends on plus a
//! reference dense simplex implementation; [`relax`] builds the
//! relaxation's constraints from the shared DAG.

pub mod oracle;
pub mod relax;

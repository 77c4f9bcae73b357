//! Scenario tests that drive a whole city through the `TestCity` harness.
//!
//! Each file sets a city up through the public tools, advances it and
//! checks what several systems produced together.

mod bootstrap_tests;
mod disaster_tests;
mod power_tests;

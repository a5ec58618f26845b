//! End-to-end tests of the authn and confirm steps.

mod common;
mod properties;
mod scenarios;

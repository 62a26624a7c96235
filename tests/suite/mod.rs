//! Integration test suites

mod config;
mod forge_flow;
mod gateway;
mod persistence;

//! Integration tests for ticker acceptance testing.

mod common;
mod end_to_end_test;
mod transparency_test;

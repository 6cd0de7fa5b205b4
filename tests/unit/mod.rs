//! Unit test modules.

mod carbon_test;
mod parser_test;
mod streak_test;

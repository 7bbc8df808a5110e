//! Interpreter tests, grouped by statement kind

mod helpers;
mod intcal_tests;
mod while_tests;

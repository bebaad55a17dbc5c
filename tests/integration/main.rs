//! Integration test harness

mod links_tests;

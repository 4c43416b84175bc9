/// Database connection and migration tests
pub mod db_tests;

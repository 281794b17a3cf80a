pub mod write_tests;
pub mod concurrency_tests;

pub mod errors;
pub mod db;
pub mod pull_request_thread;

#[cfg(test)]
mod tests;

mod error_handling;
mod process_executor;
mod runtime_fake_executor;

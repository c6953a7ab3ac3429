pub mod executor;

pub use executor::ValidationExecutor;

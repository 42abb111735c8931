pub mod estimator;
pub mod fanout;
pub mod geo;
pub mod state_machine;
pub mod store;
pub mod sweeper;
pub mod verification;

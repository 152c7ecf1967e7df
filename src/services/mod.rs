pub mod orchestrator;
pub mod renderer;
pub mod session;
pub mod transport;
pub mod verdict;

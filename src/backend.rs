pub mod allocation;
pub mod device;
pub mod engine;
pub mod grouping;
pub mod mathphysics;
pub mod overlap;
pub mod propagation;
pub mod recommendation;
pub mod report;
pub mod scoring;
pub mod snapshot;

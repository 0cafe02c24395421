pub mod generator;
pub mod steps;
pub mod tree;

pub use generator::RandomTree;
pub use steps::{locator_shape, shape};
pub use tree::{TestNode, TestTree};

mod skeleton;

pub use skeleton::*;

#[cfg(test)]
mod skeleton_tests;

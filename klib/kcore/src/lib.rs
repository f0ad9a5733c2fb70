#![no_std]
#![allow(clippy::module_name_repetitions)]

#[cfg(test)]
extern crate std;

pub mod sync;

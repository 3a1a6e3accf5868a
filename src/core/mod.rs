pub mod assembler;
pub mod catalog;
pub mod config;
pub mod dialog;
pub mod grid;
pub mod mapgen;
pub mod naming;
pub mod normalize;
pub mod placer;
pub mod seed;
pub mod validator;

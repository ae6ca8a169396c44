pub mod arguments;
pub mod artifacts;
pub mod chain;
pub mod config;
pub mod deployer;
pub mod interface;
pub mod request;
pub mod run;
pub mod status;
pub mod verification;

pub use {
    deployer::Deployer,
    run::{execute, run},
};

pub mod capture;
pub mod config;
pub mod console;
pub mod coroutine;
pub mod dap;
pub mod debugger;
pub mod error;
pub mod logging;

pub mod compilation;
pub mod debug_tools;
pub mod diagnostic;
pub mod hash;
pub mod hooks;
pub mod manifest;
pub mod plugin;
pub mod types;

pub use self::compilation::Compilation;

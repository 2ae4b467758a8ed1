pub use self::chunk_optimizer_plugin::*;

mod chunk_optimizer_plugin;

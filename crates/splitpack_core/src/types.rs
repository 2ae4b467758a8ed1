pub use self::chunk::*;
pub use self::entrypoint::*;
pub use self::module::*;
pub use self::output_asset::*;

mod chunk;
mod entrypoint;
mod module;
mod output_asset;

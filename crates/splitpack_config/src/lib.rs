pub mod splitpack_config;
pub mod splitpack_rc_config_loader;

pub use splitpack_config::ManifestConfig;
pub use splitpack_config::RemoveUnusedDependenciesConfig;
pub use splitpack_config::SplitpackConfig;
pub use splitpack_rc_config_loader::SplitpackRcConfigLoader;
pub use splitpack_rc_config_loader::SplitpackRcFile;

pub use self::parser::{AuthConfig, Config, DatabaseConfig, DbType, LoggingConfig, RenderConfig};
pub use self::validator::ConfigError;

mod parser;
mod validator;

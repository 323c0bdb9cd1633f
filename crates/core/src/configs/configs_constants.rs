/// Provider used for the baseline configuration.
pub const DEFAULT_PROVIDER: &str = "deepseek";

/// Model used for the baseline configuration.
pub const DEFAULT_MODEL: &str = "deepseek-v1-8k";

/// Provider of the secondary configuration seeded for new users.
pub const ALTERNATE_PROVIDER: &str = "kimi";

/// Model of the secondary configuration seeded for new users.
pub const ALTERNATE_MODEL: &str = "moonshot-v1-8k";

pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_MAX_TOKENS: i32 = 2048;

pub const MIN_TEMPERATURE: f64 = 0.0;
pub const MAX_TEMPERATURE: f64 = 1.0;
pub const MIN_MAX_TOKENS: i32 = 1;
pub const MAX_MAX_TOKENS: i32 = 4096;

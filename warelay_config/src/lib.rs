pub mod schema;

pub use schema::{
    AssistantConfig, CompletionConfig, Config, GatewayConfig, ScheduleConfig, SessionConfig,
    TextsConfig,
};

pub mod user_agent;

pub use user_agent::UserAgentMapper;

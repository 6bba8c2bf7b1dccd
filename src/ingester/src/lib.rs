pub mod error;
pub mod event;
pub mod mapper;
pub mod mappers;
pub mod pipeline;

pub use error::Result;
pub use event::Event;
pub use event::PropValue;
pub use event::Properties;
pub use mapper::EventMapper;
pub use mapper::FieldDependency;
pub use mapper::FieldDependencyBuilder;
pub use pipeline::Pipeline;

pub mod config;
pub mod error;
pub mod pipeline;
pub mod sources;

pub use error::{AppError, Result};
pub use pipeline::engine::{Engine, EngineHandle};
pub use pipeline::event::{BoxedEvent, Event, Generator, GeneratorFn, Publisher, PublisherFn};

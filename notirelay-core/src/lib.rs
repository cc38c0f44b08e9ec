pub mod condition;
pub mod credentials;
pub mod destination;
pub mod error;
pub mod formatter;
pub mod matcher;
pub mod pipeline;
pub mod property;
pub mod recorder;
pub mod schema;
pub mod template;
pub mod transport;

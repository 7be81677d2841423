pub mod catalog;
pub mod noise;
pub mod parser;

pub use catalog::{Coordinates, Location, LocationCatalog};
pub use noise::is_noise;
pub use parser::{IncomingMessage, MessageParser, ParseOutcome, ParseStats};

pub mod diagnostic;
pub mod error;
pub mod health;
pub mod schema;
pub mod snolog;

pub use diagnostic::*;
pub use error::*;
pub use health::*;
pub use schema::*;
pub use snolog::*;

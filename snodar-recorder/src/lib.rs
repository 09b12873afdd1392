pub mod ascii_logger;
pub mod clock;
pub mod config;
pub mod device;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod signal;
pub mod transport;

pub use ascii_logger::*;
pub use clock::*;
pub use config::*;
pub use device::*;
pub use error::*;
pub use metrics::*;
pub use pipeline::*;
pub use signal::*;
pub use transport::*;

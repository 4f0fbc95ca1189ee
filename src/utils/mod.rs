// Utility module exports

pub mod heuristics;
pub mod service_error;
pub mod url_normalizer;

pub use service_error::ServiceError;
pub use url_normalizer::{normalize, NormalizeError, NormalizedUrl};

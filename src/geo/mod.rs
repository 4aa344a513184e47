pub mod backend;
pub mod query;
pub mod region;

pub use backend::{BackendError, GeoBackend, HttpGeoBackend, RasterResult};
pub use query::{DateRange, Expr};
pub use region::Region;

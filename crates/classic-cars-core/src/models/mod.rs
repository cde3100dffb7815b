//! Data models for catalog entries.
//!
//! - `Car`: a stored catalog entry with its canonical identifier
//! - `CarDetails`: the identifier-less payload used for create and update
//! - `ValidationError`: reasons a payload is rejected before it is sent

pub mod car;

pub use car::{
    is_local_id, Car, CarDetails, ValidationError, DEFAULT_IMAGE_URL, LOCAL_ID_PREFIX,
    MIN_YEAR, SEED_ID_PREFIX,
};

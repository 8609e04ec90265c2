//! Request / response types, grouped by API version.

pub mod v1;

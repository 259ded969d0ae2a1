pub mod bridge;
pub mod form;
pub mod model;

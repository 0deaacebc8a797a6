pub mod events;
pub mod geomag;
pub mod policy;
pub mod quote;

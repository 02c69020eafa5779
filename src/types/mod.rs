pub mod node;
pub mod resource;
pub mod site;
pub mod timeseries;

pub mod catalog;
pub mod fanout;
pub mod integrity;
pub mod model;
pub mod snapshot;
pub mod state;
pub mod step;
pub mod trace;
pub mod types;

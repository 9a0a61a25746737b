pub mod btreemap_event_storage;
pub mod impression;
pub mod traits;

// Resume CRUD: handlers shape HTTP, the store owns every SQL statement.

pub mod handlers;
pub mod store;

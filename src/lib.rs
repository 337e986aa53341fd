pub mod db;
pub mod error;
pub mod schema;
pub mod view;
pub use db::{
    CollectionBrowser,
    ConnectionConfig,
    DatabaseObject,
    DEFAULT_OBJECT_LIMIT,
    get_scheme,
    Scheme,
};
pub use db::weaviate::WeaviateClient;
pub use error::{ BrowserError, Result };
pub use schema::{ CollectionSchema, CollectionSummary, FlatProperty, PropertyKind, PropertySchema };

pub mod category_config;
pub mod description_store;

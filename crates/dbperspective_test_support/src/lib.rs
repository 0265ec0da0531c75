pub mod fixtures;

pub use fixtures::{CONID, CRM_DATABASE, DATABASE, database_config, row};

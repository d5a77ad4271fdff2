pub mod analytics_service;
pub mod catalog_service;
pub mod history_service;
pub mod ledger_service;

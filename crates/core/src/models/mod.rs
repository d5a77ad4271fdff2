pub mod analytics;
pub mod fund;
pub mod holding;
pub mod intent;
pub mod ledger;
pub mod portfolio;
pub mod settings;
pub mod user;

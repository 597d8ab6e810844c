pub mod budget;
pub mod event;
pub mod market;
pub mod overview;
pub mod portfolio;
pub mod record;
pub mod settings;
pub mod status;

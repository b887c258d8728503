use inkpost_core::BlogClient;

pub mod cli;
pub mod commands;

pub struct AppContext {
    pub client: BlogClient,
}

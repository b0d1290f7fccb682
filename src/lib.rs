pub mod app_config;
pub mod backend;
pub mod constants;
pub mod middleware;
pub mod poll;
pub mod user;
pub mod web;

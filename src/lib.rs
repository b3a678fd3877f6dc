pub mod app_config;
pub mod attachment;
pub mod db;
pub mod identity;
pub mod middleware;
pub mod orm;
pub mod reviews;
pub mod web;

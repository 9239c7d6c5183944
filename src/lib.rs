pub mod config;
pub mod docstore;
pub mod domain;
pub mod humanize;
pub mod imghost;
pub mod observability;
pub mod publish;
pub mod repository;

//! Tollgate is the billing backend for a VPN service: user accounts,
//! tariff plans, and payment processing behind a JSON API.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod payments;
pub mod repository;
pub mod service;

//! Rust LTI tool library
//!
//! This library implements the trust and credential layer of an LTI 1.3
//! tool: platform registration and launch validation, replay and CSRF
//! protection, per-platform key lifecycle, the tool's internal session
//! credential and the client-credentials exchange for platform service
//! access tokens.

pub mod auth;
pub mod config;
pub mod storage;
pub mod web;

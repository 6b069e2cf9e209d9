//! Logger module
//!
//! Provides logging utilities for the relay server including:
//! - Server lifecycle logging
//! - Access logging with multiple formats
//! - Relay outcome logging
//! - Level-filtered error, warning, info and debug messages

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use chrono::Local;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::config::Config;

/// Severity, ordered from most to least important
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
}

impl Level {
    /// Unknown names fall back to `info`
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "error" => Self::Error,
            "warn" | "warning" => Self::Warn,
            "debug" | "trace" => Self::Debug,
            _ => Self::Info,
        }
    }

    const fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Error,
            1 => Self::Warn,
            3 => Self::Debug,
            _ => Self::Info,
        }
    }
}

static MAX_LEVEL: AtomicU8 = AtomicU8::new(Level::Info as u8);

fn enabled(level: Level) -> bool {
    level <= Level::from_u8(MAX_LEVEL.load(Ordering::Relaxed))
}

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &Config) -> std::io::Result<()> {
    MAX_LEVEL.store(Level::parse(&config.logging.level) as u8, Ordering::Relaxed);
    writer::init(
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
    )
}

fn stamp() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%z").to_string()
}

/// Write to info/access log
fn write_info(message: &str) {
    match writer::get() {
        Some(w) => w.write_access(message),
        None => println!("{message}"),
    }
}

/// Write to error log
fn write_error(message: &str) {
    match writer::get() {
        Some(w) => w.write_error(message),
        None => eprintln!("{message}"),
    }
}

pub fn log_server_start(addr: &SocketAddr, config: &Config, rate_limit_backend: &str) {
    write_info("======================================");
    write_info("Relay server started");
    write_info(&format!("Listening on: http://{addr}"));
    write_info(&format!("Log level: {}", config.logging.level));
    if let Some(workers) = config.server.workers {
        write_info(&format!("Worker threads: {workers}"));
    }
    write_info(&format!("Rate-limit store: {rate_limit_backend}"));
    if !config.newsletter.enabled {
        write_info("Newsletter relay: disabled (503)");
    }
    if config.contact.api_key.is_none() {
        write_info("Contact relay: RESEND_API_KEY not set, sends will fail");
    }
    if config.checkout.secret_key.is_none() {
        write_info("Checkout relay: STRIPE_SECRET_KEY not set, sessions will fail");
    }
    if let Some(ref path) = config.logging.access_log_file {
        write_info(&format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        write_info(&format!("Error log: {path}"));
    }
    write_info("======================================");
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    log_debug(&format!("[Connection] Accepted from: {peer_addr}"));
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    log_error(&format!("Failed to serve connection: {err:?}"));
}

pub fn log_error(message: &str) {
    if enabled(Level::Error) {
        write_error(&format!("{} [ERROR] {message}", stamp()));
    }
}

pub fn log_warning(message: &str) {
    if enabled(Level::Warn) {
        write_error(&format!("{} [WARN] {message}", stamp()));
    }
}

pub fn log_info(message: &str) {
    if enabled(Level::Info) {
        write_info(&format!("{} [INFO] {message}", stamp()));
    }
}

pub fn log_debug(message: &str) {
    if enabled(Level::Debug) {
        write_info(&format!("{} [DEBUG] {message}", stamp()));
    }
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    match writer::get() {
        Some(w) => w.write_access(&entry.format(format)),
        None => println!("{}", entry.format(format)),
    }
}

/// One line per relay decision: which route, who, what happened
pub fn log_relay(route: &str, client: &str, status: u16, detail: &str) {
    let line = format!("[Relay] {route} client={client} status={status} {detail}");
    if status >= 500 {
        log_error(&line);
    } else if status >= 400 {
        log_warning(&line);
    } else {
        log_info(&line);
    }
}

pub fn log_shutdown_requested(active: usize) {
    log_info(&format!("Shutdown requested, {active} connection(s) in flight"));
}

pub fn log_shutdown_complete(remaining: usize) {
    if remaining == 0 {
        log_info("All connections drained, exiting");
    } else {
        log_warning(&format!("Grace period elapsed with {remaining} connection(s) still open"));
    }
}

//
// Copyright (c) The SLP Directory Agent Contributors
//
// SPDX-License-Identifier: MIT
//

#![warn(rust_2018_idioms)]

mod config;
mod net;
mod wire;

use std::net::Ipv4Addr;
use std::str::FromStr;
use std::sync::Arc;

use clap::{App, Arg};
use config::{AttributeValue, Config, LoggingFmtStyle};
use slp_da_core::attr::{AttrValue, Attributes};
use slp_da_core::cache::ServiceInfoCache;
use slp_da_core::da_info::DirectoryAgentInfo;
use slp_da_core::handlers::DaBindings;
use slp_da_core::lifecycle::DirectoryAgent;
use slp_da_core::scope::Scopes;
use tracing::{info, warn};
use tracing_subscriber::Layer;
use tracing_subscriber::prelude::*;

fn init_tracing(config: &config::Logging) {
    let stdout = config.stdout.enabled.then(|| {
        let layer = tracing_subscriber::fmt::layer().with_target(false);
        match config.stdout.style {
            LoggingFmtStyle::Compact => layer.compact().boxed(),
            LoggingFmtStyle::Full => layer.boxed(),
            LoggingFmtStyle::Json => layer.json().boxed(),
            LoggingFmtStyle::Pretty => layer.pretty().boxed(),
        }
    });

    let env_filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive("slp_dad=info".parse().unwrap())
        .from_env_lossy();

    tracing_subscriber::registry().with(env_filter).with(stdout).init();
}

/// Expands `"*"` to every local non-loopback IPv4 address; anything
/// else is taken literally (§9 "Wildcard bind addresses").
fn expand_addresses(addresses: &[String]) -> Vec<Ipv4Addr> {
    let mut expanded = Vec::new();
    for address in addresses {
        if address == "*" {
            match local_ipv4_addresses() {
                Ok(addrs) => expanded.extend(addrs),
                Err(error) => warn!(%error, "failed to enumerate local addresses"),
            }
            continue;
        }
        match Ipv4Addr::from_str(address) {
            Ok(addr) => expanded.push(addr),
            Err(error) => warn!(%address, %error, "invalid bind address, skipping"),
        }
    }
    expanded
}

fn local_ipv4_addresses() -> std::io::Result<Vec<Ipv4Addr>> {
    let hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
    match std::net::ToSocketAddrs::to_socket_addrs(&(hostname.as_str(), 0)) {
        Ok(addrs) => Ok(addrs
            .filter_map(|addr| match addr.ip() {
                std::net::IpAddr::V4(v4) if !v4.is_loopback() => Some(v4),
                _ => None,
            })
            .collect()),
        Err(error) => Err(error),
    }
}

fn build_attributes(entries: &[config::AttributeEntry]) -> Attributes {
    let mut attrs = Attributes::new();
    for entry in entries {
        if entry.values.is_empty() {
            attrs.set_flag(&entry.tag);
        } else {
            let values = entry
                .values
                .iter()
                .map(|v| match v {
                    AttributeValue::String(s) => AttrValue::String(s.clone()),
                    AttributeValue::Integer(i) => AttrValue::Integer(*i),
                    AttributeValue::Bool(b) => AttrValue::Bool(*b),
                })
                .collect();
            attrs.set_values(&entry.tag, values);
        }
    }
    attrs
}

fn boot_time_now() -> u32 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}

async fn run(config: Config) {
    let addresses = expand_addresses(&config.addresses);
    if addresses.is_empty() {
        eprintln!("no usable bind addresses, exiting");
        std::process::exit(1);
    }

    let scopes = Scopes::new(&config.scopes);
    let attributes = build_attributes(&config.attributes);
    let boot_time = boot_time_now();

    let mut bindings = DaBindings::new();
    for address in &addresses {
        bindings.insert(
            address.to_string(),
            DirectoryAgentInfo::new(
                address.to_string(),
                scopes.clone(),
                attributes.clone(),
                config.language.clone(),
                boot_time,
                config.port,
            ),
        );
    }
    let bindings = Arc::new(bindings);
    let cache = Arc::new(ServiceInfoCache::new());

    let udp_socket = match net::bind_multicast(addresses[0], config.port) {
        Ok(socket) => Arc::new(socket),
        Err(error) => {
            eprintln!("failed to bind UDP multicast socket: {error}");
            std::process::exit(1);
        }
    };
    let tcp_listener = match tokio::net::TcpListener::bind((addresses[0], config.port)).await {
        Ok(listener) => listener,
        Err(error) => {
            eprintln!("failed to bind TCP listener: {error}");
            std::process::exit(1);
        }
    };

    let sink = Arc::new(net::MulticastAdvertSink::new(udp_socket.clone(), config.port));
    let mut agent = DirectoryAgent::new(
        cache.clone(),
        bindings.clone(),
        sink,
        std::time::Duration::from_secs(config.advertisement_period_secs),
        std::time::Duration::from_secs(config.expired_services_purge_period_secs),
    );
    agent.start();

    let local_address = addresses[0].to_string();
    let udp_task = tokio::spawn(net::udp_read_loop(
        udp_socket,
        cache.clone(),
        bindings.clone(),
        local_address.clone(),
    ));
    let tcp_task = tokio::spawn(net::tcp_accept_loop(tcp_listener, cache, bindings, local_address));

    info!(addresses = ?addresses, port = config.port, "directory agent started");

    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(%error, "failed to listen for shutdown signal");
    }

    // Detach the dispatcher from both servers before the agent's own
    // teardown (§5 "Cancellation & shutdown"): once aborted, neither
    // loop can dispatch into the cache again.
    udp_task.abort();
    tcp_task.abort();
    agent.stop();
}

fn main() {
    let matches = App::new("SLP directory agent")
        .version(clap::crate_version!())
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("file")
                .help("Specify an alternative configuration file."),
        )
        .get_matches();

    let config_file = matches.value_of("config");
    let config = Config::load(config_file);

    init_tracing(&config.logging);

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to create async runtime")
        .block_on(run(config));
}

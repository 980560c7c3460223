use std::net::{IpAddr, Ipv4Addr, SocketAddr};

#[derive(Debug)]
pub struct Config {
    /// address for the API server to listen on.
    ///  if not set then 0.0.0.0:8080 will be used
    pub api_listen_addr: Option<SocketAddr>,

    /// core actor/trust configuration shared with the engines
    pub core: common::config::Config,

    // misc
    pub log_level: tracing::Level,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_listen_addr: Some(SocketAddr::new(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)), 8080)),
            core: common::config::Config::default(),
            log_level: tracing::Level::INFO,
        }
    }
}

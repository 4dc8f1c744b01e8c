//! Server block generation from a manifest.

use crate::directive::{self, Directive};
use crate::inspect::split_host_port;
use crate::manifest::Manifest;

/// Render the fixed single-location template for `manifest`.
///
/// The block listens on `listen_port` unless the domain itself is
/// `host:port`, in which case that port is used and `host` becomes the
/// server name.
pub fn render(manifest: &Manifest, listen_port: u16) -> String {
    let domain = manifest.domain.trim();
    let (server_name, listen_port) = match split_host_port(domain) {
        Some((host, port)) => (host, port.parse().unwrap_or(listen_port)),
        None => (domain, listen_port),
    };
    let upstream = format!(
        "{}://{}:{}",
        manifest.protocol,
        manifest.upstream_host(),
        manifest.port
    );

    let server = Directive::block(
        "server",
        Vec::<String>::new(),
        vec![
            Directive::simple("listen", [listen_port.to_string()]),
            Directive::simple("server_name", [server_name]),
            Directive::block(
                "location",
                ["/"],
                vec![
                    Directive::simple("proxy_pass", [upstream]),
                    Directive::simple("proxy_set_header", ["Host", "$host"]),
                    Directive::simple("proxy_set_header", ["X-Real-IP", "$remote_addr"]),
                ],
            ),
        ],
    );

    directive::print(&[server])
}

//! Shared helpers for integration tests: a tiny loopback HTTP server that
//! serves the two range lists.

#![allow(dead_code)]

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// What the server answers for each list
#[derive(Debug, Clone)]
pub struct Lists {
    pub ipv4: String,
    pub ipv6: String,
    /// Status code used for every response
    pub status: u16,
    /// Wait this long before answering
    pub delay: Option<Duration>,
    /// Send bodies chunked, without Content-Length
    pub chunked: bool,
}

impl Lists {
    pub fn new(ipv4: &str, ipv6: &str) -> Self {
        Self {
            ipv4: ipv4.to_string(),
            ipv6: ipv6.to_string(),
            status: 200,
            delay: None,
            chunked: false,
        }
    }
}

/// Serves `/ips-v4` and `/ips-v6` on 127.0.0.1 until the test process exits
pub struct RangeServer {
    port: u16,
    lists: Arc<Mutex<Lists>>,
}

impl RangeServer {
    pub fn start(lists: Lists) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let lists = Arc::new(Mutex::new(lists));

        let shared = Arc::clone(&lists);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let lists = shared.lock().unwrap().clone();
                thread::spawn(move || handle(stream, &lists));
            }
        });

        Self { port, lists }
    }

    pub fn ipv4_url(&self) -> String {
        format!("http://127.0.0.1:{}/ips-v4", self.port)
    }

    pub fn ipv6_url(&self) -> String {
        format!("http://127.0.0.1:{}/ips-v6", self.port)
    }

    /// Change what later requests receive
    pub fn set(&self, lists: Lists) {
        *self.lists.lock().unwrap() = lists;
    }
}

fn handle(mut stream: TcpStream, lists: &Lists) {
    let mut reader = BufReader::new(stream.try_clone().unwrap());

    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return;
    }
    // Drain headers
    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) if line == "\r\n" || line == "\n" => break,
            Ok(_) => {}
            Err(_) => return,
        }
    }

    let path = request_line.split_whitespace().nth(1).unwrap_or("/");
    let (status, body) = match path {
        "/ips-v4" => (lists.status, lists.ipv4.as_str()),
        "/ips-v6" => (lists.status, lists.ipv6.as_str()),
        _ => (404, "not found"),
    };
    let reason = if status == 200 { "OK" } else { "Error" };

    if let Some(delay) = lists.delay {
        thread::sleep(delay);
    }

    let response = if lists.chunked {
        format!(
            "HTTP/1.1 {} {}\r\nContent-Type: text/plain\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n{:x}\r\n{}\r\n0\r\n\r\n",
            status,
            reason,
            body.len(),
            body
        )
    } else {
        format!(
            "HTTP/1.1 {} {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            reason,
            body.len(),
            body
        )
    };
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

/// Path of a template shipped with the crate
pub fn shipped_template(name: &str) -> String {
    format!("{}/templates/{}", env!("CARGO_MANIFEST_DIR"), name)
}

/// Write a config file for a run confined to `dir`
pub fn write_config(
    dir: &Path,
    server: &RangeServer,
    firewall_template: &str,
    proxy_reload: &[&str],
    firewall_reload: &[&str],
) -> std::path::PathBuf {
    let quote_all = |argv: &[&str]| {
        argv.iter()
            .map(|a| format!("\"{}\"", a))
            .collect::<Vec<_>>()
            .join(", ")
    };

    let yaml = format!(
        r#"sources:
  ipv4_url: "{ipv4}"
  ipv6_url: "{ipv6}"
  timeout_secs: 5
templates:
  proxy: "{proxy_template}"
  firewall: "{firewall_template}"
outputs:
  proxy: "{dir}/cf_ips.conf"
  firewall: "{dir}/nftables.conf"
state_file: "{dir}/cf_ip_hash.txt"
log_file: "{dir}/exec-report.log"
lock_file: "{dir}/cfsync.lock"
reload:
  proxy:
    name: "nginx"
    command: [{proxy_reload}]
  firewall:
    name: "nftables"
    command: [{firewall_reload}]
"#,
        ipv4 = server.ipv4_url(),
        ipv6 = server.ipv6_url(),
        proxy_template = shipped_template("cf_ips.conf.j2"),
        firewall_template = firewall_template,
        dir = dir.display(),
        proxy_reload = quote_all(proxy_reload),
        firewall_reload = quote_all(firewall_reload),
    );

    let path = dir.join("config.yaml");
    std::fs::write(&path, yaml).unwrap();
    path
}

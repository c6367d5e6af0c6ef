// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Test data generators for attack simulation.

use std::net::{IpAddr, Ipv4Addr};

/// Generate a pool of IP addresses for testing.
pub fn generate_ips(count: usize) -> Vec<IpAddr> {
    (0..count)
        .map(|i| {
            // Use 10.x.x.x private range
            let a = ((i >> 16) & 0xFF) as u8;
            let b = ((i >> 8) & 0xFF) as u8;
            let c = (i & 0xFF) as u8;
            IpAddr::V4(Ipv4Addr::new(10, a, b, c))
        })
        .collect()
}

/// Paths commonly probed by vulnerability scanners.
pub fn scanner_paths() -> Vec<&'static str> {
    vec![
        "/.env",
        "/.env.local",
        "/.env.production",
        "/backend/.env",
        "/api/.env",
        "/.git/config",
        "/.git/HEAD",
        "/wp-admin/setup-config.php",
        "/wp-login.php",
        "/wp-content/plugins/",
        "/phpmyadmin/index.php",
        "/xmlrpc.php",
        "/.aws/credentials",
        "/cgi-bin/luci",
        "/vendor/phpunit/phpunit/src/Util/PHP/eval-stdin.php",
        "/actuator/health",
        "/.DS_Store",
        "/config.php",
    ]
}

/// Paths a legitimate client of the service would request.
pub fn legitimate_paths() -> Vec<&'static str> {
    vec![
        "/",
        "/health",
        "/healthz",
        "/convert/pptx-to-jpeg/",
        "/static/1a2b3c4d_001.jpg",
        "/static/1a2b3c4d_002.jpg",
        "/environment.txt",
        "/missing-real-page",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_ips() {
        let ips = generate_ips(256);
        assert_eq!(ips.len(), 256);
        // All should be unique
        let unique: std::collections::HashSet<_> = ips.iter().collect();
        assert_eq!(unique.len(), 256);
    }

    #[test]
    fn test_path_pools_disjoint() {
        let scanner = scanner_paths();
        assert!(legitimate_paths().iter().all(|p| !scanner.contains(p)));
    }
}

//! Template rendering for the generated configuration files.
//!
//! Templates use Jinja2 syntax (rendered with minijinja) and see exactly two
//! variables: `cf_ipv4` and `cf_ipv6`, the sorted range lists.

use minijinja::{context, Environment, UndefinedBehavior};
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

use crate::config::TemplatesConfig;
use crate::error::SyncError;
use crate::fetcher::IpRanges;
use crate::fs_abstraction::FileSystem;

/// One template, loaded once at startup
#[derive(Debug, Clone)]
pub struct TemplateSource {
    name: String,
    source: String,
}

impl TemplateSource {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }

    /// Read a template file. A missing template is a configuration error.
    pub fn load(fs: &dyn FileSystem, path: &Path) -> Result<Self, SyncError> {
        let source = fs.read_to_string(path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                SyncError::Configuration(format!("Template not found: {}", path.display()))
            } else {
                SyncError::Configuration(format!(
                    "Failed to read template {}: {}",
                    path.display(),
                    e
                ))
            }
        })?;

        debug!(template = %path.display(), bytes = source.len(), "Loaded template");
        Ok(Self::new(path.display().to_string(), source))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Expand the template against the range lists.
    pub fn render(&self, ranges: &IpRanges) -> Result<String, SyncError> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);

        let template = env
            .template_from_named_str(&self.name, &self.source)
            .map_err(|e| render_error(&self.name, &e))?;

        template
            .render(context! {
                cf_ipv4 => &ranges.ipv4,
                cf_ipv6 => &ranges.ipv6,
            })
            .map_err(|e| render_error(&self.name, &e))
    }
}

fn render_error(name: &str, err: &minijinja::Error) -> SyncError {
    match err.line() {
        Some(line) => SyncError::Render(format!("{} (line {}): {}", name, line, err)),
        None => SyncError::Render(format!("{}: {}", name, err)),
    }
}

/// Both templates of a deployment
#[derive(Debug, Clone)]
pub struct Templates {
    pub proxy: TemplateSource,
    pub firewall: TemplateSource,
}

/// Output of one render pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedConfigs {
    pub proxy: String,
    pub firewall: String,
}

impl Templates {
    pub fn load(fs: &dyn FileSystem, config: &TemplatesConfig) -> Result<Self, SyncError> {
        Ok(Self {
            proxy: TemplateSource::load(fs, &config.proxy)?,
            firewall: TemplateSource::load(fs, &config.firewall)?,
        })
    }

    /// Render both documents. Nothing is returned unless both succeed.
    pub fn render_all(&self, ranges: &IpRanges) -> Result<RenderedConfigs, SyncError> {
        Ok(RenderedConfigs {
            proxy: self.proxy.render(ranges)?,
            firewall: self.firewall.render(ranges)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs_abstraction::MockFileSystem;
    use std::io;
    use std::path::PathBuf;

    const PROXY_TEMPLATE: &str = include_str!("../templates/cf_ips.conf.j2");
    const FIREWALL_TEMPLATE: &str = include_str!("../templates/nftables.conf.j2");

    fn sample_ranges() -> IpRanges {
        IpRanges::new(
            vec!["10.0.0.0/8".to_string(), "1.1.1.0/24".to_string()],
            vec!["2606:4700::/32".to_string(), "2400:cb00::/32".to_string()],
        )
    }

    #[test]
    fn test_render_one_line_per_range_in_order() {
        let template = TemplateSource::new(
            "allow",
            "{% for ip in cf_ipv4 %}allow {{ ip }};\n{% endfor %}{% for ip in cf_ipv6 %}allow {{ ip }};\n{% endfor %}deny all;",
        );

        let output = template.render(&sample_ranges()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(
            lines,
            vec![
                "allow 1.1.1.0/24;",
                "allow 10.0.0.0/8;",
                "allow 2400:cb00::/32;",
                "allow 2606:4700::/32;",
                "deny all;",
            ]
        );
    }

    #[test]
    fn test_render_drops_single_trailing_newline() {
        let template = TemplateSource::new("t", "{{ cf_ipv4 | length }}\n");
        assert_eq!(template.render(&sample_ranges()).unwrap(), "2");
    }

    #[test]
    fn test_render_undefined_variable_fails() {
        let template = TemplateSource::new("bad", "{% for ip in cf_ips %}{{ ip }}{% endfor %}");
        let err = template.render(&sample_ranges()).unwrap_err();
        assert!(matches!(err, SyncError::Render(_)));
        assert!(err.to_string().contains("bad"));
    }

    #[test]
    fn test_render_syntax_error_fails() {
        let template = TemplateSource::new("broken", "{% for ip in cf_ipv4 %}{{ ip }}");
        let err = template.render(&sample_ranges()).unwrap_err();
        assert!(matches!(err, SyncError::Render(_)));
    }

    #[test]
    fn test_shipped_proxy_template() {
        let template = TemplateSource::new("cf_ips.conf.j2", PROXY_TEMPLATE);
        let output = template.render(&sample_ranges()).unwrap();

        let entries: Vec<&str> = output
            .lines()
            .filter(|l| l.starts_with("set_real_ip_from"))
            .collect();
        assert_eq!(
            entries,
            vec![
                "set_real_ip_from 1.1.1.0/24;",
                "set_real_ip_from 10.0.0.0/8;",
                "set_real_ip_from 2400:cb00::/32;",
                "set_real_ip_from 2606:4700::/32;",
            ]
        );
        assert!(output.contains("real_ip_header CF-Connecting-IP;"));
    }

    #[test]
    fn test_shipped_firewall_template_lists_ranges_sorted() {
        let template = TemplateSource::new("nftables.conf.j2", FIREWALL_TEMPLATE);
        let output = template.render(&sample_ranges()).unwrap();

        let first = output.find("1.1.1.0/24").unwrap();
        let second = output.find("10.0.0.0/8").unwrap();
        assert!(first < second);

        assert!(output.contains("            1.1.1.0/24,\n            10.0.0.0/8\n        }"));
        assert!(output.contains("            2400:cb00::/32,\n            2606:4700::/32\n        }"));
    }

    #[test]
    fn test_load_missing_template_is_configuration_error() {
        let mut fs = MockFileSystem::new();
        fs.expect_read_to_string()
            .returning(|_| Err(io::Error::new(io::ErrorKind::NotFound, "missing")));

        let err = TemplateSource::load(&fs, Path::new("nftables.conf.j2")).unwrap_err();
        assert!(matches!(err, SyncError::Configuration(_)));
        assert!(err.to_string().contains("nftables.conf.j2"));
    }

    #[test]
    fn test_templates_load_both() {
        let mut fs = MockFileSystem::new();
        fs.expect_read_to_string()
            .withf(|p| p == Path::new("proxy.j2"))
            .returning(|_| Ok("proxy {{ cf_ipv4 | length }}".to_string()));
        fs.expect_read_to_string()
            .withf(|p| p == Path::new("firewall.j2"))
            .returning(|_| Ok("firewall {{ cf_ipv6 | length }}".to_string()));

        let config = TemplatesConfig {
            proxy: PathBuf::from("proxy.j2"),
            firewall: PathBuf::from("firewall.j2"),
        };
        let templates = Templates::load(&fs, &config).unwrap();
        assert_eq!(templates.proxy.name(), "proxy.j2");

        let rendered = templates.render_all(&sample_ranges()).unwrap();
        assert_eq!(rendered.proxy, "proxy 2");
        assert_eq!(rendered.firewall, "firewall 2");
    }

    #[test]
    fn test_render_all_fails_if_either_fails() {
        let templates = Templates {
            proxy: TemplateSource::new("proxy", "ok"),
            firewall: TemplateSource::new("firewall", "{{ missing }}"),
        };
        assert!(templates.render_all(&sample_ranges()).is_err());
    }
}

use super::parse_bool_env;
use std::env;

/// Token bucket settings for one route group.
///
/// `per_second` is the replenish period handed to `tower_governor`, so larger
/// values are stricter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRule {
    pub per_second: u64,
    pub burst_size: u32,
}

impl RateLimitRule {
    const fn new(per_second: u64, burst_size: u32) -> Self {
        Self {
            per_second,
            burst_size,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub public_read: RateLimitRule,
    pub moderation: RateLimitRule,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            public_read: RateLimitRule::new(1, 60),
            moderation: RateLimitRule::new(2, 20),
        }
    }
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.enabled = parse_bool_env("RATE_LIMIT_ENABLED", cfg.enabled);

        if let Ok(raw) = env::var("RATE_LIMIT_CONFIG") {
            match parse_rate_limit_config(&raw) {
                Ok(overrides) => cfg.apply(&overrides),
                Err(err) => {
                    tracing::warn!("Invalid RATE_LIMIT_CONFIG '{}': {}", raw, err);
                }
            }
        }

        cfg
    }

    fn apply(&mut self, overrides: &[(RouteGroup, RateLimitRule)]) {
        for (group, rule) in overrides {
            match group {
                RouteGroup::All => {
                    self.public_read = *rule;
                    self.moderation = *rule;
                }
                RouteGroup::PublicRead => self.public_read = *rule,
                RouteGroup::Moderation => self.moderation = *rule,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RouteGroup {
    All,
    PublicRead,
    Moderation,
}

impl RouteGroup {
    fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "public" | "public_read" | "public-read" => Some(Self::PublicRead),
            "moderation" | "mod" => Some(Self::Moderation),
            _ => None,
        }
    }
}

/// Accepts either a global rule (`"2:20"`) or per-group rules
/// (`"public=1:60,moderation=2:20"`).
fn parse_rate_limit_config(raw: &str) -> Result<Vec<(RouteGroup, RateLimitRule)>, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("empty value".to_string());
    }

    if !trimmed.contains('=') {
        return Ok(vec![(RouteGroup::All, parse_rule(trimmed)?)]);
    }

    trimmed
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            let (name, raw_rule) = item
                .split_once('=')
                .ok_or_else(|| format!("invalid item '{}', expected name=per:burst", item))?;
            let group = RouteGroup::parse(name.trim()).ok_or_else(|| {
                format!(
                    "unknown group '{}', expected public/moderation",
                    name.trim()
                )
            })?;
            Ok((group, parse_rule(raw_rule.trim())?))
        })
        .collect()
}

fn parse_rule(raw: &str) -> Result<RateLimitRule, String> {
    let (per_second_raw, burst_raw) = raw
        .split_once(':')
        .ok_or_else(|| format!("invalid rule '{}', expected per:burst", raw))?;

    let per_second: u64 = per_second_raw
        .trim()
        .parse()
        .map_err(|_| format!("invalid per_second '{}'", per_second_raw.trim()))?;
    let burst_size: u32 = burst_raw
        .trim()
        .parse()
        .map_err(|_| format!("invalid burst_size '{}'", burst_raw.trim()))?;

    if per_second == 0 || burst_size == 0 {
        return Err("per_second and burst_size must be > 0".to_string());
    }

    Ok(RateLimitRule::new(per_second, burst_size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_rule_applies_to_every_group() {
        let overrides = parse_rate_limit_config("3:30").unwrap();
        let mut cfg = RateLimitConfig::default();
        cfg.apply(&overrides);
        assert_eq!(cfg.public_read, RateLimitRule::new(3, 30));
        assert_eq!(cfg.moderation, RateLimitRule::new(3, 30));
    }

    #[test]
    fn grouped_rules_override_only_named_groups() {
        let overrides = parse_rate_limit_config("moderation=5:6").unwrap();
        let mut cfg = RateLimitConfig::default();
        cfg.apply(&overrides);
        assert_eq!(cfg.moderation, RateLimitRule::new(5, 6));
        assert_eq!(cfg.public_read, RateLimitConfig::default().public_read);
    }

    #[test]
    fn group_aliases_are_accepted() {
        let overrides = parse_rate_limit_config("public-read=8:16,mod=1:2").unwrap();
        assert_eq!(
            overrides,
            vec![
                (RouteGroup::PublicRead, RateLimitRule::new(8, 16)),
                (RouteGroup::Moderation, RateLimitRule::new(1, 2)),
            ]
        );
    }

    #[test]
    fn unknown_group_is_rejected() {
        let err = parse_rate_limit_config("auth=1:2").unwrap_err();
        assert!(err.contains("unknown group"));
    }

    #[test]
    fn zero_burst_is_rejected() {
        assert!(parse_rate_limit_config("1:0").is_err());
    }
}

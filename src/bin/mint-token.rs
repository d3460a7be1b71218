//! Print a bearer token for local development.
//!
//! Usage: cargo run --bin mint-token [USER_ID] [TTL_HOURS]

use chrono::Duration;
use giftlist_backend::{config::AppConfig, identity::IdentityProvider};
use std::env;
use uuid::Uuid;

const USAGE: &str = "Usage: cargo run --bin mint-token [USER_ID] [TTL_HOURS]";
const DEFAULT_TTL_HOURS: i64 = 24;
/// One year.
const MAX_TTL_HOURS: i64 = 24 * 366;

/// Token lifetime from the optional TTL_HOURS argument.
fn parse_ttl(arg: Option<&str>) -> Result<Duration, String> {
    let hours = match arg {
        None => DEFAULT_TTL_HOURS,
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .map_err(|_| format!("TTL_HOURS must be a whole number, got '{}'", raw))?,
    };
    if !(1..=MAX_TTL_HOURS).contains(&hours) {
        return Err(format!(
            "TTL_HOURS must be between 1 and {}, got {}",
            MAX_TTL_HOURS, hours
        ));
    }
    Duration::try_hours(hours).ok_or_else(|| format!("TTL_HOURS out of range: {}", hours))
}

fn main() {
    dotenvy::dotenv().ok();

    let user_id = match env::args().nth(1) {
        Some(arg) => Uuid::parse_str(&arg).unwrap_or_else(|_| {
            eprintln!("{}", USAGE);
            eprintln!("USER_ID must be a UUID, got '{}'", arg);
            std::process::exit(1);
        }),
        None => Uuid::new_v4(),
    };
    let ttl = parse_ttl(env::args().nth(2).as_deref()).unwrap_or_else(|e| {
        eprintln!("{}", USAGE);
        eprintln!("{}", e);
        std::process::exit(1);
    });

    let config = AppConfig::from_env();
    if config.is_production() {
        eprintln!("Refusing to mint tokens with ENVIRONMENT=production");
        std::process::exit(1);
    }

    let identity = IdentityProvider::new(&config.jwt_secret, config.jwt_audience.clone());
    match identity.issue(user_id, ttl) {
        Ok(token) => {
            println!("\nUser  : {}", user_id);
            println!("TTL   : {}h", ttl.num_hours());
            println!("Token : {}\n", token);
            println!("# Use it as:");
            println!("Authorization: Bearer {}", token);
        }
        Err(e) => {
            eprintln!("Error minting token: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_defaults_to_a_day() {
        assert_eq!(parse_ttl(None).unwrap(), Duration::hours(24));
        assert_eq!(parse_ttl(Some(" 48 ")).unwrap(), Duration::hours(48));
    }

    #[test]
    fn test_ttl_out_of_range_is_rejected() {
        for raw in ["9223372036854775807", "-5", "0", "9000", "soon"] {
            assert!(parse_ttl(Some(raw)).is_err(), "accepted {}", raw);
        }
        assert!(parse_ttl(Some(&MAX_TTL_HOURS.to_string())).is_ok());
    }
}
